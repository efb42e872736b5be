//! The in-memory object graph: every
//! resident indirect object keyed by id, the trailer, and the recovered
//! cross-reference table. The hard work (recovering this map from bytes,
//! writing it back out) lives in `reader`/`parser` and `writer`.

use std::collections::BTreeMap;
use std::io::Write as IoWrite;
use std::path::Path;

use crate::dictionary::Dictionary;
use crate::encryption::{self, EncryptionState};
use crate::error::Error;
use crate::object::{Object, ObjectLifecycle};
use crate::writer::{SaveOptions, WriteMode};
use crate::xref::{Xref, XrefEntry, XrefType};
use crate::{ObjectId, Result};

#[derive(Debug, Clone)]
pub struct Document {
    /// `"1.4"`, `"1.7"`, `"2.0"`, etc, parsed from the `%PDF-M.m` header.
    pub version: String,
    pub objects: BTreeMap<ObjectId, Object>,
    pub trailer: Dictionary,
    pub reference_table: Xref,
    /// Highest object number currently allocated; `add_object`/`new_object_id`
    /// hand out `max_id + 1` and bump this.
    pub max_id: u32,
    /// Raw bytes of the `%...` binary-marker comment, if the header carried
    /// one; re-emitted verbatim by the writer.
    pub binary_mark: Vec<u8>,
    /// Byte offset the primary `startxref` pointed at (informational; the
    /// writer computes its own on save).
    pub xref_start: usize,
    pub encryption_state: Option<EncryptionState>,
    /// spec.md §4.9 state machine, tracked per id: `Unparsed` for anything
    /// not yet touched, through `DictResident`/`StreamResident` once the
    /// object's value is the one held in `objects`, to `Free` once
    /// [`Document::free_object`] releases the slot. Never removed once set,
    /// so `Free` stays visible after the `objects` entry itself is gone.
    pub lifecycle: BTreeMap<ObjectId, ObjectLifecycle>,
}

/// The lifecycle state a freshly materialized `obj` should be recorded at:
/// `StreamResident` for a stream whose content has actually been read,
/// `HeaderParsed` for a stream still waiting on a deferred `/Length`
/// (§4.7's two-pass loader), `DictResident` for everything else.
pub(crate) fn resident_lifecycle(obj: &Object) -> ObjectLifecycle {
    match obj {
        Object::Stream(stream) if stream.start_position.is_none() || !stream.content.is_empty() => {
            ObjectLifecycle::StreamResident
        }
        Object::Stream(_) => ObjectLifecycle::HeaderParsed,
        _ => ObjectLifecycle::DictResident,
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Document {
            version: "1.7".to_string(),
            objects: BTreeMap::new(),
            trailer: Dictionary::new(),
            reference_table: Xref::new(1, XrefType::Table),
            max_id: 0,
            binary_mark: Vec::new(),
            xref_start: 0,
            encryption_state: None,
            lifecycle: BTreeMap::new(),
        }
    }

    /// Current lifecycle state of `id`, per spec.md §4.9; an id never
    /// touched by the reader/writer reads as `Unparsed`.
    pub fn lifecycle_of(&self, id: ObjectId) -> ObjectLifecycle {
        self.lifecycle.get(&id).copied().unwrap_or(ObjectLifecycle::Unparsed)
    }

    /// Records that `id` now holds `obj`: `StreamResident` for a stream
    /// whose content has actually been read, `DictResident` for every other
    /// resident value (including a stream still waiting on a deferred
    /// `/Length`, per §4.7's two-pass loader).
    pub(crate) fn mark_resident(&mut self, id: ObjectId, obj: &Object) {
        self.lifecycle.insert(id, resident_lifecycle(obj));
    }

    /// Final lifecycle pass `Reader::read` runs once loading settles:
    /// every free xref slot reads as `Free`, every id actually holding an
    /// object reads as `DictResident`/`StreamResident` per
    /// [`resident_lifecycle`]. Covers both the plain and encrypted loading
    /// paths, which insert into `objects` at different call sites.
    pub(crate) fn sync_lifecycle(&mut self) {
        for (&num, entry) in self.reference_table.entries.iter() {
            if let XrefEntry::Free { generation, .. } = *entry {
                self.lifecycle.insert((num, generation), ObjectLifecycle::Free);
            }
        }
        let resident: Vec<(ObjectId, ObjectLifecycle)> =
            self.objects.iter().map(|(&id, obj)| (id, resident_lifecycle(obj))).collect();
        self.lifecycle.extend(resident);
    }

    pub fn get_object(&self, id: ObjectId) -> Result<&Object> {
        self.objects.get(&id).ok_or(Error::MissingXrefEntry)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.objects.get_mut(&id).ok_or(Error::MissingXrefEntry)
    }

    pub fn get_dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        self.get_object(id).and_then(Object::as_dict)
    }

    /// Resolves one level of indirection: a `Reference` becomes the object
    /// it points at (cloned), anything else passes through unchanged. The
    /// returned id is the reference's target, or `(0, 0)` when `value`
    /// was not itself a reference (there is nothing to name).
    pub fn dereference(&self, value: &Object) -> Result<(ObjectId, Object)> {
        match value {
            Object::Reference(id) => {
                let resolved = self.get_object_following_chain(*id)?;
                Ok((*id, resolved))
            }
            other => Ok(((0, 0), other.clone())),
        }
    }

    /// Follows a chain of references (a reference to a reference) up to
    /// [`crate::xref::MAX_DEREFERENCE_DEPTH`] hops; dereferencing itself
    /// must be cycle-safe.
    fn get_object_following_chain(&self, mut id: ObjectId) -> Result<Object> {
        let mut hops = 0;
        loop {
            let obj = self.get_object(id)?;
            match obj {
                Object::Reference(next) => {
                    hops += 1;
                    if hops > crate::xref::MAX_DEREFERENCE_DEPTH {
                        return Err(Error::ReferenceCycle(id));
                    }
                    id = *next;
                }
                other => return Ok(other.clone()),
            }
        }
    }

    /// Allocates the next free object number (generation 0) without storing
    /// anything in it yet.
    pub fn new_object_id(&mut self) -> ObjectId {
        self.max_id += 1;
        (self.max_id, 0)
    }

    /// Inserts `value` as a brand new indirect object and returns its id.
    pub fn add_object<T: Into<Object>>(&mut self, value: T) -> ObjectId {
        let id = self.new_object_id();
        let obj = value.into();
        self.mark_resident(id, &obj);
        self.objects.insert(id, obj);
        id
    }

    /// Replaces (or inserts) the object at `id`, leaving `max_id` untouched
    /// if `id` was already within range.
    pub fn set_object<T: Into<Object>>(&mut self, id: ObjectId, value: T) {
        if id.0 > self.max_id {
            self.max_id = id.0;
        }
        let obj = value.into();
        self.mark_resident(id, &obj);
        self.objects.insert(id, obj);
    }

    /// Removes an object and marks its xref slot free, bumping the
    /// generation for reuse (spec's "every free() bumps generation, never
    /// reuses 65535" decision, SPEC_FULL.md §5).
    pub fn free_object(&mut self, id: ObjectId) {
        self.objects.remove(&id);
        let next_generation = if id.1 == u16::MAX { u16::MAX } else { id.1 + 1 };
        let _ = self.reference_table.insert(
            id.0,
            XrefEntry::Free {
                next: 0,
                generation: next_generation,
            },
        );
        self.lifecycle.insert(id, ObjectLifecycle::Free);
    }

    /// Attempts to authenticate `password` against `/Encrypt` (as both the
    /// user and owner password) without mutating `self`; `Reader` installs
    /// the resulting [`EncryptionState`] once authentication succeeds.
    pub fn authenticate_password(&self, password: &str) -> Result<EncryptionState> {
        EncryptionState::decode(self, password)
    }

    pub fn save<W: IoWrite>(&mut self, target: W) -> Result<()> {
        self.save_with_options(target, SaveOptions::default())
    }

    pub fn save_to<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.save(file)
    }

    pub fn save_with_options<W: IoWrite>(&mut self, target: W, options: SaveOptions) -> Result<()> {
        crate::writer::write_document(self, target, options, WriteMode::Clean)
    }

    pub fn encrypt(&mut self, state: EncryptionState) {
        self.encryption_state = Some(state);
    }

    /// Applies `self.encryption_state`'s encryption in place to every
    /// resident object except the `/Encrypt` dictionary itself, for the
    /// writer to call right before serialization.
    pub(crate) fn encrypt_objects_for_save(&mut self) {
        let Some(state) = self.encryption_state.clone() else {
            return;
        };
        let encrypt_ref = self.trailer.get(b"Encrypt").and_then(Object::as_reference).ok();
        for (id, obj) in self.objects.iter_mut() {
            if Some(*id) == encrypt_ref {
                continue;
            }
            encryption::encrypt_object(&state, *id, obj);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dereference_follows_chain_and_detects_cycle() {
        let mut doc = Document::new();
        let a = doc.add_object(Object::Integer(42));
        let (_, value) = doc.dereference(&Object::Reference(a)).unwrap();
        assert_eq!(value, Object::Integer(42));

        let b = doc.new_object_id();
        doc.set_object(b, Object::Reference(b));
        assert!(doc.dereference(&Object::Reference(b)).is_err());
    }

    #[test]
    fn free_object_bumps_generation_and_frees_slot() {
        let mut doc = Document::new();
        let id = doc.add_object(Object::Integer(1));
        doc.free_object(id);
        assert!(doc.get_object(id).is_err());
        assert!(!doc.reference_table.is_in_use(id.0));
    }

    #[test]
    fn set_object_raises_max_id() {
        let mut doc = Document::new();
        doc.set_object((5, 0), Object::Integer(1));
        assert_eq!(doc.max_id, 5);
        assert_eq!(doc.new_object_id(), (6, 0));
    }

    /// spec.md §4.9: an untouched id reads `Unparsed`; adding a value moves
    /// it to `DictResident` (or `StreamResident` for a fully-read stream);
    /// `free_object` moves it to `Free` and the state survives the object
    /// itself being gone from `objects`.
    #[test]
    fn lifecycle_tracks_residency_and_freeing() {
        let mut doc = Document::new();
        let untouched = (99, 0);
        assert_eq!(doc.lifecycle_of(untouched), ObjectLifecycle::Unparsed);

        let id = doc.add_object(Object::Integer(1));
        assert_eq!(doc.lifecycle_of(id), ObjectLifecycle::DictResident);

        let stream_id = doc.add_object(crate::object::Stream::new(Dictionary::new(), b"content".to_vec()));
        assert_eq!(doc.lifecycle_of(stream_id), ObjectLifecycle::StreamResident);

        doc.free_object(id);
        assert_eq!(doc.lifecycle_of(id), ObjectLifecycle::Free);
    }
}
