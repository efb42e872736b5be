//! Incremental updates (PDF spec §7.5.6): append only what changed to the
//! tail of an existing file, leaving every byte of the original untouched.
//! A reader that does not understand the update can still recover the
//! original content; one that does walks the `/Prev` chain exactly the way
//! [`crate::reader`] already does when loading a linearized or
//! incrementally-updated file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::dictionary::Dictionary;
use crate::document::Document;
use crate::object::Object;
use crate::writer::write_object_value;
use crate::xref::{Xref, XrefEntry, XrefType};
use crate::{ObjectId, Result};

/// A loaded document paired with a snapshot of its object graph at load
/// time, so that [`IncrementalDocument::save`] can emit only the objects
/// that were added, replaced, or freed since.
pub struct IncrementalDocument {
    original_buffer: Vec<u8>,
    base_objects: BTreeMap<ObjectId, Object>,
    base_xref_start: usize,
    pub new_document: Document,
}

impl IncrementalDocument {
    pub fn create_from(buffer: Vec<u8>, document: Document) -> Self {
        let base_xref_start = document.xref_start;
        IncrementalDocument {
            original_buffer: buffer,
            base_objects: document.objects.clone(),
            base_xref_start,
            new_document: document,
        }
    }

    /// Mutable access to the working copy; callers mutate this the same
    /// way they would a freshly loaded [`Document`].
    pub fn get_document(&mut self) -> &mut Document {
        &mut self.new_document
    }

    fn changed_objects(&self) -> Vec<(ObjectId, Option<&Object>)> {
        let mut changed = Vec::new();
        for (id, obj) in &self.new_document.objects {
            match self.base_objects.get(id) {
                Some(base) if base == obj => {}
                _ => changed.push((*id, Some(obj))),
            }
        }
        for id in self.base_objects.keys() {
            if !self.new_document.objects.contains_key(id) {
                changed.push((*id, None));
            }
        }
        changed.sort_by_key(|(id, _)| *id);
        changed
    }

    pub fn save<W: Write>(&mut self, mut target: W) -> Result<()> {
        target.write_all(&self.original_buffer)?;
        if !self.original_buffer.ends_with(b"\n") {
            target.write_all(b"\n")?;
        }

        let changed = self.changed_objects();
        let base_offset = self.original_buffer.len();
        let mut body = Vec::new();
        let mut xref = Xref::new(self.new_document.max_id + 1, XrefType::Table);

        for (id, obj) in &changed {
            match obj {
                Some(value) => {
                    let offset = (base_offset + body.len()) as u32;
                    write_incremental_object(&mut body, *id, value);
                    xref.insert(id.0, XrefEntry::Normal { offset, generation: id.1 }).ok();
                }
                None => {
                    xref.insert(id.0, XrefEntry::Free { next: 0, generation: id.1.wrapping_add(1) }).ok();
                }
            }
        }

        let xref_offset = base_offset + body.len();
        let mut trailer: Dictionary = self.new_document.trailer.clone();
        trailer.set("Size", (self.new_document.max_id + 1) as i64);
        trailer.set("Prev", self.base_xref_start as i64);

        write_incremental_xref_table(&mut body, &xref);
        body.extend_from_slice(b"trailer\n");
        let mut trailer_bytes = Vec::new();
        write_object_value(&mut trailer_bytes, &Object::Dictionary(trailer));
        body.extend_from_slice(&trailer_bytes);
        body.extend_from_slice(b"\nstartxref\n");
        body.extend_from_slice(format!("{xref_offset}\n").as_bytes());
        body.extend_from_slice(b"%%EOF");

        target.write_all(&body)?;
        Ok(())
    }

    pub fn save_to<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.save(file)
    }
}

fn write_incremental_object(buf: &mut Vec<u8>, id: ObjectId, obj: &Object) {
    buf.extend_from_slice(format!("{} {} obj\n", id.0, id.1).as_bytes());
    write_object_value(buf, obj);
    buf.extend_from_slice(b"\nendobj\n");
}

fn write_incremental_xref_table(buf: &mut Vec<u8>, xref: &Xref) {
    buf.extend_from_slice(b"xref\n");
    let mut ids: Vec<u32> = xref.entries.keys().copied().collect();
    ids.sort_unstable();

    let mut i = 0;
    while i < ids.len() {
        let start = ids[i];
        let mut count = 1;
        while i + count < ids.len() && ids[i + count] == start + count as u32 {
            count += 1;
        }
        buf.extend_from_slice(format!("{start} {count}\n").as_bytes());
        for &id in &ids[i..i + count] {
            match xref.get(id) {
                Some(XrefEntry::Normal { offset, generation }) => {
                    buf.extend_from_slice(format!("{:010} {:05} n \n", offset, generation).as_bytes());
                }
                Some(XrefEntry::Free { next, generation }) => {
                    buf.extend_from_slice(format!("{:010} {:05} f \n", next, generation).as_bytes());
                }
                _ => buf.extend_from_slice(b"0000000000 00000 f \n"),
            }
        }
        i += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_changed_objects_are_appended() {
        let mut doc = Document::new();
        let a = doc.add_object(Object::Integer(1));
        let b = doc.add_object(Object::Integer(2));
        doc.trailer.set("Root", a);

        let original_buffer = b"%PDF-1.7\n%fake\n".to_vec();
        let mut incremental = IncrementalDocument::create_from(original_buffer.clone(), doc);

        incremental.get_document().set_object(b, Object::Integer(99));
        let changed = incremental.changed_objects();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].0, b);

        let mut out = Vec::new();
        incremental.save(&mut out).unwrap();
        assert!(out.starts_with(&original_buffer));
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("99"));
        assert!(text.contains("/Prev"));
    }
}
