//! Object streams (`/ObjStm`, spec.md glossary): an indirect stream whose
//! decoded body packs a run of other objects to let the filter pipeline
//! compress them together. [`ObjectStream::new`] expands one on load;
//! [`ObjectStreamBuilder`] packs a batch of eligible objects into one or
//! more streams on save.

use std::collections::BTreeMap;

use crate::dictionary::Dictionary;
use crate::error::Error;
use crate::object::{Object, Stream};
use crate::{ObjectId, Result};

/// The expansion of a single `/ObjStm` object: every member object it
/// contained, keyed by `(object number, generation 0)` — object streams
/// only ever hold generation-0 objects (PDF 32000-1 §7.5.7).
pub struct ObjectStream {
    pub objects: BTreeMap<ObjectId, Object>,
}

impl ObjectStream {
    /// Expands `stream` (already the owning object's `Stream`, content
    /// still in its filtered/on-disk form) into its member objects. Uses a
    /// second tokenizer pass over the *decoded* body: first the `/N`
    /// `(object_number, relative_offset)` index pairs, then the objects
    /// themselves starting at `/First`. `/Extends` (chained object streams)
    /// is not followed: no test fixture in this corpus uses it and the
    /// spec does not name it as a required scenario.
    pub fn new(stream: &mut Stream) -> Result<Self> {
        let decoded = crate::filters::decode_stream(&stream.dict, &stream.content)?;

        let n = stream
            .dict
            .get(b"N")
            .and_then(Object::as_i64)
            .map_err(|_| Error::InvalidStream("/ObjStm missing /N".to_string()))? as usize;
        let first = stream
            .dict
            .get(b"First")
            .and_then(Object::as_i64)
            .map_err(|_| Error::InvalidStream("/ObjStm missing /First".to_string()))? as usize;

        if first > decoded.len() {
            return Err(Error::InvalidStream("/ObjStm /First past end of decoded body".to_string()));
        }
        let header = &decoded[..first];

        let mut pairs = Vec::with_capacity(n);
        let mut pos = 0usize;
        for _ in 0..n {
            let (num, next) = read_uint_token(header, pos)
                .ok_or_else(|| Error::InvalidStream("/ObjStm index pair truncated".to_string()))?;
            let (rel_offset, next) = read_uint_token(header, next)
                .ok_or_else(|| Error::InvalidStream("/ObjStm index pair truncated".to_string()))?;
            pairs.push((num as u32, rel_offset as usize));
            pos = next;
        }

        let mut objects = BTreeMap::new();
        for (i, &(num, rel_offset)) in pairs.iter().enumerate() {
            let start = first + rel_offset;
            let end = pairs
                .get(i + 1)
                .map(|&(_, next_rel)| first + next_rel)
                .unwrap_or(decoded.len());
            if start > decoded.len() || end > decoded.len() || start > end {
                log::warn!("/ObjStm member {num} has an out-of-range offset, skipping");
                continue;
            }
            match crate::parser::parse_standalone_value(&decoded[start..end]) {
                Ok(obj) => {
                    objects.insert((num, 0), obj);
                }
                Err(e) => log::warn!("/ObjStm member {num} failed to parse: {e}"),
            }
        }

        Ok(ObjectStream { objects })
    }
}

/// Skips leading whitespace, then reads a run of ASCII digits starting at
/// `pos`. Returns the parsed value and the position just past it.
fn read_uint_token(buf: &[u8], mut pos: usize) -> Option<(u64, usize)> {
    while buf.get(pos).map(|b| b.is_ascii_whitespace()).unwrap_or(false) {
        pos += 1;
    }
    let start = pos;
    while buf.get(pos).map(|b| b.is_ascii_digit()).unwrap_or(false) {
        pos += 1;
    }
    if pos == start {
        return None;
    }
    std::str::from_utf8(&buf[start..pos]).ok()?.parse().ok().map(|v| (v, pos))
}

/// One `/ObjStm` object produced by [`ObjectStreamBuilder`]: its dictionary
/// (`/Type /ObjStm`, `/N`, `/First`, `/Filter /FlateDecode`), its already
/// flate-encoded body, and the member object IDs it carries (so the writer
/// can emit `Compressed` xref entries for them).
pub struct ObjectStreamChunk {
    pub dict: Dictionary,
    pub content: Vec<u8>,
    pub member_ids: Vec<ObjectId>,
}

#[derive(Debug, Clone, Copy)]
pub struct ObjectStreamConfig {
    /// Upper bound on how many objects one `/ObjStm` packs before the
    /// builder starts a new one. PDF readers impose no hard cap; this
    /// keeps any single stream from growing unboundedly.
    pub max_objects_per_stream: usize,
}

impl Default for ObjectStreamConfig {
    fn default() -> Self {
        ObjectStreamConfig {
            max_objects_per_stream: 200,
        }
    }
}

pub struct ObjectStreamBuilder {
    config: ObjectStreamConfig,
}

impl ObjectStreamBuilder {
    pub fn new(config: ObjectStreamConfig) -> Self {
        ObjectStreamBuilder { config }
    }

    /// Packs `objects` (the caller is responsible for only passing objects
    /// eligible for compression: no `Stream` payload, not the `/Encrypt`
    /// dictionary, not an xref stream) into one or more `/ObjStm` chunks.
    pub fn build_object_streams(&self, objects: &BTreeMap<ObjectId, Object>) -> Vec<ObjectStreamChunk> {
        let cap = self.config.max_objects_per_stream.max(1);
        let mut chunks = Vec::new();
        let mut iter = objects.iter().peekable();

        while iter.peek().is_some() {
            let group: Vec<(ObjectId, &Object)> = iter.by_ref().take(cap).map(|(k, v)| (*k, v)).collect();
            if group.is_empty() {
                break;
            }

            let mut header = Vec::new();
            let mut body = Vec::new();
            for (id, obj) in &group {
                let rel_offset = body.len();
                header.extend_from_slice(format!("{} {} ", id.0, rel_offset).as_bytes());
                crate::writer::write_object_value(&mut body, obj);
                body.push(b'\n');
            }

            let first = header.len();
            let mut full = header;
            full.extend_from_slice(&body);
            let compressed = crate::filters::flate_encode_bytes(&full).unwrap_or(full);

            let mut dict = Dictionary::new();
            dict.set("Type", Object::Name(b"ObjStm".to_vec()));
            dict.set("N", group.len() as i64);
            dict.set("First", first as i64);
            dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));

            chunks.push(ObjectStreamChunk {
                dict,
                content: compressed,
                member_ids: group.iter().map(|(id, _)| *id).collect(),
            });
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// spec.md §8 scenario 4: an `/ObjStm` with `/N 2 /First 8` whose
    /// decoded body is the index pairs `"1 0 2 9 "` (object 1 at relative
    /// offset 0, object 2 at relative offset 9) followed by `"<</A 1>>
    /// <</A 2>>"`. No `/Filter` is set, so the decoded body is the raw
    /// content unchanged (Flate round-tripping itself is covered in
    /// `filters.rs`; this test is about the index-pairs-then-members
    /// expansion, not the compression).
    #[test]
    fn expands_compressed_object_stream_members() {
        let header = b"1 0 2 9 ";
        let body = b"<</A 1>> <</A 2>>";
        let mut content = header.to_vec();
        content.extend_from_slice(body);

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"ObjStm".to_vec()));
        dict.set("N", 2i64);
        dict.set("First", header.len() as i64);

        let mut stream = Stream::new(dict, content);
        let expanded = ObjectStream::new(&mut stream).unwrap();

        assert_eq!(expanded.objects.len(), 2);
        let obj1 = expanded.objects.get(&(1, 0)).unwrap().as_dict().unwrap();
        assert_eq!(obj1.get(b"A").unwrap().as_i64().unwrap(), 1);
        let obj2 = expanded.objects.get(&(2, 0)).unwrap().as_dict().unwrap();
        assert_eq!(obj2.get(b"A").unwrap().as_i64().unwrap(), 2);
    }

    #[test]
    fn skips_member_that_fails_to_parse_rather_than_failing_the_whole_stream() {
        let header = b"1 0 2 9 3 18 ";
        let body = b"<</A 1>> @@@@@@@@@<</A 3>>";
        let mut content = header.to_vec();
        content.extend_from_slice(body);

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"ObjStm".to_vec()));
        dict.set("N", 3i64);
        dict.set("First", header.len() as i64);

        let mut stream = Stream::new(dict, content);
        let expanded = ObjectStream::new(&mut stream).unwrap();

        assert_eq!(expanded.objects.len(), 2);
        assert!(expanded.objects.contains_key(&(1, 0)));
        assert!(!expanded.objects.contains_key(&(2, 0)));
        assert!(expanded.objects.contains_key(&(3, 0)));
    }
}
