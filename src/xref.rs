use std::collections::BTreeMap;

use crate::dictionary::Dictionary;
use crate::error::XrefError;
use crate::Result;

/// Hard cap on object numbers (spec's `size <= 2^23 - 1`), enforced against
/// malicious or corrupt `/Size`/`/Index` values before any allocation.
pub const MAX_OBJECT_NUMBER: u32 = (1 << 23) - 1;

/// Maximum number of `/Prev` (and `/XRefStm`) hops a single xref walk will
/// follow before giving up, independent of the visited-offsets cycle guard.
pub const MAX_XREF_DEPTH: usize = 500;

/// Maximum chained-reference depth `Document::dereference` will follow
/// before treating further indirection as a cycle.
pub const MAX_DEREFERENCE_DEPTH: usize = 1000;

/// One cross-reference table slot. `parsed` distinguishes a slot the walker
/// has actually seen from one only implied by a gap in `/Index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Free list node: `next` is the object number of the next free slot.
    Free { next: u32, generation: u16 },
    /// Ordinary object at a byte offset in the file (or its tail update).
    Normal { offset: u32, generation: u16 },
    /// Object packed into an `/ObjStm` object stream.
    Compressed { container: u32, index: u32 },
    /// Slot that was never parsed (gap in a subsection, or an `/Index`
    /// range the walker never visited). Tolerant mode treats this exactly
    /// like `Free` with an unknown `next`/`generation`.
    UnusableFree,
}

impl XrefEntry {
    pub fn is_free(&self) -> bool {
        matches!(self, XrefEntry::Free { .. } | XrefEntry::UnusableFree)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefType {
    Table,
    Stream,
}

/// The reconstructed cross-reference table: object number -> entry.
///
/// Source files routinely violate the singly-linked free-list invariant
/// (§4.4); this structure does not try to preserve the file's free chain on
/// read, it only records what each slot resolved to. A well-formed chain is
/// rebuilt by the writer at save time (see `writer.rs`).
#[derive(Debug, Clone)]
pub struct Xref {
    pub size: u32,
    pub entries: BTreeMap<u32, XrefEntry>,
    pub cross_reference_type: XrefType,
}

impl Xref {
    pub fn new(size: u32, cross_reference_type: XrefType) -> Self {
        Xref {
            size,
            entries: BTreeMap::new(),
            cross_reference_type,
        }
    }

    pub fn get(&self, object_number: u32) -> Option<&XrefEntry> {
        self.entries.get(&object_number)
    }

    pub fn insert(&mut self, object_number: u32, entry: XrefEntry) -> Result<()> {
        if object_number > MAX_OBJECT_NUMBER {
            return Err(XrefError::SizeOverflow.into());
        }
        self.entries.insert(object_number, entry);
        Ok(())
    }

    /// First-definition-wins insert: used while merging `/Prev` chains,
    /// where an entry already present in the newer section must not be
    /// overwritten by an older one.
    pub fn insert_if_absent(&mut self, object_number: u32, entry: XrefEntry) -> Result<()> {
        if object_number > MAX_OBJECT_NUMBER {
            return Err(XrefError::SizeOverflow.into());
        }
        self.entries.entry(object_number).or_insert(entry);
        Ok(())
    }

    pub fn max_id(&self) -> u32 {
        self.entries.keys().copied().max().unwrap_or(0)
    }

    /// Merges an older (`/Prev`) section into this one. Entries already
    /// present win, per PDF semantics: the most recent definition of an
    /// object number is authoritative.
    pub fn merge(&mut self, older: Xref) {
        for (num, entry) in older.entries {
            self.entries.entry(num).or_insert(entry);
        }
        if older.size > self.size {
            self.size = older.size;
        }
    }

    /// Every unparsed or `f`-typed slot is free, per the loader's
    /// free-list-reconstruction policy (§4.4).
    pub fn is_in_use(&self, object_number: u32) -> bool {
        matches!(
            self.entries.get(&object_number),
            Some(XrefEntry::Normal { .. }) | Some(XrefEntry::Compressed { .. })
        )
    }

    /// Rebuilds a well-formed free-list chain (slot 0 head, each free entry
    /// pointing at the next, tail pointing at 0) for the writer. Does not
    /// mutate `self`; returns the chain as `(object_number, next, generation)`.
    pub fn well_formed_free_chain(&self) -> Vec<(u32, u32, u16)> {
        let mut free_nums: Vec<u32> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_free())
            .map(|(n, _)| *n)
            .collect();
        if !free_nums.contains(&0) {
            free_nums.push(0);
        }
        free_nums.sort_unstable();

        let mut chain = Vec::with_capacity(free_nums.len());
        for (i, &num) in free_nums.iter().enumerate() {
            let next = free_nums.get(i + 1).copied().unwrap_or(0);
            let generation = if num == 0 {
                65535
            } else {
                match self.entries.get(&num) {
                    Some(XrefEntry::Free { generation, .. }) => *generation,
                    _ => 0,
                }
            };
            chain.push((num, next, generation));
        }
        chain
    }
}

/// Brute-force recovery used when the primary xref walk fails outright
/// (not merely a cycle): scan the whole buffer for `N G obj` headers and
/// rebuild a synthetic table from what is found. Grounded on podofo's
/// `PdfParser::ReadDocumentStructure` falling back to `ReadObjects` when the
/// declared xref cannot be parsed at all (see SPEC_FULL.md §3).
pub fn recover_by_scanning(buffer: &[u8]) -> (Xref, Dictionary) {
    let mut xref = Xref::new(1, XrefType::Table);
    xref.entries.insert(0, XrefEntry::Free { next: 0, generation: 65535 });

    let mut pos = 0usize;
    while pos < buffer.len() {
        if let Some(rel) = buffer[pos..].windows(3).position(|w| w == b"obj") {
            let obj_kw_start = pos + rel;
            if let Some((num, gen, header_start)) = parse_obj_header_backwards(buffer, obj_kw_start) {
                // Overwrite, not insert-if-absent: later occurrences in the
                // file are later (incremental-update) definitions and win,
                // matching how a well-formed xref chain resolves duplicates.
                xref.insert(
                    num,
                    XrefEntry::Normal {
                        offset: header_start as u32,
                        generation: gen,
                    },
                )
                .ok();
                if num + 1 > xref.size {
                    xref.size = num + 1;
                }
            }
            pos = obj_kw_start + 3;
        } else {
            break;
        }
    }

    (xref, Dictionary::new())
}

/// Given the byte offset of the `obj` keyword, walks backwards over
/// whitespace/digits to recover `N G obj` and the offset of `N`.
fn parse_obj_header_backwards(buffer: &[u8], obj_kw_start: usize) -> Option<(u32, u16, usize)> {
    let mut i = obj_kw_start;
    // skip whitespace before "obj"
    while i > 0 && buffer[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    let gen_end = i;
    while i > 0 && buffer[i - 1].is_ascii_digit() {
        i -= 1;
    }
    let gen_start = i;
    if gen_start == gen_end {
        return None;
    }
    while i > 0 && buffer[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    let num_end = i;
    while i > 0 && buffer[i - 1].is_ascii_digit() {
        i -= 1;
    }
    let num_start = i;
    if num_start == num_end {
        return None;
    }

    let num: u32 = std::str::from_utf8(&buffer[num_start..num_end]).ok()?.parse().ok()?;
    let gen: u16 = std::str::from_utf8(&buffer[gen_start..gen_end]).ok()?.parse().ok()?;
    Some((num, gen, num_start))
}
