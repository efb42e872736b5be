//! The tokenizer and grammar (spec.md §4.2): turns raw bytes into `Object`
//! values, indirect objects, and xref sections. Implemented as a hand-rolled
//! recursive-descent reader over an absolute-offset cursor rather than
//! combinator chains: the grammar's trickiest parts (forward-referenced
//! stream `/Length`, tolerant xref entries, bounded string nesting) all need
//! lookahead and backtracking that reads more plainly this way. `nom_locate`
//! still owns the public boundary (`ParserInput`), carrying a context tag
//! (`"xref"`, `"indirect object"`, ...) each entry point is called with; the
//! tag labels the call site for a reader of the log output even though the
//! grammar functions below re-derive their own absolute offsets rather than
//! reading it back off the span.

mod input;

pub use input::ParserInput;

use std::collections::HashSet;

use input::{is_pdf_delimiter, is_pdf_whitespace};

use crate::dictionary::Dictionary;
use crate::error::{Error, ParseError, XrefError};
use crate::object::{Object, Stream, StringFormat};
use crate::reader::{Reader, MAX_BRACKET};
use crate::xref::{Xref, XrefEntry, XrefType};
use crate::{ObjectId, Result};

/// Deepest array/dictionary nesting `parse_value` will descend before
/// giving up; guards the recursive descent against a stack overflow on
/// adversarial input (spec.md §7, "bounded recursion").
const MAX_VALUE_DEPTH: usize = 256;

/// A cursor over an absolute byte buffer. All positions recorded in
/// `Object::Stream::start_position` and in xref entries are offsets into
/// this same buffer, so the cursor never works over a re-based slice.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Mirrors `Reader::strict`. In non-strict mode a bare keyword at a
    /// value position that isn't `true`/`false`/`null` becomes
    /// `Object::RawData` instead of failing the whole object.
    strict: bool,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.buf.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn starts_with(&self, needle: &[u8]) -> bool {
        self.buf[self.pos.min(self.buf.len())..].starts_with(needle)
    }
}

fn skip_whitespace_and_comments(c: &mut Cursor) {
    loop {
        match c.peek() {
            Some(b) if is_pdf_whitespace(b) => c.pos += 1,
            Some(b'%') => {
                while let Some(b) = c.peek() {
                    if b == b'\r' || b == b'\n' {
                        break;
                    }
                    c.pos += 1;
                }
            }
            _ => break,
        }
    }
}

/// Consumes `kw` if it occurs at the cursor and is followed by a delimiter,
/// whitespace, or end of input (so `"Rendering"` is never mistaken for the
/// keyword `"R"`). Leaves the cursor untouched on mismatch.
fn eat_keyword(c: &mut Cursor, kw: &[u8]) -> bool {
    if !c.starts_with(kw) {
        return false;
    }
    let boundary_ok = match c.peek_at(kw.len()) {
        Some(b) => is_pdf_whitespace(b) || is_pdf_delimiter(b),
        None => true,
    };
    if boundary_ok {
        c.pos += kw.len();
        true
    } else {
        false
    }
}

fn expect_keyword(c: &mut Cursor, kw: &[u8]) -> Result<()> {
    if eat_keyword(c, kw) {
        Ok(())
    } else {
        Err(ParseError::BrokenFile.into())
    }
}

fn parse_uint(c: &mut Cursor) -> Option<u64> {
    let start = c.pos;
    while c.peek().map(|b| b.is_ascii_digit()).unwrap_or(false) {
        c.pos += 1;
    }
    if c.pos == start {
        return None;
    }
    std::str::from_utf8(&c.buf[start..c.pos]).ok()?.parse().ok()
}

fn parse_i64(c: &mut Cursor) -> Option<i64> {
    let start = c.pos;
    if matches!(c.peek(), Some(b'+') | Some(b'-')) {
        c.pos += 1;
    }
    let digits_start = c.pos;
    while c.peek().map(|b| b.is_ascii_digit()).unwrap_or(false) {
        c.pos += 1;
    }
    if c.pos == digits_start {
        c.pos = start;
        return None;
    }
    std::str::from_utf8(&c.buf[start..c.pos]).ok()?.parse().ok()
}

/// Parses the document header: `%PDF-M.m`. Expects `input` to start exactly
/// at the `%PDF-` magic (the caller has already located it).
pub fn header(input: ParserInput) -> Option<String> {
    let buf = input.fragment();
    if !buf.starts_with(b"%PDF-") {
        return None;
    }
    let rest = &buf[5..];
    let mut end = 0;
    while end < rest.len() && (rest[end].is_ascii_digit() || rest[end] == b'.') {
        end += 1;
    }
    if end == 0 {
        return None;
    }
    std::str::from_utf8(&rest[..end]).ok().map(|s| s.to_string())
}

/// Parses the optional binary-marker comment on the line right after the
/// header (`%` followed by four or more bytes `>= 0x80`, conventionally).
/// Returns whatever follows `%` up to the end of line, whether or not it
/// turns out to qualify; the caller checks the high-bit condition itself.
pub fn binary_mark(input: ParserInput) -> Option<Vec<u8>> {
    let buf = input.fragment();
    if buf.first() != Some(&b'%') {
        return None;
    }
    let mut end = 1;
    while end < buf.len() && buf[end] != b'\r' && buf[end] != b'\n' {
        end += 1;
    }
    Some(buf[1..end].to_vec())
}

/// Parses `startxref\n<offset>` (tolerating the `startref` misspelling some
/// broken producers emit). `input` starts at the `startxref` keyword.
pub fn xref_start(input: ParserInput) -> Option<i64> {
    let buf = input.fragment();
    let mut c = Cursor { buf, pos: 0, strict: true };
    skip_whitespace_and_comments(&mut c);
    if !(eat_keyword(&mut c, b"startxref") || eat_keyword(&mut c, b"startref")) {
        return None;
    }
    skip_whitespace_and_comments(&mut c);
    parse_i64(&mut c)
}

/// Parses one xref section (classic table or xref stream) and its local
/// trailer dictionary. `input` starts exactly at the section: either the
/// `xref` keyword or the `N G obj` header of an xref stream. The `/Prev` /
/// `/XRefStm` walk across sections is the caller's job (`reader/mod.rs`),
/// not this function's: each call here only resolves a single section.
pub fn xref_and_trailer(input: ParserInput, reader: &Reader) -> Result<(Xref, Dictionary)> {
    let buf = input.fragment();
    let mut c = Cursor { buf, pos: 0, strict: reader.strict };
    skip_whitespace_and_comments(&mut c);
    if eat_keyword(&mut c, b"xref") {
        classic_xref_and_trailer(&mut c)
    } else {
        xref_stream_and_trailer(&mut c)
    }
}

fn classic_xref_and_trailer(c: &mut Cursor) -> Result<(Xref, Dictionary)> {
    let mut xref = Xref::new(1, XrefType::Table);

    loop {
        skip_whitespace_and_comments(c);
        if c.starts_with(b"trailer") {
            break;
        }
        let save = c.pos;
        let first = match parse_uint(c) {
            Some(v) => v,
            None => {
                c.pos = save;
                break;
            }
        };
        skip_whitespace_and_comments(c);
        let count = parse_uint(c).ok_or(XrefError::InvalidXRef)?;
        skip_whitespace_and_comments(c);

        for i in 0..count {
            skip_whitespace_and_comments(c);
            let offset = parse_uint(c).ok_or(XrefError::InvalidXRef)?;
            skip_whitespace_and_comments(c);
            let generation = parse_uint(c).ok_or(XrefError::InvalidXRef)? as u16;
            skip_whitespace_and_comments(c);
            let kind = c.bump().ok_or(XrefError::InvalidXRef)?;

            let num = (first + i) as u32;
            let entry = match kind {
                b'n' => XrefEntry::Normal {
                    offset: offset as u32,
                    generation,
                },
                b'f' => XrefEntry::Free {
                    next: offset as u32,
                    generation,
                },
                _ => return Err(XrefError::InvalidXRef.into()),
            };
            xref.insert_if_absent(num, entry)?;
            if num + 1 > xref.size {
                xref.size = num + 1;
            }
        }
    }

    skip_whitespace_and_comments(c);
    expect_keyword(c, b"trailer").map_err(|_| XrefError::InvalidXRef)?;
    skip_whitespace_and_comments(c);
    let value = parse_value(c)?;
    let trailer = match value {
        Object::Dictionary(d) => d,
        _ => return Err(ParseError::NoTrailer.into()),
    };

    if let Ok(size) = trailer.get(b"Size").and_then(Object::as_i64) {
        if size > 0 {
            xref.size = size as u32;
        }
    }

    Ok((xref, trailer))
}

fn xref_stream_and_trailer(c: &mut Cursor) -> Result<(Xref, Dictionary)> {
    skip_whitespace_and_comments(c);
    parse_uint(c).ok_or(XrefError::InvalidXRefStream)?;
    skip_whitespace_and_comments(c);
    parse_uint(c).ok_or(XrefError::InvalidXRefStream)?;
    skip_whitespace_and_comments(c);
    expect_keyword(c, b"obj").map_err(|_| XrefError::InvalidXRefStream)?;
    skip_whitespace_and_comments(c);

    let value = parse_value(c)?;
    let dict = match value {
        Object::Dictionary(d) => d,
        _ => return Err(XrefError::InvalidXRefStream.into()),
    };

    skip_whitespace_and_comments(c);
    if !eat_keyword(c, b"stream") {
        return Err(XrefError::InvalidXRefStream.into());
    }
    let (raw_content, _start) = read_stream_body(c, &dict)?;
    let decoded = crate::filters::decode_stream(&dict, &raw_content).map_err(|_| XrefError::InvalidXRefStream)?;

    let w_obj = dict.get(b"W").and_then(Object::as_array).map_err(|_| XrefError::InvalidXRefStream)?;
    if w_obj.len() != 3 {
        return Err(XrefError::InvalidXRefStream.into());
    }
    let w: Vec<usize> = w_obj.iter().map(|o| o.as_i64().unwrap_or(0).max(0) as usize).collect();
    if w.iter().any(|&x| x > 8) {
        return Err(XrefError::InvalidXRefStream.into());
    }

    let size = dict.get(b"Size").and_then(Object::as_i64).map_err(|_| XrefError::InvalidXRefStream)? as u32;
    let index: Vec<(u32, u32)> = match dict.get(b"Index").and_then(Object::as_array) {
        Ok(arr) => arr
            .chunks(2)
            .filter_map(|pair| match pair {
                [a, b] => Some((a.as_i64().ok()? as u32, b.as_i64().ok()? as u32)),
                _ => None,
            })
            .collect(),
        Err(_) => vec![(0, size)],
    };

    let record_len = w[0] + w[1] + w[2];
    if record_len == 0 {
        return Err(XrefError::InvalidXRefStream.into());
    }

    let mut xref = Xref::new(size, XrefType::Stream);
    let mut pos = 0usize;
    for (first, count) in index {
        for i in 0..count {
            if pos + record_len > decoded.len() {
                return Err(XrefError::InvalidXRefStream.into());
            }
            let rec = &decoded[pos..pos + record_len];
            pos += record_len;

            let mut off = 0usize;
            let ty = read_be_field(rec, &mut off, w[0], 1);
            let f2 = read_be_field(rec, &mut off, w[1], 0);
            let f3 = read_be_field(rec, &mut off, w[2], 0);

            let num = first + i;
            let entry = match ty {
                0 => XrefEntry::Free {
                    next: f2 as u32,
                    generation: f3 as u16,
                },
                1 => XrefEntry::Normal {
                    offset: f2 as u32,
                    generation: f3 as u16,
                },
                2 => XrefEntry::Compressed {
                    container: f2 as u32,
                    index: f3 as u32,
                },
                _ => return Err(XrefError::InvalidXRefType.into()),
            };
            xref.insert_if_absent(num, entry)?;
        }
    }

    Ok((xref, dict))
}

fn read_be_field(rec: &[u8], off: &mut usize, width: usize, default: u64) -> u64 {
    if width == 0 {
        return default;
    }
    let v = rec[*off..*off + width].iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
    *off += width;
    v
}

/// Parses one `N G obj ... endobj` at an absolute offset into the full
/// document buffer. `reader` and `already_seen` are accepted for symmetry
/// with [`crate::reader::object_loader`]'s other entry points and to honor
/// `reader.strict`; a stream's `/Length` is never chased here even when it
/// is an indirect reference; the `stream`/`endstream` boundary scan always
/// recovers a usable byte range, and the exact length gets reconciled once
/// `/Length` is resolved (`Reader::read_stream_content`, the second pass).
pub fn indirect_object(
    input: ParserInput,
    offset: usize,
    expected_id: Option<ObjectId>,
    reader: &Reader,
    _already_seen: &mut HashSet<ObjectId>,
) -> Result<(ObjectId, Object)> {
    let buf = input.fragment();
    if offset > buf.len() {
        return Err(Error::InvalidOffset(offset));
    }
    let mut c = Cursor { buf, pos: offset, strict: reader.strict };

    skip_whitespace_and_comments(&mut c);
    let num = parse_uint(&mut c).ok_or(ParseError::BrokenFile)?;
    skip_whitespace_and_comments(&mut c);
    let generation = parse_uint(&mut c).ok_or(ParseError::BrokenFile)?;
    skip_whitespace_and_comments(&mut c);
    expect_keyword(&mut c, b"obj")?;

    let id: ObjectId = (num as u32, generation as u16);
    if let Some(expected) = expected_id {
        if expected != id {
            if reader.strict {
                return Err(ParseError::BrokenFile.into());
            }
            log::warn!(
                "object identity mismatch: xref pointed at {} {} R but header reads {} {} R",
                expected.0, expected.1, id.0, id.1
            );
        }
    }

    skip_whitespace_and_comments(&mut c);
    let mut value = parse_value(&mut c)?;

    skip_whitespace_and_comments(&mut c);
    if let Object::Dictionary(dict) = &value {
        if eat_keyword(&mut c, b"stream") {
            let (content, start) = read_stream_body(&mut c, dict)?;
            value = Object::Stream(Stream {
                dict: dict.clone(),
                content,
                allow_compression: true,
                start_position: Some(start),
            });
        }
    }

    skip_whitespace_and_comments(&mut c);
    let _ = eat_keyword(&mut c, b"endobj");

    Ok((id, value))
}

/// Reads a stream body starting right after the `stream` keyword has
/// already been consumed. Returns the captured content and the absolute
/// offset of its first byte.
fn read_stream_body(c: &mut Cursor, dict: &Dictionary) -> Result<(Vec<u8>, usize)> {
    // The keyword must be followed by CRLF or LF; tolerate a lone CR or
    // plain whitespace from non-conformant producers.
    match c.peek() {
        Some(b'\r') => {
            c.pos += 1;
            if c.peek() == Some(b'\n') {
                c.pos += 1;
            }
        }
        Some(b'\n') => c.pos += 1,
        _ => {
            while matches!(c.peek(), Some(b' ') | Some(b'\t')) {
                c.pos += 1;
            }
        }
    }
    let start = c.pos;

    let direct_length = dict.get(b"Length").ok().and_then(|o| match o {
        Object::Integer(n) if *n >= 0 => Some(*n as usize),
        _ => None,
    });

    let end = match direct_length {
        Some(n) if start + n <= c.buf.len() => start + n,
        _ => find_endstream(c.buf, start).unwrap_or(c.buf.len()),
    };

    let content_end = if direct_length.is_some() {
        end
    } else {
        trim_trailing_eol(c.buf, start, end)
    };

    let content = c.buf[start..content_end].to_vec();
    c.pos = end;
    skip_whitespace_and_comments(c);
    let _ = eat_keyword(c, b"endstream");

    Ok((content, start))
}

fn find_endstream(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(b"endstream".len())
        .position(|w| w == b"endstream")
        .map(|rel| from + rel)
}

/// Trims one trailing EOL (CRLF, LF, or lone CR) immediately before
/// `end`, for the endstream-scan fallback where that EOL is conventionally
/// not part of the stream's actual content.
fn trim_trailing_eol(buf: &[u8], start: usize, end: usize) -> usize {
    if end >= 2 && end - 2 >= start && buf[end - 2] == b'\r' && buf[end - 1] == b'\n' {
        end - 2
    } else if end >= 1 && end - 1 >= start && (buf[end - 1] == b'\n' || buf[end - 1] == b'\r') {
        end - 1
    } else {
        end
    }
}

/// Parses one self-contained `Object`, with no indirect-object framing and
/// no stream handling: used by [`crate::object_stream::ObjectStream`] to
/// expand the values packed into an `/ObjStm`.
pub(crate) fn parse_standalone_value(buf: &[u8]) -> Result<Object> {
    let mut c = Cursor { buf, pos: 0, strict: true };
    parse_value(&mut c)
}

fn parse_value(c: &mut Cursor) -> Result<Object> {
    parse_value_depth(c, 0)
}

fn parse_value_depth(c: &mut Cursor, depth: usize) -> Result<Object> {
    if depth > MAX_VALUE_DEPTH {
        return Err(ParseError::BrokenFile.into());
    }
    skip_whitespace_and_comments(c);
    match c.peek() {
        None => Err(ParseError::UnexpectedEOF.into()),
        Some(b'/') => Ok(Object::Name(parse_name(c)?)),
        Some(b'(') => Ok(Object::String(parse_literal_string(c)?, StringFormat::Literal)),
        Some(b'<') => {
            if c.peek_at(1) == Some(b'<') {
                Ok(Object::Dictionary(parse_dict(c, depth)?))
            } else {
                Ok(Object::String(parse_hex_string(c)?, StringFormat::Hexadecimal))
            }
        }
        Some(b'[') => Ok(Object::Array(parse_array(c, depth)?)),
        Some(b) if b.is_ascii_digit() || b == b'+' || b == b'-' || b == b'.' => parse_number_or_reference(c),
        _ => {
            if eat_keyword(c, b"true") {
                Ok(Object::Boolean(true))
            } else if eat_keyword(c, b"false") {
                Ok(Object::Boolean(false))
            } else if eat_keyword(c, b"null") {
                Ok(Object::Null)
            } else if !c.strict {
                let start = c.pos;
                while let Some(b) = c.peek() {
                    if is_pdf_whitespace(b) || is_pdf_delimiter(b) {
                        break;
                    }
                    c.pos += 1;
                }
                if c.pos > start {
                    log::warn!(
                        "unrecognized token {:?} at value position, kept as raw data",
                        String::from_utf8_lossy(&c.buf[start..c.pos])
                    );
                    Ok(Object::RawData(c.buf[start..c.pos].to_vec()))
                } else {
                    Err(ParseError::BrokenFile.into())
                }
            } else {
                Err(ParseError::BrokenFile.into())
            }
        }
    }
}

fn parse_number_or_reference(c: &mut Cursor) -> Result<Object> {
    let first = parse_number_token(c)?;
    if let Object::Integer(n) = first {
        if n >= 0 {
            let save = c.pos;
            skip_whitespace_and_comments(c);
            if let Some(g) = parse_uint(c) {
                skip_whitespace_and_comments(c);
                if eat_keyword(c, b"R") {
                    return Ok(Object::Reference((n as u32, g as u16)));
                }
            }
            c.pos = save;
        }
    }
    Ok(first)
}

fn parse_number_token(c: &mut Cursor) -> Result<Object> {
    let start = c.pos;
    if matches!(c.peek(), Some(b'+') | Some(b'-')) {
        c.pos += 1;
    }
    let mut saw_digit = false;
    while c.peek().map(|b| b.is_ascii_digit()).unwrap_or(false) {
        c.pos += 1;
        saw_digit = true;
    }
    let mut is_real = false;
    if c.peek() == Some(b'.') {
        is_real = true;
        c.pos += 1;
        while c.peek().map(|b| b.is_ascii_digit()).unwrap_or(false) {
            c.pos += 1;
            saw_digit = true;
        }
    }
    if !saw_digit {
        return Err(ParseError::BrokenFile.into());
    }
    let text = std::str::from_utf8(&c.buf[start..c.pos]).map_err(|_| ParseError::BrokenFile)?;
    if is_real {
        text.parse::<f64>().map(Object::Real).map_err(|_| ParseError::BrokenFile.into())
    } else {
        text.parse::<i64>().map(Object::Integer).map_err(|_| ParseError::NumberOverflow.into())
    }
}

fn parse_name(c: &mut Cursor) -> Result<Vec<u8>> {
    c.pos += 1; // '/'
    let mut out = Vec::new();
    while let Some(b) = c.peek() {
        if is_pdf_whitespace(b) || is_pdf_delimiter(b) {
            break;
        }
        if b == b'#' {
            if let (Some(h1), Some(h2)) = (c.peek_at(1), c.peek_at(2)) {
                if let (Some(d1), Some(d2)) = ((h1 as char).to_digit(16), (h2 as char).to_digit(16)) {
                    out.push(((d1 as u8) << 4) | d2 as u8);
                    c.pos += 3;
                    continue;
                }
            }
        }
        out.push(b);
        c.pos += 1;
    }
    Ok(out)
}

fn parse_literal_string(c: &mut Cursor) -> Result<Vec<u8>> {
    c.pos += 1; // '('
    let mut depth = 1usize;
    let mut out = Vec::new();

    loop {
        let b = c.bump().ok_or(ParseError::UnexpectedEOF)?;
        match b {
            b'\\' => {
                let e = c.bump().ok_or(ParseError::UnexpectedEOF)?;
                match e {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0c),
                    b'(' => out.push(b'('),
                    b')' => out.push(b')'),
                    b'\\' => out.push(b'\\'),
                    b'\r' => {
                        if c.peek() == Some(b'\n') {
                            c.pos += 1;
                        }
                    }
                    b'\n' => {}
                    b'0'..=b'7' => {
                        let mut val: u32 = (e - b'0') as u32;
                        let mut n = 1;
                        while n < 3 {
                            match c.peek() {
                                Some(d) if (b'0'..=b'7').contains(&d) => {
                                    val = val * 8 + (d - b'0') as u32;
                                    c.pos += 1;
                                    n += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push((val & 0xff) as u8);
                    }
                    other => out.push(other),
                }
            }
            b'(' => {
                depth += 1;
                if depth > MAX_BRACKET {
                    return Err(ParseError::BrokenFile.into());
                }
                out.push(b'(');
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                out.push(b')');
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn parse_hex_string(c: &mut Cursor) -> Result<Vec<u8>> {
    c.pos += 1; // '<'
    let mut out = Vec::new();
    let mut hi: Option<u8> = None;
    loop {
        let b = c.bump().ok_or(ParseError::UnexpectedEOF)?;
        if b == b'>' {
            break;
        }
        if is_pdf_whitespace(b) {
            continue;
        }
        let nibble = (b as char).to_digit(16).ok_or(ParseError::BrokenFile)? as u8;
        match hi.take() {
            Some(h) => out.push((h << 4) | nibble),
            None => hi = Some(nibble),
        }
    }
    if let Some(h) = hi {
        out.push(h << 4);
    }
    Ok(out)
}

fn parse_array(c: &mut Cursor, depth: usize) -> Result<Vec<Object>> {
    c.pos += 1; // '['
    let mut out = Vec::new();
    loop {
        skip_whitespace_and_comments(c);
        if c.peek() == Some(b']') {
            c.pos += 1;
            break;
        }
        if c.peek().is_none() {
            return Err(ParseError::UnexpectedEOF.into());
        }
        out.push(parse_value_depth(c, depth + 1)?);
    }
    Ok(out)
}

fn parse_dict(c: &mut Cursor, depth: usize) -> Result<Dictionary> {
    c.pos += 2; // '<<'
    let mut dict = Dictionary::new();
    loop {
        skip_whitespace_and_comments(c);
        if c.peek() == Some(b'>') && c.peek_at(1) == Some(b'>') {
            c.pos += 2;
            break;
        }
        if c.peek().is_none() {
            return Err(ParseError::UnexpectedEOF.into());
        }
        if c.peek() != Some(b'/') {
            return Err(ParseError::BrokenFile.into());
        }
        let key = parse_name(c)?;
        let value = parse_value_depth(c, depth + 1)?;
        dict.set(key, value);
    }
    Ok(dict)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_of(bytes: &[u8]) -> Object {
        let mut c = Cursor { buf: bytes, pos: 0, strict: true };
        parse_value(&mut c).unwrap()
    }

    fn value_of_non_strict(bytes: &[u8]) -> Object {
        let mut c = Cursor { buf: bytes, pos: 0, strict: false };
        parse_value(&mut c).unwrap()
    }

    #[test]
    fn parses_scalars() {
        assert_eq!(value_of(b"123"), Object::Integer(123));
        assert_eq!(value_of(b"-12.5"), Object::Real(-12.5));
        assert_eq!(value_of(b"true"), Object::Boolean(true));
        assert_eq!(value_of(b"null"), Object::Null);
        assert_eq!(value_of(b"/Name#20With#20Escapes"), Object::Name(b"Name With Escapes".to_vec()));
    }

    #[test]
    fn parses_reference_vs_two_integers() {
        assert_eq!(value_of(b"12 0 R"), Object::Reference((12, 0)));
        match value_of(b"[1 2]") {
            Object::Array(items) => assert_eq!(items, vec![Object::Integer(1), Object::Integer(2)]),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn parses_nested_literal_string_with_escapes() {
        let obj = value_of(b"(a \\(nested\\) b\\n\\051)");
        match obj {
            Object::String(bytes, StringFormat::Literal) => assert_eq!(bytes, b"a (nested) b\n)"),
            other => panic!("expected literal string, got {other:?}"),
        }
    }

    #[test]
    fn rejects_string_nesting_past_the_bracket_cap() {
        let mut s = Vec::new();
        s.push(b'(');
        s.extend(std::iter::repeat(b'(').take(MAX_BRACKET + 1));
        s.extend(std::iter::repeat(b')').take(MAX_BRACKET + 2));
        let mut c = Cursor { buf: &s, pos: 0, strict: true };
        assert!(parse_value(&mut c).is_err());
    }

    #[test]
    fn unrecognized_keyword_is_raw_data_in_non_strict_mode() {
        assert_eq!(value_of_non_strict(b"garbage"), Object::RawData(b"garbage".to_vec()));
    }

    #[test]
    fn unrecognized_keyword_is_an_error_in_strict_mode() {
        let mut c = Cursor { buf: b"garbage", pos: 0, strict: true };
        assert!(parse_value(&mut c).is_err());
    }

    #[test]
    fn parses_hex_string() {
        match value_of(b"<48656C6C6F>") {
            Object::String(bytes, StringFormat::Hexadecimal) => assert_eq!(bytes, b"Hello"),
            other => panic!("expected hex string, got {other:?}"),
        }
    }

    #[test]
    fn parses_dictionary() {
        match value_of(b"<< /Type /Catalog /Count 3 >>") {
            Object::Dictionary(dict) => {
                assert_eq!(dict.get(b"Type").unwrap().as_name().unwrap(), b"Catalog");
                assert_eq!(dict.get(b"Count").unwrap().as_i64().unwrap(), 3);
            }
            other => panic!("expected dictionary, got {other:?}"),
        }
    }

    #[test]
    fn indirect_object_with_direct_length_stream() {
        let buf = b"7 0 obj\n<< /Length 5 >>\nstream\nhello\nendstream\nendobj\n";
        let mut seen = HashSet::new();
        let reader = Reader {
            buffer: buf,
            document: crate::Document::new(),
            encryption_state: None,
            password: None,
            raw_objects: std::collections::HashMap::new(),
            strict: false,
        };
        let (id, obj) = indirect_object(ParserInput::new_extra(buf, "indirect object"), 0, None, &reader, &mut seen)
            .unwrap();
        assert_eq!(id, (7, 0));
        let stream = obj.as_stream().unwrap();
        assert_eq!(stream.content, b"hello");
    }
}
