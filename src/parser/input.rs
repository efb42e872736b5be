//! The tokenizer's input type: a byte slice wrapped by `nom_locate` so every
//! combinator failure can report a byte offset, and an `extra` context tag
//! (e.g. `"xref"`, `"indirect object"`) that error annotation attaches to
//! the frame it failed in.

use nom_locate::LocatedSpan;

pub type ParserInput<'a> = LocatedSpan<&'a [u8], &'static str>;

/// PDF whitespace: NUL, tab, LF, FF, CR, space (PDF 32000-1 §7.2.2).
pub fn is_pdf_whitespace(b: u8) -> bool {
    matches!(b, 0x00 | b'\t' | b'\n' | 0x0c | b'\r' | b' ')
}

/// PDF delimiter characters, which terminate a bare keyword/number token
/// without being consumed as part of it.
pub fn is_pdf_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}
