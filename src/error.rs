use std::io;
use std::str::Utf8Error;

use crate::ObjectId;

/// Failures that originate in the xref recovery layer (magic/EOF scan, `startxref`,
/// classic table, xref stream, `/Prev` chain).
#[derive(Debug, thiserror::Error)]
pub enum XrefError {
    #[error("could not locate startxref / the primary xref section")]
    Start,
    #[error("/Prev offset of the trailer points outside the file")]
    PrevStart,
    #[error("/XRefStm offset of the trailer points outside the file")]
    StreamStart,
    #[error("classic xref subsection is malformed")]
    InvalidXRef,
    #[error("xref stream object is malformed")]
    InvalidXRefStream,
    #[error("xref stream entry has an unrecognized type field")]
    InvalidXRefType,
    #[error("cyclic /Prev chain revisits offset {0}")]
    CyclicXref(u64),
    #[error("xref entry count would exceed the object-number cap (2^23 - 1)")]
    SizeOverflow,
}

/// Failures from the tokenizer / grammar layer.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("input does not start with a PDF header (%PDF-M.m)")]
    InvalidFileHeader,
    #[error("xref table or stream could not be parsed")]
    InvalidXref,
    #[error("no %PDF- magic found in input")]
    NoPdfFile,
    #[error("no %%EOF marker found")]
    NoEOFToken,
    #[error("no trailer dictionary found and version predates xref streams")]
    NoTrailer,
    #[error("referenced object was never defined in the file")]
    NoObject,
    #[error("file is malformed in a way that cannot be localized further")]
    BrokenFile,
    #[error("input ended in the middle of an object or token")]
    UnexpectedEOF,
    #[error("integer literal does not fit in i64")]
    NumberOverflow,
    #[error("/Linearized dictionary present but malformed")]
    InvalidLinearization,
    #[error("encoder path not implemented for filter {0}")]
    UnsupportedFilter(String),
}

/// Failures from the streaming filter pipeline (§4.1).
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("{filter}: {reason}")]
    Decode { filter: &'static str, reason: String },
    #[error("{filter}: {reason}")]
    Encode { filter: &'static str, reason: String },
    #[error("predictor {predictor} is unsupported or malformed: {reason}")]
    Predictor { predictor: u8, reason: String },
    #[error("LZW code table exceeded the 4096-entry cap")]
    LzwTableOverflow,
}

/// Top-level crate error. Component boundaries (tokenizer, xref resolver,
/// filter pipeline) each get their own nested error enum and are wrapped
/// here via `#[from]`, so `Error::source()` already walks the boundary
/// chain innermost-first; call sites that tolerate a failure instead of
/// propagating it (`reader/mod.rs`'s non-strict paths) log the offset or
/// object id at the point of the boundary rather than threading it through
/// the error value itself.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] Utf8Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Xref(#[from] XrefError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("encryption setup failed: {0}")]
    Encryption(String),

    #[error("decryption failed for object {}: {}", .id.0, .reason)]
    Decryption { id: ObjectId, reason: String },

    #[error("invalid /Encrypt dictionary: {0}")]
    InvalidEncryptionDict(String),

    #[error("password did not authenticate against /U or /O")]
    InvalidPassword,

    #[error("expected {expected}, found {found}")]
    Type { expected: &'static str, found: &'static str },

    #[error("value out of range: {0}")]
    ValueOutOfRange(&'static str),

    #[error("reference cycle detected while resolving object {} {}", .0.0, .0.1)]
    ReferenceCycle(ObjectId),

    #[error("no xref entry for requested object")]
    MissingXrefEntry,

    #[error("dictionary has no entry for the requested key")]
    MissingDictKey,

    #[error("offset {0} is outside the document buffer")]
    InvalidOffset(usize),

    #[error("stream is malformed: {0}")]
    InvalidStream(String),

    #[error("stream /Length did not resolve to a usable non-negative integer")]
    InvalidStreamLength,

    #[error("numeric conversion failed: {0}")]
    NumericCast(String),

    #[error("attempted to mutate a frozen value")]
    ChangeOnImmutable,

    #[error("materialization re-entered object {} {} while it was already in progress", .0.0, .0.1)]
    InternalLogic(ObjectId),

    #[error("allocation or size cap exceeded: {0}")]
    OutOfMemory(&'static str),

    #[error("not implemented: {0}")]
    Unimplemented(&'static str),

    #[error("dangling reference to object {} {} in strict mode", .0.0, .0.1)]
    DanglingReference(ObjectId),
}

pub type Result<T> = std::result::Result<T, Error>;
