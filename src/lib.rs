//! A library for parsing, recovering and serializing PDF object graphs.
//!
//! The crate models a PDF document as an in-memory object graph: indirect
//! objects keyed by `(number, generation)`, reachable from a trailer
//! dictionary through references. Parsing reconstructs that graph from
//! bytes by recovering the cross-reference table (classic or stream form,
//! tolerant of the usual real-world corruption); serializing walks the
//! graph back out, optionally as an incremental update that reuses the
//! original file's unchanged bytes.
//!
//! Page trees, content-stream text extraction, annotations, form fields and
//! rendering are out of scope; the hard engineering here is the object
//! model, the xref resolver, the filter pipeline and the encryption engine.

pub mod dictionary;
pub mod document;
pub mod encryption;
pub mod error;
pub mod filters;
pub mod incremental_document;
pub mod object;
pub mod object_stream;
mod parser;
mod reader;
pub mod writer;
pub mod xref;

pub use dictionary::Dictionary;
pub use document::Document;
pub use error::{Error, FilterError, ParseError, Result, XrefError};
pub use incremental_document::IncrementalDocument;
pub use object::{Object, Stream, StringFormat};
pub use object_stream::{ObjectStream, ObjectStreamBuilder, ObjectStreamConfig};
pub use reader::PdfMetadata;
pub use writer::{SaveOptions, SaveOptionsBuilder, WriteMode};

/// Identity of an indirect object: object number and generation. Object
/// number 0, generation 65535 is the permanent head of the xref free list
/// and is never allocated to a live object (spec invariant).
pub type ObjectId = (u32, u16);

/// Builds a [`Dictionary`] from `"key" => value` pairs, in the order
/// written (the backing `IndexMap` preserves it).
#[macro_export]
macro_rules! dictionary {
    () => { $crate::Dictionary::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut dict = $crate::Dictionary::new();
        $( dict.set($key, $value); )+
        dict
    }};
}
