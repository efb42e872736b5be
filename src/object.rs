use crate::dictionary::Dictionary;
use crate::error::Error;
use crate::{ObjectId, Result};

/// Literal vs. hex notation for a PDF string; both decode to the same byte
/// buffer, the tag only affects how the writer re-emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Literal,
    Hexadecimal,
}

/// The tagged variant described by spec.md's Value table. `Stream` folds in
/// the dictionary that must own it (spec's invariant: a stream only exists
/// on an indirect object whose value is a dictionary), matching how the
/// rest of this crate's reader/writer code addresses streams as a single
/// unit rather than a dictionary plus a side channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(Vec<u8>),
    String(Vec<u8>, StringFormat),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
    /// Opaque bytes the tokenizer could not classify as any other tag,
    /// kept verbatim rather than failing the whole object (spec.md §4.3's
    /// `RawData`). Produced only in non-strict mode, for a bare keyword at
    /// a value position that is not `true`/`false`/`null`.
    RawData(Vec<u8>),
}

/// Lifecycle of a single indirect object, per spec.md §4.9. Tracked
/// informationally by [`crate::document::Document`] rather than inside
/// `Object` itself, since transitions are driven by the reader/writer, not
/// by the value being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectLifecycle {
    Unparsed,
    HeaderParsed,
    DictResident,
    StreamResident,
    Free,
}

/// An indirect stream object: a dictionary (declaring `/Length`, `/Filter`,
/// `/DecodeParms`) plus a raw-bytes buffer. `start_position` is the byte
/// offset of the first content byte in the source buffer, used by the
/// two-pass loader (§4.7) to defer reading the body until `/Length` -
/// possibly itself an indirect reference - has been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub content: Vec<u8>,
    /// False once the stream has been decrypted/decoded in place and
    /// should not be re-filtered on save (e.g. content rewritten directly).
    pub allow_compression: bool,
    pub start_position: Option<usize>,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>) -> Self {
        let mut stream = Stream {
            dict,
            content,
            allow_compression: true,
            start_position: None,
        };
        stream.set_length_field();
        stream
    }

    pub fn with_start_position(mut self, pos: usize) -> Self {
        self.start_position = Some(pos);
        self
    }

    pub fn set_content(&mut self, content: Vec<u8>) {
        self.content = content;
        self.set_length_field();
    }

    fn set_length_field(&mut self) {
        self.dict.set("Length", self.content.len() as i64);
    }

    pub fn filter_names(&self) -> Vec<Vec<u8>> {
        self.dict.filter_names()
    }

    /// `/DecodeParms`, aligned with `filter_names()`: one entry (possibly
    /// `Object::Null`) per filter.
    pub fn decode_parms(&self) -> Vec<Object> {
        match self.dict.get(b"DecodeParms").or_else(|_| self.dict.get(b"DP")) {
            Ok(Object::Array(arr)) => arr.clone(),
            Ok(single) => vec![single.clone()],
            Err(_) => Vec::new(),
        }
    }
}

impl Object {
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Object::Boolean(b) => Ok(*b),
            other => Err(other.type_error("bool")),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(i) => Ok(*i),
            other => Err(other.type_error("integer")),
        }
    }

    /// Widens an Integer to f64, or returns a Real directly.
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Object::Real(r) => Ok(*r),
            Object::Integer(i) => Ok(*i as f64),
            other => Err(other.type_error("number")),
        }
    }

    /// Rounds a Real to the nearest i64, or returns an Integer directly.
    /// Spec's `as_number_lenient`.
    pub fn as_i64_lenient(&self) -> Result<i64> {
        match self {
            Object::Integer(i) => Ok(*i),
            Object::Real(r) => Ok(r.round() as i64),
            other => Err(other.type_error("number")),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(name) => Ok(name),
            other => Err(other.type_error("name")),
        }
    }

    /// Accepts either a Name or a String, matching how many producers write
    /// names where the spec expects a string (and vice versa).
    pub fn as_str(&self) -> Result<&[u8]> {
        match self {
            Object::String(bytes, _) => Ok(bytes),
            Object::Name(bytes) => Ok(bytes),
            other => Err(other.type_error("string")),
        }
    }

    pub fn as_array(&self) -> Result<&Vec<Object>> {
        match self {
            Object::Array(arr) => Ok(arr),
            other => Err(other.type_error("array")),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Object>> {
        match self {
            Object::Array(arr) => Ok(arr),
            other => Err(other.type_error("array")),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dictionary(dict) => Ok(dict),
            Object::Stream(stream) => Ok(&stream.dict),
            other => Err(other.type_error("dictionary")),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Object::Dictionary(dict) => Ok(dict),
            Object::Stream(stream) => Ok(&mut stream.dict),
            other => Err(other.type_error("dictionary")),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(stream) => Ok(stream),
            other => Err(other.type_error("stream")),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream> {
        match self {
            Object::Stream(stream) => Ok(stream),
            other => Err(other.type_error("stream")),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            other => Err(other.type_error("reference")),
        }
    }

    pub fn as_raw_data(&self) -> Result<&[u8]> {
        match self {
            Object::RawData(bytes) => Ok(bytes),
            other => Err(other.type_error("raw data")),
        }
    }

    fn type_error(&self, expected: &'static str) -> Error {
        Error::Type {
            expected,
            found: self.kind_name(),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Object::Null => "null",
            Object::Boolean(_) => "bool",
            Object::Integer(_) => "integer",
            Object::Real(_) => "real",
            Object::Name(_) => "name",
            Object::String(..) => "string",
            Object::Array(_) => "array",
            Object::Dictionary(_) => "dictionary",
            Object::Stream(_) => "stream",
            Object::Reference(_) => "reference",
            Object::RawData(_) => "raw data",
        }
    }

    /// Spec's `equals_value`: structural comparison, `None` when either side
    /// is a reference (identity, not value, comparison belongs elsewhere) or
    /// raw data (undefined, per spec.md §4.3).
    pub fn equals_value(&self, other: &Object) -> Option<bool> {
        match (self, other) {
            (Object::Reference(_), _) | (_, Object::Reference(_)) => None,
            (Object::RawData(_), _) | (_, Object::RawData(_)) => None,
            _ => Some(self == other),
        }
    }

    /// Spec's `equals_reference`: pointer-identity comparison over two
    /// `Reference` values; `None` if either side is not a reference.
    pub fn equals_reference(&self, other: &Object) -> Option<bool> {
        match (self, other) {
            (Object::Reference(a), Object::Reference(b)) => Some(a == b),
            _ => None,
        }
    }
}

impl From<bool> for Object {
    fn from(v: bool) -> Self {
        Object::Boolean(v)
    }
}
impl From<i64> for Object {
    fn from(v: i64) -> Self {
        Object::Integer(v)
    }
}
impl From<f64> for Object {
    fn from(v: f64) -> Self {
        Object::Real(v)
    }
}
impl From<Vec<Object>> for Object {
    fn from(v: Vec<Object>) -> Self {
        Object::Array(v)
    }
}
impl From<Dictionary> for Object {
    fn from(v: Dictionary) -> Self {
        Object::Dictionary(v)
    }
}
impl From<Stream> for Object {
    fn from(v: Stream) -> Self {
        Object::Stream(v)
    }
}
impl From<ObjectId> for Object {
    fn from(v: ObjectId) -> Self {
        Object::Reference(v)
    }
}
impl From<String> for Object {
    fn from(v: String) -> Self {
        Object::String(v.into_bytes(), StringFormat::Literal)
    }
}
impl From<&str> for Object {
    fn from(v: &str) -> Self {
        Object::Name(v.as_bytes().to_vec())
    }
}
