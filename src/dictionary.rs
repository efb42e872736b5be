use std::fmt;

use indexmap::IndexMap;

use crate::error::Error;
use crate::object::Object;
use crate::Result;

/// An ordered Name -> Value mapping.
///
/// Backed by `IndexMap` so that a document re-serialized without
/// modification emits its dictionaries in the same key order they were
/// parsed in (spec's determinism requirement for the writer).
#[derive(Clone, Default, PartialEq)]
pub struct Dictionary(IndexMap<Vec<u8>, Object>);

impl Dictionary {
    pub fn new() -> Self {
        Dictionary(IndexMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Vec<u8>>,
        V: Into<Object>,
    {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &[u8]) -> Result<&Object> {
        self.0.get(key).ok_or(Error::MissingDictKey)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Result<&mut Object> {
        self.0.get_mut(key).ok_or(Error::MissingDictKey)
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        self.0.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Object)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Vec<u8>, &mut Object)> {
        self.0.iter_mut()
    }

    /// Value of `/Type`, if present.
    pub fn get_type(&self) -> Result<&[u8]> {
        self.get(b"Type").and_then(Object::as_name)
    }

    /// Value of `/Subtype`, if present.
    pub fn get_subtype(&self) -> Result<&[u8]> {
        self.get(b"Subtype").and_then(Object::as_name)
    }

    /// True if `/Type` (or `/Subtype` as a fallback) equals `name`.
    pub fn has_type(&self, name: &[u8]) -> bool {
        self.get_type().map(|t| t == name).unwrap_or(false) || self.get_subtype().map(|t| t == name).unwrap_or(false)
    }

    /// Resolves `/Filter` into a list of filter names, whether it was stored
    /// as a single Name or an Array of Names.
    pub fn filter_names(&self) -> Vec<Vec<u8>> {
        match self.get(b"Filter") {
            Ok(Object::Name(name)) => vec![name.clone()],
            Ok(Object::Array(arr)) => arr.iter().filter_map(|o| o.as_name().ok().map(|n| n.to_vec())).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|(k, v)| (String::from_utf8_lossy(k), v)))
            .finish()
    }
}

impl IntoIterator for Dictionary {
    type Item = (Vec<u8>, Object);
    type IntoIter = indexmap::map::IntoIter<Vec<u8>, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(Vec<u8>, Object)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (Vec<u8>, Object)>>(iter: T) -> Self {
        Dictionary(IndexMap::from_iter(iter))
    }
}
