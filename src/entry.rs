//! The decoded row type streamed by the pipeline.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::html_parser::DocumentHandle;

/// A single field value inside an [`Entry`].
///
/// String leaves are kept verbatim, non-string primitives are stringified by
/// the decoder, and nested structure is preserved here (in addition to the
/// stringified form callers see through [`Entry::get_string`]) so consumers
/// that want to walk a nested object/array don't have to re-parse JSON.
///
/// `Document` is not part of the wire-level union the decoder produces; it
/// is the one variant only the Follow operator ever constructs, holding the
/// parsed document it attaches to `dst_field`.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
    Object(Map<String, Value>),
    Array(Vec<Value>),
    Document(DocumentHandle),
}

impl EntryValue {
    /// The string a consumer sees when treating this value as text: string
    /// leaves pass through unquoted, everything else is the `Display`/JSON
    /// form with any single pair of surrounding quotes stripped.
    #[must_use]
    pub fn as_display_string(&self) -> String {
        match self {
            EntryValue::String(s) => s.clone(),
            EntryValue::Integer(n) => n.to_string(),
            EntryValue::Float(f) => f.to_string(),
            EntryValue::Bool(b) => b.to_string(),
            EntryValue::Null => "null".to_string(),
            EntryValue::Object(obj) => strip_quotes(&Value::Object(obj.clone()).to_string()),
            EntryValue::Array(arr) => strip_quotes(&Value::Array(arr.clone()).to_string()),
            EntryValue::Document(_) => "<document>".to_string(),
        }
    }

    /// The value as a borrowed `&str`, if this is a string leaf.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EntryValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The value as a parsed document, if this is a document leaf (the
    /// Follow operator's success case).
    #[must_use]
    pub fn as_document(&self) -> Option<&DocumentHandle> {
        match self {
            EntryValue::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

pub(crate) fn strip_quotes(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// A decoded row from the index response.
///
/// Field order is not semantically significant; a `BTreeMap` is used purely
/// so `Debug`/snapshot output is reproducible across runs, not because order
/// carries meaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
    fields: BTreeMap<String, EntryValue>,
}

impl Entry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field, overwriting any existing value under the same key
    /// (last-write-wins, per the decoder's duplicate-key rule).
    pub fn insert(&mut self, key: impl Into<String>, value: EntryValue) {
        self.fields.insert(key.into(), value);
    }

    /// Returns a new entry with `key` bound to `value`, leaving `self`
    /// untouched. Used by the follow operator, which must not mutate the
    /// entries it enriches.
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: EntryValue) -> Self {
        let mut next = self.clone();
        next.insert(key, value);
        next
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&EntryValue> {
        self.fields.get(key)
    }

    /// Convenience accessor for a field's display string: string leaves are
    /// returned verbatim, every other leaf is stringified the same way
    /// [`EntryValue::as_display_string`] does, so a `map`/`filter` closure
    /// written against this accessor never silently sees `None` for an
    /// integer/float/bool/null/object/array field.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.fields.get(key).map(EntryValue::as_display_string)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<EntryValue> {
        self.fields.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntryValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, EntryValue)> for Entry {
    fn from_iter<T: IntoIterator<Item = (String, EntryValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_does_not_mutate_original() {
        let base = Entry::new();
        let enriched = base.with("doc", EntryValue::String("x".into()));
        assert!(base.get("doc").is_none());
        assert_eq!(enriched.get_string("doc").as_deref(), Some("x"));
    }

    #[test]
    fn get_string_stringifies_non_string_leaves() {
        let mut entry = Entry::new();
        entry.insert("count", EntryValue::Integer(42));
        entry.insert("active", EntryValue::Bool(true));
        entry.insert("missing", EntryValue::Null);
        assert_eq!(entry.get_string("count").as_deref(), Some("42"));
        assert_eq!(entry.get_string("active").as_deref(), Some("true"));
        assert_eq!(entry.get_string("missing").as_deref(), Some("null"));
    }

    #[test]
    fn display_string_strips_one_pair_of_quotes() {
        let quoted = EntryValue::String("\"X\"".to_string());
        assert_eq!(strip_quotes(&quoted.as_display_string()), "X");
    }
}
