//! Decoded request bodies.

use std::collections::HashMap;

use crate::cache::CacheItem;

/// Field name under which non-form bodies are stored.
pub const RAW_FIELD: &str = "postData";

/// The value of one body field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyValue {
    /// Held in memory.
    Text(String),
    /// Held in temporary storage owned by the session.
    File(CacheItem),
}

/// One value of a body field plus the metadata its part declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPart {
    pub value: BodyValue,
    /// The part's own `Content-Type`, if declared.
    pub content_type: Option<String>,
    /// The original filename of an uploaded file.
    pub filename: Option<String>,
}

impl BodyPart {
    /// A plain text value without metadata.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: BodyValue::Text(value.into()),
            content_type: None,
            filename: None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            BodyValue::Text(text) => Some(text),
            BodyValue::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&CacheItem> {
        match &self.value {
            BodyValue::File(item) => Some(item),
            BodyValue::Text(_) => None,
        }
    }
}

/// Field name to every value received for it, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    fields: HashMap<String, Vec<BodyPart>>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of distinct field names.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Append a value to a field.
    pub fn insert(&mut self, name: impl Into<String>, part: BodyPart) {
        self.fields.entry(name.into()).or_default().push(part);
    }

    /// Record a field name that carried no value.
    pub fn insert_name(&mut self, name: impl Into<String>) {
        self.fields.entry(name.into()).or_default();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// First value of a field.
    pub fn get(&self, name: &str) -> Option<&BodyPart> {
        self.fields.get(name).and_then(|parts| parts.first())
    }

    /// All values of a field; empty when the field is absent.
    pub fn get_all(&self, name: &str) -> &[BodyPart] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value of a field, if it is held in memory.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(BodyPart::as_text)
    }

    /// All in-memory values of a field.
    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.get_all(name).iter().filter_map(BodyPart::as_text).collect()
    }

    /// First value of a field, if it is file-backed.
    pub fn file(&self, name: &str) -> Option<&CacheItem> {
        self.get(name).and_then(BodyPart::as_file)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// The payload of a non-form body.
    pub fn raw(&self) -> Option<&BodyPart> {
        self.get(RAW_FIELD)
    }
}
