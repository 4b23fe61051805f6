//! Document representation.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::schema::FieldValue;

/// A document: a mapping from field name to typed value.
///
/// Documents are assigned a monotonically increasing id by the writer at
/// `add_document` time and are immutable once flushed, apart from tombstone
/// deletion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    fields: AHashMap<String, FieldValue>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Document::default()
    }

    /// Add a free-text field.
    pub fn add_text<S: Into<String>, V: Into<String>>(mut self, name: S, value: V) -> Self {
        self.fields
            .insert(name.into(), FieldValue::Text(value.into()));
        self
    }

    /// Add an atomic categorical text field.
    pub fn add_categorical<S: Into<String>, V: Into<String>>(mut self, name: S, value: V) -> Self {
        self.fields
            .insert(name.into(), FieldValue::Categorical(value.into()));
        self
    }

    /// Add a numeric field.
    pub fn add_numeric<S: Into<String>>(mut self, name: S, value: f64) -> Self {
        self.fields.insert(name.into(), FieldValue::Numeric(value));
        self
    }

    /// Add a boolean field.
    pub fn add_boolean<S: Into<String>>(mut self, name: S, value: bool) -> Self {
        self.fields.insert(name.into(), FieldValue::Boolean(value));
        self
    }

    /// Add a unique id field.
    pub fn add_id<S: Into<String>, V: Into<String>>(mut self, name: S, value: V) -> Self {
        self.fields
            .insert(name.into(), FieldValue::Id(value.into()));
        self
    }

    /// Add an already-typed field value.
    pub fn add_field<S: Into<String>>(mut self, name: S, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Look up a field value by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Iterate over all fields.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Number of fields in this document.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
