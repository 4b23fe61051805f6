//! Schema definition and validation.
//!
//! A schema declares, per field name, the field's kind and its `stored` /
//! `indexed` flags. The engine treats the schema as a frozen lookup table for
//! the duration of any write or read session.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{ChrysalisError, Result};

/// The recognized field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Free text, run through the boundary tokenizer and analyzer.
    Text,
    /// Text indexed as a single atomic token, no tokenization.
    CategoricalText,
    /// Numeric value with ordered comparison support.
    Numeric,
    /// Boolean value.
    Boolean,
    /// Unique atomic identifier token.
    Id,
}

/// Declaration of a single field: its kind plus storage/indexing flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// The kind of value this field holds.
    pub kind: FieldKind,
    /// Whether raw values are stored for retrieval.
    pub stored: bool,
    /// Whether values are indexed for searching.
    pub indexed: bool,
}

impl FieldSpec {
    /// A tokenized, indexed and stored text field.
    pub fn text() -> Self {
        FieldSpec {
            kind: FieldKind::Text,
            stored: true,
            indexed: true,
        }
    }

    /// An atomic categorical field, indexed and stored.
    pub fn categorical() -> Self {
        FieldSpec {
            kind: FieldKind::CategoricalText,
            stored: true,
            indexed: true,
        }
    }

    /// A numeric field, indexed and stored.
    pub fn numeric() -> Self {
        FieldSpec {
            kind: FieldKind::Numeric,
            stored: true,
            indexed: true,
        }
    }

    /// A boolean field, indexed and stored.
    pub fn boolean() -> Self {
        FieldSpec {
            kind: FieldKind::Boolean,
            stored: true,
            indexed: true,
        }
    }

    /// A unique id field, indexed atomically and stored.
    pub fn id() -> Self {
        FieldSpec {
            kind: FieldKind::Id,
            stored: true,
            indexed: true,
        }
    }

    /// Toggle the stored flag.
    pub fn with_stored(mut self, stored: bool) -> Self {
        self.stored = stored;
        self
    }

    /// Toggle the indexed flag.
    pub fn with_indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }
}

/// A typed field value supplied in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Free text.
    Text(String),
    /// Atomic categorical text.
    Categorical(String),
    /// Numeric value.
    Numeric(f64),
    /// Boolean value.
    Boolean(bool),
    /// Unique identifier.
    Id(String),
}

impl FieldValue {
    /// Return the text content if this is a Text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Return the numeric content if this is a Numeric value.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            FieldValue::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    /// Render the value as the single atomic term it is indexed under.
    ///
    /// Only meaningful for non-Text kinds; Text fields go through the
    /// analysis pipeline instead.
    pub fn atomic_term(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Categorical(s) => s.clone(),
            FieldValue::Numeric(n) => format_numeric_term(*n),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Id(s) => s.clone(),
        }
    }

    fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Categorical(_) => FieldKind::CategoricalText,
            FieldValue::Numeric(_) => FieldKind::Numeric,
            FieldValue::Boolean(_) => FieldKind::Boolean,
            FieldValue::Id(_) => FieldKind::Id,
        }
    }
}

/// Render a numeric value as a dictionary term.
///
/// Integral values drop the fractional part so that `5.0` and a query for
/// `5` index and match under the same term.
pub fn format_numeric_term(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// A frozen mapping from field name to field declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    fields: AHashMap<String, FieldSpec>,
}

impl Schema {
    /// Start building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder {
            fields: AHashMap::new(),
        }
    }

    /// Look up a field declaration by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Iterate over all declared fields.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldSpec)> {
        self.fields.iter()
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate a field value against its declaration.
    ///
    /// Returns the declaration on success. Unknown fields and kind
    /// disagreements are `SchemaMismatch` errors.
    pub fn validate(&self, name: &str, value: &FieldValue) -> Result<&FieldSpec> {
        let spec = self.field(name).ok_or_else(|| {
            ChrysalisError::schema(format!("field '{name}' is not declared in the schema"))
        })?;

        if value.kind() != spec.kind {
            return Err(ChrysalisError::schema(format!(
                "field '{name}' declared as {:?} but value is {:?}",
                spec.kind,
                value.kind()
            )));
        }

        Ok(spec)
    }
}

/// Builder for [`Schema`].
#[derive(Debug)]
pub struct SchemaBuilder {
    fields: AHashMap<String, FieldSpec>,
}

impl SchemaBuilder {
    /// Declare a field. A field that is neither stored nor indexed is
    /// meaningless and rejected at build time.
    pub fn add_field<S: Into<String>>(mut self, name: S, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// Finish building, validating every declaration.
    pub fn build(self) -> Result<Schema> {
        for (name, spec) in &self.fields {
            if !spec.stored && !spec.indexed {
                return Err(ChrysalisError::schema(format!(
                    "field '{name}' is neither stored nor indexed"
                )));
            }
        }
        Ok(Schema {
            fields: self.fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_builder() {
        let schema = Schema::builder()
            .add_field("text", FieldSpec::text())
            .add_field("rating", FieldSpec::numeric())
            .build()
            .unwrap();

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.field("text").unwrap().kind, FieldKind::Text);
        assert!(schema.field("missing").is_none());
    }

    #[test]
    fn test_rejects_unstored_unindexed_field() {
        let result = Schema::builder()
            .add_field(
                "useless",
                FieldSpec::text().with_stored(false).with_indexed(false),
            )
            .build();

        assert!(matches!(result, Err(ChrysalisError::SchemaMismatch(_))));
    }

    #[test]
    fn test_validate_kind_mismatch() {
        let schema = Schema::builder()
            .add_field("rating", FieldSpec::numeric())
            .build()
            .unwrap();

        let err = schema
            .validate("rating", &FieldValue::Text("five".to_string()))
            .unwrap_err();
        assert!(matches!(err, ChrysalisError::SchemaMismatch(_)));

        assert!(schema.validate("rating", &FieldValue::Numeric(5.0)).is_ok());
    }

    #[test]
    fn test_validate_unknown_field() {
        let schema = Schema::builder()
            .add_field("text", FieldSpec::text())
            .build()
            .unwrap();

        let err = schema
            .validate("other", &FieldValue::Text("x".to_string()))
            .unwrap_err();
        assert!(matches!(err, ChrysalisError::SchemaMismatch(_)));
    }

    #[test]
    fn test_atomic_terms() {
        assert_eq!(FieldValue::Numeric(5.0).atomic_term(), "5");
        assert_eq!(FieldValue::Numeric(2.5).atomic_term(), "2.5");
        assert_eq!(FieldValue::Boolean(true).atomic_term(), "true");
        assert_eq!(
            FieldValue::Id("doc-1".to_string()).atomic_term(),
            "doc-1"
        );
    }
}
