//! Error types for the chrysalis engine.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChrysalisError>;

/// The error type for all chrysalis operations.
#[derive(Error, Debug)]
pub enum ChrysalisError {
    /// Input text cannot be indexed at all (e.g. interior NUL bytes).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A field value's kind disagrees with the declared field kind, or the
    /// field declaration itself is invalid.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A storage write batch did not complete. The prior index state is
    /// untouched and the flush may be retried.
    #[error("flush failure: {0}")]
    FlushFailure(String),

    /// A segment failed an internal consistency check on open.
    #[error("corrupt segment: {0}")]
    CorruptSegment(String),

    /// A malformed query tree (bad wildcard pattern, empty clause, ...).
    #[error("query parse error: {0}")]
    QueryParse(String),

    /// A document id (or other directly addressed entity) does not exist.
    /// Absent terms are not errors; they yield empty postings.
    #[error("not found: {0}")]
    NotFound(String),

    /// The storage collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// An internal index invariant was violated (duplicate doc id,
    /// out-of-order postings). Always fatal, never repaired silently.
    #[error("index error: {0}")]
    Index(String),

    /// A query evaluation was cancelled via its cancellation token.
    #[error("query cancelled")]
    Cancelled,

    /// I/O error from an underlying storage implementation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error for segment payloads.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ChrysalisError {
    /// Create a malformed input error.
    pub fn malformed_input<S: Into<String>>(message: S) -> Self {
        ChrysalisError::MalformedInput(message.into())
    }

    /// Create a schema mismatch error.
    pub fn schema<S: Into<String>>(message: S) -> Self {
        ChrysalisError::SchemaMismatch(message.into())
    }

    /// Create a flush failure error.
    pub fn flush<S: Into<String>>(message: S) -> Self {
        ChrysalisError::FlushFailure(message.into())
    }

    /// Create a corrupt segment error.
    pub fn corrupt<S: Into<String>>(message: S) -> Self {
        ChrysalisError::CorruptSegment(message.into())
    }

    /// Create a query parse error.
    pub fn query<S: Into<String>>(message: S) -> Self {
        ChrysalisError::QueryParse(message.into())
    }

    /// Create a not found error.
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        ChrysalisError::NotFound(message.into())
    }

    /// Create a storage error.
    pub fn storage<S: Into<String>>(message: S) -> Self {
        ChrysalisError::Storage(message.into())
    }

    /// Create an index error.
    pub fn index<S: Into<String>>(message: S) -> Self {
        ChrysalisError::Index(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChrysalisError::flush("batch write aborted");
        assert_eq!(err.to_string(), "flush failure: batch write aborted");

        let err = ChrysalisError::not_found("document 42");
        assert_eq!(err.to_string(), "not found: document 42");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: ChrysalisError = io_err.into();
        assert!(matches!(err, ChrysalisError::Io(_)));
    }
}
