//! Chrysalis is a text indexing and retrieval engine built for qualitative
//! analysis: alongside the usual inverted index it keeps track of *frames*,
//! small windows of consecutive sentences, so results come back with the
//! local context a term appeared in.
//!
//! The pipeline: raw field text is split into paragraphs, sentences and
//! frames in one pass, word-tokenized and filtered, then written into
//! immutable segments through a pluggable key-value [`storage`] backend.
//! Readers pin a manifest snapshot and merge segments lazily; queries are
//! trait-object trees (term, wildcard, boolean, phrase, field filter)
//! scored with TF-IDF.
//!
//! ```
//! use std::sync::Arc;
//!
//! use chrysalis::document::Document;
//! use chrysalis::index::Index;
//! use chrysalis::query::TermQuery;
//! use chrysalis::schema::{FieldSpec, Schema};
//! use chrysalis::storage::memory::MemoryStorage;
//!
//! # fn main() -> chrysalis::error::Result<()> {
//! let schema = Schema::builder()
//!     .add_field("body", FieldSpec::text())
//!     .build()?;
//! let index = Index::new(Arc::new(MemoryStorage::new()), schema);
//!
//! index.add_document(Document::new().add_text("body", "The cat sat on the mat."))?;
//! index.commit()?;
//!
//! let results = index.search(&TermQuery::new("body", "cat"), 0, 10)?;
//! assert_eq!(results.total_hits, 1);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod document;
pub mod error;
pub mod index;
pub mod query;
pub mod schema;
pub mod storage;

pub use document::Document;
pub use error::{ChrysalisError, Result};
pub use index::Index;
pub use schema::{FieldSpec, FieldValue, Schema};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
