//! Query tree and evaluation.
//!
//! Queries are trait objects composed into a tree; `evaluate` turns a node
//! into a [`DocIterator`] over the reader snapshot held by the evaluation
//! context. Scoring is TF-IDF: each term contributes
//! `tf · idf · boost` to the documents it matches, with
//! `idf = ln(total_docs / doc_freq)` floored at zero.

pub mod boolean;
pub mod filter;
pub mod iter;
pub mod phrase;
pub mod searcher;
pub mod wildcard;

pub use boolean::{BooleanClause, BooleanQuery, BooleanQueryBuilder, Occur};
pub use filter::{FieldFilter, FieldFilterQuery};
pub use iter::{CancelToken, DocIterator, ScoredDoc};
pub use phrase::PhraseQuery;
pub use searcher::{
    SearchHit, SearchResults, Searcher, SearcherConfig, WildcardScorePolicy,
};
pub use wildcard::WildcardQuery;

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::index::segment;
use crate::query::iter::{EmptyIter, TermIter};

/// Everything a query needs to evaluate itself.
pub struct EvalContext {
    /// The pinned snapshot being searched.
    pub reader: Arc<IndexReader>,
    /// Cancellation token checked between merge steps.
    pub cancel: CancelToken,
    /// Score credit policy for wildcard expansions.
    pub wildcard_policy: WildcardScorePolicy,
    /// Live document count, floored at 1 so idf is always defined.
    pub total_docs: u64,
}

impl EvalContext {
    /// Inverse document frequency, floored at zero. A term present in every
    /// document scores zero rather than negative.
    pub fn idf(&self, doc_freq: u64) -> f32 {
        if doc_freq == 0 {
            return 0.0;
        }
        (self.total_docs as f32 / doc_freq as f32).ln().max(0.0)
    }
}

/// A node of the query tree.
pub trait Query: Debug + Send + Sync {
    /// Evaluate into a doc-id-ordered scored stream.
    fn evaluate(&self, ctx: &EvalContext) -> Result<Box<dyn DocIterator>>;

    /// Boost factor multiplying this node's per-document scores.
    fn boost(&self) -> f32;

    /// Human-readable form, for logs.
    fn description(&self) -> String;

    /// Clone into a new box.
    fn clone_box(&self) -> Box<dyn Query>;
}

impl Clone for Box<dyn Query> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Matches documents containing an exact term in a field.
#[derive(Debug, Clone)]
pub struct TermQuery {
    field: String,
    term: String,
    boost: f32,
}

impl TermQuery {
    /// Create a term query.
    pub fn new<S: Into<String>>(field: S, term: S) -> Self {
        TermQuery {
            field: field.into(),
            term: term.into(),
            boost: 1.0,
        }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// The field searched.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The term matched.
    pub fn term(&self) -> &str {
        &self.term
    }
}

impl Query for TermQuery {
    fn evaluate(&self, ctx: &EvalContext) -> Result<Box<dyn DocIterator>> {
        let full_term = segment::full_term(&self.field, &self.term);
        let doc_freq = ctx.reader.doc_frequency(&full_term)?;
        if doc_freq == 0 {
            return Ok(Box::new(EmptyIter));
        }
        let weight = ctx.idf(doc_freq) * self.boost;
        Ok(Box::new(TermIter::new(
            ctx.reader.postings(&full_term)?,
            weight,
        )))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn description(&self) -> String {
        format!("term({}:{})", self.field, self.term)
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }
}
