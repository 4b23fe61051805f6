//! Search execution: evaluation, ranking, paging.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::document::Document;
use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::query::iter::CancelToken;
use crate::query::{EvalContext, Query};

/// How a wildcard credits a document matched through several expanded
/// terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WildcardScorePolicy {
    /// Credit the best-scoring matched term. Keeps a document from
    /// outranking exact matches just by containing many variants.
    #[default]
    Max,
    /// Sum the matched terms' scores.
    Sum,
}

/// Searcher configuration.
#[derive(Debug, Clone)]
pub struct SearcherConfig {
    /// Wildcard credit policy.
    pub wildcard_policy: WildcardScorePolicy,
    /// Whether hits carry their stored fields.
    pub load_documents: bool,
}

impl Default for SearcherConfig {
    fn default() -> Self {
        SearcherConfig::new()
    }
}

impl SearcherConfig {
    pub fn new() -> Self {
        SearcherConfig {
            wildcard_policy: WildcardScorePolicy::default(),
            load_documents: true,
        }
    }

    pub fn with_wildcard_policy(mut self, policy: WildcardScorePolicy) -> Self {
        self.wildcard_policy = policy;
        self
    }

    pub fn with_load_documents(mut self, load: bool) -> Self {
        self.load_documents = load;
        self
    }
}

/// One ranked search hit.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Document id.
    pub doc_id: u64,
    /// TF-IDF score.
    pub score: f32,
    /// Stored fields, when the searcher loads them.
    pub document: Option<Document>,
}

/// A page of ranked results.
#[derive(Debug, Clone)]
pub struct SearchResults {
    /// The requested page, ranked by descending score with ascending doc id
    /// breaking ties.
    pub hits: Vec<SearchHit>,
    /// Total matching documents, independent of paging.
    pub total_hits: u64,
}

/// Executes queries against one reader snapshot.
#[derive(Debug)]
pub struct Searcher {
    reader: Arc<IndexReader>,
    config: SearcherConfig,
    cancel: CancelToken,
}

impl Searcher {
    /// Create a searcher with the default configuration.
    pub fn new(reader: Arc<IndexReader>) -> Self {
        Searcher::with_config(reader, SearcherConfig::new())
    }

    /// Create a searcher with an explicit configuration.
    pub fn with_config(reader: Arc<IndexReader>, config: SearcherConfig) -> Self {
        Searcher {
            reader,
            config,
            cancel: CancelToken::new(),
        }
    }

    /// The snapshot this searcher reads from.
    pub fn reader(&self) -> &Arc<IndexReader> {
        &self.reader
    }

    /// A handle that cancels in-flight and future evaluations on this
    /// searcher.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn context(&self) -> EvalContext {
        EvalContext {
            reader: self.reader.clone(),
            cancel: self.cancel.clone(),
            wildcard_policy: self.config.wildcard_policy,
            total_docs: self.reader.doc_count().max(1),
        }
    }

    /// Evaluate and rank, returning `limit` hits starting at `offset`.
    pub fn search(&self, query: &dyn Query, offset: usize, limit: usize) -> Result<SearchResults> {
        log::debug!("search: {}", query.description());
        let ctx = self.context();
        let mut iter = query.evaluate(&ctx)?;

        // Leaf iterators do not check the token themselves, so the drain
        // loop does.
        let mut matches = Vec::new();
        while let Some(doc) = iter.next_doc()? {
            self.cancel.check()?;
            matches.push(doc);
        }
        let total_hits = matches.len() as u64;

        // Descending score; ascending doc id makes ranking deterministic
        // on ties.
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });

        let mut hits = Vec::with_capacity(limit.min(matches.len()));
        for doc in matches.into_iter().skip(offset).take(limit) {
            let document = if self.config.load_documents {
                Some(self.reader.document(doc.doc_id)?)
            } else {
                None
            };
            hits.push(SearchHit {
                doc_id: doc.doc_id,
                score: doc.score,
                document,
            });
        }
        Ok(SearchResults { hits, total_hits })
    }

    /// Number of documents matching the query.
    pub fn count(&self, query: &dyn Query) -> Result<u64> {
        let ctx = self.context();
        let mut iter = query.evaluate(&ctx)?;
        let mut count = 0;
        while iter.next_doc()?.is_some() {
            self.cancel.check()?;
            count += 1;
        }
        Ok(count)
    }

    /// Ids of all matching documents, ascending, without ranking.
    pub fn filter(&self, query: &dyn Query) -> Result<Vec<u64>> {
        let ctx = self.context();
        let mut iter = query.evaluate(&ctx)?;
        let mut ids = Vec::new();
        while let Some(doc) = iter.next_doc()? {
            self.cancel.check()?;
            ids.push(doc.doc_id);
        }
        Ok(ids)
    }
}
