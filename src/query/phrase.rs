//! Phrase matching over token positions.

use crate::error::{ChrysalisError, Result};
use crate::index::postings::Posting;
use crate::index::reader::PostingsIter;
use crate::index::segment;
use crate::query::iter::{CancelToken, DocIterator, EmptyIter, ScoredDoc};
use crate::query::{EvalContext, Query, TermQuery};

/// Matches documents containing the given terms at strictly consecutive
/// token positions.
///
/// Evaluation intersects the terms' postings by doc id, then verifies
/// adjacency on the stored positions. The phrase frequency (number of
/// position chains) is the tf in the document's score; idf is the sum of
/// the member terms' idfs.
#[derive(Debug, Clone)]
pub struct PhraseQuery {
    field: String,
    terms: Vec<String>,
    boost: f32,
}

impl PhraseQuery {
    /// Create a phrase query over the terms in order.
    pub fn new<S: Into<String>, I: IntoIterator<Item = S>>(field: S, terms: I) -> Self {
        PhraseQuery {
            field: field.into(),
            terms: terms.into_iter().map(Into::into).collect(),
            boost: 1.0,
        }
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// The terms of the phrase, in order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

impl Query for PhraseQuery {
    fn evaluate(&self, ctx: &EvalContext) -> Result<Box<dyn DocIterator>> {
        if self.terms.is_empty() {
            return Err(ChrysalisError::query("phrase query has no terms"));
        }
        if self.terms.len() == 1 {
            return TermQuery::new(self.field.clone(), self.terms[0].clone())
                .with_boost(self.boost)
                .evaluate(ctx);
        }

        let mut weight = 0.0;
        let mut streams = Vec::with_capacity(self.terms.len());
        for term in &self.terms {
            let full_term = segment::full_term(&self.field, term);
            let doc_freq = ctx.reader.doc_frequency(&full_term)?;
            if doc_freq == 0 {
                // One absent term means the phrase can never match.
                return Ok(Box::new(EmptyIter));
            }
            weight += ctx.idf(doc_freq);
            streams.push(ctx.reader.postings(&full_term)?);
        }

        PhraseIter::new(streams, weight * self.boost, ctx.cancel.clone())
            .map(|it| Box::new(it) as Box<dyn DocIterator>)
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn description(&self) -> String {
        format!("phrase({}:\"{}\")", self.field, self.terms.join(" "))
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }
}

struct PhraseChild {
    stream: PostingsIter,
    head: Option<Posting>,
}

impl PhraseChild {
    fn advance(&mut self) {
        self.head = self.stream.next();
    }

    fn seek(&mut self, target: u64) {
        while matches!(self.head, Some(ref p) if p.doc_id < target) {
            self.advance();
        }
    }
}

/// Positional intersection of the phrase's term postings.
struct PhraseIter {
    children: Vec<PhraseChild>,
    weight: f32,
    cancel: CancelToken,
}

impl PhraseIter {
    fn new(streams: Vec<PostingsIter>, weight: f32, cancel: CancelToken) -> Result<Self> {
        let children = streams
            .into_iter()
            .map(|mut stream| {
                let head = stream.next();
                PhraseChild { stream, head }
            })
            .collect();
        Ok(PhraseIter {
            children,
            weight,
            cancel,
        })
    }

    /// Count position chains where term i+1 sits at position + 1 of term i.
    fn phrase_frequency(children: &[PhraseChild]) -> u64 {
        let Some(first) = children[0].head.as_ref() else {
            return 0;
        };
        first
            .positions
            .iter()
            .filter(|start| {
                children[1..].iter().enumerate().all(|(i, child)| {
                    let wanted = start.position + 1 + i as u32;
                    child
                        .head
                        .as_ref()
                        .is_some_and(|p| p.positions.iter().any(|pos| pos.position == wanted))
                })
            })
            .count() as u64
    }
}

impl DocIterator for PhraseIter {
    fn next_doc(&mut self) -> Result<Option<ScoredDoc>> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(ChrysalisError::Cancelled);
            }
            // Align all children on the same doc id, as in a conjunction.
            let mut target = 0;
            for child in &self.children {
                match &child.head {
                    Some(p) => target = target.max(p.doc_id),
                    None => return Ok(None),
                }
            }
            let mut aligned = true;
            for child in &mut self.children {
                child.seek(target);
                match &child.head {
                    Some(p) if p.doc_id == target => {}
                    Some(_) => aligned = false,
                    None => return Ok(None),
                }
            }
            if !aligned {
                continue;
            }

            let tf = Self::phrase_frequency(&self.children);
            for child in &mut self.children {
                child.advance();
            }
            if tf > 0 {
                return Ok(Some(ScoredDoc {
                    doc_id: target,
                    score: tf as f32 * self.weight,
                }));
            }
        }
    }
}
