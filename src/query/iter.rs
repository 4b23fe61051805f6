//! Scored document iterators and the merge combinators behind boolean
//! evaluation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{ChrysalisError, Result};
use crate::index::reader::PostingsIter;

/// Cooperative cancellation for long evaluations.
///
/// Cloning shares the flag. Combinators check the token between doc-id
/// merge steps and the searcher checks it while draining, so a cancelled
/// search returns promptly instead of running to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that is never cancelled until `cancel` is called.
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Error with `Cancelled` if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ChrysalisError::Cancelled);
        }
        Ok(())
    }
}

/// A matching document with its accumulated score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    /// Document id.
    pub doc_id: u64,
    /// Score contribution of the subtree that produced this entry.
    pub score: f32,
}

/// A stream of matching documents, ascending by doc id.
///
/// All combinators below preserve the ordering and do work linear in the
/// sum of their children's postings.
pub trait DocIterator {
    /// The next matching document, or `None` when exhausted.
    fn next_doc(&mut self) -> Result<Option<ScoredDoc>>;
}

/// An iterator that never matches.
pub struct EmptyIter;

impl DocIterator for EmptyIter {
    fn next_doc(&mut self) -> Result<Option<ScoredDoc>> {
        Ok(None)
    }
}

/// Postings of a single term scored as tf · idf · boost.
pub struct TermIter {
    postings: PostingsIter,
    weight: f32,
}

impl TermIter {
    /// Wrap a postings stream with a per-occurrence weight (idf · boost).
    pub fn new(postings: PostingsIter, weight: f32) -> Self {
        TermIter { postings, weight }
    }
}

impl DocIterator for TermIter {
    fn next_doc(&mut self) -> Result<Option<ScoredDoc>> {
        Ok(self.postings.next().map(|p| ScoredDoc {
            doc_id: p.doc_id,
            score: p.term_frequency() as f32 * self.weight,
        }))
    }
}

/// How a union combines the scores of children matching the same document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreCombine {
    /// Sum child scores.
    #[default]
    Sum,
    /// Take the best child score. Used for wildcard expansions under the
    /// max credit policy.
    Max,
}

struct Child {
    iter: Box<dyn DocIterator>,
    head: Option<ScoredDoc>,
}

impl Child {
    fn new(mut iter: Box<dyn DocIterator>) -> Result<Self> {
        let head = iter.next_doc()?;
        Ok(Child { iter, head })
    }

    fn advance(&mut self) -> Result<()> {
        self.head = self.iter.next_doc()?;
        Ok(())
    }

    /// Advance until the head doc id is at least `target`.
    fn seek(&mut self, target: u64) -> Result<()> {
        while matches!(self.head, Some(d) if d.doc_id < target) {
            self.advance()?;
        }
        Ok(())
    }
}

/// OR: documents matching at least one child.
pub struct UnionIter {
    children: Vec<Child>,
    combine: ScoreCombine,
    cancel: CancelToken,
}

impl UnionIter {
    pub fn new(
        iters: Vec<Box<dyn DocIterator>>,
        combine: ScoreCombine,
        cancel: CancelToken,
    ) -> Result<Self> {
        let children = iters.into_iter().map(Child::new).collect::<Result<_>>()?;
        Ok(UnionIter {
            children,
            combine,
            cancel,
        })
    }
}

impl DocIterator for UnionIter {
    fn next_doc(&mut self) -> Result<Option<ScoredDoc>> {
        self.cancel.check()?;
        let min = self
            .children
            .iter()
            .filter_map(|c| c.head.map(|d| d.doc_id))
            .min();
        let Some(doc_id) = min else {
            return Ok(None);
        };

        let mut score = match self.combine {
            ScoreCombine::Sum => 0.0,
            ScoreCombine::Max => f32::MIN,
        };
        for child in &mut self.children {
            if let Some(head) = child.head {
                if head.doc_id == doc_id {
                    score = match self.combine {
                        ScoreCombine::Sum => score + head.score,
                        ScoreCombine::Max => score.max(head.score),
                    };
                    child.advance()?;
                }
            }
        }
        Ok(Some(ScoredDoc { doc_id, score }))
    }
}

/// AND: documents matching every child, scores summed.
pub struct IntersectionIter {
    children: Vec<Child>,
    cancel: CancelToken,
}

impl IntersectionIter {
    pub fn new(iters: Vec<Box<dyn DocIterator>>, cancel: CancelToken) -> Result<Self> {
        let children = iters.into_iter().map(Child::new).collect::<Result<_>>()?;
        Ok(IntersectionIter { children, cancel })
    }
}

impl DocIterator for IntersectionIter {
    fn next_doc(&mut self) -> Result<Option<ScoredDoc>> {
        if self.children.is_empty() {
            return Ok(None);
        }
        loop {
            self.cancel.check()?;
            // Align every child on the largest head; any exhausted child
            // ends the stream.
            let mut target = 0;
            for child in &self.children {
                match child.head {
                    Some(d) => target = target.max(d.doc_id),
                    None => return Ok(None),
                }
            }
            let mut aligned = true;
            for child in &mut self.children {
                child.seek(target)?;
                match child.head {
                    Some(d) if d.doc_id == target => {}
                    Some(_) => aligned = false,
                    None => return Ok(None),
                }
            }
            if aligned {
                let mut score = 0.0;
                for child in &mut self.children {
                    if let Some(head) = child.head {
                        score += head.score;
                    }
                    child.advance()?;
                }
                return Ok(Some(ScoredDoc {
                    doc_id: target,
                    score,
                }));
            }
        }
    }
}

/// NOT: documents from `base` that do not appear in `exclude`.
pub struct DifferenceIter {
    base: Box<dyn DocIterator>,
    exclude: Child,
    cancel: CancelToken,
}

impl DifferenceIter {
    pub fn new(
        base: Box<dyn DocIterator>,
        exclude: Box<dyn DocIterator>,
        cancel: CancelToken,
    ) -> Result<Self> {
        Ok(DifferenceIter {
            base,
            exclude: Child::new(exclude)?,
            cancel,
        })
    }
}

impl DocIterator for DifferenceIter {
    fn next_doc(&mut self) -> Result<Option<ScoredDoc>> {
        loop {
            self.cancel.check()?;
            let Some(doc) = self.base.next_doc()? else {
                return Ok(None);
            };
            self.exclude.seek(doc.doc_id)?;
            match self.exclude.head {
                Some(d) if d.doc_id == doc.doc_id => continue,
                _ => return Ok(Some(doc)),
            }
        }
    }
}

/// Multiplies every score from `inner` by a constant boost factor.
pub struct ScaleIter {
    inner: Box<dyn DocIterator>,
    factor: f32,
}

impl ScaleIter {
    pub fn new(inner: Box<dyn DocIterator>, factor: f32) -> Self {
        ScaleIter { inner, factor }
    }
}

impl DocIterator for ScaleIter {
    fn next_doc(&mut self) -> Result<Option<ScoredDoc>> {
        Ok(self.inner.next_doc()?.map(|mut doc| {
            doc.score *= self.factor;
            doc
        }))
    }
}

/// Documents from `base`, with the score of any aligned `optional` match
/// added. Implements SHOULD clauses alongside MUST clauses.
pub struct OptionalScoreIter {
    base: Box<dyn DocIterator>,
    optional: Child,
}

impl OptionalScoreIter {
    pub fn new(base: Box<dyn DocIterator>, optional: Box<dyn DocIterator>) -> Result<Self> {
        Ok(OptionalScoreIter {
            base,
            optional: Child::new(optional)?,
        })
    }
}

impl DocIterator for OptionalScoreIter {
    fn next_doc(&mut self) -> Result<Option<ScoredDoc>> {
        let Some(mut doc) = self.base.next_doc()? else {
            return Ok(None);
        };
        self.optional.seek(doc.doc_id)?;
        if let Some(head) = self.optional.head {
            if head.doc_id == doc.doc_id {
                doc.score += head.score;
            }
        }
        Ok(Some(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed list of scored docs, for combinator tests.
    struct FixedIter {
        docs: std::vec::IntoIter<ScoredDoc>,
    }

    fn fixed(docs: &[(u64, f32)]) -> Box<dyn DocIterator> {
        Box::new(FixedIter {
            docs: docs
                .iter()
                .map(|&(doc_id, score)| ScoredDoc { doc_id, score })
                .collect::<Vec<_>>()
                .into_iter(),
        })
    }

    impl DocIterator for FixedIter {
        fn next_doc(&mut self) -> Result<Option<ScoredDoc>> {
            Ok(self.docs.next())
        }
    }

    fn drain(mut iter: impl DocIterator) -> Vec<(u64, f32)> {
        let mut out = Vec::new();
        while let Some(doc) = iter.next_doc().unwrap() {
            out.push((doc.doc_id, doc.score));
        }
        out
    }

    #[test]
    fn test_union_sums_scores() {
        let union = UnionIter::new(
            vec![fixed(&[(1, 1.0), (3, 1.0)]), fixed(&[(1, 2.0), (2, 2.0)])],
            ScoreCombine::Sum,
            CancelToken::new(),
        )
        .unwrap();
        assert_eq!(drain(union), vec![(1, 3.0), (2, 2.0), (3, 1.0)]);
    }

    #[test]
    fn test_union_max_combine() {
        let union = UnionIter::new(
            vec![fixed(&[(1, 1.0)]), fixed(&[(1, 5.0)])],
            ScoreCombine::Max,
            CancelToken::new(),
        )
        .unwrap();
        assert_eq!(drain(union), vec![(1, 5.0)]);
    }

    #[test]
    fn test_intersection() {
        let inter = IntersectionIter::new(
            vec![
                fixed(&[(1, 1.0), (2, 1.0), (5, 1.0)]),
                fixed(&[(2, 2.0), (4, 2.0), (5, 2.0)]),
            ],
            CancelToken::new(),
        )
        .unwrap();
        assert_eq!(drain(inter), vec![(2, 3.0), (5, 3.0)]);
    }

    #[test]
    fn test_difference() {
        let diff = DifferenceIter::new(
            fixed(&[(1, 1.0), (2, 1.0), (3, 1.0)]),
            fixed(&[(2, 0.0)]),
            CancelToken::new(),
        )
        .unwrap();
        assert_eq!(drain(diff), vec![(1, 1.0), (3, 1.0)]);
    }

    #[test]
    fn test_optional_score() {
        let opt = OptionalScoreIter::new(
            fixed(&[(1, 1.0), (2, 1.0)]),
            fixed(&[(2, 4.0), (9, 4.0)]),
        )
        .unwrap();
        assert_eq!(drain(opt), vec![(1, 1.0), (2, 5.0)]);
    }

    #[test]
    fn test_cancellation_surfaces() {
        let token = CancelToken::new();
        token.cancel();
        let mut union = UnionIter::new(
            vec![fixed(&[(1, 1.0)])],
            ScoreCombine::Sum,
            token,
        )
        .unwrap();
        assert!(matches!(
            union.next_doc(),
            Err(ChrysalisError::Cancelled)
        ));
    }
}
