//! Boolean combination of queries.

use crate::error::{ChrysalisError, Result};
use crate::query::iter::{
    DifferenceIter, DocIterator, IntersectionIter, OptionalScoreIter, ScaleIter, ScoreCombine,
    UnionIter,
};
use crate::query::{EvalContext, Query};

/// How a clause participates in the match decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match (AND).
    Must,
    /// The clause may match and contributes to the score (OR).
    Should,
    /// The clause must not match (NOT).
    MustNot,
}

/// One clause of a boolean query.
#[derive(Debug, Clone)]
pub struct BooleanClause {
    /// The wrapped query.
    pub query: Box<dyn Query>,
    /// How the clause participates.
    pub occur: Occur,
}

impl BooleanClause {
    pub fn new(query: Box<dyn Query>, occur: Occur) -> Self {
        BooleanClause { query, occur }
    }

    pub fn must(query: Box<dyn Query>) -> Self {
        Self::new(query, Occur::Must)
    }

    pub fn should(query: Box<dyn Query>) -> Self {
        Self::new(query, Occur::Should)
    }

    pub fn must_not(query: Box<dyn Query>) -> Self {
        Self::new(query, Occur::MustNot)
    }
}

/// AND / OR / NOT combination of sub-queries.
///
/// Semantics: documents must match every `Must` clause; `Should` clauses
/// widen the match when no `Must` clause exists and otherwise only add
/// score; `MustNot` clauses subtract documents and never contribute score.
/// Evaluation is a sorted merge over child iterators, linear in the sum of
/// the children's postings.
#[derive(Debug, Clone)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
    boost: f32,
}

impl Default for BooleanQuery {
    fn default() -> Self {
        BooleanQuery::new()
    }
}

impl BooleanQuery {
    pub fn new() -> Self {
        BooleanQuery {
            clauses: Vec::new(),
            boost: 1.0,
        }
    }

    /// Start a builder.
    pub fn builder() -> BooleanQueryBuilder {
        BooleanQueryBuilder::new()
    }

    pub fn add_clause(&mut self, clause: BooleanClause) {
        self.clauses.push(clause);
    }

    /// The clauses, in insertion order.
    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    fn evaluate_occur(
        &self,
        ctx: &EvalContext,
        occur: Occur,
    ) -> Result<Vec<Box<dyn DocIterator>>> {
        self.clauses
            .iter()
            .filter(|c| c.occur == occur)
            .map(|c| c.query.evaluate(ctx))
            .collect()
    }
}

impl Query for BooleanQuery {
    fn evaluate(&self, ctx: &EvalContext) -> Result<Box<dyn DocIterator>> {
        if self.clauses.is_empty() {
            return Err(ChrysalisError::query("boolean query has no clauses"));
        }

        let musts = self.evaluate_occur(ctx, Occur::Must)?;
        let shoulds = self.evaluate_occur(ctx, Occur::Should)?;
        let must_nots = self.evaluate_occur(ctx, Occur::MustNot)?;

        if musts.is_empty() && shoulds.is_empty() {
            return Err(ChrysalisError::query(
                "boolean query needs at least one positive clause",
            ));
        }

        let mut base: Box<dyn DocIterator> = if musts.is_empty() {
            Box::new(UnionIter::new(shoulds, ScoreCombine::Sum, ctx.cancel.clone())?)
        } else {
            let required = Box::new(IntersectionIter::new(musts, ctx.cancel.clone())?);
            if shoulds.is_empty() {
                required
            } else {
                let optional =
                    Box::new(UnionIter::new(shoulds, ScoreCombine::Sum, ctx.cancel.clone())?);
                Box::new(OptionalScoreIter::new(required, optional)?)
            }
        };

        if !must_nots.is_empty() {
            let excluded =
                Box::new(UnionIter::new(must_nots, ScoreCombine::Sum, ctx.cancel.clone())?);
            base = Box::new(DifferenceIter::new(base, excluded, ctx.cancel.clone())?);
        }

        if self.boost != 1.0 {
            base = Box::new(ScaleIter::new(base, self.boost));
        }
        Ok(base)
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn description(&self) -> String {
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|c| {
                let sigil = match c.occur {
                    Occur::Must => "+",
                    Occur::Should => "",
                    Occur::MustNot => "-",
                };
                format!("{sigil}{}", c.query.description())
            })
            .collect();
        format!("bool({})", parts.join(" "))
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }
}

/// Fluent construction of boolean queries.
#[derive(Debug, Default)]
pub struct BooleanQueryBuilder {
    query: BooleanQuery,
}

impl BooleanQueryBuilder {
    pub fn new() -> Self {
        BooleanQueryBuilder {
            query: BooleanQuery::new(),
        }
    }

    pub fn must(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_clause(BooleanClause::must(query));
        self
    }

    pub fn should(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_clause(BooleanClause::should(query));
        self
    }

    pub fn must_not(mut self, query: Box<dyn Query>) -> Self {
        self.query.add_clause(BooleanClause::must_not(query));
        self
    }

    pub fn boost(mut self, boost: f32) -> Self {
        self.query.boost = boost;
        self
    }

    pub fn build(self) -> BooleanQuery {
        self.query
    }
}
