//! Match-only filters over atomic field terms.

use crate::error::{ChrysalisError, Result};
use crate::index::segment;
use crate::query::iter::{DocIterator, EmptyIter, ScoreCombine, TermIter, UnionIter};
use crate::query::{EvalContext, Query};
use crate::schema::FieldValue;

/// The filter condition.
#[derive(Debug, Clone)]
pub enum FieldFilter {
    /// Exact match on the atomic term of a value.
    Equals(FieldValue),
    /// Inclusive numeric range; an open bound is unbounded on that side.
    Range {
        min: Option<f64>,
        max: Option<f64>,
    },
}

/// Matches documents by an atomic field value, without scoring.
///
/// Applies to CATEGORICAL_TEXT, ID, NUMERIC and BOOLEAN fields, which index
/// their values as single atomic terms. Matched documents contribute a zero
/// score, so the filter constrains a boolean query without disturbing
/// ranking.
#[derive(Debug, Clone)]
pub struct FieldFilterQuery {
    field: String,
    filter: FieldFilter,
}

impl FieldFilterQuery {
    /// Filter on exact equality with a value.
    pub fn equals<S: Into<String>>(field: S, value: FieldValue) -> Result<Self> {
        if matches!(value, FieldValue::Text(_)) {
            return Err(ChrysalisError::query(
                "text fields are searched with term queries, not field filters",
            ));
        }
        Ok(FieldFilterQuery {
            field: field.into(),
            filter: FieldFilter::Equals(value),
        })
    }

    /// Filter on an inclusive numeric range.
    pub fn numeric_range<S: Into<String>>(
        field: S,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<Self> {
        if min.is_none() && max.is_none() {
            return Err(ChrysalisError::query("numeric range needs at least one bound"));
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(ChrysalisError::query(format!(
                    "numeric range is inverted: {lo} > {hi}"
                )));
            }
        }
        Ok(FieldFilterQuery {
            field: field.into(),
            filter: FieldFilter::Range { min, max },
        })
    }

    /// The field filtered on.
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Query for FieldFilterQuery {
    fn evaluate(&self, ctx: &EvalContext) -> Result<Box<dyn DocIterator>> {
        match &self.filter {
            FieldFilter::Equals(value) => {
                let full_term = segment::full_term(&self.field, &value.atomic_term());
                Ok(Box::new(TermIter::new(ctx.reader.postings(&full_term)?, 0.0)))
            }
            FieldFilter::Range { min, max } => {
                // Numeric fields index one atomic term per value, so the
                // field's dictionary slice is the value universe.
                let prefix = format!("{}:", self.field);
                let mut children: Vec<Box<dyn DocIterator>> = Vec::new();
                for full_term in ctx.reader.terms_with_prefix(&prefix)? {
                    let Ok(value) = full_term[prefix.len()..].parse::<f64>() else {
                        continue;
                    };
                    if min.is_some_and(|lo| value < lo) || max.is_some_and(|hi| value > hi) {
                        continue;
                    }
                    children.push(Box::new(TermIter::new(ctx.reader.postings(&full_term)?, 0.0)));
                }
                if children.is_empty() {
                    return Ok(Box::new(EmptyIter));
                }
                Ok(Box::new(UnionIter::new(
                    children,
                    ScoreCombine::Sum,
                    ctx.cancel.clone(),
                )?))
            }
        }
    }

    fn boost(&self) -> f32 {
        1.0
    }

    fn description(&self) -> String {
        match &self.filter {
            FieldFilter::Equals(value) => {
                format!("filter({}={})", self.field, value.atomic_term())
            }
            FieldFilter::Range { min, max } => format!(
                "filter({}:[{}..{}])",
                self.field,
                min.map_or("*".to_string(), |v| v.to_string()),
                max.map_or("*".to_string(), |v| v.to_string())
            ),
        }
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }
}
