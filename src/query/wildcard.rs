//! Wildcard term matching with `*` and `?` globs.

use regex::Regex;

use crate::error::{ChrysalisError, Result};
use crate::index::segment;
use crate::query::iter::{DocIterator, EmptyIter, ScoreCombine, TermIter, UnionIter};
use crate::query::searcher::WildcardScorePolicy;
use crate::query::{EvalContext, Query};

/// Default cap on the number of terms a wildcard may expand to.
pub const DEFAULT_MAX_EXPANSIONS: usize = 1024;

/// Matches documents containing any dictionary term matching a glob
/// pattern. `*` matches any run of characters, `?` exactly one; both can be
/// escaped with a backslash.
///
/// Evaluation expands the pattern against the dictionary (scanning only
/// terms sharing the pattern's literal prefix) and unions the matched
/// terms' postings. Expansion is capped: when the cap is hit the first
/// `max_expansions` terms in dictionary order are used and the truncation
/// is logged, trading recall for bounded work.
#[derive(Debug, Clone)]
pub struct WildcardQuery {
    field: String,
    pattern: String,
    regex: Regex,
    boost: f32,
    max_expansions: usize,
}

impl WildcardQuery {
    /// Create a wildcard query. Fails with `QueryParse` on an invalid
    /// pattern (no wildcard characters, or a bad escape).
    pub fn new<S: Into<String>>(field: S, pattern: S) -> Result<Self> {
        let pattern = pattern.into();
        if !pattern.contains('*') && !pattern.contains('?') {
            return Err(ChrysalisError::query(format!(
                "wildcard pattern '{pattern}' contains no wildcard characters"
            )));
        }
        let compiled = Self::compile_pattern(&pattern)?;
        let regex = Regex::new(&compiled)
            .map_err(|e| ChrysalisError::query(format!("invalid wildcard pattern: {e}")))?;
        Ok(WildcardQuery {
            field: field.into(),
            pattern,
            regex,
            boost: 1.0,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
        })
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Set the expansion cap.
    pub fn with_max_expansions(mut self, max: usize) -> Self {
        self.max_expansions = max.max(1);
        self
    }

    /// The field searched.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The original glob pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether a term matches the pattern.
    pub fn matches(&self, term: &str) -> bool {
        self.regex.is_match(term)
    }

    /// Translate the glob into an anchored regex.
    fn compile_pattern(pattern: &str) -> Result<String> {
        let mut regex = String::with_capacity(pattern.len() + 8);
        regex.push('^');

        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('*') => regex.push_str("\\*"),
                    Some('?') => regex.push_str("\\?"),
                    Some(other) => {
                        regex.push('\\');
                        regex.push(other);
                    }
                    None => {
                        return Err(ChrysalisError::query(
                            "wildcard pattern ends with a dangling escape",
                        ));
                    }
                },
                '*' => regex.push_str(".*"),
                '?' => regex.push('.'),
                '^' | '$' | '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '|' => {
                    regex.push('\\');
                    regex.push(c);
                }
                c => regex.push(c),
            }
        }

        regex.push('$');
        Ok(regex)
    }

    /// The literal text before the first wildcard, used to bound the
    /// dictionary scan.
    fn literal_prefix(&self) -> &str {
        let end = self
            .pattern
            .find(|c| c == '*' || c == '?' || c == '\\')
            .unwrap_or(self.pattern.len());
        &self.pattern[..end]
    }
}

impl Query for WildcardQuery {
    fn evaluate(&self, ctx: &EvalContext) -> Result<Box<dyn DocIterator>> {
        let scan_prefix = segment::full_term(&self.field, self.literal_prefix());
        let field_prefix_len = self.field.len() + 1;

        let mut expanded = Vec::new();
        let mut truncated = false;
        for full_term in ctx.reader.terms_with_prefix(&scan_prefix)? {
            let term = &full_term[field_prefix_len..];
            if !self.matches(term) {
                continue;
            }
            if expanded.len() >= self.max_expansions {
                truncated = true;
                break;
            }
            expanded.push(full_term);
        }
        if truncated {
            log::warn!(
                "wildcard {} expansion truncated at {} terms",
                self.description(),
                self.max_expansions
            );
        }
        if expanded.is_empty() {
            return Ok(Box::new(EmptyIter));
        }

        // Each matched term keeps its own idf weight; the credit policy
        // decides how per-term scores combine for a document.
        let mut children: Vec<Box<dyn DocIterator>> = Vec::with_capacity(expanded.len());
        for full_term in &expanded {
            let doc_freq = ctx.reader.doc_frequency(full_term)?;
            let weight = ctx.idf(doc_freq) * self.boost;
            children.push(Box::new(TermIter::new(
                ctx.reader.postings(full_term)?,
                weight,
            )));
        }
        let combine = match ctx.wildcard_policy {
            WildcardScorePolicy::Max => ScoreCombine::Max,
            WildcardScorePolicy::Sum => ScoreCombine::Sum,
        };
        Ok(Box::new(UnionIter::new(children, combine, ctx.cancel.clone())?))
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn description(&self) -> String {
        format!("wildcard({}:{})", self.field, self.pattern)
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }
}
