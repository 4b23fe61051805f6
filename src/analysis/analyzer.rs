//! Analyzer: frames, word tokens and token filters, composed.

use ahash::AHashSet;
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use lazy_static::lazy_static;

use crate::analysis::boundary::{BoundaryTokenizer, Frame};
use crate::analysis::token::Token;
use crate::analysis::tokenizer::WordTokenizer;
use crate::error::{ChrysalisError, Result};

lazy_static! {
    /// Default English stopword set.
    pub static ref ENGLISH_STOPWORDS: AHashSet<&'static str> = [
        "a", "about", "above", "after", "again", "all", "am", "an", "and",
        "any", "are", "as", "at", "be", "because", "been", "before", "being",
        "below", "between", "both", "but", "by", "can", "did", "do", "does",
        "doing", "down", "during", "each", "few", "for", "from", "further",
        "had", "has", "have", "having", "he", "her", "here", "hers", "him",
        "his", "how", "i", "if", "in", "into", "is", "it", "its", "just",
        "me", "more", "most", "my", "no", "nor", "not", "now", "of", "off",
        "on", "once", "only", "or", "other", "our", "out", "over", "own",
        "same", "she", "so", "some", "such", "than", "that", "the", "their",
        "them", "then", "there", "these", "they", "this", "those", "through",
        "to", "too", "under", "until", "up", "very", "was", "we", "were",
        "what", "when", "where", "which", "while", "who", "whom", "why",
        "will", "with", "you", "your",
    ]
    .into_iter()
    .collect();
}

/// Analyzer configuration. Every filter stage toggles independently.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Sentences per frame. 0 means the whole field is one frame.
    pub frame_size: usize,
    /// Lowercase every token.
    pub lowercase: bool,
    /// Lowercase only the first token of each frame. Normalizes
    /// sentence-case while leaving proper nouns elsewhere intact. Ignored
    /// when `lowercase` is set.
    pub lowercase_frame_initial: bool,
    /// Remove stopwords.
    pub remove_stopwords: bool,
    /// Extra stopwords beyond the built-in English set.
    pub extra_stopwords: Vec<String>,
    /// Remove tokens shorter than this many characters, unless they carry a
    /// sigil (#, @, $) or are numeric.
    pub min_word_size: usize,
    /// Multi-word phrases merged into single compound terms, e.g.
    /// "climate change".
    pub compounds: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            frame_size: 2,
            lowercase: false,
            lowercase_frame_initial: true,
            remove_stopwords: true,
            extra_stopwords: Vec::new(),
            min_word_size: 3,
            compounds: Vec::new(),
        }
    }
}

impl AnalyzerConfig {
    /// Sentences per frame.
    pub fn with_frame_size(mut self, frame_size: usize) -> Self {
        self.frame_size = frame_size;
        self
    }

    /// Lowercase every token.
    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    /// Toggle stopword removal.
    pub fn with_stopwords(mut self, remove: bool) -> Self {
        self.remove_stopwords = remove;
        self
    }

    /// Add stopwords beyond the built-in set.
    pub fn with_extra_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_stopwords = words.into_iter().map(Into::into).collect();
        self
    }

    /// Minimum token length kept by the stop filter.
    pub fn with_min_word_size(mut self, size: usize) -> Self {
        self.min_word_size = size;
        self
    }

    /// Phrases merged into compound terms.
    pub fn with_compounds<I, S>(mut self, compounds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compounds = compounds.into_iter().map(Into::into).collect();
        self
    }
}

/// The result of analyzing one text field.
#[derive(Debug, Clone)]
pub struct AnalyzedText {
    /// Frames partitioning the source text.
    pub frames: Vec<Frame>,
    /// Filtered tokens with monotonic field-wide positions. Filtering leaves
    /// position gaps; it never renumbers or reorders.
    pub tokens: Vec<Token>,
}

/// Full analysis pipeline: boundary tokenizer, word tokenizer, filters.
#[derive(Debug)]
pub struct Analyzer {
    config: AnalyzerConfig,
    boundary: BoundaryTokenizer,
    words: WordTokenizer,
    stopwords: AHashSet<String>,
    compounds: Option<AhoCorasick>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Analyzer::new(AnalyzerConfig::default())
    }
}

impl Analyzer {
    /// Build an analyzer from its configuration.
    pub fn new(config: AnalyzerConfig) -> Self {
        let mut stopwords: AHashSet<String> = if config.remove_stopwords {
            ENGLISH_STOPWORDS.iter().map(|s| s.to_string()).collect()
        } else {
            AHashSet::new()
        };
        for word in &config.extra_stopwords {
            stopwords.insert(word.to_lowercase());
        }

        let compounds = if config.compounds.is_empty() {
            None
        } else {
            let patterns: Vec<String> = config
                .compounds
                .iter()
                .map(|c| c.to_lowercase())
                .collect();
            // Leftmost-longest so "new york city" beats "new york".
            match AhoCorasickBuilder::new()
                .match_kind(MatchKind::LeftmostLongest)
                .ascii_case_insensitive(true)
                .build(&patterns)
            {
                Ok(automaton) => Some(automaton),
                Err(e) => {
                    log::warn!("compound automaton build failed, merging disabled: {e}");
                    None
                }
            }
        };

        Analyzer {
            boundary: BoundaryTokenizer::new(config.frame_size),
            words: WordTokenizer::new(),
            stopwords,
            compounds,
            config,
        }
    }

    /// The configuration this analyzer was built from.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze one text field: frames plus the filtered token stream.
    pub fn analyze(&self, text: &str) -> Result<AnalyzedText> {
        let frames = self.boundary.frames(text)?;

        let mut tokens = Vec::new();
        let mut position = 0u32;
        for frame in &frames {
            let raw = frame.raw(text);
            let mut first_in_frame = true;
            for mut token in self.words.token_stream(raw, frame.span.start, frame.seq) {
                token.position = position;
                position += 1;
                if self.config.lowercase {
                    token.text = token.text.to_lowercase();
                } else if self.config.lowercase_frame_initial && first_in_frame {
                    token.text = token.text.to_lowercase();
                }
                first_in_frame = false;
                if self.keep(&token) {
                    tokens.push(token);
                }
            }
        }

        let tokens = self.merge_compounds(tokens)?;
        Ok(AnalyzedText { frames, tokens })
    }

    /// Stop filter: drop stopwords and too-short tokens. Sigiled and numeric
    /// tokens always survive the length check.
    fn keep(&self, token: &Token) -> bool {
        let text = token.text.as_str();
        if self.config.remove_stopwords && self.stopwords.contains(&text.to_lowercase()) {
            return false;
        }
        if text.chars().count() < self.config.min_word_size {
            let sigiled = text.starts_with('#') || text.starts_with('@') || text.starts_with('$');
            let numeric = text.chars().next().is_some_and(|c| c.is_ascii_digit());
            if !sigiled && !numeric {
                return false;
            }
        }
        true
    }

    /// Merge configured multi-word phrases into single compound tokens.
    ///
    /// Only runs of tokens at strictly consecutive positions within one
    /// frame are merged, so a phrase interrupted by a removed stopword or a
    /// frame boundary stays unmerged. The compound takes the first token's
    /// position and start offset and the last token's end offset.
    fn merge_compounds(&self, tokens: Vec<Token>) -> Result<Vec<Token>> {
        let Some(ref automaton) = self.compounds else {
            return Ok(tokens);
        };
        if tokens.is_empty() {
            return Ok(tokens);
        }

        // Join token texts with single spaces, tracking each token's byte
        // range in the joined string so matches map back to token runs.
        let mut joined = String::new();
        let mut ranges = Vec::with_capacity(tokens.len());
        for token in &tokens {
            if !joined.is_empty() {
                joined.push(' ');
            }
            let start = joined.len();
            joined.push_str(&token.text);
            ranges.push((start, joined.len()));
        }

        let mut merged = Vec::with_capacity(tokens.len());
        let mut next = 0usize;
        for m in automaton.find_iter(&joined) {
            // A compound must cover whole tokens.
            let Some(first) = ranges[next..].iter().position(|r| r.0 == m.start()) else {
                continue;
            };
            let first = next + first;
            let Some(last) = ranges[first..].iter().position(|r| r.1 == m.end()) else {
                continue;
            };
            let last = first + last;

            let run = &tokens[first..=last];
            let consecutive = run.windows(2).all(|w| {
                w[1].position == w[0].position + 1 && w[1].frame == w[0].frame
            });
            if !consecutive {
                continue;
            }

            merged.extend_from_slice(&tokens[next..first]);
            let text = if self.config.lowercase {
                joined[m.start()..m.end()].to_string()
            } else {
                run.iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            merged.push(Token::new(
                text,
                run[0].position,
                run[0].frame,
                run[0].start,
                run[run.len() - 1].end,
            ));
            next = last + 1;
        }
        merged.extend_from_slice(&tokens[next..]);
        Ok(merged)
    }
}
