//! Text analysis pipeline.
//!
//! Analysis turns raw field text into a stream of normalized, position-tagged
//! terms in three stages:
//!
//! ```text
//! Text → Boundary Tokenizer → Word Tokenizer → Token Filters → Terms
//! ```
//!
//! The boundary tokenizer finds paragraph, sentence and frame boundaries in
//! one pass over the text. The word tokenizer runs once per frame. Filters
//! (case folding, stopword removal, compound-term merging) are each
//! independently toggleable and never reorder the stream.

pub mod analyzer;
pub mod boundary;
pub mod token;
pub mod tokenizer;

pub use analyzer::{AnalyzedText, Analyzer, AnalyzerConfig};
pub use boundary::{BoundaryTokenizer, Frame, RegexSentenceDetector, SentenceDetector, Span};
pub use token::Token;
pub use tokenizer::WordTokenizer;
