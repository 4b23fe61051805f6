//! Boundary tokenization: paragraph, sentence and frame detection.
//!
//! A frame is a fixed-size window of consecutive sentences and is the unit of
//! qualitative context. Boundaries are detected in a single pass over the
//! text and represented as a tagged-span overlay — an ordered list of
//! `(offset, kind)` tags aligned to the original text — rather than by
//! inserting marker bytes into the text, so no marker-collision hazard
//! exists. The sentence detector runs exactly once over the whole input;
//! frame grouping is O(sentence count); nothing re-scans the full text more
//! than a constant number of times.

use std::fmt::Debug;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ChrysalisError, Result};

/// A half-open `[start, end)` byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a span.
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span is zero-length.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Pluggable sentence boundary detection.
///
/// Given text, return ordered, disjoint `[start, end)` spans that partition
/// the input. A span includes any trailing whitespace up to the start of the
/// next sentence, so concatenating the spans reproduces the text exactly.
pub trait SentenceDetector: Send + Sync + Debug {
    /// Detect sentence spans in `text`.
    fn detect(&self, text: &str) -> Vec<Span>;
}

lazy_static! {
    // Sentence-ending punctuation run, optional closing quotes/brackets,
    // then the whitespace separating it from the next sentence.
    static ref SENTENCE_BREAK: Regex = Regex::new(
        "[.!?\u{2024}\u{FE52}\u{FF0E}]+[\"'\\)\\]\u{201D}\u{2019}]*\\s+"
    )
    .unwrap();
}

/// Words that end with a period without ending a sentence.
const ABBREVIATIONS: &[&str] = &["Mr", "Mrs", "Ms", "Dr", "Prof", "St", "No", "vs", "etc"];

/// Default regex-based sentence detector.
///
/// Splits after runs of sentence-ending punctuation followed by whitespace,
/// with a bounded lookback that suppresses breaks after initials ("J.") and
/// a short list of common abbreviations. Swap in a smarter detector through
/// [`BoundaryTokenizer::with_detector`] when this is too naive.
#[derive(Debug, Default)]
pub struct RegexSentenceDetector;

impl RegexSentenceDetector {
    /// Whether the word immediately before the punctuation at `punct_start`
    /// suppresses the sentence break.
    fn is_abbreviation(text: &str, punct_start: usize) -> bool {
        let head = &text[..punct_start];
        let word_start = head
            .rfind(|c: char| c.is_whitespace())
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &head[word_start..];
        if word.len() == 1 && word.chars().all(|c| c.is_uppercase()) {
            return true; // an initial, like the "J" in "J. Smith"
        }
        ABBREVIATIONS.contains(&word)
    }
}

impl SentenceDetector for RegexSentenceDetector {
    fn detect(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();
        let mut last = 0;
        for m in SENTENCE_BREAK.find_iter(text) {
            if Self::is_abbreviation(text, m.start()) {
                continue;
            }
            if m.end() > last {
                spans.push(Span::new(last, m.end()));
                last = m.end();
            }
        }
        if last < text.len() {
            spans.push(Span::new(last, text.len()));
        }
        spans
    }
}

/// A frame: an ordered window of up to N consecutive sentences, never
/// spanning a paragraph boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 0-based frame sequence number within the field.
    pub seq: u32,
    /// The raw byte span of this frame in the source text.
    pub span: Span,
}

impl Frame {
    /// The raw text slice of this frame, whitespace included.
    ///
    /// Concatenating the raw slices of all frames reproduces the source
    /// text exactly.
    pub fn raw<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start..self.span.end]
    }

    /// The trimmed text of this frame, as presented in search results.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.raw(source).trim()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoundaryKind {
    Sentence,
    Paragraph,
}

/// Detects paragraph, sentence and frame boundaries in one pass.
#[derive(Debug, Clone)]
pub struct BoundaryTokenizer {
    frame_size: usize,
    paragraph_break: Regex,
    detector: Arc<dyn SentenceDetector>,
}

impl Default for BoundaryTokenizer {
    fn default() -> Self {
        BoundaryTokenizer::new(2)
    }
}

impl BoundaryTokenizer {
    /// Create a tokenizer producing frames of `frame_size` sentences.
    ///
    /// A `frame_size` of 0 disables framing: the whole text becomes a single
    /// frame.
    pub fn new(frame_size: usize) -> Self {
        Self::with_min_blank_run(frame_size, 2)
    }

    /// Create a tokenizer with a custom minimal newline run length for
    /// paragraph breaks (default 2, i.e. one blank line).
    pub fn with_min_blank_run(frame_size: usize, min_newlines: usize) -> Self {
        let pattern = format!("(?:\\r?\\n[ \\t]*){{{},}}", min_newlines.max(1));
        BoundaryTokenizer {
            frame_size,
            // The pattern is built from a validated integer only.
            paragraph_break: Regex::new(&pattern).expect("paragraph pattern"),
            detector: Arc::new(RegexSentenceDetector),
        }
    }

    /// Replace the sentence boundary detector.
    pub fn with_detector(mut self, detector: Arc<dyn SentenceDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// The configured frame size in sentences.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Split `text` into frames.
    ///
    /// A frame is cut after every `frame_size` sentences, or at a paragraph
    /// break, whichever comes first; a final partial frame is still emitted.
    /// Zero-length sentence spans are skipped, not emitted as degenerate
    /// frames.
    pub fn frames(&self, text: &str) -> Result<Vec<Frame>> {
        if text.contains('\0') {
            return Err(ChrysalisError::malformed_input(
                "text contains an interior NUL byte",
            ));
        }
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        if self.frame_size == 0 {
            return Ok(vec![Frame {
                seq: 0,
                span: Span::new(0, text.len()),
            }]);
        }

        // One detector pass over the whole input, then one linear scan for
        // paragraph breaks. Both produce offset-sorted tag lists.
        let sentence_ends: Vec<usize> = self
            .detector
            .detect(text)
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.end)
            .collect();
        let paragraph_ends: Vec<usize> = self
            .paragraph_break
            .find_iter(text)
            .map(|m| m.end())
            .collect();

        let tags = merge_tags(&sentence_ends, &paragraph_ends);

        // Frame grouping is a single walk over the tags.
        let mut frames = Vec::new();
        let mut frame_start = 0;
        let mut sentences_in_frame = 0;
        let cut = |frames: &mut Vec<Frame>, frame_start: &mut usize, offset: usize| {
            if offset > *frame_start {
                frames.push(Frame {
                    seq: frames.len() as u32,
                    span: Span::new(*frame_start, offset),
                });
                *frame_start = offset;
            }
        };

        for (offset, kind) in tags {
            match kind {
                BoundaryKind::Paragraph => {
                    // A frame never straddles a paragraph boundary.
                    cut(&mut frames, &mut frame_start, offset);
                    sentences_in_frame = 0;
                }
                BoundaryKind::Sentence => {
                    sentences_in_frame += 1;
                    if sentences_in_frame >= self.frame_size {
                        cut(&mut frames, &mut frame_start, offset);
                        sentences_in_frame = 0;
                    }
                }
            }
        }
        // Final partial frame.
        cut(&mut frames, &mut frame_start, text.len());

        Ok(frames)
    }
}

/// Merge two sorted offset lists into one ordered tag list.
///
/// When a sentence end and a paragraph end coincide the paragraph tag wins,
/// so the cut happens exactly once.
fn merge_tags(sentences: &[usize], paragraphs: &[usize]) -> Vec<(usize, BoundaryKind)> {
    let mut tags = Vec::with_capacity(sentences.len() + paragraphs.len());
    let (mut i, mut j) = (0, 0);
    while i < sentences.len() && j < paragraphs.len() {
        if sentences[i] < paragraphs[j] {
            tags.push((sentences[i], BoundaryKind::Sentence));
            i += 1;
        } else if paragraphs[j] < sentences[i] {
            tags.push((paragraphs[j], BoundaryKind::Paragraph));
            j += 1;
        } else {
            tags.push((paragraphs[j], BoundaryKind::Paragraph));
            i += 1;
            j += 1;
        }
    }
    tags.extend(sentences[i..].iter().map(|&o| (o, BoundaryKind::Sentence)));
    tags.extend(paragraphs[j..].iter().map(|&o| (o, BoundaryKind::Paragraph)));
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_sentence_frames() {
        let tokenizer = BoundaryTokenizer::new(2);
        let text = "The cat sat. The dog ran. Birds fly high in the sky.";
        let frames = tokenizer.frames(text).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].text(text), "The cat sat. The dog ran.");
        assert_eq!(frames[1].text(text), "Birds fly high in the sky.");
    }

    #[test]
    fn test_frame_round_trip() {
        let tokenizer = BoundaryTokenizer::new(2);
        let text = "One sentence here. Another one. A third.\n\nNew paragraph. More text follows here.";
        let frames = tokenizer.frames(text).unwrap();

        let rejoined: String = frames.iter().map(|f| f.raw(text)).collect();
        assert_eq!(rejoined, text);
    }

    #[test]
    fn test_frames_never_cross_paragraphs() {
        let tokenizer = BoundaryTokenizer::new(3);
        let text = "First sentence.\n\nSecond paragraph sentence. Another sentence here.";
        let frames = tokenizer.frames(text).unwrap();

        // The first paragraph has only one sentence; the frame is cut at the
        // paragraph break even though the frame size is 3.
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].text(text), "First sentence.");
        assert!(frames[1].text(text).starts_with("Second paragraph"));
    }

    #[test]
    fn test_final_partial_frame() {
        let tokenizer = BoundaryTokenizer::new(2);
        let text = "One. Two. Three.";
        let frames = tokenizer.frames(text).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].text(text), "One. Two.");
        assert_eq!(frames[1].text(text), "Three.");
    }

    #[test]
    fn test_frame_size_zero_yields_one_frame() {
        let tokenizer = BoundaryTokenizer::new(0);
        let text = "One. Two. Three. Four. Five.";
        let frames = tokenizer.frames(text).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].text(text), text);
    }

    #[test]
    fn test_abbreviations_do_not_break_sentences() {
        let tokenizer = BoundaryTokenizer::new(1);
        let text = "Mr. Smith met J. Jones today. They spoke at length.";
        let frames = tokenizer.frames(text).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].text(text), "Mr. Smith met J. Jones today.");
    }

    #[test]
    fn test_empty_and_blank_text() {
        let tokenizer = BoundaryTokenizer::new(2);
        assert!(tokenizer.frames("").unwrap().is_empty());
        assert!(tokenizer.frames("   \n\n  ").unwrap().is_empty());
    }

    #[test]
    fn test_nul_byte_rejected() {
        let tokenizer = BoundaryTokenizer::new(2);
        let err = tokenizer.frames("bad\0text").unwrap_err();
        assert!(matches!(err, ChrysalisError::MalformedInput(_)));
    }

    #[test]
    fn test_paragraph_without_sentence_punctuation() {
        let tokenizer = BoundaryTokenizer::new(2);
        let text = "A Title\n\nBody sentence one. Body sentence two.";
        let frames = tokenizer.frames(text).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].text(text), "A Title");
        assert_eq!(frames[1].text(text), "Body sentence one. Body sentence two.");
    }
}
