//! Word-level tokenization.

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::token::Token;

lazy_static! {
    // Alternation order matters: emails and numbers contain word characters
    // and must win before the plain word branch sees them.
    static ref WORD_PATTERN: Regex = Regex::new(
        r"(?x)
        \w[\w.+-]*@[\w-]+(?:\.[\w-]+)+     # email address
        | [$\u{20AC}\u{00A3}]?\d+(?:[,.]\d+)*%?  # number, money, percentage
        | \w+(?:['\u{2019}]\w+)+           # contraction (don't, it's)
        | [\#@]?\w+(?:-\w+)*               # word, hashtag, mention, hyphenated
        "
    )
    .unwrap();
}

/// Regex-driven word tokenizer.
///
/// Recognizes emails, numbers (with currency and percent sigils),
/// contractions, hyphenated words, hashtags and mentions as single tokens.
/// Punctuation and whitespace between tokens is dropped.
#[derive(Debug, Clone, Default)]
pub struct WordTokenizer;

impl WordTokenizer {
    /// Create a word tokenizer.
    pub fn new() -> Self {
        WordTokenizer
    }

    /// Tokenize `text`, yielding tokens with byte offsets relative to the
    /// start of `text` plus `base_offset`. `frame` is stamped on every token;
    /// positions start at 0 and are renumbered by the analyzer when frames
    /// are chained.
    pub fn token_stream<'a>(
        &self,
        text: &'a str,
        base_offset: usize,
        frame: u32,
    ) -> Box<dyn Iterator<Item = Token> + 'a> {
        Box::new(WORD_PATTERN.find_iter(text).enumerate().map(move |(i, m)| {
            Token::new(
                m.as_str(),
                i as u32,
                frame,
                base_offset + m.start(),
                base_offset + m.end(),
            )
        }))
    }
}
