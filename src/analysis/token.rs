//! Token representation.

/// A single token extracted from field text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token text (possibly normalized by filters).
    pub text: String,
    /// 0-based ordinal of this token within its field, monotonic across
    /// frames. Phrase queries rely on this staying monotonic.
    pub position: u32,
    /// Frame sequence number this token belongs to.
    pub frame: u32,
    /// Byte offset of the token start in the original field text.
    pub start: usize,
    /// Byte offset one past the token end in the original field text.
    pub end: usize,
}

impl Token {
    /// Create a token.
    pub fn new<S: Into<String>>(text: S, position: u32, frame: u32, start: usize, end: usize) -> Self {
        Token {
            text: text.into(),
            position,
            frame,
            start,
            end,
        }
    }
}
