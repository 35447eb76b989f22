use compact_str::CompactString;
use std::fmt;

/// Integer token type as assigned by the grammar vocabulary.
///
/// User-defined types start at [`MIN_USER_TOKEN_TYPE`]; [`EOF`] is reserved.
pub type TokenType = i32;

/// End-of-input token type.
pub const EOF: TokenType = -1;

/// Marker used in look-ahead sets for "the end of the current rule was reached".
///
/// It never appears on a real token.
pub const EPSILON: TokenType = -2;

/// First token type available to grammar-defined tokens.
pub const MIN_USER_TOKEN_TYPE: TokenType = 1;

/// Token channel.
///
/// The parser only sees tokens on [`Channel::Default`]; hidden tokens stay in
/// the buffer and contribute to rule text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    #[default]
    Default,
    Hidden,
}

/// A token produced by a token source or conjured during recovery.
///
/// Offsets and the stream index are signed so that conjured tokens can carry
/// `-1` for "no backing input".
///
/// # Examples
///
/// ```rust
/// use recog::lexer::Token;
///
/// let tok = Token::new(2, "b", 3, 3, 1, 3).with_index(3);
/// assert_eq!(tok.to_string(), "[@3,3:3='b',<2>,1:3]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token type from the vocabulary.
    pub token_type: TokenType,
    /// Matched text (`<EOF>` for the end-of-input token).
    pub text: CompactString,
    /// Channel the token was emitted on.
    pub channel: Channel,
    /// First char offset, inclusive.
    pub start: isize,
    /// Last char offset, inclusive.
    pub stop: isize,
    /// 1-based line.
    pub line: usize,
    /// 0-based column.
    pub column: usize,
    /// Position in the token stream, `-1` until buffered or when conjured.
    pub index: isize,
}

impl Token {
    /// Create a default-channel token with an unassigned stream index.
    #[must_use]
    pub fn new(
        token_type: TokenType,
        text: impl Into<CompactString>,
        start: isize,
        stop: isize,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            token_type,
            text: text.into(),
            channel: Channel::Default,
            start,
            stop,
            line,
            column,
            index: -1,
        }
    }

    /// The end-of-input token, positioned just past the last character.
    #[must_use]
    pub fn eof(offset: isize, line: usize, column: usize) -> Self {
        Self::new(EOF, "<EOF>", offset, offset - 1, line, column)
    }

    /// Set the stream index.
    #[must_use]
    pub const fn with_index(mut self, index: isize) -> Self {
        self.index = index;
        self
    }

    /// Set the channel.
    #[must_use]
    pub const fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.token_type == EOF
    }

    /// Whether the token was conjured by recovery rather than read from input.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        self.index < 0 && self.start < 0
    }

    /// Quoted form used in diagnostics: `'text'` with whitespace escapes.
    #[must_use]
    pub fn error_display(&self) -> String {
        quote_escaped(&self.text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[@{},{}:{}='{}',<{}>",
            self.index,
            self.start,
            self.stop,
            escape_whitespace(&self.text),
            self.token_type
        )?;
        if self.channel == Channel::Hidden {
            f.write_str(",channel=1")?;
        }
        write!(f, ",{}:{}]", self.line, self.column)
    }
}

/// Replace newline, carriage return and tab with their escaped spelling.
#[must_use]
pub fn escape_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// [`escape_whitespace`] wrapped in single quotes.
#[must_use]
pub fn quote_escaped(text: &str) -> String {
    format!("'{}'", escape_whitespace(text))
}
