//! Buffered token cursor with look-ahead and rewind.

use super::{Channel, EOF, Token, TokenType};
use crate::error::LexerError;

/// Producer of tokens, pulled one at a time.
///
/// After the input is exhausted every call returns an EOF token.
pub trait TokenSource {
    fn next_token(&mut self) -> Token;

    /// Recognition errors produced since the last call, oldest first.
    fn take_errors(&mut self) -> Vec<LexerError> {
        Vec::new()
    }
}

/// Source over tokens produced elsewhere (an external lexer).
///
/// Tokens after the first EOF are ignored; if the list has no EOF one is
/// synthesized after the last token.
#[derive(Debug, Clone)]
pub struct VecTokenSource {
    tokens: std::vec::IntoIter<Token>,
    last: Option<Token>,
}

impl VecTokenSource {
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
            last: None,
        }
    }

    fn synthesized_eof(&self) -> Token {
        match &self.last {
            Some(t) if t.is_eof() => t.clone(),
            Some(t) => {
                let width = t.text.chars().count();
                Token::eof(t.stop + 1, t.line, t.column + width)
            }
            None => Token::eof(0, 1, 0),
        }
    }
}

impl TokenSource for VecTokenSource {
    fn next_token(&mut self) -> Token {
        if self.last.as_ref().is_some_and(Token::is_eof) {
            return self.synthesized_eof();
        }
        match self.tokens.next() {
            Some(t) => {
                self.last = Some(t.clone());
                t
            }
            None => {
                let eof = self.synthesized_eof();
                self.last = Some(eof.clone());
                eof
            }
        }
    }
}

/// Position saved by [`TokenStream::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamMark {
    pub index: usize,
}

/// Cursor over the default-channel tokens of a source.
///
/// Look-ahead is 1-based: `la(1)` is the current token. Off-channel tokens are
/// skipped by look-ahead but remain visible to [`TokenStream::text`].
pub trait TokenStream {
    /// Type of the `k`-th token ahead (`k >= 1`).
    fn la(&mut self, k: usize) -> TokenType;

    /// The `k`-th token ahead (`k >= 1`); EOF once the input is exhausted.
    fn lt(&mut self, k: usize) -> Token;

    /// The `k`-th default-channel token behind the cursor (`k >= 1`).
    fn lb(&mut self, k: usize) -> Option<Token>;

    /// Advance past the current token. Consuming EOF does nothing.
    fn consume(&mut self);

    /// Buffer index of the current token.
    fn index(&mut self) -> usize;

    /// Move the cursor to buffer index `index` (or the next on-channel token).
    fn seek(&mut self, index: usize);

    fn mark(&mut self) -> StreamMark;

    fn release(&mut self, mark: StreamMark);

    /// Text of buffered tokens `start..=stop`, all channels, stopping at EOF.
    fn text(&mut self, start: usize, stop: usize) -> String;

    /// Token recognition errors the source produced since the last call.
    fn take_source_errors(&mut self) -> Vec<LexerError>;
}

/// Lazily filled token buffer over a [`TokenSource`].
///
/// Tokens are pulled only when look-ahead reaches them, so source errors
/// surface in the order the parser reaches the input that caused them.
///
/// # Examples
///
/// ```rust
/// use recog::lexer::{BufferedTokenStream, Token, TokenStream, VecTokenSource, EOF};
///
/// let tokens = vec![
///     Token::new(1, "a", 0, 0, 1, 0),
///     Token::new(2, "b", 1, 1, 1, 1),
/// ];
/// let mut stream = BufferedTokenStream::new(VecTokenSource::new(tokens));
/// assert_eq!(stream.la(1), 1);
/// assert_eq!(stream.la(2), 2);
/// let mark = stream.mark();
/// stream.consume();
/// stream.consume();
/// assert_eq!(stream.la(1), EOF);
/// stream.seek(mark.index);
/// stream.release(mark);
/// assert_eq!(stream.lt(1).text, "a");
/// ```
#[derive(Debug)]
pub struct BufferedTokenStream<S: TokenSource> {
    source: S,
    tokens: Vec<Token>,
    p: usize,
    initialized: bool,
    fetched_eof: bool,
    open_marks: usize,
}

impl<S: TokenSource> BufferedTokenStream<S> {
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            p: 0,
            initialized: false,
            fetched_eof: false,
            open_marks: 0,
        }
    }

    /// Every token buffered so far, all channels.
    #[must_use]
    pub fn buffered(&self) -> &[Token] {
        &self.tokens
    }

    /// Pull tokens until `i` is buffered or EOF was reached; true if `i` exists.
    fn sync(&mut self, i: usize) -> bool {
        while self.tokens.len() <= i && !self.fetched_eof {
            #[allow(clippy::cast_possible_wrap)]
            let index = self.tokens.len() as isize;
            let tok = self.source.next_token().with_index(index);
            self.fetched_eof = tok.is_eof();
            self.tokens.push(tok);
        }
        i < self.tokens.len()
    }

    /// First default-channel (or EOF) token at or after `i`.
    fn next_on_channel(&mut self, mut i: usize) -> usize {
        loop {
            if !self.sync(i) {
                return self.tokens.len().saturating_sub(1);
            }
            let tok = &self.tokens[i];
            if tok.channel == Channel::Default || tok.is_eof() {
                return i;
            }
            i += 1;
        }
    }

    fn setup(&mut self) {
        if !self.initialized {
            self.initialized = true;
            self.p = self.next_on_channel(0);
        }
    }

    fn ahead_index(&mut self, k: usize) -> usize {
        self.setup();
        let mut i = self.p;
        for _ in 1..k {
            if self.tokens.get(i).is_some_and(Token::is_eof) {
                break;
            }
            i = self.next_on_channel(i + 1);
        }
        i
    }
}

impl<S: TokenSource> TokenStream for BufferedTokenStream<S> {
    fn la(&mut self, k: usize) -> TokenType {
        let i = self.ahead_index(k.max(1));
        self.tokens.get(i).map_or(EOF, |t| t.token_type)
    }

    fn lt(&mut self, k: usize) -> Token {
        let i = self.ahead_index(k.max(1));
        self.tokens
            .get(i)
            .cloned()
            .unwrap_or_else(|| Token::eof(0, 1, 0))
    }

    fn lb(&mut self, k: usize) -> Option<Token> {
        self.setup();
        let mut i = self.p;
        let mut n = 0;
        while i > 0 {
            i -= 1;
            if self.tokens[i].channel == Channel::Default {
                n += 1;
                if n == k {
                    return Some(self.tokens[i].clone());
                }
            }
        }
        None
    }

    fn consume(&mut self) {
        self.setup();
        if self.tokens.get(self.p).is_some_and(Token::is_eof) {
            return;
        }
        self.p = self.next_on_channel(self.p + 1);
    }

    fn index(&mut self) -> usize {
        self.setup();
        self.p
    }

    fn seek(&mut self, index: usize) {
        self.initialized = true;
        self.p = self.next_on_channel(index);
    }

    fn mark(&mut self) -> StreamMark {
        self.open_marks += 1;
        StreamMark {
            index: self.index(),
        }
    }

    fn release(&mut self, _mark: StreamMark) {
        self.open_marks = self.open_marks.saturating_sub(1);
    }

    fn text(&mut self, start: usize, stop: usize) -> String {
        self.sync(stop);
        let mut out = String::new();
        for tok in self.tokens.iter().skip(start).take(stop.saturating_sub(start) + 1) {
            if tok.is_eof() {
                break;
            }
            out.push_str(&tok.text);
        }
        out
    }

    fn take_source_errors(&mut self) -> Vec<LexerError> {
        self.source.take_errors()
    }
}
