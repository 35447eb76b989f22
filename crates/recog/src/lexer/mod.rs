//! # Lexer Module
//!
//! Tokens, lexer rules and the token stream the parser reads from.
//!
//! ## Overview
//!
//! - [`Token`]: typed, positioned piece of input (or a conjured one)
//! - [`Pattern`] / [`CharSet`]: what a lexer rule matches
//! - [`Lexer`]: maximal-munch tokenizer over a [`LexerSpec`]
//! - [`BufferedTokenStream`]: lazily filled cursor with look-ahead and rewind
//!
//! ## Matching
//!
//! At each position every rule is tried and the longest match wins; on a tie
//! the rule defined first wins. Rules marked `skip` produce nothing, rules
//! marked `hidden` produce tokens on [`Channel::Hidden`].
//!
//! When no rule matches, the lexer queues a [`LexerError`] whose text is the
//! input from the token start up to the furthest position any rule reached,
//! plus the character that stopped it. That text is skipped and lexing resumes
//! after it.
//!
//! ```rust
//! use recog::lexer::{Lexer, LexerRule, LexerSpec, Pattern, TokenSource};
//!
//! let spec = LexerSpec::new(vec![
//!     LexerRule::token("A", 1, Pattern::literal("a")),
//!     LexerRule::skip("WS", 2, Pattern::literal(" ")),
//! ]);
//! let mut lexer = Lexer::new(spec.into(), "a c a");
//! assert_eq!(lexer.next_token().to_string(), "[@-1,0:0='a',<1>,1:0]");
//! assert_eq!(lexer.next_token().text, "a");
//! assert_eq!(lexer.take_errors()[0].to_string(), "token recognition error at: 'c'");
//! ```

pub mod pattern;
pub mod stream;
pub mod token;

pub use pattern::{CharSet, Pattern};
pub use stream::{BufferedTokenStream, StreamMark, TokenSource, TokenStream, VecTokenSource};
pub use token::{
    Channel, EOF, EPSILON, MIN_USER_TOKEN_TYPE, Token, TokenType, escape_whitespace, quote_escaped,
};

use crate::error::LexerError;
use compact_str::CompactString;
use std::sync::Arc;

/// What happens to a match of a lexer rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexerRuleKind {
    #[default]
    Emit,
    /// `-> skip`
    Skip,
    /// `-> channel(HIDDEN)`
    Hidden,
}

/// One lexer rule with its fragments already inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerRule {
    pub name: CompactString,
    pub token_type: TokenType,
    pub pattern: Pattern,
    pub kind: LexerRuleKind,
}

impl LexerRule {
    #[must_use]
    pub fn token(name: &str, token_type: TokenType, pattern: Pattern) -> Self {
        Self {
            name: CompactString::new(name),
            token_type,
            pattern,
            kind: LexerRuleKind::Emit,
        }
    }

    #[must_use]
    pub fn skip(name: &str, token_type: TokenType, pattern: Pattern) -> Self {
        Self {
            kind: LexerRuleKind::Skip,
            ..Self::token(name, token_type, pattern)
        }
    }

    #[must_use]
    pub fn hidden(name: &str, token_type: TokenType, pattern: Pattern) -> Self {
        Self {
            kind: LexerRuleKind::Hidden,
            ..Self::token(name, token_type, pattern)
        }
    }
}

/// Ordered lexer rules; earlier rules win ties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexerSpec {
    rules: Vec<LexerRule>,
}

impl LexerSpec {
    #[must_use]
    pub const fn new(rules: Vec<LexerRule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &[LexerRule] {
        &self.rules
    }
}

/// Maximal-munch tokenizer.
///
/// Tokens are produced on demand; errors are queued and drained with
/// [`TokenSource::take_errors`].
#[derive(Debug, Clone)]
pub struct Lexer {
    spec: Arc<LexerSpec>,
    input: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    errors: Vec<LexerError>,
}

impl Lexer {
    #[must_use]
    pub fn new(spec: Arc<LexerSpec>, input: &str) -> Self {
        Self {
            spec,
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 0,
            errors: Vec::new(),
        }
    }

    /// Lex the whole input, returning the tokens (ending in EOF) and the errors.
    #[must_use]
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexerError>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let done = tok.is_eof();
            tokens.push(tok);
            if done {
                break;
            }
        }
        (tokens, self.errors)
    }

    /// Longest match at the current position: (rule, length), else the
    /// furthest position reached by any rule.
    fn best_match(&self) -> Result<(&LexerRule, usize), usize> {
        let mut furthest = self.pos;
        let mut best: Option<(&LexerRule, usize)> = None;
        for rule in &self.spec.rules {
            if let Some(len) = rule.pattern.longest_match(&self.input, self.pos, &mut furthest)
                && best.is_none_or(|(_, b)| len > b)
            {
                best = Some((rule, len));
            }
        }
        best.ok_or(furthest)
    }

    fn advance(&mut self, len: usize) -> CompactString {
        let end = (self.pos + len).min(self.input.len());
        let text: CompactString = self.input[self.pos..end].iter().collect();
        for &c in &self.input[self.pos..end] {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        self.pos = end;
        text
    }

    #[allow(clippy::cast_possible_wrap)]
    fn offset(&self) -> isize {
        self.pos as isize
    }
}

impl TokenSource for Lexer {
    fn next_token(&mut self) -> Token {
        loop {
            if self.pos >= self.input.len() {
                return Token::eof(self.offset(), self.line, self.column);
            }
            let (start, line, column) = (self.offset(), self.line, self.column);
            match self.best_match() {
                Ok((rule, len)) => {
                    let (token_type, kind) = (rule.token_type, rule.kind);
                    let text = self.advance(len);
                    let stop = self.offset() - 1;
                    match kind {
                        LexerRuleKind::Skip => {}
                        LexerRuleKind::Emit => {
                            return Token::new(token_type, text, start, stop, line, column);
                        }
                        LexerRuleKind::Hidden => {
                            return Token::new(token_type, text, start, stop, line, column)
                                .with_channel(Channel::Hidden);
                        }
                    }
                }
                Err(furthest) => {
                    // The char that stopped the furthest path is part of the error.
                    let len = (furthest - self.pos + 1).min(self.input.len() - self.pos);
                    let offset = self.pos;
                    let text = self.advance(len);
                    self.errors.push(LexerError::new(text, offset, line, column));
                }
            }
        }
    }

    fn take_errors(&mut self) -> Vec<LexerError> {
        std::mem::take(&mut self.errors)
    }
}
