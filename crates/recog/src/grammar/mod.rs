//! # Grammar Module
//!
//! Grammar definition and compilation into a shared, immutable [`Grammar`].
//!
//! ## Overview
//!
//! - [`Expr`]: parser rule expressions
//! - [`GrammarBuilder`]: rules, lexer rules, `tokens {}` and imports
//! - [`Vocabulary`]: token types with their symbolic and literal names
//!
//! Building a grammar merges imported grammars, assigns token types, rewrites
//! direct left recursion into precedence loops and lowers every rule into the
//! transition network ([`crate::atn::Atn`]).
//!
//! ## Example
//!
//! ```rust
//! use recog::grammar::{Expr, Grammar};
//!
//! let grammar = Grammar::builder("T")
//!     .rule("a", Expr::seq([Expr::lit("a"), Expr::lit("b")]))
//!     .build()
//!     .unwrap();
//! let result = grammar.parser("aa").parse("a").unwrap();
//! assert_eq!(
//!     result.diagnostic_lines(),
//!     vec!["line 1:1 mismatched input 'a' expecting 'b'"]
//! );
//! ```

mod builder;
mod compile;
pub mod expr;
mod left_recursion;
pub mod vocabulary;

pub use builder::GrammarBuilder;
pub use expr::Expr;
pub use vocabulary::Vocabulary;

use crate::atn::Atn;
use crate::error::LexerError;
use crate::lexer::{Lexer, LexerSpec, Token, TokenSource, VecTokenSource};
use crate::parser::Parser;
use compact_str::CompactString;
use std::sync::Arc;

/// A compiled grammar.
///
/// Cloning is cheap: the network, vocabulary and lexer rules are shared, and
/// any number of parses (on any threads) can use them at once.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) name: CompactString,
    pub(crate) atn: Arc<Atn>,
    pub(crate) vocabulary: Arc<Vocabulary>,
    pub(crate) lexer: Arc<LexerSpec>,
}

impl Grammar {
    #[must_use]
    pub fn builder(name: &str) -> GrammarBuilder {
        GrammarBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn atn(&self) -> &Arc<Atn> {
        &self.atn
    }

    #[must_use]
    pub fn vocabulary(&self) -> &Arc<Vocabulary> {
        &self.vocabulary
    }

    #[must_use]
    pub fn lexer_spec(&self) -> &LexerSpec {
        &self.lexer
    }

    /// A lexer over `input` using this grammar's lexer rules.
    #[must_use]
    pub fn lexer(&self, input: &str) -> Lexer {
        Lexer::new(Arc::clone(&self.lexer), input)
    }

    /// Lex all of `input`, numbering the tokens by stream position.
    #[must_use]
    pub fn tokenize(&self, input: &str) -> (Vec<Token>, Vec<LexerError>) {
        let mut lexer = self.lexer(input);
        let mut tokens = Vec::new();
        loop {
            #[allow(clippy::cast_possible_wrap)]
            let tok = lexer.next_token().with_index(tokens.len() as isize);
            let done = tok.is_eof();
            tokens.push(tok);
            if done {
                break;
            }
        }
        (tokens, lexer.take_errors())
    }

    /// A parser reading `input` through this grammar's lexer.
    #[must_use]
    pub fn parser(&self, input: &str) -> Parser<Lexer> {
        Parser::new(self.clone(), self.lexer(input))
    }

    /// A parser over tokens produced by some other lexer.
    #[must_use]
    pub fn parser_from_tokens(&self, tokens: Vec<Token>) -> Parser<VecTokenSource> {
        Parser::new(self.clone(), VecTokenSource::new(tokens))
    }
}
