//! # Recog
//!
//! Adaptive LL(*) parsing with ANTLR-style error recovery, driven by an
//! interpreter over a grammar's transition network.
//!
//! ## Overview
//!
//! - **Grammars** are built in code ([`grammar::GrammarBuilder`]), including
//!   lexer rules, imports and directly left-recursive rules
//! - **Prediction** ([`prediction`]) simulates every alternative of a decision
//!   over the real input, with as much look-ahead as the decision needs
//! - **Recovery** ([`recovery`]) deletes a stray token, conjures a missing
//!   one, or resynchronizes with what an enclosing rule can continue with
//! - **Diagnostics** ([`error`]) are `line L:C message` lines collected in
//!   order, lexer errors included
//!
//! ## Quick Start
//!
//! ```rust
//! use recog::grammar::{Expr, Grammar};
//!
//! let grammar = Grammar::builder("Demo")
//!     .rule("a", Expr::seq([Expr::lit("a"), Expr::lit("b"), Expr::lit("c")]))
//!     .build()
//!     .unwrap();
//!
//! let result = grammar.parser("ac").parse("a").unwrap();
//! assert_eq!(result.diagnostic_lines(), vec!["line 1:1 missing 'b' at 'c'"]);
//!
//! // The conjured 'b' is in the tree as an error leaf.
//! let tree = result.tree.unwrap();
//! assert_eq!(tree.to_string_tree(), "(a a <missing 'b'> c)");
//! ```
//!
//! ## Feature Flags
//!
//! - `diagnostics`: [`miette`](https://docs.rs/miette) integration for every
//!   error type and [`error::Diagnostic`]
//! - `parallel`: [`parser::parallel::parse_batch`] over a rayon pool

pub mod atn;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod prediction;
pub mod recovery;
pub mod testing;
pub mod tree;

pub use error::{
    AtnError, Diagnostic, DiagnosticKind, ErrorListener, GrammarError, LexerError, ParseMetrics, ParseResult,
    RecognitionError,
};
pub use grammar::{Expr, Grammar, GrammarBuilder, Vocabulary};
pub use lexer::{Token, TokenType};
pub use parser::{ActionContext, NoHooks, Parser, ParserConfig, SemanticHooks};
pub use tree::ParseTree;
