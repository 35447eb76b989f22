//! # Error Types
//!
//! Errors, diagnostics and parse results.
//!
//! ## Overview
//!
//! Failures fall into two very different classes:
//!
//! - **Recoverable input errors** ([`RecognitionError`], [`LexerError`]): the
//!   input does not match the grammar. These never escape a parse. They are
//!   turned into [`Diagnostic`] lines and the parse continues.
//! - **Defects** ([`GrammarError`], [`AtnError`]): the grammar or the compiled
//!   network is malformed. These stop processing and are returned as `Err`.
//!
//! ## Diagnostic format
//!
//! Every diagnostic renders as one line, `line <L>:<C> <message>`, with a
//! 1-based line and 0-based column:
//!
//! ```text
//! line 1:1 mismatched input 'a' expecting 'b'
//! line 1:1 extraneous input 'a' expecting {'b', 'c'}
//! line 1:1 missing 'b' at 'c'
//! line 1:1 no viable alternative at input 'ae'
//! line 1:3 token recognition error at: 'c'
//! ```
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors integrate with [`miette`]
//! for rich error reporting.

pub mod diagnostics;

pub use diagnostics::{
    ConsoleErrorListener, Diagnostic, DiagnosticCollector, DiagnosticKind, ErrorListener,
};

use crate::atn::{PredictionContext, StateId};
use crate::lexer::Token;
use crate::tree::{BuilderError, ParseTree};
use compact_str::CompactString;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic as MietteDiagnostic;

/// Grammar definition problems found while building a [`crate::grammar::Grammar`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(MietteDiagnostic))]
pub enum GrammarError {
    #[error("grammar `{grammar}` defines no parser rules")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::no_rules)))]
    NoRules { grammar: CompactString },

    #[error("rule `{rule}` is defined twice in grammar `{grammar}`")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::duplicate_rule)))]
    DuplicateRule {
        rule: CompactString,
        grammar: CompactString,
    },

    #[error("reference to undefined rule `{rule}` from `{referenced_from}`")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::undefined_rule)))]
    UndefinedRule {
        rule: CompactString,
        referenced_from: CompactString,
    },

    #[error("reference to undefined token `{name}` from rule `{rule}`")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::undefined_token)))]
    UndefinedToken {
        name: CompactString,
        rule: CompactString,
    },

    #[error("reference to undefined lexer fragment `{name}`")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::undefined_fragment)))]
    UndefinedFragment { name: CompactString },

    #[error("lexer rule `{name}` can match the empty string")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::empty_token)))]
    EmptyToken { name: CompactString },

    #[error("rule `{rule}` has an empty set of alternatives")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::empty_choice)))]
    EmptyChoice { rule: CompactString },

    #[error("rules {} are mutually left-recursive", .rules.join(", "))]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(grammar::indirect_left_recursion),
            help("only direct left recursion (`e : e '+' e | ...`) is rewritten")
        )
    )]
    IndirectLeftRecursion { rules: Vec<String> },

    #[error("left-recursive rule `{rule}` has no non-recursive alternative")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::no_primary)))]
    NoPrimaryAlternative { rule: CompactString },

    #[error("alternative {alt} of rule `{rule}` is only a reference to the rule itself")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::empty_recursive_alternative)))]
    EmptyRecursiveAlternative { rule: CompactString, alt: usize },

    #[error("lexer fragment `{name}` refers to itself")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::recursive_fragment)))]
    RecursiveFragment { name: CompactString },

    #[error("rule `{rule}` contains a closure whose body can match the empty string")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::empty_closure)))]
    EmptyClosure { rule: CompactString },

    #[error("label `{label}` in rule `{rule}` must be on a single token or token set")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::invalid_label)))]
    InvalidLabel {
        label: CompactString,
        rule: CompactString,
    },

    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(transparent))]
    Atn(#[from] AtnError),
}

/// Malformed transition network, detected at build time or while parsing.
///
/// This is the only error a parse can return.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(MietteDiagnostic))]
pub enum AtnError {
    #[error("decision state {state} has no alternatives")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::empty_decision)))]
    EmptyDecision { state: StateId },

    #[error("state {state} has no outgoing transitions")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::dead_end)))]
    DeadEnd { state: StateId },

    #[error("state {state} does not exist")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::missing_state)))]
    MissingState { state: StateId },

    #[error("transition from state {from} targets missing state {target}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::dangling_target)))]
    DanglingTarget { from: StateId, target: StateId },

    #[error("rule transition from state {from} does not target its rule's start state")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::bad_rule_target)))]
    BadRuleTarget { from: StateId },

    #[error("unknown start rule `{0}`")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::unknown_rule)))]
    UnknownRule(CompactString),

    #[error("rule `{rule}` re-entered at token {index} without consuming input")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::recursion_cycle)))]
    RecursionCycle { rule: CompactString, index: usize },

    #[error("parse tree construction failed: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::tree)))]
    Tree(#[from] BuilderError),
}

/// A recoverable mismatch between input and grammar.
///
/// Carries what the error strategy needs to describe it: the offending token,
/// the state the parser was in and the invocation stack at that point.
#[derive(Debug, Clone, Error)]
pub enum RecognitionError {
    #[error("mismatched input {}", .offending.error_display())]
    InputMismatch {
        offending: Token,
        state: StateId,
        ctx: PredictionContext,
    },

    #[error("no viable alternative at input {}", .offending.error_display())]
    NoViableAlternative {
        /// First token of the failed decision.
        start: Token,
        offending: Token,
        state: StateId,
        ctx: PredictionContext,
    },

    #[error("rule {rule} failed predicate: {{{predicate}}}?")]
    FailedPredicate {
        offending: Token,
        rule: CompactString,
        predicate: CompactString,
        state: StateId,
        ctx: PredictionContext,
    },
}

impl RecognitionError {
    #[must_use]
    pub const fn offending(&self) -> &Token {
        match self {
            Self::InputMismatch { offending, .. }
            | Self::NoViableAlternative { offending, .. }
            | Self::FailedPredicate { offending, .. } => offending,
        }
    }

    #[must_use]
    pub const fn state(&self) -> StateId {
        match self {
            Self::InputMismatch { state, .. }
            | Self::NoViableAlternative { state, .. }
            | Self::FailedPredicate { state, .. } => *state,
        }
    }
}

/// Input the token source could not match with any lexer rule.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[cfg_attr(feature = "diagnostics", derive(MietteDiagnostic))]
#[error("token recognition error at: {}", crate::lexer::quote_escaped(.text))]
#[cfg_attr(feature = "diagnostics", diagnostic(code(lexer::token_recognition)))]
pub struct LexerError {
    /// Skipped text: the partially matched prefix plus the failing character.
    pub text: CompactString,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl LexerError {
    #[must_use]
    pub const fn new(text: CompactString, offset: usize, line: usize, column: usize) -> Self {
        Self {
            text,
            offset,
            line,
            column,
        }
    }
}

/// Counters collected over one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseMetrics {
    /// Tokens consumed by the parser, including ones deleted by recovery.
    pub tokens_consumed: usize,
    /// Prediction runs.
    pub decisions: usize,
    /// Deepest look-ahead any prediction needed.
    pub max_lookahead: usize,
    /// Decisions resolved by picking the lowest of several viable alternatives.
    pub ambiguities: usize,
    /// Syntax errors reported, including ones past the recording limit.
    pub errors_recovered: usize,
    pub parse_time: std::time::Duration,
}

impl ParseMetrics {
    /// Accumulate another parse's counters (used for batch totals).
    pub fn merge(&mut self, other: &Self) {
        self.tokens_consumed += other.tokens_consumed;
        self.decisions += other.decisions;
        self.max_lookahead = self.max_lookahead.max(other.max_lookahead);
        self.ambiguities += other.ambiguities;
        self.errors_recovered += other.errors_recovered;
        self.parse_time += other.parse_time;
    }
}

/// Outcome of a parse: always a tree (possibly partial), plus the ordered
/// diagnostic log.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// `None` only when tree building was disabled.
    pub tree: Option<ParseTree>,
    /// Syntax and token recognition errors in the order they were reported.
    pub diagnostics: Vec<Diagnostic>,
    pub metrics: ParseMetrics,
}

impl ParseResult {
    /// No diagnostics were produced.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Diagnostics rendered one per line, as an error listener would print them.
    #[must_use]
    pub fn diagnostic_lines(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}
