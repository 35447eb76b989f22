//! # Error Recovery
//!
//! The default error strategy: detects mismatches, reports them once, and
//! gets the parser back in step with the input.
//!
//! ## Overview
//!
//! The strategy is consulted at three points:
//!
//! - [`DefaultErrorStrategy::sync`] before every decision and at loop-back
//!   states, so stray tokens are dropped before prediction sees them;
//! - [`DefaultErrorStrategy::recover_inline`] when a token match fails:
//!   single-token deletion, then single-token insertion, then an input
//!   mismatch error;
//! - [`DefaultErrorStrategy::report_error`] and
//!   [`DefaultErrorStrategy::recover`] when a rule gives up: the error is
//!   reported and tokens are discarded until something an enclosing rule can
//!   continue with.
//!
//! After reporting, the strategy stays in *recovery mode* until a token is
//! matched, and reports nothing while in it. One error therefore produces one
//! diagnostic, however many rules it unwinds.
//!
//! The strategy works through the [`Recognizer`] trait, which the parser
//! implements over its current state, invocation stack and token stream.

pub mod conjure;

use crate::atn::{Atn, IntervalSet, PredictionContext, StateId, StateKind, analyzer};
use crate::error::{Diagnostic, DiagnosticKind, RecognitionError};
use crate::grammar::Vocabulary;
use crate::lexer::{EOF, Token, TokenStream, quote_escaped};
use crate::parser::RecognizerEvent;
use smallvec::SmallVec;

/// The parser as seen by the error strategy.
pub trait Recognizer {
    fn atn(&self) -> &Atn;

    fn vocabulary(&self) -> &Vocabulary;

    /// Current automaton state.
    fn state(&self) -> StateId;

    /// Invocation stack of the current rule.
    fn context(&self) -> &PredictionContext;

    fn input(&mut self) -> &mut dyn TokenStream;

    /// Consume the current token into the parse tree; `discarded` tokens are
    /// attached as error nodes.
    fn consume(&mut self, discarded: bool);

    fn notify_error(&mut self, diagnostic: Diagnostic);

    fn emit(&mut self, _event: RecognizerEvent) {}
}

/// Deletion, insertion and panic-mode resynchronization, in that order.
///
/// One strategy serves a whole parse; [`DefaultErrorStrategy::reset`] clears
/// it for reuse.
#[derive(Debug, Clone, Default)]
pub struct DefaultErrorStrategy {
    recovering: bool,
    last_error_index: Option<usize>,
    last_error_states: SmallVec<[StateId; 4]>,
}

impl DefaultErrorStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.end_error_condition();
    }

    #[must_use]
    pub const fn in_error_recovery_mode(&self) -> bool {
        self.recovering
    }

    fn begin_error_condition(&mut self, r: &mut dyn Recognizer) {
        self.recovering = true;
        let token = r.input().lt(1);
        r.emit(RecognizerEvent::BeginRecovery { token });
    }

    fn end_error_condition(&mut self) {
        self.recovering = false;
        self.last_error_index = None;
        self.last_error_states.clear();
    }

    /// A token was matched: leave recovery mode.
    pub fn report_match(&mut self, r: &mut dyn Recognizer) {
        if self.recovering {
            r.emit(RecognizerEvent::EndRecovery);
        }
        self.end_error_condition();
    }

    /// Report `e` unless already recovering.
    pub fn report_error(&mut self, r: &mut dyn Recognizer, e: &RecognitionError) {
        if self.recovering {
            return;
        }
        self.begin_error_condition(r);
        let (kind, message) = match e {
            RecognitionError::NoViableAlternative { start, offending, .. } => {
                let input = if start.is_eof() {
                    "<EOF>".to_string()
                } else {
                    r.input().text(stream_index(start), stream_index(offending))
                };
                (
                    DiagnosticKind::NoViableAlternative,
                    format!("no viable alternative at input {}", quote_escaped(&input)),
                )
            }
            RecognitionError::InputMismatch {
                offending,
                state,
                ctx,
            } => {
                let expected = analyzer::expected_tokens(r.atn(), *state, ctx);
                (
                    DiagnosticKind::MismatchedInput,
                    format!(
                        "mismatched input {} expecting {}",
                        offending.error_display(),
                        r.vocabulary().format_set(&expected)
                    ),
                )
            }
            RecognitionError::FailedPredicate { .. } => (DiagnosticKind::FailedPredicate, e.to_string()),
        };
        notify(r, kind, e.offending(), message);
    }

    /// Panic-mode recovery after a reported error: discard tokens until one
    /// that some enclosing rule can continue with.
    ///
    /// If the previous error happened at the same token and in a state
    /// already seen, one token is consumed first so the parser cannot fail at
    /// the same place forever.
    pub fn recover(&mut self, r: &mut dyn Recognizer) {
        let state = r.state();
        if self.last_error_index == Some(r.input().index()) && self.last_error_states.contains(&state) {
            r.consume(true);
        }
        self.last_error_index = Some(r.input().index());
        if !self.last_error_states.contains(&state) {
            self.last_error_states.push(state);
        }
        let follow = analyzer::error_recovery_set(r.atn(), r.context());
        self.consume_until(r, &follow);
    }

    /// Make sure the current token can start what follows the current state.
    ///
    /// At block and loop starts a single extraneous token is deleted, or an
    /// input mismatch is returned. At loop-back states the extraneous tokens
    /// are reported and discarded up to something that can continue the loop
    /// or follow it.
    ///
    /// # Errors
    ///
    /// [`RecognitionError::InputMismatch`] when a block cannot be entered with
    /// the current token.
    pub fn sync(&mut self, r: &mut dyn Recognizer) -> Result<(), RecognitionError> {
        if self.recovering {
            return Ok(());
        }
        let state = r.state();
        let la = r.input().la(1);
        if la == EOF || r.atn().next_tokens(state).contains(la) {
            return Ok(());
        }
        if analyzer::is_expected(r.atn(), state, r.context(), la) {
            return Ok(());
        }
        match r.atn().state(state).map(|s| s.kind) {
            Some(
                StateKind::BlockStart
                | StateKind::StarBlockStart
                | StateKind::PlusBlockStart
                | StateKind::StarLoopEntry { .. },
            ) => {
                if self.single_token_deletion(r).is_some() {
                    return Ok(());
                }
                Err(input_mismatch(r))
            }
            Some(StateKind::StarLoopBack | StateKind::PlusLoopBack) => {
                self.report_unwanted_token(r);
                let mut follow = expected(r);
                follow.add_all(&analyzer::error_recovery_set(r.atn(), r.context()));
                self.consume_until(r, &follow);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Recover from a failed token match without leaving the rule.
    ///
    /// Returns the token that stands for the expected one: the real next
    /// token after deleting an extraneous one, or a conjured token when the
    /// expected one appears to be missing.
    ///
    /// # Errors
    ///
    /// [`RecognitionError::InputMismatch`] when neither heuristic applies.
    pub fn recover_inline(&mut self, r: &mut dyn Recognizer) -> Result<Token, RecognitionError> {
        if let Some(matched) = self.single_token_deletion(r) {
            r.consume(false);
            return Ok(matched);
        }
        if self.single_token_insertion(r) {
            let expected = expected(r);
            let current = r.input().lt(1);
            let previous = r.input().lb(1);
            let token = conjure::conjure(&expected, r.vocabulary(), &current, previous.as_ref());
            r.emit(RecognizerEvent::Conjure {
                token: token.clone(),
            });
            return Ok(token);
        }
        Err(input_mismatch(r))
    }

    /// Delete the current token if the one after it is what was expected.
    fn single_token_deletion(&mut self, r: &mut dyn Recognizer) -> Option<Token> {
        let next = r.input().la(2);
        if !expected(r).contains(next) {
            return None;
        }
        self.report_unwanted_token(r);
        r.consume(true);
        let matched = r.input().lt(1);
        self.report_match(r);
        Some(matched)
    }

    /// Whether the current token could follow the expected one, so that
    /// conjuring the expected token lets the parse continue.
    fn single_token_insertion(&mut self, r: &mut dyn Recognizer) -> bool {
        let current = r.input().la(1);
        let atn = r.atn();
        let Some(next) = atn
            .state(r.state())
            .and_then(|s| s.transition(0))
            .map(|t| t.target())
        else {
            return false;
        };
        if analyzer::look(atn, next, Some(r.context())).contains(current) {
            self.report_missing_token(r);
            return true;
        }
        false
    }

    fn report_unwanted_token(&mut self, r: &mut dyn Recognizer) {
        if self.recovering {
            return;
        }
        self.begin_error_condition(r);
        let token = r.input().lt(1);
        let expecting = expected(r);
        let message = format!(
            "extraneous input {} expecting {}",
            token.error_display(),
            r.vocabulary().format_set(&expecting)
        );
        notify(r, DiagnosticKind::ExtraneousInput, &token, message);
    }

    fn report_missing_token(&mut self, r: &mut dyn Recognizer) {
        if self.recovering {
            return;
        }
        self.begin_error_condition(r);
        let token = r.input().lt(1);
        let expecting = expected(r);
        let message = format!(
            "missing {} at {}",
            r.vocabulary().format_set(&expecting),
            token.error_display()
        );
        notify(r, DiagnosticKind::MissingToken, &token, message);
    }

    fn consume_until(&mut self, r: &mut dyn Recognizer, set: &IntervalSet) {
        let mut skipped = 0;
        loop {
            let t = r.input().la(1);
            if t == EOF || set.contains(t) {
                break;
            }
            r.consume(self.recovering);
            skipped += 1;
        }
        if skipped > 0 {
            r.emit(RecognizerEvent::Resync { skipped });
        }
    }
}

/// Tokens acceptable at the recognizer's current state and stack.
fn expected(r: &dyn Recognizer) -> IntervalSet {
    analyzer::expected_tokens(r.atn(), r.state(), r.context())
}

fn input_mismatch(r: &mut dyn Recognizer) -> RecognitionError {
    RecognitionError::InputMismatch {
        offending: r.input().lt(1),
        state: r.state(),
        ctx: r.context().clone(),
    }
}

fn notify(r: &mut dyn Recognizer, kind: DiagnosticKind, token: &Token, message: String) {
    r.notify_error(Diagnostic::new(kind, token.line, token.column, message).with_token_index(token.index));
}

#[allow(clippy::cast_sign_loss)]
fn stream_index(token: &Token) -> usize {
    token.index.max(0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Expr, Grammar};
    use crate::lexer::{BufferedTokenStream, TokenType, VecTokenSource};

    /// Parks a recognizer on one state of a single-rule grammar.
    struct Fixture {
        grammar: Grammar,
        state: StateId,
        ctx: PredictionContext,
        input: BufferedTokenStream<VecTokenSource>,
        consumed: Vec<(Token, bool)>,
        diagnostics: Vec<String>,
    }

    impl Fixture {
        fn new(grammar: Grammar, state: StateId, types: &[TokenType]) -> Self {
            #[allow(clippy::cast_possible_wrap)]
            let tokens = types
                .iter()
                .enumerate()
                .map(|(i, &t)| {
                    let text = grammar.vocabulary().display_name(t).trim_matches('\'').to_string();
                    Token::new(t, text, i as isize, i as isize, 1, i)
                })
                .collect();
            Self {
                grammar,
                state,
                ctx: PredictionContext::empty(),
                input: BufferedTokenStream::new(VecTokenSource::new(tokens)),
                consumed: Vec::new(),
                diagnostics: Vec::new(),
            }
        }
    }

    impl Recognizer for Fixture {
        fn atn(&self) -> &Atn {
            self.grammar.atn()
        }
        fn vocabulary(&self) -> &Vocabulary {
            self.grammar.vocabulary()
        }
        fn state(&self) -> StateId {
            self.state
        }
        fn context(&self) -> &PredictionContext {
            &self.ctx
        }
        fn input(&mut self) -> &mut dyn TokenStream {
            &mut self.input
        }
        fn consume(&mut self, discarded: bool) {
            let t = self.input.lt(1);
            self.consumed.push((t, discarded));
            self.input.consume();
        }
        fn notify_error(&mut self, diagnostic: Diagnostic) {
            self.diagnostics.push(diagnostic.to_string());
        }
    }

    /// a : 'a' 'b' 'c' ;  parked at the state matching 'b'.
    fn abc(types: &[TokenType]) -> Fixture {
        let g = Grammar::builder("T")
            .rule("a", Expr::seq([Expr::lit("a"), Expr::lit("b"), Expr::lit("c")]))
            .build()
            .unwrap();
        let b = g.vocabulary().type_of_literal("b").unwrap();
        let state = g
            .atn()
            .states()
            .iter()
            .position(|s| matches!(s.transition(0), Some(crate::atn::Transition::Atom { token, .. }) if *token == b))
            .unwrap();
        Fixture::new(g, state, types)
    }

    #[test]
    fn test_deletion_consumes_extraneous_token() {
        // "a" already matched; input is 'c' 'b'
        let mut f = abc(&[3, 2]);
        let mut s = DefaultErrorStrategy::new();
        let tok = s.recover_inline(&mut f).unwrap();
        assert_eq!(tok.token_type, 2);
        assert_eq!(f.diagnostics, vec!["line 1:0 extraneous input 'c' expecting 'b'"]);
        assert_eq!(f.consumed.len(), 2);
        assert!(f.consumed[0].1);
        assert!(!f.consumed[1].1);
        assert!(!s.in_error_recovery_mode());
    }

    #[test]
    fn test_insertion_conjures_without_consuming() {
        let mut f = abc(&[3]);
        let mut s = DefaultErrorStrategy::new();
        let tok = s.recover_inline(&mut f).unwrap();
        assert!(tok.is_missing());
        assert_eq!(tok.text, "<missing 'b'>");
        assert!(f.consumed.is_empty());
        assert_eq!(f.input.index(), 0);
        assert_eq!(f.diagnostics, vec!["line 1:0 missing 'b' at 'c'"]);
        assert!(s.in_error_recovery_mode());
    }

    #[test]
    fn test_mismatch_when_no_heuristic_applies() {
        let mut f = abc(&[1, 1]);
        let mut s = DefaultErrorStrategy::new();
        let err = s.recover_inline(&mut f).unwrap_err();
        assert!(matches!(err, RecognitionError::InputMismatch { .. }));
        s.report_error(&mut f, &err);
        assert_eq!(f.diagnostics, vec!["line 1:0 mismatched input 'a' expecting 'b'"]);
    }

    #[test]
    fn test_reports_suppressed_while_recovering() {
        let mut f = abc(&[1, 1]);
        let mut s = DefaultErrorStrategy::new();
        let err = s.recover_inline(&mut f).unwrap_err();
        s.report_error(&mut f, &err);
        s.report_error(&mut f, &err);
        assert_eq!(f.diagnostics.len(), 1);
        s.report_match(&mut f);
        s.report_error(&mut f, &err);
        assert_eq!(f.diagnostics.len(), 2);
    }

    #[test]
    fn test_recover_discards_to_eof_at_outermost_rule() {
        let mut f = abc(&[1, 1, 1]);
        let mut s = DefaultErrorStrategy::new();
        let err = s.recover_inline(&mut f).unwrap_err();
        s.report_error(&mut f, &err);
        s.recover(&mut f);
        assert_eq!(f.input.la(1), EOF);
        assert!(f.consumed.iter().all(|(_, discarded)| *discarded));
    }

    #[test]
    fn test_recover_forces_progress_on_repeat_failure() {
        let mut f = abc(&[2]);
        let mut s = DefaultErrorStrategy::new();
        // previous error at the same token and state
        s.last_error_index = Some(0);
        s.last_error_states.push(f.state);
        s.recovering = true;
        s.recover(&mut f);
        assert_eq!(f.consumed.len(), 1);
    }
}
