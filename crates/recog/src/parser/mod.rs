//! # Parser
//!
//! A generic interpreter that walks a grammar's transition network over a
//! token stream, asking the prediction engine at every decision and the error
//! strategy whenever the input does not fit.
//!
//! ## Overview
//!
//! - [`Parser`]: owns the token stream; one parse per start rule
//! - [`SemanticHooks`]: embedded actions and semantic predicates
//! - [`ParserConfig`]: tree building and diagnostic limits
//! - [`RecognizerEvent`]: optional trace of what the parser did
//!
//! A parse never fails because of its input. Syntax errors become
//! diagnostics in the [`ParseResult`] and the tree is returned anyway, with
//! error nodes for discarded and conjured tokens. Only a malformed network
//! ends a parse early, as an [`AtnError`].
//!
//! ## Example
//!
//! ```rust
//! use recog::grammar::{Expr, Grammar};
//! use recog::lexer::{CharSet, Pattern};
//!
//! let grammar = Grammar::builder("T")
//!     .rule("start", Expr::plus(Expr::token("ID")))
//!     .token("ID", Pattern::class(CharSet::new(vec![('a', 'z')])).plus())
//!     .build()
//!     .unwrap();
//! let result = grammar.parser("").parse("start").unwrap();
//! assert_eq!(result.diagnostic_lines(), vec!["line 1:0 missing ID at '<EOF>'"]);
//! ```

mod config;
mod context;
mod events;
#[cfg(feature = "parallel")]
pub mod parallel;

pub use config::ParserConfig;
pub use context::{ActionContext, NoHooks, SemanticHooks};
pub use events::{EventCollector, EventHandler, NullEventHandler, RecognizerEvent};

use crate::atn::{Atn, PredictionContext, RuleIndex, StateId, StateKind, Transition, analyzer};
use crate::error::{
    AtnError, Diagnostic, DiagnosticKind, ErrorListener, ParseMetrics, ParseResult, RecognitionError,
};
use crate::grammar::{Grammar, Vocabulary};
use crate::lexer::{BufferedTokenStream, Token, TokenSource, TokenStream, TokenType};
use crate::prediction::{PredictionEngine, PredictionError};
use crate::recovery::{DefaultErrorStrategy, Recognizer};
use crate::tree::{BuilderError, TreeBuilder};
use compact_str::CompactString;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::Instant;

/// Interpreting parser over a token source.
pub struct Parser<S: TokenSource> {
    grammar: Grammar,
    engine: PredictionEngine,
    input: BufferedTokenStream<S>,
    config: ParserConfig,
    listeners: Vec<Box<dyn ErrorListener>>,
}

impl<S: TokenSource> Parser<S> {
    #[must_use]
    pub fn new(grammar: Grammar, source: S) -> Self {
        let engine = PredictionEngine::new(Arc::clone(grammar.atn()));
        Self {
            grammar,
            engine,
            input: BufferedTokenStream::new(source),
            config: ParserConfig::default(),
            listeners: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ParserConfig {
        &self.config
    }

    #[must_use]
    pub const fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Forward every recorded diagnostic to `listener` as well.
    pub fn add_error_listener(&mut self, listener: Box<dyn ErrorListener>) {
        self.listeners.push(listener);
    }

    pub fn remove_error_listeners(&mut self) {
        self.listeners.clear();
    }

    /// Tokens pulled from the source so far, all channels.
    #[must_use]
    pub fn buffered_tokens(&self) -> &[Token] {
        self.input.buffered()
    }

    /// Parse from rule `start`.
    ///
    /// # Errors
    ///
    /// [`AtnError::UnknownRule`] if `start` is not a rule; any other
    /// [`AtnError`] if the network turns out to be malformed.
    pub fn parse(&mut self, start: &str) -> Result<ParseResult, AtnError> {
        self.parse_with(start, &mut NoHooks)
    }

    /// Parse from rule `start`, running actions and predicates through `hooks`.
    ///
    /// # Errors
    ///
    /// As for [`Parser::parse`].
    pub fn parse_with(&mut self, start: &str, hooks: &mut dyn SemanticHooks) -> Result<ParseResult, AtnError> {
        self.parse_traced(start, hooks, &mut NullEventHandler)
    }

    /// Parse from rule `start`, reporting every step to `events`.
    ///
    /// # Errors
    ///
    /// As for [`Parser::parse`].
    pub fn parse_traced(
        &mut self,
        start: &str,
        hooks: &mut dyn SemanticHooks,
        events: &mut dyn EventHandler,
    ) -> Result<ParseResult, AtnError> {
        let began = Instant::now();
        let rule = self
            .grammar
            .atn()
            .rule_index(start)
            .ok_or_else(|| AtnError::UnknownRule(CompactString::new(start)))?;

        let mut run = Run {
            atn: self.grammar.atn().as_ref(),
            vocabulary: self.grammar.vocabulary().as_ref(),
            engine: &self.engine,
            input: &mut self.input,
            listeners: &mut self.listeners,
            events,
            max_errors: self.config.max_errors,
            tree: self.config.build_parse_tree.then(TreeBuilder::new),
            state: 0,
            ctx: PredictionContext::empty(),
            frames: Vec::new(),
            diagnostics: Vec::new(),
            metrics: ParseMetrics::default(),
            defect: None,
        };
        let mut strategy = DefaultErrorStrategy::new();
        run.run(rule, &mut strategy, hooks)?;
        run.flush_source_errors();

        let tree = run.tree.take().map(TreeBuilder::finish).transpose()?;
        let mut metrics = run.metrics;
        metrics.parse_time = began.elapsed();
        Ok(ParseResult {
            tree,
            diagnostics: run.diagnostics,
            metrics,
        })
    }
}

/// One active rule invocation.
#[derive(Debug)]
struct Frame {
    rule: RuleIndex,
    /// Caller state to continue at on return.
    follow: StateId,
    precedence: i32,
    /// Stream index of the first token of the invocation.
    start_index: usize,
    labels: SmallVec<[(CompactString, Token); 2]>,
    last_token: Option<Token>,
    error: bool,
}

/// Why visiting a state stopped.
enum Failure {
    Recognition(RecognitionError),
    Defect(AtnError),
}

impl From<RecognitionError> for Failure {
    fn from(e: RecognitionError) -> Self {
        Self::Recognition(e)
    }
}

impl From<AtnError> for Failure {
    fn from(e: AtnError) -> Self {
        Self::Defect(e)
    }
}

impl From<BuilderError> for Failure {
    fn from(e: BuilderError) -> Self {
        Self::Defect(e.into())
    }
}

/// State of one parse.
struct Run<'p> {
    atn: &'p Atn,
    vocabulary: &'p Vocabulary,
    engine: &'p PredictionEngine,
    input: &'p mut dyn TokenStream,
    listeners: &'p mut [Box<dyn ErrorListener>],
    events: &'p mut dyn EventHandler,
    max_errors: usize,
    tree: Option<TreeBuilder>,
    state: StateId,
    /// Return states of the callers of the current rule.
    ctx: PredictionContext,
    frames: Vec<Frame>,
    diagnostics: Vec<Diagnostic>,
    metrics: ParseMetrics,
    /// Tree failure raised where it cannot be returned directly.
    defect: Option<AtnError>,
}

impl Run<'_> {
    fn run(
        &mut self,
        start: RuleIndex,
        strategy: &mut DefaultErrorStrategy,
        hooks: &mut dyn SemanticHooks,
    ) -> Result<(), AtnError> {
        let stop = self
            .atn
            .rule(start)
            .ok_or_else(|| AtnError::UnknownRule(CompactString::new(self.atn.rule_name(start))))?
            .stop;
        self.enter_rule(start, stop, 0);

        loop {
            if let Some(defect) = self.defect.take() {
                return Err(defect);
            }
            if self.atn.try_state(self.state)?.kind == StateKind::RuleStop {
                let outermost = self.frames.len() <= 1;
                self.exit_rule()?;
                if outermost {
                    return Ok(());
                }
                continue;
            }
            match self.visit_state(strategy, hooks) {
                Ok(()) => {}
                Err(Failure::Defect(e)) => return Err(e),
                Err(Failure::Recognition(e)) => {
                    if let Some(frame) = self.frames.last_mut() {
                        frame.error = true;
                        if let Some(rule) = self.atn.rule(frame.rule) {
                            self.state = rule.stop;
                        }
                    }
                    if let Some(tree) = &mut self.tree {
                        tree.mark_error();
                    }
                    strategy.report_error(self, &e);
                    strategy.recover(self);
                }
            }
        }
    }

    fn precedence(&self) -> i32 {
        self.frames.last().map_or(0, |f| f.precedence)
    }

    fn enter_rule(&mut self, rule: RuleIndex, follow: StateId, precedence: i32) {
        let atn = self.atn;
        let index = self.input.index();
        let name = atn.rule_name(rule);
        self.frames.push(Frame {
            rule,
            follow,
            precedence,
            start_index: index,
            labels: SmallVec::new(),
            last_token: None,
            error: false,
        });
        if let Some(tree) = &mut self.tree {
            tree.start_rule(name);
        }
        self.events.handle(&RecognizerEvent::EnterRule {
            rule: CompactString::new(name),
            index,
        });
        if let Some(info) = atn.rule(rule) {
            self.state = info.start;
        }
    }

    /// Close the current invocation and continue in the caller.
    fn exit_rule(&mut self) -> Result<(), AtnError> {
        let Some(frame) = self.frames.pop() else {
            return Ok(());
        };
        if let Some(tree) = &mut self.tree {
            tree.finish_rule()?;
        }
        self.events.handle(&RecognizerEvent::ExitRule {
            rule: CompactString::new(self.atn.rule_name(frame.rule)),
            error: frame.error,
        });
        if !self.frames.is_empty() {
            self.ctx = self.ctx.pop().map(|(_, _, parent)| parent).unwrap_or_default();
            self.state = frame.follow;
        }
        Ok(())
    }

    fn visit_state(
        &mut self,
        strategy: &mut DefaultErrorStrategy,
        hooks: &mut dyn SemanticHooks,
    ) -> Result<(), Failure> {
        let atn = self.atn;
        let id = self.state;
        let p = atn.try_state(id)?;

        let mut alt = 1;
        if p.transitions.len() > 1 {
            strategy.sync(self)?;
            alt = self.predict(id, hooks)?;
        } else if matches!(p.kind, StateKind::StarLoopBack | StateKind::PlusBlockStart) {
            strategy.sync(self)?;
        }

        let t = p
            .transition(alt - 1)
            .ok_or(AtnError::EmptyDecision { state: id })?;
        match t {
            Transition::Epsilon { target } => {
                let exits_loop = atn.state(*target).is_some_and(|s| s.kind == StateKind::LoopEnd);
                if p.kind == (StateKind::StarLoopEntry { precedence: true }) && !exits_loop {
                    self.push_recursion_level()?;
                }
            }
            Transition::Atom { token, .. } => {
                let matched = self.match_token(*token, strategy)?;
                self.bind_label(p.label.as_deref(), matched);
            }
            Transition::Set { .. } | Transition::Wildcard { .. } => {
                let current = self.input.lt(1);
                let matched = if t.matches(current.token_type, atn.max_token_type()) {
                    strategy.report_match(self);
                    self.consume(false);
                    current
                } else {
                    self.recover_inline(strategy)?
                };
                self.bind_label(p.label.as_deref(), matched);
            }
            Transition::Rule {
                rule,
                follow,
                precedence,
                ..
            } => {
                let index = self.input.index();
                if self
                    .frames
                    .iter()
                    .any(|f| f.rule == *rule && f.start_index == index && f.precedence == *precedence)
                {
                    return Err(AtnError::RecursionCycle {
                        rule: CompactString::new(atn.rule_name(*rule)),
                        index,
                    }
                    .into());
                }
                self.ctx = self.ctx.push(*follow, self.precedence());
                self.enter_rule(*rule, *follow, *precedence);
                return Ok(());
            }
            Transition::Predicate { rule, index, .. } => {
                let text = atn.predicate_text(*index);
                if !hooks.predicate(atn.rule_name(*rule), text) {
                    return Err(self.failed_predicate(*rule, text).into());
                }
            }
            Transition::Precedence { precedence, .. } => {
                if *precedence < self.precedence() {
                    let text = format!("precpred(_ctx, {precedence})");
                    return Err(self.failed_predicate(p.rule, &text).into());
                }
            }
            Transition::Action { index, .. } => self.run_action(atn.action_text(*index), hooks),
        }
        self.state = t.target();
        Ok(())
    }

    /// Adaptive prediction at decision state `id`.
    ///
    /// A loop whose every alternative fails on the very first token is exited
    /// instead, leaving the error to whatever follows the loop.
    fn predict(&mut self, id: StateId, hooks: &mut dyn SemanticHooks) -> Result<usize, Failure> {
        let atn = self.atn;
        let engine = self.engine;
        let ctx = self.ctx.clone();
        let precedence = self.precedence();
        let decision = atn.state(id).and_then(|s| s.decision).unwrap_or_default();
        self.metrics.decisions += 1;

        match engine.adaptive_predict(&mut *self.input, id, &ctx, precedence, hooks) {
            Ok(prediction) => {
                self.metrics.max_lookahead = self.metrics.max_lookahead.max(prediction.lookahead);
                if prediction.is_ambiguous() {
                    self.metrics.ambiguities += 1;
                    self.events.handle(&RecognizerEvent::AmbiguityResolved {
                        decision,
                        alts: prediction.conflicting.to_vec(),
                        chosen: prediction.alt,
                    });
                }
                self.events.handle(&RecognizerEvent::Predict {
                    decision,
                    alt: prediction.alt,
                    lookahead: prediction.lookahead,
                });
                if self.is_rule_block(id)
                    && let Some(tree) = &mut self.tree
                {
                    tree.set_alt(prediction.alt);
                }
                Ok(prediction.alt)
            }
            Err(PredictionError::Atn(e)) => Err(e.into()),
            Err(PredictionError::NoViableAlternative(e)) => {
                let first_token = matches!(
                    &e,
                    RecognitionError::NoViableAlternative { start, offending, .. } if start.index == offending.index
                );
                match loop_exit(atn, id) {
                    Some(exit) if first_token => Ok(exit),
                    _ => Err(e.into()),
                }
            }
        }
    }

    /// Whether `id` is the block holding the alternatives of its rule.
    fn is_rule_block(&self, id: StateId) -> bool {
        let atn = self.atn;
        atn.state(id)
            .and_then(|s| atn.rule(s.rule))
            .and_then(|r| atn.state(r.start))
            .and_then(|s| s.transition(0))
            .is_some_and(|t| t.target() == id)
    }

    fn match_token(&mut self, ttype: TokenType, strategy: &mut DefaultErrorStrategy) -> Result<Token, Failure> {
        let current = self.input.lt(1);
        if current.token_type == ttype {
            strategy.report_match(self);
            self.consume(false);
            return Ok(current);
        }
        self.recover_inline(strategy)
    }

    fn recover_inline(&mut self, strategy: &mut DefaultErrorStrategy) -> Result<Token, Failure> {
        let token = strategy.recover_inline(self)?;
        if token.is_missing() {
            if let Some(tree) = &mut self.tree {
                tree.error_token(token.clone())?;
            }
            if let Some(frame) = self.frames.last_mut() {
                frame.last_token = Some(token.clone());
            }
        }
        Ok(token)
    }

    fn bind_label(&mut self, label: Option<&str>, token: Token) {
        let (Some(label), Some(frame)) = (label, self.frames.last_mut()) else {
            return;
        };
        match frame.labels.iter_mut().find(|(name, _)| name == label) {
            Some(slot) => slot.1 = token,
            None => frame.labels.push((CompactString::new(label), token)),
        }
    }

    /// Start another level of a left-recursive rule's operator loop: what was
    /// parsed so far becomes the first child of a new node of the same rule.
    fn push_recursion_level(&mut self) -> Result<(), BuilderError> {
        if let Some(tree) = &mut self.tree {
            tree.wrap_current()?;
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.labels.clear();
        }
        Ok(())
    }

    fn failed_predicate(&mut self, rule: RuleIndex, text: &str) -> RecognitionError {
        RecognitionError::FailedPredicate {
            offending: self.input.lt(1),
            rule: CompactString::new(self.atn.rule_name(rule)),
            predicate: CompactString::new(text),
            state: self.state,
            ctx: self.ctx.clone(),
        }
    }

    fn run_action(&mut self, action: &str, hooks: &mut dyn SemanticHooks) {
        let atn = self.atn;
        let start = self.frames.last().map_or(0, |f| f.start_index);
        let text = match self.input.lb(1).and_then(|prev| usize::try_from(prev.index).ok()) {
            Some(stop) if stop >= start => self.input.text(start, stop),
            _ => String::new(),
        };
        let expected = self
            .vocabulary
            .format_set(&analyzer::expected_tokens(atn, self.state, &self.ctx));
        let Some(frame) = self.frames.last() else {
            return;
        };
        let ctx = ActionContext {
            rule: atn.rule_name(frame.rule),
            last_token: frame.last_token.as_ref(),
            labels: &frame.labels,
            expected,
            text,
        };
        hooks.action(&ctx, action);
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        if self.diagnostics.len() >= self.max_errors {
            return;
        }
        for listener in self.listeners.iter_mut() {
            listener.syntax_error(&diagnostic);
        }
        self.diagnostics.push(diagnostic);
    }

    /// Move token recognition errors from the source into the log.
    fn flush_source_errors(&mut self) {
        for e in self.input.take_source_errors() {
            let diagnostic = Diagnostic::new(DiagnosticKind::TokenRecognition, e.line, e.column, e.to_string());
            self.record(diagnostic);
        }
    }
}

impl Recognizer for Run<'_> {
    fn atn(&self) -> &Atn {
        self.atn
    }

    fn vocabulary(&self) -> &Vocabulary {
        self.vocabulary
    }

    fn state(&self) -> StateId {
        self.state
    }

    fn context(&self) -> &PredictionContext {
        &self.ctx
    }

    fn input(&mut self) -> &mut dyn TokenStream {
        &mut *self.input
    }

    fn consume(&mut self, discarded: bool) {
        let token = self.input.lt(1);
        if let Some(tree) = &mut self.tree {
            let added = if discarded {
                tree.error_token(token.clone())
            } else {
                tree.token(token.clone())
            };
            if let Err(e) = added {
                self.defect.get_or_insert(e.into());
            }
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.last_token = Some(token.clone());
        }
        if !token.is_eof() {
            self.metrics.tokens_consumed += 1;
        }
        self.events.handle(&RecognizerEvent::Consume {
            token,
            error: discarded,
        });
        self.input.consume();
    }

    fn notify_error(&mut self, diagnostic: Diagnostic) {
        self.flush_source_errors();
        self.metrics.errors_recovered += 1;
        self.record(diagnostic);
    }

    fn emit(&mut self, event: RecognizerEvent) {
        self.events.handle(&event);
    }
}

/// Alternative of loop decision `id` that leaves the loop.
fn loop_exit(atn: &Atn, id: StateId) -> Option<usize> {
    let state = atn.state(id)?;
    if !matches!(state.kind, StateKind::StarLoopEntry { .. } | StateKind::PlusLoopBack) {
        return None;
    }
    state
        .transitions
        .iter()
        .position(|t| atn.state(t.target()).is_some_and(|s| s.kind == StateKind::LoopEnd))
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Expr;
    use crate::lexer::{CharSet, Pattern};
    use crate::tree::ParseTree;

    fn lowercase_id() -> Pattern {
        Pattern::class(CharSet::new(vec![('a', 'z')])).plus()
    }

    #[test]
    fn test_clean_parse_builds_tree() {
        let g = Grammar::builder("T")
            .rule("s", Expr::seq([Expr::rule("a"), Expr::lit(";")]))
            .rule("a", Expr::star(Expr::token("ID")))
            .token("ID", lowercase_id())
            .skip("WS", Pattern::class(CharSet::whitespace()).plus())
            .build()
            .unwrap();
        let result = g.parser("x y ;").parse("s").unwrap();
        assert!(result.is_clean());
        let tree = result.tree.unwrap();
        assert_eq!(tree.to_string_tree(), "(s (a x y) ;)");
        assert_eq!(result.metrics.tokens_consumed, 3);
    }

    #[test]
    fn test_unknown_start_rule() {
        let g = Grammar::builder("T").rule("s", Expr::lit("a")).build().unwrap();
        let err = g.parser("a").parse("nope").unwrap_err();
        assert_eq!(err, AtnError::UnknownRule("nope".into()));
    }

    #[test]
    fn test_tree_disabled() {
        let g = Grammar::builder("T").rule("s", Expr::lit("a")).build().unwrap();
        let config = ParserConfig {
            build_parse_tree: false,
            ..ParserConfig::default()
        };
        let result = g.parser("a").with_config(config).parse("s").unwrap();
        assert!(result.tree.is_none());
        assert!(result.is_clean());
    }

    #[test]
    fn test_conjured_token_is_error_node() {
        let g = Grammar::builder("T")
            .rule("a", Expr::seq([Expr::lit("a"), Expr::lit("b"), Expr::lit("c")]))
            .build()
            .unwrap();
        let result = g.parser("ac").parse("a").unwrap();
        assert_eq!(result.diagnostic_lines(), vec!["line 1:1 missing 'b' at 'c'"]);
        let tree = result.tree.unwrap();
        assert_eq!(tree.error_count(), 1);
        assert!(matches!(&tree.children()[1], ParseTree::Error(t) if t.is_missing()));
    }

    #[test]
    fn test_left_recursive_levels_nest() {
        let g = Grammar::builder("T")
            .rule(
                "e",
                Expr::choice([
                    Expr::seq([Expr::rule("e"), Expr::lit("*"), Expr::rule("e")]),
                    Expr::seq([Expr::rule("e"), Expr::lit("+"), Expr::rule("e")]),
                    Expr::token("INT"),
                ]),
            )
            .token("INT", Pattern::class(CharSet::digits()).plus())
            .build()
            .unwrap();
        let result = g.parser("1+2*3").parse("e").unwrap();
        assert!(result.is_clean());
        assert_eq!(
            result.tree.unwrap().to_string_tree(),
            "(e (e 1) + (e (e 2) * (e 3)))"
        );
    }

    #[test]
    fn test_action_sees_labels_and_text() {
        struct Capture(Vec<String>);
        impl SemanticHooks for Capture {
            fn action(&mut self, ctx: &ActionContext<'_>, text: &str) {
                let x = ctx.label("x").map(|t| t.text.to_string()).unwrap_or_default();
                self.0.push(format!("{text}:{x}:{}:{}", ctx.text(), ctx.expected_tokens()));
            }
        }
        let g = Grammar::builder("T")
            .rule(
                "a",
                Expr::seq([
                    Expr::lit("a"),
                    Expr::label("x", Expr::lit("b")),
                    Expr::action("show"),
                    Expr::lit("c"),
                ]),
            )
            .build()
            .unwrap();
        let mut hooks = Capture(Vec::new());
        let result = g.parser("abc").parse_with("a", &mut hooks).unwrap();
        assert!(result.is_clean());
        assert_eq!(hooks.0, vec!["show:b:ab:'c'"]);
    }

    #[test]
    fn test_failed_predicate_reported() {
        struct Deny;
        impl SemanticHooks for Deny {
            fn predicate(&mut self, _rule: &str, _text: &str) -> bool {
                false
            }
        }
        let g = Grammar::builder("T")
            .rule("a", Expr::seq([Expr::predicate("ok"), Expr::lit("a")]))
            .build()
            .unwrap();
        let result = g.parser("a").parse_with("a", &mut Deny).unwrap();
        assert_eq!(result.diagnostic_lines(), vec!["line 1:0 rule a failed predicate: {ok}?"]);
    }

    #[test]
    fn test_loop_exits_on_unexpected_first_token() {
        let g = Grammar::builder("T")
            .rule("a", Expr::seq([Expr::lit("a"), Expr::star(Expr::lit("b")), Expr::lit("c")]))
            .build()
            .unwrap();
        let result = g.parser("ab").parse("a").unwrap();
        assert_eq!(result.diagnostic_lines(), vec!["line 1:2 missing 'c' at '<EOF>'"]);
    }

    #[test]
    fn test_events_traced() {
        let g = Grammar::builder("T")
            .rule("s", Expr::choice([Expr::seq([Expr::lit("a")]), Expr::seq([Expr::lit("a")])]))
            .build()
            .unwrap();
        let mut events = EventCollector::new();
        let result = g
            .parser("a")
            .parse_traced("s", &mut NoHooks, &mut events)
            .unwrap();
        assert_eq!(result.metrics.ambiguities, 1);
        assert_eq!(events.ambiguities().count(), 1);
        assert!(matches!(events.events.first(), Some(RecognizerEvent::EnterRule { index: 0, .. })));
        assert!(matches!(events.events.last(), Some(RecognizerEvent::ExitRule { error: false, .. })));
    }

    #[test]
    fn test_max_errors_limits_log() {
        let g = Grammar::builder("T")
            .rule("s", Expr::seq([Expr::star(Expr::rule("stat")), Expr::eof()]))
            .rule("stat", Expr::seq([Expr::lit("x"), Expr::lit(";")]))
            .build()
            .unwrap();
        let all = g.parser("xx;xx;").parse("s").unwrap();
        assert_eq!(
            all.diagnostic_lines(),
            vec![
                "line 1:1 extraneous input 'x' expecting ';'",
                "line 1:4 extraneous input 'x' expecting ';'",
            ]
        );
        let config = ParserConfig {
            max_errors: 1,
            ..ParserConfig::default()
        };
        let limited = g.parser("xx;xx;").with_config(config).parse("s").unwrap();
        assert_eq!(limited.diagnostic_lines(), vec!["line 1:1 extraneous input 'x' expecting ';'"]);
        assert_eq!(limited.metrics.errors_recovered, 2);
    }

    /// `s : s 'x' ;` wired by hand, skipping the left-recursion rewrite.
    #[test]
    fn test_recursion_without_progress_is_a_defect() {
        let mut b = crate::atn::AtnBuilder::new();
        let s = b.add_rule("s", false);
        let mid = b.add_state(StateKind::Basic, s);
        let end = b.add_state(StateKind::Basic, s);
        b.add_transition(
            b.rule_start(s),
            Transition::Rule {
                target: b.rule_start(s),
                rule: s,
                follow: mid,
                precedence: 0,
            },
        );
        b.add_transition(mid, Transition::Atom { target: end, token: 1 });
        b.add_transition(end, Transition::Epsilon { target: b.rule_stop(s) });

        let mut vocabulary = Vocabulary::new();
        vocabulary.define_literal("x");
        let g = Grammar {
            name: CompactString::new("Cycle"),
            atn: Arc::new(b.finish(1).unwrap()),
            vocabulary: Arc::new(vocabulary),
            lexer: Arc::new(crate::lexer::LexerSpec::default()),
        };
        let err = g
            .parser_from_tokens(vec![Token::new(1, "x", 0, 0, 1, 0)])
            .parse("s")
            .unwrap_err();
        assert!(
            matches!(err, AtnError::RecursionCycle { ref rule, index: 0 } if rule.as_str() == "s"),
            "{err}"
        );
    }
}
