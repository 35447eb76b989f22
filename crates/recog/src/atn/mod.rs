//! # Transition Network
//!
//! The immutable automaton a grammar compiles to, and the static analyses
//! over it.
//!
//! ## Overview
//!
//! - [`Atn`]: states, transitions, rule and decision tables
//! - [`AtnBuilder`]: incremental construction plus validation
//! - [`PredictionContext`]: persistent rule-invocation stacks
//! - [`analyzer`]: within-rule and full-context look-ahead sets
//!
//! A built [`Atn`] is never mutated. It is shared behind an `Arc` by every
//! parse of the grammar, including parses running on other threads.

pub mod analyzer;
pub mod context;
pub mod interval;
pub mod transition;

pub use context::PredictionContext;
pub use interval::{Interval, IntervalSet};
pub use transition::Transition;

use crate::error::AtnError;
use crate::lexer::TokenType;
use compact_str::CompactString;
use smallvec::SmallVec;

pub type StateId = usize;
pub type RuleIndex = usize;
pub type DecisionId = usize;

/// Structural role of a state.
///
/// Roles matter to the error strategy (where to resynchronize) and to the
/// interpreter (loop iterations of left-recursive rules).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Basic,
    RuleStart,
    RuleStop,
    BlockStart,
    BlockEnd,
    StarBlockStart,
    PlusBlockStart,
    /// Entry of a `(...)*` loop. `precedence` marks the operator loop produced
    /// by the left-recursion rewrite.
    StarLoopEntry {
        precedence: bool,
    },
    StarLoopBack,
    PlusLoopBack,
    LoopEnd,
}

/// One automaton state.
#[derive(Debug, Clone)]
pub struct AtnState {
    pub kind: StateKind,
    pub rule: RuleIndex,
    pub transitions: SmallVec<[Transition; 2]>,
    pub decision: Option<DecisionId>,
    /// Label bound to the token matched by this state's transition.
    pub label: Option<CompactString>,
}

impl AtnState {
    #[must_use]
    pub fn transition(&self, i: usize) -> Option<&Transition> {
        self.transitions.get(i)
    }

    /// True when every outgoing transition is epsilon (or there are none).
    #[must_use]
    pub fn only_epsilon(&self) -> bool {
        self.transitions.iter().all(Transition::is_epsilon)
    }
}

/// Per-rule bookkeeping.
#[derive(Debug, Clone)]
pub struct RuleInfo {
    pub name: CompactString,
    pub start: StateId,
    pub stop: StateId,
    /// Rewritten from direct left recursion; takes a precedence argument.
    pub left_recursive: bool,
}

/// Compiled transition network.
#[derive(Debug, Clone)]
pub struct Atn {
    states: Vec<AtnState>,
    rules: Vec<RuleInfo>,
    decisions: Vec<StateId>,
    predicates: Vec<CompactString>,
    actions: Vec<CompactString>,
    max_token_type: TokenType,
    /// Within-rule next-token sets, one per state.
    next_tokens: Vec<IntervalSet>,
    empty: IntervalSet,
}

impl Atn {
    #[must_use]
    pub fn state(&self, id: StateId) -> Option<&AtnState> {
        self.states.get(id)
    }

    #[must_use]
    pub fn states(&self) -> &[AtnState] {
        &self.states
    }

    #[must_use]
    pub fn rules(&self) -> &[RuleInfo] {
        &self.rules
    }

    #[must_use]
    pub fn rule(&self, index: RuleIndex) -> Option<&RuleInfo> {
        self.rules.get(index)
    }

    #[must_use]
    pub fn rule_index(&self, name: &str) -> Option<RuleIndex> {
        self.rules.iter().position(|r| r.name == name)
    }

    #[must_use]
    pub fn rule_name(&self, index: RuleIndex) -> &str {
        self.rules.get(index).map_or("<invalid>", |r| r.name.as_str())
    }

    /// State of decision number `decision`.
    #[must_use]
    pub fn decision_state(&self, decision: DecisionId) -> Option<StateId> {
        self.decisions.get(decision).copied()
    }

    #[must_use]
    pub fn num_decisions(&self) -> usize {
        self.decisions.len()
    }

    #[must_use]
    pub const fn max_token_type(&self) -> TokenType {
        self.max_token_type
    }

    #[must_use]
    pub fn predicate_text(&self, index: usize) -> &str {
        self.predicates.get(index).map_or("", CompactString::as_str)
    }

    #[must_use]
    pub fn action_text(&self, index: usize) -> &str {
        self.actions.get(index).map_or("", CompactString::as_str)
    }

    /// Tokens that can follow `state` without leaving its rule.
    ///
    /// Contains [`crate::lexer::EPSILON`] when the rule end is reachable
    /// without consuming input. Precomputed at build time.
    #[must_use]
    pub fn next_tokens(&self, state: StateId) -> &IntervalSet {
        self.next_tokens.get(state).unwrap_or(&self.empty)
    }

    /// Look up a state, turning a bad id into an error instead of a panic.
    ///
    /// # Errors
    ///
    /// Returns [`AtnError::MissingState`] if `id` is out of range.
    pub fn try_state(&self, id: StateId) -> Result<&AtnState, AtnError> {
        self.states.get(id).ok_or(AtnError::MissingState { state: id })
    }
}

/// Incremental construction of an [`Atn`].
///
/// # Examples
///
/// ```rust
/// use recog::atn::{AtnBuilder, StateKind, Transition};
///
/// let mut b = AtnBuilder::new();
/// let r = b.add_rule("a", false);
/// let (start, stop) = (b.rule_start(r), b.rule_stop(r));
/// let mid = b.add_state(StateKind::Basic, r);
/// b.add_transition(start, Transition::Atom { target: mid, token: 1 });
/// b.add_transition(mid, Transition::Epsilon { target: stop });
/// let atn = b.finish(1).unwrap();
/// assert_eq!(atn.rules().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct AtnBuilder {
    states: Vec<AtnState>,
    rules: Vec<RuleInfo>,
    predicates: Vec<CompactString>,
    actions: Vec<CompactString>,
}

impl AtnBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&mut self, kind: StateKind, rule: RuleIndex) -> StateId {
        self.states.push(AtnState {
            kind,
            rule,
            transitions: SmallVec::new(),
            decision: None,
            label: None,
        });
        self.states.len() - 1
    }

    /// Register a rule and create its start and stop states.
    pub fn add_rule(&mut self, name: &str, left_recursive: bool) -> RuleIndex {
        let index = self.rules.len();
        let start = self.add_state(StateKind::RuleStart, index);
        let stop = self.add_state(StateKind::RuleStop, index);
        self.rules.push(RuleInfo {
            name: CompactString::new(name),
            start,
            stop,
            left_recursive,
        });
        index
    }

    #[must_use]
    pub fn rule_start(&self, rule: RuleIndex) -> StateId {
        self.rules[rule].start
    }

    #[must_use]
    pub fn rule_stop(&self, rule: RuleIndex) -> StateId {
        self.rules[rule].stop
    }

    pub fn add_transition(&mut self, from: StateId, transition: Transition) {
        if let Some(state) = self.states.get_mut(from) {
            state.transitions.push(transition);
        }
    }

    pub fn set_label(&mut self, state: StateId, label: &str) {
        if let Some(state) = self.states.get_mut(state) {
            state.label = Some(CompactString::new(label));
        }
    }

    pub fn kind_mut(&mut self, state: StateId) -> Option<&mut StateKind> {
        self.states.get_mut(state).map(|s| &mut s.kind)
    }

    /// Intern predicate text, returning its index.
    pub fn add_predicate(&mut self, text: &str) -> usize {
        self.predicates.push(CompactString::new(text));
        self.predicates.len() - 1
    }

    /// Intern action text, returning its index.
    pub fn add_action(&mut self, text: &str) -> usize {
        self.actions.push(CompactString::new(text));
        self.actions.len() - 1
    }

    /// Validate, number the decisions and precompute next-token sets.
    ///
    /// Decision numbers are assigned in state order to every state with more
    /// than one outgoing transition.
    ///
    /// # Errors
    ///
    /// Returns an [`AtnError`] if a transition targets a missing state, a rule
    /// transition does not target a rule start, a loop or block start has no
    /// alternatives, or a non-stop state is a dead end.
    pub fn finish(self, max_token_type: TokenType) -> Result<Atn, AtnError> {
        let Self {
            mut states,
            rules,
            predicates,
            actions,
        } = self;

        for (id, state) in states.iter().enumerate() {
            let is_decision_kind = matches!(
                state.kind,
                StateKind::BlockStart
                    | StateKind::StarBlockStart
                    | StateKind::PlusBlockStart
                    | StateKind::StarLoopEntry { .. }
                    | StateKind::PlusLoopBack
            );
            if state.transitions.is_empty() {
                if is_decision_kind {
                    return Err(AtnError::EmptyDecision { state: id });
                }
                if state.kind != StateKind::RuleStop {
                    return Err(AtnError::DeadEnd { state: id });
                }
            }
            for t in &state.transitions {
                let target = t.target();
                let Some(target_state) = states.get(target) else {
                    return Err(AtnError::DanglingTarget { from: id, target });
                };
                if let Transition::Rule { rule, follow, .. } = t {
                    if target_state.kind != StateKind::RuleStart || target_state.rule != *rule {
                        return Err(AtnError::BadRuleTarget { from: id });
                    }
                    if *follow >= states.len() {
                        return Err(AtnError::DanglingTarget {
                            from: id,
                            target: *follow,
                        });
                    }
                }
            }
        }

        let mut decisions = Vec::new();
        for (id, state) in states.iter_mut().enumerate() {
            if state.transitions.len() > 1 {
                state.decision = Some(decisions.len());
                decisions.push(id);
            }
        }

        let mut atn = Atn {
            states,
            rules,
            decisions,
            predicates,
            actions,
            max_token_type,
            next_tokens: Vec::new(),
            empty: IntervalSet::new(),
        };
        atn.next_tokens = (0..atn.states.len())
            .map(|s| analyzer::look(&atn, s, None))
            .collect();
        Ok(atn)
    }
}
