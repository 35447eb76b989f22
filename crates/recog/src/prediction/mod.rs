//! # Adaptive Prediction
//!
//! Chooses an alternative at a decision state by simulating every
//! alternative in parallel over the actual input.
//!
//! ## Algorithm
//!
//! A *configuration* is one simulated path: `(state, alt, context,
//! precedence)`. Prediction starts with the closure of one configuration per
//! alternative, all sharing the parser's real invocation stack, then moves the
//! set over one token at a time:
//!
//! 1. **reach**: keep configurations that can match the next token and move
//!    them past it, then take the closure again;
//! 2. **stop** when a single alternative is left, or when every group of
//!    configurations sharing a state, context and precedence has the same
//!    lowest alternative (a resolved ambiguity), or at EOF;
//! 3. **fail** when nothing can match, unless some path had already finished
//!    the decision's rule, in which case that alternative is taken and the
//!    mismatch is left to ordinary token matching.
//!
//! The closure follows rule calls by pushing frames on a persistent
//! [`PredictionContext`] and returns through them at rule stop states, so the
//! look-ahead is exact for the current invocation stack. Entering the same
//! rule at the same precedence twice without consuming input ends that path,
//! which keeps the closure finite.
//!
//! All look-ahead is speculative: the stream is rewound to where it started
//! before returning.

use crate::atn::{Atn, PredictionContext, RuleIndex, StateId, StateKind, Transition};
use crate::error::{AtnError, RecognitionError};
use crate::lexer::{EOF, TokenStream, TokenType};
use crate::parser::SemanticHooks;
use hashbrown::HashSet;
use smallvec::SmallVec;
use std::sync::Arc;
use thiserror::Error;

/// Outcome of a successful prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    /// 1-based alternative number.
    pub alt: usize,
    /// Tokens examined to decide.
    pub lookahead: usize,
    /// Alternatives that were still viable when the lowest was picked; empty
    /// unless the decision was ambiguous for this input.
    pub conflicting: SmallVec<[usize; 4]>,
}

impl Prediction {
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.conflicting.len() > 1
    }
}

#[derive(Debug, Clone, Error)]
pub enum PredictionError {
    #[error(transparent)]
    NoViableAlternative(RecognitionError),

    #[error(transparent)]
    Atn(#[from] AtnError),
}

#[derive(Debug, Clone)]
struct Config {
    state: StateId,
    alt: usize,
    ctx: PredictionContext,
    precedence: i32,
    /// Some return on this path left the decision's rule.
    reaches_outer: bool,
    /// Still before any action on this path; user predicates are evaluated.
    collect: bool,
}

type ConfigKey = (StateId, usize, PredictionContext, i32);

impl Config {
    fn key(&self) -> ConfigKey {
        (self.state, self.alt, self.ctx.clone(), self.precedence)
    }
}

#[derive(Debug, Default)]
struct ConfigSet {
    configs: Vec<Config>,
    seen: HashSet<ConfigKey, ahash::RandomState>,
}

impl ConfigSet {
    fn add(&mut self, config: Config) {
        if self.seen.insert(config.key()) {
            self.configs.push(config);
        }
    }

    fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    fn alts(&self) -> SmallVec<[usize; 4]> {
        let mut alts: SmallVec<[usize; 4]> = self.configs.iter().map(|c| c.alt).collect();
        alts.sort_unstable();
        alts.dedup();
        alts
    }

    /// The lowest alternative if every (state, context, precedence) group
    /// agrees on it.
    fn single_min_alt(&self) -> Option<usize> {
        let mut groups: hashbrown::HashMap<(StateId, &PredictionContext, i32), usize, ahash::RandomState> =
            hashbrown::HashMap::with_hasher(ahash::RandomState::new());
        for c in &self.configs {
            groups
                .entry((c.state, &c.ctx, c.precedence))
                .and_modify(|m| *m = (*m).min(c.alt))
                .or_insert(c.alt);
        }
        let mut mins = groups.values().copied();
        let first = mins.next()?;
        mins.all(|m| m == first).then_some(first)
    }
}

/// Rules entered on the current closure path: (rule, precedence, depth).
type Entered = SmallVec<[(RuleIndex, i32, usize); 4]>;

/// Prediction over one grammar's network.
#[derive(Debug, Clone)]
pub struct PredictionEngine {
    atn: Arc<Atn>,
}

impl PredictionEngine {
    #[must_use]
    pub const fn new(atn: Arc<Atn>) -> Self {
        Self { atn }
    }

    #[must_use]
    pub fn atn(&self) -> &Atn {
        &self.atn
    }

    /// Predict the alternative to take at `decision_state`.
    ///
    /// `ctx` is the parser's invocation stack (callers of the current rule)
    /// and `precedence` the precedence argument of the current invocation.
    /// The stream is left where it was.
    ///
    /// # Errors
    ///
    /// [`PredictionError::NoViableAlternative`] if no alternative can match
    /// the input; [`PredictionError::Atn`] if the network is malformed.
    pub fn adaptive_predict(
        &self,
        stream: &mut dyn TokenStream,
        decision_state: StateId,
        ctx: &PredictionContext,
        precedence: i32,
        hooks: &mut dyn SemanticHooks,
    ) -> Result<Prediction, PredictionError> {
        let state = self.atn.try_state(decision_state)?;
        if state.transitions.is_empty() {
            return Err(AtnError::EmptyDecision {
                state: decision_state,
            }
            .into());
        }
        let mark = stream.mark();
        let result = self.simulate(stream, decision_state, ctx, precedence, hooks);
        stream.seek(mark.index);
        stream.release(mark);
        result
    }

    fn simulate(
        &self,
        stream: &mut dyn TokenStream,
        decision_state: StateId,
        ctx: &PredictionContext,
        precedence: i32,
        hooks: &mut dyn SemanticHooks,
    ) -> Result<Prediction, PredictionError> {
        let state = self.atn.try_state(decision_state)?;
        let start_token = stream.lt(1);
        let outer = ctx.len();

        let mut work = Vec::new();
        for (i, t) in state.transitions.iter().enumerate() {
            let base = Config {
                state: decision_state,
                alt: i + 1,
                ctx: ctx.clone(),
                precedence,
                reaches_outer: false,
                collect: true,
            };
            if let Some(next) = self.step(&base, t, &Entered::new(), Some(&mut *hooks)) {
                work.push(next);
            }
        }
        let mut start = ConfigSet::default();
        self.closure(work, &mut start, outer, Some(hooks))?;

        let mut previous = start;
        let mut depth = 0usize;
        loop {
            let t = stream.la(1);
            let reach = self.reach(&previous, t, outer)?;
            if reach.is_empty() {
                if let Some(alt) = exit_alternative(&self.atn, &previous) {
                    return Ok(Prediction {
                        alt,
                        lookahead: depth.max(1),
                        conflicting: SmallVec::new(),
                    });
                }
                return Err(PredictionError::NoViableAlternative(
                    RecognitionError::NoViableAlternative {
                        start: start_token,
                        offending: stream.lt(1),
                        state: decision_state,
                        ctx: ctx.clone(),
                    },
                ));
            }
            depth += 1;

            let alts = reach.alts();
            if alts.len() == 1 {
                return Ok(Prediction {
                    alt: alts[0],
                    lookahead: depth,
                    conflicting: SmallVec::new(),
                });
            }
            if let Some(alt) = reach.single_min_alt() {
                return Ok(Prediction {
                    alt,
                    lookahead: depth,
                    conflicting: alts,
                });
            }
            if t == EOF {
                return Ok(Prediction {
                    alt: alts[0],
                    lookahead: depth,
                    conflicting: alts,
                });
            }
            previous = reach;
            stream.consume();
        }
    }

    /// Move every configuration over `t`, then close.
    fn reach(&self, previous: &ConfigSet, t: TokenType, outer: usize) -> Result<ConfigSet, AtnError> {
        let max = self.atn.max_token_type();
        let mut moved = Vec::new();
        let mut finished = Vec::new();
        for c in &previous.configs {
            let state = self.atn.try_state(c.state)?;
            if state.kind == StateKind::RuleStop {
                finished.push(c.clone());
                continue;
            }
            for tr in &state.transitions {
                if tr.matches(t, max) {
                    moved.push((
                        Config {
                            state: tr.target(),
                            collect: false,
                            ..c.clone()
                        },
                        Entered::new(),
                    ));
                }
            }
        }
        let mut reach = ConfigSet::default();
        self.closure(moved, &mut reach, outer, None)?;

        // Paths that finished the outermost rule stay alive unless another
        // path is also at a rule end, or the input itself ended.
        if !finished.is_empty() {
            let stop_in_reach = reach
                .configs
                .iter()
                .any(|c| self.atn.state(c.state).is_some_and(|s| s.kind == StateKind::RuleStop));
            if t == EOF || !stop_in_reach {
                finished.into_iter().for_each(|c| reach.add(c));
            }
        }
        Ok(reach)
    }

    /// Epsilon closure of `work` into `out`.
    ///
    /// `hooks` is only given for the start closure: user predicates are
    /// evaluated there and treated as true afterwards.
    fn closure(
        &self,
        mut work: Vec<(Config, Entered)>,
        out: &mut ConfigSet,
        outer: usize,
        mut hooks: Option<&mut dyn SemanticHooks>,
    ) -> Result<(), AtnError> {
        let mut busy: HashSet<ConfigKey, ahash::RandomState> =
            HashSet::with_hasher(ahash::RandomState::new());
        work.reverse();
        while let Some((config, entered)) = work.pop() {
            if !busy.insert(config.key()) {
                continue;
            }
            let state = self.atn.try_state(config.state)?;

            if state.kind == StateKind::RuleStop {
                match config.ctx.pop() {
                    Some((ret, prec, parent)) => {
                        let reaches_outer = config.reaches_outer || parent.len() < outer;
                        let mut entered = entered;
                        entered.retain(|e| e.2 <= parent.len());
                        work.push((
                            Config {
                                state: ret,
                                ctx: parent,
                                precedence: prec,
                                reaches_outer,
                                ..config
                            },
                            entered,
                        ));
                    }
                    None => out.add(config),
                }
                continue;
            }

            if !state.only_epsilon() {
                out.add(config.clone());
            }
            // Pushed in reverse so alternatives are expanded in grammar order.
            for t in state.transitions.iter().rev() {
                let reborrowed = match hooks {
                    Some(ref mut h) => Some(&mut **h as &mut dyn SemanticHooks),
                    None => None,
                };
                if let Some(next) = self.step(&config, t, &entered, reborrowed) {
                    work.push(next);
                }
            }
        }
        Ok(())
    }

    /// Follow one non-matching transition; `None` if it is blocked.
    fn step(
        &self,
        config: &Config,
        t: &Transition,
        entered: &Entered,
        hooks: Option<&mut dyn SemanticHooks>,
    ) -> Option<(Config, Entered)> {
        match t {
            Transition::Epsilon { target } => Some((
                Config {
                    state: *target,
                    ..config.clone()
                },
                entered.clone(),
            )),
            Transition::Action { target, .. } => Some((
                Config {
                    state: *target,
                    collect: false,
                    ..config.clone()
                },
                entered.clone(),
            )),
            Transition::Rule {
                target,
                rule,
                follow,
                precedence,
            } => {
                if entered.iter().any(|e| e.0 == *rule && e.1 == *precedence) {
                    return None;
                }
                let ctx = config.ctx.push(*follow, config.precedence);
                let mut entered = entered.clone();
                entered.push((*rule, *precedence, ctx.len()));
                Some((
                    Config {
                        state: *target,
                        ctx,
                        precedence: *precedence,
                        ..config.clone()
                    },
                    entered,
                ))
            }
            Transition::Predicate {
                target,
                rule,
                index,
            } => {
                let pass = match hooks {
                    Some(h) if config.collect => {
                        h.predicate(self.atn.rule_name(*rule), self.atn.predicate_text(*index))
                    }
                    _ => true,
                };
                pass.then(|| {
                    (
                        Config {
                            state: *target,
                            ..config.clone()
                        },
                        entered.clone(),
                    )
                })
            }
            Transition::Precedence { target, precedence } => {
                (*precedence >= config.precedence).then(|| {
                    (
                        Config {
                            state: *target,
                            ..config.clone()
                        },
                        entered.clone(),
                    )
                })
            }
            Transition::Atom { .. } | Transition::Set { .. } | Transition::Wildcard { .. } => None,
        }
    }
}

/// Lowest alternative among paths that already left the decision's rule or
/// finished the outermost rule.
fn exit_alternative(atn: &Atn, previous: &ConfigSet) -> Option<usize> {
    previous
        .configs
        .iter()
        .filter(|c| {
            c.reaches_outer
                || (c.ctx.is_empty() && atn.state(c.state).is_some_and(|s| s.kind == StateKind::RuleStop))
        })
        .map(|c| c.alt)
        .min()
}
