//! # Look-ahead Analysis
//!
//! One-token look-ahead sets over the network, in two flavours:
//!
//! - **within rule** (no context): reaching the rule's stop state adds
//!   [`EPSILON`], meaning "whatever follows the invocation";
//! - **full context**: the invocation stack is walked outward and reaching the
//!   stop state of the outermost rule adds [`EOF`].
//!
//! Predicates are looked through: a predicate never hides the tokens behind
//! it. Rules already being expanded on the current path are skipped, which is
//! what keeps the walk finite on recursive grammars.

use super::{Atn, PredictionContext, RuleIndex, StateId, StateKind, Transition};
use crate::atn::IntervalSet;
use crate::lexer::{EOF, EPSILON, TokenType};
use hashbrown::HashSet;

struct Walk<'a> {
    atn: &'a Atn,
    full: bool,
    out: IntervalSet,
    busy: HashSet<(StateId, PredictionContext), ahash::RandomState>,
    called: HashSet<RuleIndex, ahash::RandomState>,
}

impl Walk<'_> {
    fn visit(&mut self, s: StateId, ctx: &PredictionContext) {
        if !self.busy.insert((s, ctx.clone())) {
            return;
        }
        let Some(state) = self.atn.state(s) else {
            return;
        };

        if state.kind == StateKind::RuleStop {
            match ctx.pop() {
                Some((ret, _, parent)) => {
                    let removed = self.called.remove(&state.rule);
                    self.visit(ret, &parent);
                    if removed {
                        self.called.insert(state.rule);
                    }
                }
                None if self.full => self.out.add(EOF),
                None => self.out.add(EPSILON),
            }
            return;
        }

        for t in &state.transitions {
            match t {
                Transition::Rule {
                    target,
                    rule,
                    follow,
                    precedence,
                } => {
                    if self.called.contains(rule) {
                        continue;
                    }
                    self.called.insert(*rule);
                    self.visit(*target, &ctx.push(*follow, *precedence));
                    self.called.remove(rule);
                }
                Transition::Epsilon { target }
                | Transition::Predicate { target, .. }
                | Transition::Precedence { target, .. }
                | Transition::Action { target, .. } => self.visit(*target, ctx),
                Transition::Atom { .. } | Transition::Set { .. } | Transition::Wildcard { .. } => {
                    if let Some(label) = t.label(self.atn.max_token_type()) {
                        self.out.add_all(&label);
                    }
                }
            }
        }
    }
}

/// Tokens that can be matched next from `state`.
///
/// With `ctx == None` the set is computed within the rule (see module docs);
/// with a context it continues into the callers and ends in EOF.
#[must_use]
pub fn look(atn: &Atn, state: StateId, ctx: Option<&PredictionContext>) -> IntervalSet {
    let mut walk = Walk {
        atn,
        full: ctx.is_some(),
        out: IntervalSet::new(),
        busy: HashSet::with_hasher(ahash::RandomState::new()),
        called: HashSet::with_hasher(ahash::RandomState::new()),
    };
    let start_ctx = ctx.cloned().unwrap_or_default();
    walk.visit(state, &start_ctx);
    walk.out
}

/// Tokens acceptable at `state` given the actual invocation stack `ctx`.
///
/// Starts from the within-rule set and, while the end of the current rule is
/// reachable, adds what follows each invocation outward. If the end of the
/// outermost rule is reachable, EOF is included.
#[must_use]
pub fn expected_tokens(atn: &Atn, state: StateId, ctx: &PredictionContext) -> IntervalSet {
    let mut following = atn.next_tokens(state).clone();
    if !following.contains(EPSILON) {
        return following;
    }
    let mut expected = following.clone();
    expected.remove(EPSILON);
    for ret in ctx.return_states() {
        if !following.contains(EPSILON) {
            break;
        }
        following = atn.next_tokens(ret).clone();
        expected.add_all(&following);
        expected.remove(EPSILON);
    }
    if following.contains(EPSILON) {
        expected.add(EOF);
    }
    expected
}

/// Whether `t` may legally appear at `state` under `ctx`.
///
/// Equivalent to `expected_tokens(..).contains(t)` but stops walking as soon
/// as the answer is known.
#[must_use]
pub fn is_expected(atn: &Atn, state: StateId, ctx: &PredictionContext, t: TokenType) -> bool {
    let mut following = atn.next_tokens(state);
    if following.contains(t) {
        return true;
    }
    if !following.contains(EPSILON) {
        return false;
    }
    for ret in ctx.return_states() {
        if !following.contains(EPSILON) {
            break;
        }
        following = atn.next_tokens(ret);
        if following.contains(t) {
            return true;
        }
    }
    following.contains(EPSILON) && t == EOF
}

/// Union of what can follow every pending invocation on `ctx`, without EPSILON.
///
/// Panic-mode recovery discards input until it reaches one of these tokens (or
/// EOF), so that some enclosing rule can continue.
#[must_use]
pub fn error_recovery_set(atn: &Atn, ctx: &PredictionContext) -> IntervalSet {
    let mut set = IntervalSet::new();
    for ret in ctx.return_states() {
        set.add_all(atn.next_tokens(ret));
    }
    set.remove(EPSILON);
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn::AtnBuilder;

    /// s : a 'x' ;  a : 'y'? ;
    fn two_rules() -> (Atn, StateId, StateId) {
        let mut b = AtnBuilder::new();
        let s = b.add_rule("s", false);
        let a = b.add_rule("a", false);
        let s_mid = b.add_state(StateKind::Basic, s);
        let s_end = b.add_state(StateKind::Basic, s);
        b.add_transition(
            b.rule_start(s),
            Transition::Rule {
                target: b.rule_start(a),
                rule: a,
                follow: s_mid,
                precedence: 0,
            },
        );
        b.add_transition(s_mid, Transition::Atom { target: s_end, token: 1 });
        b.add_transition(s_end, Transition::Epsilon { target: b.rule_stop(s) });

        let block = b.add_state(StateKind::BlockStart, a);
        let y = b.add_state(StateKind::Basic, a);
        let end = b.add_state(StateKind::BlockEnd, a);
        b.add_transition(b.rule_start(a), Transition::Epsilon { target: block });
        b.add_transition(block, Transition::Epsilon { target: y });
        b.add_transition(block, Transition::Epsilon { target: end });
        b.add_transition(y, Transition::Atom { target: end, token: 2 });
        b.add_transition(end, Transition::Epsilon { target: b.rule_stop(a) });
        let atn = b.finish(2).unwrap();
        (atn, block, s_mid)
    }

    #[test]
    fn test_within_rule_includes_epsilon() {
        let (atn, block, _) = two_rules();
        let set = atn.next_tokens(block);
        assert!(set.contains(2));
        assert!(set.contains(EPSILON));
        assert!(!set.contains(1));
    }

    #[test]
    fn test_rule_start_sees_through_call() {
        let (atn, _, _) = two_rules();
        let start = atn.rules()[0].start;
        let set = look(&atn, start, None);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_expected_walks_into_caller() {
        let (atn, block, s_mid) = two_rules();
        let ctx = PredictionContext::empty().push(s_mid, 0);
        let expected = expected_tokens(&atn, block, &ctx);
        assert_eq!(expected.iter().collect::<Vec<_>>(), vec![1, 2]);
        assert!(is_expected(&atn, block, &ctx, 1));
        assert!(!is_expected(&atn, block, &ctx, EOF));
    }

    #[test]
    fn test_expected_at_outermost_adds_eof() {
        let (atn, block, _) = two_rules();
        let expected = expected_tokens(&atn, block, &PredictionContext::empty());
        assert_eq!(expected.iter().collect::<Vec<_>>(), vec![EOF, 2]);
    }

    #[test]
    fn test_full_context_look() {
        let (atn, block, s_mid) = two_rules();
        let ctx = PredictionContext::empty().push(s_mid, 0);
        let set = look(&atn, block, Some(&ctx));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_recovery_set_unions_frames() {
        let (atn, _, s_mid) = two_rules();
        let ctx = PredictionContext::empty().push(s_mid, 0);
        assert_eq!(error_recovery_set(&atn, &ctx).iter().collect::<Vec<_>>(), vec![1]);
        assert!(error_recovery_set(&atn, &PredictionContext::empty()).is_empty());
    }
}
