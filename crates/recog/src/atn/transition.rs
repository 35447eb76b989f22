use super::{IntervalSet, RuleIndex, StateId};
use crate::lexer::TokenType;

/// Edge of the transition network.
///
/// The variants are closed: closure computation, look-ahead analysis and the
/// interpreter all match on them exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Epsilon {
        target: StateId,
    },
    /// Match one token type.
    Atom {
        target: StateId,
        token: TokenType,
    },
    /// Match any type in the set.
    Set {
        target: StateId,
        set: IntervalSet,
    },
    /// Match any token except EOF.
    Wildcard {
        target: StateId,
    },
    /// Invoke `rule` (whose start state is `target`); on return continue at `follow`.
    Rule {
        target: StateId,
        rule: RuleIndex,
        follow: StateId,
        precedence: i32,
    },
    /// User semantic predicate; `index` points into [`super::Atn::predicate_text`].
    Predicate {
        target: StateId,
        rule: RuleIndex,
        index: usize,
    },
    /// `{precpred(p)}?` inserted by the left-recursion rewrite.
    Precedence {
        target: StateId,
        precedence: i32,
    },
    /// Embedded action, run only by the interpreter, never during prediction.
    /// `index` points into [`super::Atn::action_text`].
    Action {
        target: StateId,
        rule: RuleIndex,
        index: usize,
    },
}

impl Transition {
    #[must_use]
    pub const fn target(&self) -> StateId {
        match self {
            Self::Epsilon { target }
            | Self::Atom { target, .. }
            | Self::Set { target, .. }
            | Self::Wildcard { target }
            | Self::Rule { target, .. }
            | Self::Predicate { target, .. }
            | Self::Precedence { target, .. }
            | Self::Action { target, .. } => *target,
        }
    }

    /// Transitions that do not consume input.
    #[must_use]
    pub const fn is_epsilon(&self) -> bool {
        matches!(
            self,
            Self::Epsilon { .. }
                | Self::Rule { .. }
                | Self::Predicate { .. }
                | Self::Precedence { .. }
                | Self::Action { .. }
        )
    }

    /// Whether this consuming transition accepts `t`.
    ///
    /// `max_token_type` bounds the wildcard; EOF never matches a wildcard.
    #[must_use]
    pub fn matches(&self, t: TokenType, max_token_type: TokenType) -> bool {
        match self {
            Self::Atom { token, .. } => *token == t,
            Self::Set { set, .. } => set.contains(t),
            Self::Wildcard { .. } => t >= crate::lexer::MIN_USER_TOKEN_TYPE && t <= max_token_type,
            _ => false,
        }
    }

    /// Token types a consuming transition can match, if any.
    #[must_use]
    pub fn label(&self, max_token_type: TokenType) -> Option<IntervalSet> {
        match self {
            Self::Atom { token, .. } => Some(IntervalSet::of(*token)),
            Self::Set { set, .. } => Some(set.clone()),
            Self::Wildcard { .. } => Some(IntervalSet::of_range(
                crate::lexer::MIN_USER_TOKEN_TYPE,
                max_token_type,
            )),
            _ => None,
        }
    }
}
