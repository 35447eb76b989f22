//! Rule-invocation stacks shared between simulation paths.
//!
//! A context is a linked chain of frames. Pushing allocates one frame that
//! points at the existing chain, so any number of configurations can extend
//! the same prefix without copying it. Frames are never mutated.

use super::StateId;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Debug)]
struct Frame {
    /// State to continue at when the invoked rule returns.
    return_state: StateId,
    /// Precedence argument of the invocation being returned into.
    precedence: i32,
    parent: Option<Arc<Frame>>,
    depth: usize,
}

/// Persistent stack of pending rule returns. The empty context means "the
/// outermost rule": reaching its stop state ends the input.
///
/// # Examples
///
/// ```rust
/// use recog::atn::PredictionContext;
///
/// let root = PredictionContext::empty();
/// let a = root.push(7, 0);
/// let b = a.push(9, 2);
/// let c = a.push(9, 2);
/// assert_eq!(b, c);
/// assert_eq!(b.len(), 2);
/// let (ret, prec, parent) = b.pop().unwrap();
/// assert_eq!((ret, prec), (9, 2));
/// assert_eq!(parent, a);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PredictionContext {
    head: Option<Arc<Frame>>,
}

impl PredictionContext {
    #[must_use]
    pub const fn empty() -> Self {
        Self { head: None }
    }

    /// New context with one more frame on top; `self` is untouched.
    #[must_use]
    pub fn push(&self, return_state: StateId, precedence: i32) -> Self {
        let depth = self.head.as_ref().map_or(1, |f| f.depth + 1);
        Self {
            head: Some(Arc::new(Frame {
                return_state,
                precedence,
                parent: self.head.clone(),
                depth,
            })),
        }
    }

    /// Top frame's return state and precedence, plus the remaining context.
    #[must_use]
    pub fn pop(&self) -> Option<(StateId, i32, Self)> {
        self.head.as_ref().map(|f| {
            (
                f.return_state,
                f.precedence,
                Self {
                    head: f.parent.clone(),
                },
            )
        })
    }

    #[must_use]
    pub fn return_state(&self) -> Option<StateId> {
        self.head.as_ref().map(|f| f.return_state)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.head.as_ref().map_or(0, |f| f.depth)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Return states from the innermost frame outward.
    pub fn return_states(&self) -> impl Iterator<Item = StateId> + '_ {
        let mut cur = self.head.as_deref();
        std::iter::from_fn(move || {
            let frame = cur?;
            cur = frame.parent.as_deref();
            Some(frame.return_state)
        })
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        let mut cur = self.head.as_deref();
        std::iter::from_fn(move || {
            let frame = cur?;
            cur = frame.parent.as_deref();
            Some(frame)
        })
    }
}

impl PartialEq for PredictionContext {
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mut a = self.head.as_ref();
        let mut b = other.head.as_ref();
        loop {
            match (a, b) {
                (None, None) => return true,
                (Some(x), Some(y)) => {
                    if Arc::ptr_eq(x, y) {
                        return true;
                    }
                    if x.return_state != y.return_state || x.precedence != y.precedence {
                        return false;
                    }
                    a = x.parent.as_ref();
                    b = y.parent.as_ref();
                }
                _ => return false,
            }
        }
    }
}

impl Eq for PredictionContext {}

impl Hash for PredictionContext {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for frame in self.frames() {
            state.write_usize(frame.return_state);
            state.write_i32(frame.precedence);
        }
    }
}
