//! Sorted, coalesced sets of token types.

use crate::lexer::TokenType;
use smallvec::SmallVec;
use std::fmt;

/// Inclusive range of token types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub start: TokenType,
    pub stop: TokenType,
}

impl Interval {
    #[must_use]
    pub const fn new(start: TokenType, stop: TokenType) -> Self {
        Self { start, stop }
    }

    #[must_use]
    pub const fn contains(self, t: TokenType) -> bool {
        t >= self.start && t <= self.stop
    }

    #[allow(clippy::cast_sign_loss)]
    const fn len(self) -> usize {
        (self.stop - self.start + 1) as usize
    }
}

/// A set of token types stored as disjoint, sorted, non-adjacent intervals.
///
/// Most sets in a grammar hold a handful of types, so the intervals live
/// inline until they outgrow the small buffer.
///
/// # Examples
///
/// ```rust
/// use recog::atn::IntervalSet;
///
/// let mut set = IntervalSet::of(3);
/// set.add(1);
/// set.add(2);
/// assert_eq!(set.min_element(), Some(1));
/// assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IntervalSet {
    intervals: SmallVec<[Interval; 4]>,
}

impl IntervalSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set holding exactly `t`.
    #[must_use]
    pub fn of(t: TokenType) -> Self {
        let mut set = Self::new();
        set.add(t);
        set
    }

    /// Set holding every type in `start..=stop`.
    #[must_use]
    pub fn of_range(start: TokenType, stop: TokenType) -> Self {
        let mut set = Self::new();
        set.add_range(start, stop);
        set
    }

    pub fn add(&mut self, t: TokenType) {
        self.add_range(t, t);
    }

    /// Insert `start..=stop`, merging with overlapping or adjacent intervals.
    pub fn add_range(&mut self, start: TokenType, stop: TokenType) {
        if stop < start {
            return;
        }
        let mut merged = Interval::new(start, stop);
        let mut out: SmallVec<[Interval; 4]> = SmallVec::with_capacity(self.intervals.len() + 1);
        let mut placed = false;
        for &iv in &self.intervals {
            if iv.stop.saturating_add(1) < merged.start {
                out.push(iv);
            } else if merged.stop.saturating_add(1) < iv.start {
                if !placed {
                    out.push(merged);
                    placed = true;
                }
                out.push(iv);
            } else {
                merged = Interval::new(merged.start.min(iv.start), merged.stop.max(iv.stop));
            }
        }
        if !placed {
            out.push(merged);
        }
        self.intervals = out;
    }

    pub fn add_all(&mut self, other: &Self) {
        for iv in &other.intervals {
            self.add_range(iv.start, iv.stop);
        }
    }

    /// Union without mutating either operand.
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.add_all(other);
        out
    }

    pub fn remove(&mut self, t: TokenType) {
        let mut out: SmallVec<[Interval; 4]> = SmallVec::with_capacity(self.intervals.len() + 1);
        for &iv in &self.intervals {
            if !iv.contains(t) {
                out.push(iv);
                continue;
            }
            if iv.start < t {
                out.push(Interval::new(iv.start, t - 1));
            }
            if t < iv.stop {
                out.push(Interval::new(t + 1, iv.stop));
            }
        }
        self.intervals = out;
    }

    #[must_use]
    pub fn contains(&self, t: TokenType) -> bool {
        self.intervals
            .binary_search_by(|iv| {
                if t < iv.start {
                    std::cmp::Ordering::Greater
                } else if t > iv.stop {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Number of token types in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.iter().map(|iv| iv.len()).sum()
    }

    #[must_use]
    pub fn min_element(&self) -> Option<TokenType> {
        self.intervals.first().map(|iv| iv.start)
    }

    #[must_use]
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// Every member in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = TokenType> + '_ {
        self.intervals.iter().flat_map(|iv| iv.start..=iv.stop)
    }
}

impl FromIterator<TokenType> for IntervalSet {
    fn from_iter<I: IntoIterator<Item = TokenType>>(iter: I) -> Self {
        let mut set = Self::new();
        for t in iter {
            set.add(t);
        }
        set
    }
}

impl fmt::Display for IntervalSet {
    /// Numeric rendering; see [`crate::grammar::Vocabulary::format_set`] for names.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self
            .intervals
            .iter()
            .map(|iv| {
                if iv.start == iv.stop {
                    iv.start.to_string()
                } else {
                    format!("{}..{}", iv.start, iv.stop)
                }
            })
            .collect();
        if self.len() == 1 {
            f.write_str(&items[0])
        } else {
            write!(f, "{{{}}}", items.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{EOF, EPSILON};

    #[test]
    fn test_add_merges_adjacent() {
        let mut set = IntervalSet::new();
        set.add(1);
        set.add(3);
        set.add(2);
        assert_eq!(set.intervals(), &[Interval::new(1, 3)]);
    }

    #[test]
    fn test_add_range_overlapping() {
        let mut set = IntervalSet::of_range(5, 8);
        set.add_range(1, 2);
        set.add_range(2, 6);
        assert_eq!(set.intervals(), &[Interval::new(1, 8)]);
        assert_eq!(set.len(), 8);
    }

    #[test]
    fn test_remove_splits_interval() {
        let mut set = IntervalSet::of_range(1, 5);
        set.remove(3);
        assert_eq!(set.intervals(), &[Interval::new(1, 2), Interval::new(4, 5)]);
        assert!(!set.contains(3));
        assert!(set.contains(4));
    }

    #[test]
    fn test_special_types_sort_first() {
        let mut set = IntervalSet::of(4);
        set.add(EOF);
        set.add(EPSILON);
        assert_eq!(set.min_element(), Some(EPSILON));
        set.remove(EPSILON);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![EOF, 4]);
    }

    #[test]
    fn test_display() {
        assert_eq!(IntervalSet::of(2).to_string(), "2");
        let set: IntervalSet = [1, 2, 3, 7].into_iter().collect();
        assert_eq!(set.to_string(), "{1..3, 7}");
    }

    #[test]
    fn test_or_leaves_operands() {
        let a = IntervalSet::of(1);
        let b = IntervalSet::of(9);
        let c = a.or(&b);
        assert_eq!(a.len(), 1);
        assert_eq!(c.iter().collect::<Vec<_>>(), vec![1, 9]);
    }
}
