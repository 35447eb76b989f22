//! Lexer rule patterns and their matcher.
//!
//! Patterns are matched by simulating all paths at once: each pattern maps a
//! set of start positions to the set of end positions it can reach. The
//! matcher also records how far any partial path got, which is what a token
//! recognition error reports and skips.

use compact_str::CompactString;
use smallvec::SmallVec;

type Positions = SmallVec<[usize; 4]>;

/// Character class such as `[a-z0-9_]` or `~[\n]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharSet {
    ranges: Vec<(char, char)>,
    negated: bool,
}

impl CharSet {
    /// Create a character set from inclusive ranges.
    #[must_use]
    pub const fn new(ranges: Vec<(char, char)>) -> Self {
        Self {
            ranges,
            negated: false,
        }
    }

    /// Set of the given characters.
    #[must_use]
    pub fn of(chars: &str) -> Self {
        Self::new(chars.chars().map(|c| (c, c)).collect())
    }

    #[must_use]
    pub fn digits() -> Self {
        Self::new(vec![('0', '9')])
    }

    /// `[ \t\r\n]`
    #[must_use]
    pub fn whitespace() -> Self {
        Self::of(" \t\r\n")
    }

    /// Match every character *not* in this set.
    #[must_use]
    pub const fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    #[must_use]
    pub fn matches(&self, c: char) -> bool {
        let hit = self.ranges.iter().any(|&(lo, hi)| c >= lo && c <= hi);
        hit != self.negated
    }
}

/// Pattern of a lexer rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Literal(CompactString),
    CharClass(CharSet),
    Repeat {
        pattern: Box<Pattern>,
        min: usize,
        max: Option<usize>,
    },
    Seq(Vec<Pattern>),
    Alt(Vec<Pattern>),
    /// Reference to a `fragment` rule, inlined when the grammar is built.
    Fragment(CompactString),
    /// Any single character.
    Any,
}

impl Pattern {
    #[must_use]
    pub fn literal(text: &str) -> Self {
        Self::Literal(CompactString::new(text))
    }

    /// `'lo'..'hi'`
    #[must_use]
    pub fn range(lo: char, hi: char) -> Self {
        Self::CharClass(CharSet::new(vec![(lo, hi)]))
    }

    #[must_use]
    pub const fn class(set: CharSet) -> Self {
        Self::CharClass(set)
    }

    #[must_use]
    pub fn fragment(name: &str) -> Self {
        Self::Fragment(CompactString::new(name))
    }

    #[must_use]
    pub fn seq(items: impl IntoIterator<Item = Self>) -> Self {
        Self::Seq(items.into_iter().collect())
    }

    #[must_use]
    pub fn alt(items: impl IntoIterator<Item = Self>) -> Self {
        Self::Alt(items.into_iter().collect())
    }

    /// `p+`
    #[must_use]
    pub fn plus(self) -> Self {
        Self::Repeat {
            pattern: Box::new(self),
            min: 1,
            max: None,
        }
    }

    /// `p*`
    #[must_use]
    pub fn star(self) -> Self {
        Self::Repeat {
            pattern: Box::new(self),
            min: 0,
            max: None,
        }
    }

    /// `p?`
    #[must_use]
    pub fn opt(self) -> Self {
        Self::Repeat {
            pattern: Box::new(self),
            min: 0,
            max: Some(1),
        }
    }

    /// The literal text if the pattern is exactly one literal.
    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the pattern can match without consuming anything.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        match self {
            Self::Literal(s) => s.is_empty(),
            Self::CharClass(_) | Self::Any | Self::Fragment(_) => false,
            Self::Repeat { pattern, min, .. } => *min == 0 || pattern.is_nullable(),
            Self::Seq(items) => items.iter().all(Self::is_nullable),
            Self::Alt(items) => items.is_empty() || items.iter().any(Self::is_nullable),
        }
    }

    /// Longest match of this pattern at `pos`, or `None`.
    ///
    /// `furthest` is raised to the furthest position any partial path reached.
    pub(crate) fn longest_match(&self, input: &[char], pos: usize, furthest: &mut usize) -> Option<usize> {
        let mut starts = Positions::new();
        starts.push(pos);
        self.ends(input, &starts, furthest)
            .into_iter()
            .filter(|&end| end > pos)
            .max()
            .map(|end| end - pos)
    }

    fn ends(&self, input: &[char], starts: &[usize], furthest: &mut usize) -> Positions {
        let mut out = Positions::new();
        match self {
            Self::Literal(text) => {
                for &start in starts {
                    let mut at = start;
                    let mut complete = true;
                    for expected in text.chars() {
                        if input.get(at) == Some(&expected) {
                            at += 1;
                        } else {
                            complete = false;
                            break;
                        }
                    }
                    *furthest = (*furthest).max(at);
                    if complete {
                        push_unique(&mut out, at);
                    }
                }
            }
            Self::CharClass(set) => {
                for &start in starts {
                    if input.get(start).is_some_and(|&c| set.matches(c)) {
                        *furthest = (*furthest).max(start + 1);
                        push_unique(&mut out, start + 1);
                    }
                }
            }
            Self::Any => {
                for &start in starts {
                    if start < input.len() {
                        *furthest = (*furthest).max(start + 1);
                        push_unique(&mut out, start + 1);
                    }
                }
            }
            Self::Seq(items) => {
                out.extend_from_slice(starts);
                for item in items {
                    out = item.ends(input, &out, furthest);
                    if out.is_empty() {
                        break;
                    }
                }
            }
            Self::Alt(items) => {
                for item in items {
                    for end in item.ends(input, starts, furthest) {
                        push_unique(&mut out, end);
                    }
                }
            }
            Self::Repeat { pattern, min, max } => {
                if *min == 0 {
                    out.extend_from_slice(starts);
                }
                let mut frontier: Positions = starts.iter().copied().collect();
                let mut seen: Positions = Positions::new();
                let mut count = 0usize;
                while !frontier.is_empty() {
                    count += 1;
                    if max.is_some_and(|m| count > m) {
                        break;
                    }
                    let next = pattern.ends(input, &frontier, furthest);
                    frontier = Positions::new();
                    for end in next {
                        if count > *min && seen.contains(&end) {
                            continue;
                        }
                        if count >= *min {
                            push_unique(&mut out, end);
                            push_unique(&mut seen, end);
                        }
                        push_unique(&mut frontier, end);
                    }
                    if count > input.len() + *min {
                        break;
                    }
                }
            }
            // Fragments are inlined before matching; an unresolved one never matches.
            Self::Fragment(_) => {}
        }
        out
    }

    /// Replace fragment references using `lookup`.
    pub(crate) fn resolve<E>(
        &self,
        lookup: &mut impl FnMut(&str) -> Result<Self, E>,
    ) -> Result<Self, E> {
        Ok(match self {
            Self::Fragment(name) => lookup(name)?,
            Self::Repeat { pattern, min, max } => Self::Repeat {
                pattern: Box::new(pattern.resolve(lookup)?),
                min: *min,
                max: *max,
            },
            Self::Seq(items) => Self::Seq(
                items
                    .iter()
                    .map(|p| p.resolve(lookup))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Alt(items) => Self::Alt(
                items
                    .iter()
                    .map(|p| p.resolve(lookup))
                    .collect::<Result<_, _>>()?,
            ),
            other => other.clone(),
        })
    }
}

fn push_unique(out: &mut Positions, p: usize) {
    if !out.contains(&p) {
        out.push(p);
    }
}
