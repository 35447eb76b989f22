//! Token vocabulary: the mapping between token types, symbolic names and
//! literal spellings shared by every rule of a (possibly composed) grammar.

use crate::atn::IntervalSet;
use crate::lexer::{EOF, EPSILON, MIN_USER_TOKEN_TYPE, TokenType};
use compact_str::CompactString;
use hashbrown::HashMap;

/// Name and literal tables indexed by token type.
///
/// Slot 0 is unused so that a token type indexes its own entry.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    symbolic: Vec<Option<CompactString>>,
    literal: Vec<Option<CompactString>>,
    by_name: HashMap<CompactString, TokenType, ahash::RandomState>,
    by_literal: HashMap<CompactString, TokenType, ahash::RandomState>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocabulary {
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbolic: vec![None],
            literal: vec![None],
            by_name: HashMap::with_hasher(ahash::RandomState::new()),
            by_literal: HashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    /// Highest token type defined so far.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn max_token_type(&self) -> TokenType {
        (self.symbolic.len() - 1) as TokenType
    }

    fn next_type(&mut self) -> TokenType {
        self.symbolic.push(None);
        self.literal.push(None);
        self.max_token_type()
    }

    #[allow(clippy::cast_sign_loss)]
    fn slot(t: TokenType) -> Option<usize> {
        (t >= MIN_USER_TOKEN_TYPE).then_some(t as usize)
    }

    /// Define a symbolic token name, returning the existing type if already known.
    pub fn define_name(&mut self, name: &str) -> TokenType {
        if let Some(&t) = self.by_name.get(name) {
            return t;
        }
        let t = self.next_type();
        if let Some(slot) = Self::slot(t) {
            self.symbolic[slot] = Some(CompactString::new(name));
        }
        self.by_name.insert(CompactString::new(name), t);
        t
    }

    /// Define an anonymous literal token (the `'a'` in a parser rule).
    ///
    /// `literal` is the raw text without quotes.
    pub fn define_literal(&mut self, literal: &str) -> TokenType {
        if let Some(&t) = self.by_literal.get(literal) {
            return t;
        }
        let t = self.next_type();
        if let Some(slot) = Self::slot(t) {
            self.literal[slot] = Some(CompactString::new(literal));
        }
        self.by_literal.insert(CompactString::new(literal), t);
        t
    }

    /// Give an existing named type a literal spelling (`B : 'b' ;`).
    pub fn alias_literal(&mut self, t: TokenType, literal: &str) {
        if let Some(slot) = Self::slot(t)
            && slot < self.literal.len()
            && !self.by_literal.contains_key(literal)
        {
            self.literal[slot] = Some(CompactString::new(literal));
            self.by_literal.insert(CompactString::new(literal), t);
        }
    }

    #[must_use]
    pub fn type_of_name(&self, name: &str) -> Option<TokenType> {
        if name == "EOF" {
            return Some(EOF);
        }
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn type_of_literal(&self, literal: &str) -> Option<TokenType> {
        self.by_literal.get(literal).copied()
    }

    #[must_use]
    pub fn symbolic_name(&self, t: TokenType) -> Option<&str> {
        if t == EOF {
            return Some("EOF");
        }
        Self::slot(t)
            .and_then(|s| self.symbolic.get(s))
            .and_then(|n| n.as_deref())
    }

    /// Literal spelling in quotes, e.g. `'b'`.
    #[must_use]
    pub fn literal_name(&self, t: TokenType) -> Option<String> {
        Self::slot(t)
            .and_then(|s| self.literal.get(s))
            .and_then(|n| n.as_deref())
            .map(|lit| format!("'{lit}'"))
    }

    /// Name used in diagnostics: literal if one exists, else symbolic, else the number.
    #[must_use]
    pub fn display_name(&self, t: TokenType) -> String {
        match t {
            EOF => "<EOF>".to_string(),
            EPSILON => "<EPSILON>".to_string(),
            _ => self
                .literal_name(t)
                .or_else(|| self.symbolic_name(t).map(str::to_string))
                .unwrap_or_else(|| t.to_string()),
        }
    }

    /// Render an expected set: a single type by itself, several as `{a, b, c}`
    /// in ascending type order.
    ///
    /// ```rust
    /// use recog::atn::IntervalSet;
    /// use recog::grammar::Vocabulary;
    ///
    /// let mut vocab = Vocabulary::new();
    /// let b = vocab.define_literal("b");
    /// let c = vocab.define_literal("c");
    /// assert_eq!(vocab.format_set(&IntervalSet::of(b)), "'b'");
    /// let set: IntervalSet = [c, b].into_iter().collect();
    /// assert_eq!(vocab.format_set(&set), "{'b', 'c'}");
    /// ```
    #[must_use]
    pub fn format_set(&self, set: &IntervalSet) -> String {
        let names: Vec<String> = set.iter().map(|t| self.display_name(t)).collect();
        if names.len() == 1 {
            names.into_iter().next().unwrap_or_default()
        } else {
            format!("{{{}}}", names.join(", "))
        }
    }

    /// `{EOF=-1, NAME=type, ...}` in type order, useful when checking that
    /// composed grammars agree on types.
    #[must_use]
    pub fn name_map(&self) -> String {
        let mut entries = vec!["EOF=-1".to_string()];
        for (t, name) in self.symbolic.iter().enumerate().skip(1) {
            if let Some(name) = name {
                entries.push(format!("{name}={t}"));
            }
        }
        format!("{{{}}}", entries.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_assigned_in_definition_order() {
        let mut vocab = Vocabulary::new();
        assert_eq!(vocab.define_literal("a"), 1);
        assert_eq!(vocab.define_name("ID"), 2);
        assert_eq!(vocab.define_literal("a"), 1);
        assert_eq!(vocab.define_name("ID"), 2);
        assert_eq!(vocab.max_token_type(), 2);
    }

    #[test]
    fn test_display_name_prefers_literal() {
        let mut vocab = Vocabulary::new();
        let kw = vocab.define_name("HARDWARE");
        vocab.alias_literal(kw, "hardware");
        let id = vocab.define_name("ID");
        assert_eq!(vocab.display_name(kw), "'hardware'");
        assert_eq!(vocab.display_name(id), "ID");
        assert_eq!(vocab.display_name(EOF), "<EOF>");
        assert_eq!(vocab.display_name(42), "42");
    }

    #[test]
    fn test_format_set_orders_eof_first() {
        let mut vocab = Vocabulary::new();
        vocab.define_literal("a");
        let b = vocab.define_literal("b");
        let set: IntervalSet = [b, EOF].into_iter().collect();
        assert_eq!(vocab.format_set(&set), "{<EOF>, 'b'}");
    }

    #[test]
    fn test_name_map() {
        let mut vocab = Vocabulary::new();
        vocab.define_name("B");
        vocab.define_name("A");
        assert_eq!(vocab.name_map(), "{EOF=-1, B=1, A=2}");
        assert_eq!(vocab.type_of_name("EOF"), Some(EOF));
    }
}
