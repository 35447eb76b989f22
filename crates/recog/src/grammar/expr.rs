use compact_str::CompactString;

/// Parser rule expression.
///
/// Built with the constructor functions rather than the variants directly:
///
/// ```rust
/// use recog::grammar::Expr;
///
/// // a : 'a' x=('b'|'c') {show} 'd' ;
/// let body = Expr::seq([
///     Expr::lit("a"),
///     Expr::label("x", Expr::choice([Expr::lit("b"), Expr::lit("c")])),
///     Expr::action("show"),
///     Expr::lit("d"),
/// ]);
/// assert!(matches!(body, Expr::Seq(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Quoted literal; defines an implicit token unless a lexer rule spells it.
    Literal(CompactString),
    /// Named token reference.
    Token(CompactString),
    /// Rule reference; `precedence` is only meaningful for left-recursive rules.
    Rule {
        name: CompactString,
        precedence: i32,
    },
    Seq(Vec<Expr>),
    Choice(Vec<Expr>),
    Opt(Box<Expr>),
    Star(Box<Expr>),
    Plus(Box<Expr>),
    /// `.` : any token but EOF.
    Wildcard,
    Eof,
    Empty,
    Action(CompactString),
    Predicate(CompactString),
    /// `name=element`, on a token or a set of tokens.
    Label(CompactString, Box<Expr>),
    /// `<assoc=right>` on a binary alternative of a left-recursive rule.
    RightAssoc(Box<Expr>),
    /// `{precpred(p)}?`, produced by the left-recursion rewrite.
    PrecedencePredicate(i32),
    /// Operator loop of a rewritten left-recursive rule.
    PrecedenceLoop(Box<Expr>),
}

impl Expr {
    #[must_use]
    pub fn lit(text: &str) -> Self {
        Self::Literal(CompactString::new(text))
    }

    #[must_use]
    pub fn token(name: &str) -> Self {
        Self::Token(CompactString::new(name))
    }

    #[must_use]
    pub fn rule(name: &str) -> Self {
        Self::Rule {
            name: CompactString::new(name),
            precedence: 0,
        }
    }

    #[must_use]
    pub fn seq(items: impl IntoIterator<Item = Self>) -> Self {
        Self::Seq(items.into_iter().collect())
    }

    #[must_use]
    pub fn choice(alts: impl IntoIterator<Item = Self>) -> Self {
        Self::Choice(alts.into_iter().collect())
    }

    #[must_use]
    pub fn opt(inner: Self) -> Self {
        Self::Opt(Box::new(inner))
    }

    #[must_use]
    pub fn star(inner: Self) -> Self {
        Self::Star(Box::new(inner))
    }

    #[must_use]
    pub fn plus(inner: Self) -> Self {
        Self::Plus(Box::new(inner))
    }

    #[must_use]
    pub const fn wildcard() -> Self {
        Self::Wildcard
    }

    #[must_use]
    pub const fn eof() -> Self {
        Self::Eof
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self::Empty
    }

    /// Embedded action; `text` is handed to the semantic hooks when executed.
    #[must_use]
    pub fn action(text: &str) -> Self {
        Self::Action(CompactString::new(text))
    }

    /// Semantic predicate; `text` is handed to the semantic hooks.
    #[must_use]
    pub fn predicate(text: &str) -> Self {
        Self::Predicate(CompactString::new(text))
    }

    #[must_use]
    pub fn label(name: &str, inner: Self) -> Self {
        Self::Label(CompactString::new(name), Box::new(inner))
    }

    /// Mark a binary alternative of a left-recursive rule as right-associative.
    #[must_use]
    pub fn right_assoc(alt: Self) -> Self {
        Self::RightAssoc(Box::new(alt))
    }

    /// Top-level alternatives: the items of a choice, else the expression itself.
    pub(crate) fn alternatives(&self) -> &[Self] {
        match self {
            Self::Choice(alts) => alts,
            other => std::slice::from_ref(other),
        }
    }

    /// Elements of one alternative, with any sequence nesting flattened.
    pub(crate) fn elements(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into<'a>(&'a self, out: &mut Vec<&'a Self>) {
        match self {
            Self::Seq(items) => items.iter().for_each(|i| i.flatten_into(out)),
            Self::RightAssoc(inner) => inner.flatten_into(out),
            other => out.push(other),
        }
    }

    /// Token-only choice that compiles to a single set transition.
    pub(crate) fn is_token_set(&self) -> bool {
        match self {
            Self::Choice(alts) => {
                alts.len() > 1
                    && alts
                        .iter()
                        .all(|a| matches!(a, Self::Literal(_) | Self::Token(_)))
            }
            _ => false,
        }
    }

    /// Visit every sub-expression, pre-order.
    pub(crate) fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Self)) {
        f(self);
        match self {
            Self::Seq(items) | Self::Choice(items) => items.iter().for_each(|i| i.walk(f)),
            Self::Opt(inner)
            | Self::Star(inner)
            | Self::Plus(inner)
            | Self::Label(_, inner)
            | Self::RightAssoc(inner)
            | Self::PrecedenceLoop(inner) => inner.walk(f),
            _ => {}
        }
    }
}
