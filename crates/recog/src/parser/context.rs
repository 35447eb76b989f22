use crate::lexer::Token;
use compact_str::CompactString;

/// Callbacks for embedded actions and semantic predicates.
///
/// Actions and predicates are identified by their text, as written in the
/// grammar. Both methods have defaults: actions do nothing and predicates
/// hold.
///
/// Predicates are also evaluated during prediction, before any input is
/// consumed by the decision, so they should not depend on side effects of
/// actions in the alternative being predicted.
pub trait SemanticHooks {
    /// Run the action `text`.
    fn action(&mut self, _ctx: &ActionContext<'_>, _text: &str) {}

    /// Evaluate predicate `text` of `rule`.
    fn predicate(&mut self, _rule: &str, _text: &str) -> bool {
        true
    }
}

/// Hooks that ignore every action and let every predicate pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl SemanticHooks for NoHooks {}

/// What an embedded action can see of the rule invocation it runs in.
#[derive(Debug)]
pub struct ActionContext<'a> {
    pub(crate) rule: &'a str,
    pub(crate) last_token: Option<&'a Token>,
    pub(crate) labels: &'a [(CompactString, Token)],
    pub(crate) expected: String,
    pub(crate) text: String,
}

impl ActionContext<'_> {
    #[must_use]
    pub const fn rule_name(&self) -> &str {
        self.rule
    }

    /// The token most recently matched in this invocation, conjured ones
    /// included.
    #[must_use]
    pub const fn last_token(&self) -> Option<&Token> {
        self.last_token
    }

    /// Token bound to `name` by a label such as `x='b'`.
    #[must_use]
    pub fn label(&self, name: &str) -> Option<&Token> {
        self.labels
            .iter()
            .rev()
            .find(|(label, _)| label == name)
            .map(|(_, token)| token)
    }

    /// Tokens acceptable at the action's position, rendered like a
    /// diagnostic's expected set: `'b'` or `{'b', 'c'}`.
    #[must_use]
    pub fn expected_tokens(&self) -> &str {
        &self.expected
    }

    /// Input text matched by this invocation so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}
