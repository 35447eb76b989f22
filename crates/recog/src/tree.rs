//! # Parse Trees
//!
//! Concrete parse trees produced by the interpreter and the stack-based
//! builder that assembles them.
//!
//! A tree is always produced, even for erroneous input: tokens discarded by
//! recovery and tokens conjured for missing input appear as
//! [`ParseTree::Error`] leaves, so the tree text still reflects everything the
//! parser consumed.

use crate::lexer::{Token, escape_whitespace};
use compact_str::CompactString;
use smallvec::SmallVec;
use std::fmt::Write as _;
use thiserror::Error;

/// Error raised by a malformed sequence of builder calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("builder must end with exactly one finished root, but {open} nodes are still open")]
    UnfinishedNodes { open: usize },

    #[error("finish_rule() called without a matching start_rule()")]
    UnmatchedFinish,

    #[error("token added outside of any rule node")]
    TokenWithoutParent,

    #[error("no rule was ever started")]
    Empty,
}

/// Node or leaf of a parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseTree {
    Rule(RuleNode),
    /// A token matched normally.
    Terminal(Token),
    /// A token skipped or conjured by error recovery.
    Error(Token),
}

/// One rule invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleNode {
    pub rule: CompactString,
    /// Alternative chosen at the rule's first decision (1 if it has none).
    pub alt: usize,
    pub children: Vec<ParseTree>,
    /// A recognition error was raised inside this invocation.
    pub has_error: bool,
}

impl ParseTree {
    /// Rule name for rule nodes.
    #[must_use]
    pub fn rule_name(&self) -> Option<&str> {
        match self {
            Self::Rule(node) => Some(&node.rule),
            Self::Terminal(_) | Self::Error(_) => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Rule(node) => &node.children,
            Self::Terminal(_) | Self::Error(_) => &[],
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<&Token> {
        match self {
            Self::Terminal(t) | Self::Error(t) => Some(t),
            Self::Rule(_) => None,
        }
    }

    /// Concatenated text of every leaf, excluding EOF.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Rule(node) => node.children.iter().for_each(|c| c.collect_text(out)),
            Self::Terminal(t) | Self::Error(t) => {
                if !t.is_eof() {
                    out.push_str(&t.text);
                }
            }
        }
    }

    /// LISP-style rendering: `(rule child child ...)`.
    ///
    /// ```rust
    /// use recog::lexer::Token;
    /// use recog::tree::TreeBuilder;
    ///
    /// let mut b = TreeBuilder::new();
    /// b.start_rule("a");
    /// b.token(Token::new(1, "x", 0, 0, 1, 0)).unwrap();
    /// b.finish_rule().unwrap();
    /// assert_eq!(b.finish().unwrap().to_string_tree(), "(a x)");
    /// ```
    #[must_use]
    pub fn to_string_tree(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out);
        out
    }

    fn write_tree(&self, out: &mut String) {
        match self {
            Self::Rule(node) if node.children.is_empty() => out.push_str(&node.rule),
            Self::Rule(node) => {
                let _ = write!(out, "({}", node.rule);
                for child in &node.children {
                    out.push(' ');
                    child.write_tree(out);
                }
                out.push(')');
            }
            Self::Terminal(t) | Self::Error(t) => out.push_str(&escape_whitespace(&t.text)),
        }
    }

    /// Number of error leaves in the tree.
    #[must_use]
    pub fn error_count(&self) -> usize {
        match self {
            Self::Rule(node) => node.children.iter().map(Self::error_count).sum(),
            Self::Error(_) => 1,
            Self::Terminal(_) => 0,
        }
    }
}

struct OpenNode {
    rule: CompactString,
    alt: usize,
    children: SmallVec<[ParseTree; 4]>,
    has_error: bool,
}

impl OpenNode {
    fn close(self) -> ParseTree {
        ParseTree::Rule(RuleNode {
            rule: self.rule,
            alt: self.alt,
            children: self.children.into_vec(),
            has_error: self.has_error,
        })
    }
}

/// Stack-based parse tree builder.
///
/// Rules are opened and closed in nesting order; leaves go to the innermost
/// open rule. Closing the outermost rule makes it the root.
#[derive(Default)]
pub struct TreeBuilder {
    stack: SmallVec<[OpenNode; 8]>,
    root: Option<ParseTree>,
}

impl TreeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_rule(&mut self, rule: &str) {
        self.stack.push(OpenNode {
            rule: CompactString::new(rule),
            alt: 0,
            children: SmallVec::new(),
            has_error: false,
        });
    }

    /// Close the innermost rule and attach it to its parent.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::UnmatchedFinish`] if no rule is open.
    pub fn finish_rule(&mut self) -> Result<(), BuilderError> {
        let node = self.stack.pop().ok_or(BuilderError::UnmatchedFinish)?;
        let tree = node.close();
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(tree),
            None => self.root = Some(tree),
        }
        Ok(())
    }

    fn current(&mut self) -> Result<&mut OpenNode, BuilderError> {
        self.stack.last_mut().ok_or(BuilderError::TokenWithoutParent)
    }

    /// Attach a matched token.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::TokenWithoutParent`] if no rule is open.
    pub fn token(&mut self, token: Token) -> Result<(), BuilderError> {
        self.current()?.children.push(ParseTree::Terminal(token));
        Ok(())
    }

    /// Attach a token consumed or conjured by recovery.
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::TokenWithoutParent`] if no rule is open.
    pub fn error_token(&mut self, token: Token) -> Result<(), BuilderError> {
        self.current()?.children.push(ParseTree::Error(token));
        Ok(())
    }

    /// Replace the innermost rule by a fresh node of the same rule whose first
    /// child is the old node (one more level of a left-recursive loop).
    ///
    /// # Errors
    ///
    /// Returns [`BuilderError::TokenWithoutParent`] if no rule is open.
    pub fn wrap_current(&mut self) -> Result<(), BuilderError> {
        let inner = self.stack.pop().ok_or(BuilderError::TokenWithoutParent)?;
        let rule = inner.rule.clone();
        let alt = inner.alt;
        let mut children = SmallVec::new();
        children.push(inner.close());
        self.stack.push(OpenNode {
            rule,
            alt,
            children,
            has_error: false,
        });
        Ok(())
    }

    /// Record the alternative of the innermost rule, if not yet set.
    pub fn set_alt(&mut self, alt: usize) {
        if let Some(node) = self.stack.last_mut()
            && node.alt == 0
        {
            node.alt = alt;
        }
    }

    pub fn mark_error(&mut self) {
        if let Some(node) = self.stack.last_mut() {
            node.has_error = true;
        }
    }

    /// Number of rules currently open.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Take the finished root.
    ///
    /// # Errors
    ///
    /// Returns an error if rules are still open or nothing was built.
    pub fn finish(self) -> Result<ParseTree, BuilderError> {
        if !self.stack.is_empty() {
            return Err(BuilderError::UnfinishedNodes {
                open: self.stack.len(),
            });
        }
        let mut root = self.root.ok_or(BuilderError::Empty)?;
        if let ParseTree::Rule(node) = &mut root {
            node.alt = node.alt.max(1);
        }
        Ok(root)
    }
}
