//! # Testing Utilities
//!
//! [`ParseHarness`] runs a grammar on a text input the way a behavioral test
//! observes a parser: what the embedded actions printed, and what the error
//! listener printed.
//!
//! ```rust
//! use recog::grammar::{Expr, Grammar};
//! use recog::testing::ParseHarness;
//!
//! let grammar = Grammar::builder("T")
//!     .rule("a", Expr::seq([Expr::lit("a"), Expr::action("done"), Expr::lit("b")]))
//!     .build()
//!     .unwrap();
//! let run = ParseHarness::new(grammar)
//!     .on_action("done", |ctx| ctx.text().to_string())
//!     .run("a", "ab")
//!     .unwrap();
//! assert_eq!(run.output, vec!["a"]);
//! assert!(run.errors.is_empty());
//! ```

use crate::error::{AtnError, ParseResult};
use crate::grammar::Grammar;
use crate::parser::{ActionContext, ParserConfig, SemanticHooks};
use compact_str::CompactString;

type ActionFn = Box<dyn Fn(&ActionContext<'_>) -> String + Send + Sync>;

/// Grammar plus scripted actions and predicates.
pub struct ParseHarness {
    grammar: Grammar,
    actions: Vec<(CompactString, ActionFn)>,
    predicates: Vec<(CompactString, bool)>,
    config: ParserConfig,
}

/// What one harness run observed.
#[derive(Debug)]
pub struct HarnessRun {
    /// One line per executed action, in execution order.
    pub output: Vec<String>,
    /// Diagnostic lines, `line L:C message`.
    pub errors: Vec<String>,
    pub result: ParseResult,
}

impl ParseHarness {
    #[must_use]
    pub fn new(grammar: Grammar) -> Self {
        Self {
            grammar,
            actions: Vec::new(),
            predicates: Vec::new(),
            config: ParserConfig::default(),
        }
    }

    /// Print the result of `f` whenever action `text` runs.
    #[must_use]
    pub fn on_action(
        mut self,
        text: &str,
        f: impl Fn(&ActionContext<'_>) -> String + Send + Sync + 'static,
    ) -> Self {
        self.actions.push((CompactString::new(text), Box::new(f)));
        self
    }

    /// Make predicate `text` evaluate to `value`. Unlisted predicates hold.
    #[must_use]
    pub fn predicate(mut self, text: &str, value: bool) -> Self {
        self.predicates.push((CompactString::new(text), value));
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Parse `input` from rule `start`.
    ///
    /// # Errors
    ///
    /// Whatever [`crate::parser::Parser::parse`] returns.
    pub fn run(&self, start: &str, input: &str) -> Result<HarnessRun, AtnError> {
        let mut hooks = ScriptedHooks {
            harness: self,
            output: Vec::new(),
        };
        let result = self
            .grammar
            .parser(input)
            .with_config(self.config.clone())
            .parse_with(start, &mut hooks)?;
        Ok(HarnessRun {
            output: hooks.output,
            errors: result.diagnostic_lines(),
            result,
        })
    }
}

struct ScriptedHooks<'h> {
    harness: &'h ParseHarness,
    output: Vec<String>,
}

impl SemanticHooks for ScriptedHooks<'_> {
    fn action(&mut self, ctx: &ActionContext<'_>, text: &str) {
        if let Some((_, f)) = self.harness.actions.iter().find(|(t, _)| t == text) {
            self.output.push(f(ctx));
        }
    }

    fn predicate(&mut self, _rule: &str, text: &str) -> bool {
        self.harness
            .predicates
            .iter()
            .find(|(t, _)| t == text)
            .is_none_or(|(_, value)| *value)
    }
}
