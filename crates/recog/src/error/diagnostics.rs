//! # Diagnostic Channel
//!
//! One-line syntax diagnostics and the listeners that receive them.
//!
//! A parse appends every diagnostic to its own ordered log (returned in
//! [`crate::error::ParseResult`]) and also forwards it to any registered
//! [`ErrorListener`], in the same order.

use std::fmt;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic as MietteDiagnostic;

/// What kind of event a diagnostic describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    TokenRecognition,
    MismatchedInput,
    ExtraneousInput,
    MissingToken,
    NoViableAlternative,
    FailedPredicate,
}

impl DiagnosticKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::TokenRecognition => "lexer::token_recognition",
            Self::MismatchedInput => "parser::mismatched_input",
            Self::ExtraneousInput => "parser::extraneous_input",
            Self::MissingToken => "parser::missing_token",
            Self::NoViableAlternative => "parser::no_viable_alternative",
            Self::FailedPredicate => "parser::failed_predicate",
        }
    }
}

/// A single reported problem, positioned at its offending token.
///
/// # Examples
///
/// ```rust
/// use recog::error::{Diagnostic, DiagnosticKind};
///
/// let d = Diagnostic::new(DiagnosticKind::MissingToken, 1, 1, "missing 'b' at 'c'");
/// assert_eq!(d.to_string(), "line 1:1 missing 'b' at 'c'");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}:{column} {message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// 1-based.
    pub line: usize,
    /// 0-based.
    pub column: usize,
    pub message: String,
    /// Stream index of the offending token, `None` for lexer errors.
    pub token_index: Option<isize>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            column,
            message: message.into(),
            token_index: None,
        }
    }

    #[must_use]
    pub const fn with_token_index(mut self, index: isize) -> Self {
        self.token_index = Some(index);
        self
    }
}

#[cfg(feature = "diagnostics")]
impl MietteDiagnostic for Diagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }
}

/// Receives diagnostics as they are reported.
pub trait ErrorListener {
    fn syntax_error(&mut self, diagnostic: &Diagnostic);
}

/// Keeps every diagnostic, in order.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// All diagnostics joined as lines, each ending in `\n`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for d in &self.diagnostics {
            out.push_str(&d.to_string());
            out.push('\n');
        }
        out
    }
}

impl ErrorListener for DiagnosticCollector {
    fn syntax_error(&mut self, diagnostic: &Diagnostic) {
        self.diagnostics.push(diagnostic.clone());
    }
}

/// Prints each diagnostic to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleErrorListener;

impl ErrorListener for ConsoleErrorListener {
    fn syntax_error(&mut self, diagnostic: &Diagnostic) {
        eprintln!("{diagnostic}");
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::new(
            DiagnosticKind::NoViableAlternative,
            1,
            2,
            "no viable alternative at input 'abe'",
        );
        assert_eq!(d.to_string(), "line 1:2 no viable alternative at input 'abe'");
    }

    #[test]
    fn test_collector_keeps_order() {
        let mut c = DiagnosticCollector::new();
        c.syntax_error(&Diagnostic::new(DiagnosticKind::ExtraneousInput, 1, 1, "first"));
        c.syntax_error(&Diagnostic::new(DiagnosticKind::TokenRecognition, 1, 3, "second"));
        assert_eq!(c.render(), "line 1:1 first\nline 1:3 second\n");
        assert_eq!(c.into_inner().len(), 2);
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(DiagnosticKind::MissingToken.to_string(), "parser::missing_token");
    }
}
