//! # Batch Parsing
//!
//! Independent parses of many inputs against one shared [`Grammar`], spread
//! over the rayon thread pool. Each input gets its own lexer, token stream
//! and parser; only the grammar's network and vocabulary are shared.

use crate::error::{AtnError, ParseMetrics, ParseResult};
use crate::grammar::Grammar;
use crate::parser::ParserConfig;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Outcome of parsing one input of a batch.
#[derive(Debug)]
pub struct InputParseResult {
    /// Caller-chosen identifier, such as a file path.
    pub id: String,
    pub result: Result<ParseResult, AtnError>,
    pub duration: Duration,
}

impl InputParseResult {
    /// Parsed without a single diagnostic.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.result.as_ref().is_ok_and(ParseResult::is_clean)
    }
}

/// Inputs to parse: `(id, text)` pairs, all from the same start rule.
#[derive(Debug, Clone, Default)]
pub struct ParseBatch {
    pub inputs: Vec<(String, String)>,
}

impl ParseBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.inputs.push((id.into(), text.into()));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Parse every input of `batch` from rule `start` in parallel.
///
/// Results come back in batch order.
#[must_use]
pub fn parse_batch(grammar: &Grammar, start: &str, batch: &ParseBatch, config: &ParserConfig) -> Vec<InputParseResult> {
    batch
        .inputs
        .par_iter()
        .map(|(id, text)| {
            let began = Instant::now();
            let result = grammar.parser(text).with_config(config.clone()).parse(start);
            InputParseResult {
                id: id.clone(),
                result,
                duration: began.elapsed(),
            }
        })
        .collect()
}

/// Counters summed over every successful parse of a batch.
#[must_use]
pub fn batch_metrics(results: &[InputParseResult]) -> ParseMetrics {
    let mut total = ParseMetrics::default();
    for result in results.iter().filter_map(|r| r.result.as_ref().ok()) {
        total.merge(&result.metrics);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Expr;

    #[test]
    fn test_batch_keeps_order() {
        let g = Grammar::builder("T")
            .rule("s", Expr::seq([Expr::lit("a"), Expr::lit("b")]))
            .build()
            .unwrap();
        let mut batch = ParseBatch::new();
        batch.add("good", "ab");
        batch.add("bad", "aab");
        batch.add("missing", "nope");
        let results = parse_batch(&g, "s", &batch, &ParserConfig::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "good");
        assert!(results[0].is_clean());
        assert_eq!(
            results[1].result.as_ref().unwrap().diagnostic_lines(),
            vec!["line 1:1 extraneous input 'a' expecting 'b'"]
        );
        assert!(!results[2].is_clean());
        assert_eq!(batch_metrics(&results).errors_recovered, 2);
    }
}
