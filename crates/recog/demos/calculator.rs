//! Calculator with error recovery
//!
//! Builds a left-recursive expression grammar, evaluates well-formed lines
//! through embedded actions, and shows what the parser reports for broken
//! ones.
//!
//! Run with `cargo run --example calculator`.

use recog::grammar::{Expr, Grammar};
use recog::lexer::{CharSet, Pattern};
use recog::parser::{ActionContext, SemanticHooks};
use recog::tree::ParseTree;

fn e() -> Expr {
    Expr::rule("e")
}

fn build_grammar() -> Result<Grammar, recog::GrammarError> {
    Grammar::builder("Calc")
        .rule("line", Expr::seq([e(), Expr::eof()]))
        .rule(
            "e",
            Expr::choice([
                Expr::right_assoc(Expr::seq([e(), Expr::lit("^"), e()])),
                Expr::seq([e(), Expr::label("op", Expr::choice([Expr::lit("*"), Expr::lit("/")])), e()]),
                Expr::seq([
                    e(),
                    Expr::label("op", Expr::choice([Expr::lit("+"), Expr::lit("-")])),
                    e(),
                    Expr::action("sum"),
                ]),
                Expr::seq([Expr::lit("("), e(), Expr::lit(")")]),
                Expr::token("INT"),
            ]),
        )
        .token("INT", Pattern::class(CharSet::digits()).plus())
        .skip("WS", Pattern::class(CharSet::whitespace()).plus())
        .build()
}

/// Evaluate a parse tree of `e`.
fn eval(tree: &ParseTree) -> Option<i64> {
    match tree.children() {
        [leaf] => leaf.token()?.text.parse().ok(),
        [open, inner, _] if open.token().is_some_and(|t| t.text == "(") => eval(inner),
        [lhs, op, rhs] => {
            let (l, r) = (eval(lhs)?, eval(rhs)?);
            match op.token()?.text.as_str() {
                "+" => l.checked_add(r),
                "-" => l.checked_sub(r),
                "*" => l.checked_mul(r),
                "/" => l.checked_div(r),
                "^" => u32::try_from(r).ok().and_then(|r| l.checked_pow(r)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Prints the text of every sum as soon as it is complete.
struct Tracer;

impl SemanticHooks for Tracer {
    fn action(&mut self, ctx: &ActionContext<'_>, text: &str) {
        let op = ctx.label("op").map_or("?", |t| t.text.as_str());
        println!("   {text} ({op}): {}", ctx.text());
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Calculator ===\n");
    let grammar = build_grammar()?;
    println!("Token types: {}\n", grammar.vocabulary().name_map());

    for input in ["1 + 2 * 3", "2 ^ 3 ^ 2", "(1 + 2) * 3", "1 + * 2", "(1 + 2", "4 4"] {
        println!("{input}");
        let result = grammar.parser(input).parse_with("line", &mut Tracer)?;
        for line in result.diagnostic_lines() {
            println!("   error: {line}");
        }
        if let Some(tree) = &result.tree {
            println!("   tree:  {}", tree.to_string_tree());
            if result.is_clean()
                && let Some(value) = tree.children().first().and_then(eval)
            {
                println!("   value: {value}");
            }
        }
        println!(
            "   {} tokens, {} decisions, max look-ahead {}\n",
            result.metrics.tokens_consumed, result.metrics.decisions, result.metrics.max_lookahead
        );
    }
    Ok(())
}
