#![no_main]
use libfuzzer_sys::fuzz_target;
use recog::grammar::{Expr, Grammar};
use recog::lexer::{CharSet, Pattern, Token};
use std::sync::OnceLock;

fn grammar() -> &'static Grammar {
    static GRAMMAR: OnceLock<Grammar> = OnceLock::new();
    GRAMMAR.get_or_init(|| {
        let e = || Expr::rule("e");
        Grammar::builder("Fuzz")
            .rule("prog", Expr::seq([Expr::star(Expr::rule("stat")), Expr::eof()]))
            .rule(
                "stat",
                Expr::choice([
                    Expr::seq([Expr::token("ID"), Expr::lit("="), e(), Expr::lit(";")]),
                    Expr::seq([Expr::lit("{"), Expr::star(Expr::rule("stat")), Expr::lit("}")]),
                    Expr::seq([e(), Expr::lit(";")]),
                ]),
            )
            .rule(
                "e",
                Expr::choice([
                    Expr::right_assoc(Expr::seq([e(), Expr::lit("^"), e()])),
                    Expr::seq([e(), Expr::lit("*"), e()]),
                    Expr::seq([e(), Expr::lit("+"), e()]),
                    Expr::seq([Expr::lit("-"), e()]),
                    Expr::seq([Expr::lit("("), e(), Expr::lit(")")]),
                    Expr::token("ID"),
                    Expr::token("INT"),
                ]),
            )
            .token("ID", Pattern::range('a', 'z').plus())
            .token("INT", Pattern::class(CharSet::digits()).plus())
            .build()
            .expect("fuzz grammar builds")
    })
}

fuzz_target!(|data: &[u8]| {
    let g = grammar();
    let max = g.vocabulary().max_token_type();
    // One token per byte: 0 is EOF, max + 1 a type no rule expects.
    let tokens: Vec<Token> = data
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let t = i32::from(*b) % (max + 2);
            let t = if t == 0 { -1 } else { t };
            Token::new(t, "x", i as isize, i as isize, 1, i)
        })
        .collect();
    let result = g.parser_from_tokens(tokens).parse("prog");
    assert!(result.is_ok(), "{:?}", result.err());
});
