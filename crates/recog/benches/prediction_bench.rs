use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use recog::grammar::{Expr, Grammar};
use recog::lexer::{CharSet, Pattern};
use recog::parser::ParserConfig;
use std::hint::black_box;

fn e() -> Expr {
    Expr::rule("e")
}

fn calculator() -> Grammar {
    Grammar::builder("Bench")
        .rule("s", Expr::seq([e(), Expr::eof()]))
        .rule(
            "e",
            Expr::choice([
                Expr::seq([e(), Expr::lit("*"), e()]),
                Expr::seq([e(), Expr::lit("+"), e()]),
                Expr::seq([Expr::lit("("), e(), Expr::lit(")")]),
                Expr::token("INT"),
            ]),
        )
        .token("INT", Pattern::class(CharSet::digits()).plus())
        .skip("WS", Pattern::class(CharSet::whitespace()).plus())
        .build()
        .unwrap()
}

/// A decision that needs `n + 1` tokens of look-ahead: `'x'* 'y' | 'x'* 'z'`.
fn deep_lookahead() -> Grammar {
    Grammar::builder("Deep")
        .rule(
            "a",
            Expr::choice([
                Expr::seq([Expr::star(Expr::lit("x")), Expr::lit("y")]),
                Expr::seq([Expr::star(Expr::lit("x")), Expr::lit("z")]),
            ]),
        )
        .build()
        .unwrap()
}

fn expression(terms: usize) -> String {
    (0..terms)
        .map(|i| if i % 3 == 0 { format!("({i}+1)") } else { i.to_string() })
        .collect::<Vec<_>>()
        .join(if terms % 2 == 0 { "*" } else { "+" })
}

fn bench_expression_parse(c: &mut Criterion) {
    let grammar = calculator();
    let mut group = c.benchmark_group("expression_parse");
    for terms in [8, 64, 512] {
        let input = expression(terms);
        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(terms), &input, |b, input| {
            b.iter(|| black_box(grammar.parser(black_box(input)).parse("s").unwrap()));
        });
    }
    group.finish();
}

fn bench_lookahead_depth(c: &mut Criterion) {
    let grammar = deep_lookahead();
    let config = ParserConfig {
        build_parse_tree: false,
        ..ParserConfig::default()
    };
    let mut group = c.benchmark_group("lookahead_depth");
    for depth in [4, 32, 256] {
        let input = format!("{}z", "x".repeat(depth));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &input, |b, input| {
            b.iter(|| {
                black_box(
                    grammar
                        .parser(black_box(input))
                        .with_config(config.clone())
                        .parse("a")
                        .unwrap(),
                )
            });
        });
    }
    group.finish();
}

fn bench_recovery(c: &mut Criterion) {
    let grammar = calculator();
    let input = "1+*2)(3+4**5+(6".repeat(16);
    c.bench_function("recovery_heavy_input", |b| {
        b.iter(|| black_box(grammar.parser(black_box(&input)).parse("s").unwrap()));
    });
}

criterion_group!(benches, bench_expression_parse, bench_lookahead_depth, bench_recovery);
criterion_main!(benches);
