//! Grammars assembled from imported grammars.

use recog::grammar::{Expr, Grammar, GrammarBuilder};
use recog::lexer::{CharSet, Pattern};
use recog::testing::ParseHarness;

fn ws(builder: GrammarBuilder) -> GrammarBuilder {
    builder.skip("WS", Pattern::class(CharSet::of(" \n")))
}

fn print(text: &'static str) -> impl Fn(&recog::ActionContext<'_>) -> String + Send + Sync + 'static {
    move |_| text.to_string()
}

#[test]
fn test_delegator_invokes_delegate_rule() {
    let s = Grammar::builder("S").rule("a", Expr::seq([Expr::token("B"), Expr::action("S.a")]));
    let g = ws(Grammar::builder("M").import(s).rule("s", Expr::rule("a")).token("B", Pattern::literal("b")))
        .build()
        .unwrap();
    let out = ParseHarness::new(g).on_action("S.a", print("S.a")).run("s", "b").unwrap();
    assert_eq!(out.output, vec!["S.a"]);
    assert!(out.errors.is_empty());
}

#[test]
fn test_literals_from_delegate() {
    let s = Grammar::builder("S").rule("a", Expr::seq([Expr::lit("="), Expr::lit("a"), Expr::action("S.a")]));
    let g = ws(Grammar::builder("M").import(s).rule("s", Expr::rule("a"))).build().unwrap();
    let out = ParseHarness::new(g).on_action("S.a", print("S.a")).run("s", "=a").unwrap();
    assert_eq!(out.output, vec!["S.a"]);
    assert!(out.errors.is_empty());
}

#[test]
fn test_delegate_rule_text_visible_to_caller() {
    let s = Grammar::builder("S").rule("a", Expr::seq([Expr::token("B"), Expr::action("S.a")]));
    let g = ws(Grammar::builder("M")
        .import(s)
        .rule("s", Expr::seq([Expr::rule("a"), Expr::action("text")]))
        .token("B", Pattern::literal("b")))
    .build()
    .unwrap();
    let out = ParseHarness::new(g)
        .on_action("S.a", print("S.a"))
        .on_action("text", |ctx| ctx.text().to_string())
        .run("s", "b")
        .unwrap();
    assert_eq!(out.output.concat(), "S.ab");
}

#[test]
fn test_delegator_uses_no_delegate_rules() {
    let s = Grammar::builder("S").rule("a", Expr::token("B"));
    let g = ws(Grammar::builder("M")
        .import(s)
        .rule("s", Expr::seq([Expr::lit("b"), Expr::action("foo")])))
    .build()
    .unwrap();
    let out = ParseHarness::new(g).on_action("foo", print("foo")).run("s", "b").unwrap();
    assert_eq!(out.output, vec!["foo"]);
    assert!(out.errors.is_empty());
}

#[test]
fn test_first_import_wins() {
    let s = Grammar::builder("S")
        .rule("a", Expr::seq([Expr::token("B"), Expr::action("S.a")]))
        .rule("b", Expr::token("B"));
    let t = Grammar::builder("T").rule("a", Expr::seq([Expr::token("B"), Expr::action("T.a")]));
    let g = ws(Grammar::builder("M")
        .import(s)
        .import(t)
        .rule("s", Expr::rule("a"))
        .token("B", Pattern::literal("b")))
    .build()
    .unwrap();
    let out = ParseHarness::new(g)
        .on_action("S.a", print("S.a"))
        .on_action("T.a", print("T.a"))
        .run("s", "b")
        .unwrap();
    assert_eq!(out.output, vec!["S.a"]);
}

#[test]
fn test_delegates_see_same_token_types() {
    let s = Grammar::builder("S")
        .tokens(["A", "B", "C"])
        .rule("x", Expr::seq([Expr::token("A"), Expr::action("S.x")]));
    let t = Grammar::builder("T")
        .tokens(["C", "B", "A"])
        .rule("y", Expr::seq([Expr::token("A"), Expr::action("T.y")]));
    let g = ws(Grammar::builder("M")
        .import(s)
        .import(t)
        .rule("s", Expr::seq([Expr::rule("x"), Expr::rule("y")]))
        .token("B", Pattern::literal("b"))
        .token("A", Pattern::literal("a"))
        .token("C", Pattern::literal("c")))
    .build()
    .unwrap();
    assert_eq!(g.vocabulary().name_map(), "{EOF=-1, B=1, A=2, C=3, WS=4}");
    assert_eq!(g.vocabulary().type_of_literal("a"), Some(2));
    assert_eq!(g.vocabulary().type_of_literal("b"), Some(1));
    assert_eq!(g.vocabulary().type_of_literal("c"), Some(3));

    let out = ParseHarness::new(g)
        .on_action("S.x", print("S.x"))
        .on_action("T.y", print("T.y"))
        .run("s", "aa")
        .unwrap();
    assert_eq!(out.output, vec!["S.x", "T.y"]);
    assert!(out.errors.is_empty());
}

#[test]
fn test_combined_imports_combined() {
    let s = Grammar::builder("S")
        .tokens(["A", "B", "C"])
        .rule("x", Expr::seq([Expr::lit("x"), Expr::token("INT"), Expr::action("S.x")]))
        .token("INT", Pattern::class(CharSet::digits()).plus());
    let s = ws(s);
    let g = Grammar::builder("M")
        .import(s)
        .rule("s", Expr::seq([Expr::rule("x"), Expr::token("INT")]))
        .build()
        .unwrap();
    let out = ParseHarness::new(g).on_action("S.x", print("S.x")).run("s", "x 34 9").unwrap();
    assert_eq!(out.output, vec!["S.x"]);
    assert!(out.errors.is_empty());
}

#[test]
fn test_delegator_rule_overrides_delegate() {
    let s = Grammar::builder("S")
        .rule("a", Expr::seq([Expr::rule("b"), Expr::action("S.a")]))
        .rule("b", Expr::token("B"));
    let g = ws(Grammar::builder("M")
        .import(s)
        .rule("b", Expr::choice([Expr::lit("b"), Expr::lit("c")])))
    .build()
    .unwrap();
    let out = ParseHarness::new(g).on_action("S.a", print("S.a")).run("a", "c").unwrap();
    assert_eq!(out.output, vec!["S.a"]);
    assert!(out.errors.is_empty());
}

#[test]
fn test_delegator_rule_overrides_lookahead_in_delegate() {
    let s = Grammar::builder("S")
        .rule("type_", Expr::lit("int"))
        .rule(
            "decl",
            Expr::choice([
                Expr::seq([Expr::rule("type_"), Expr::token("ID"), Expr::lit(";")]),
                Expr::seq([
                    Expr::rule("type_"),
                    Expr::token("ID"),
                    Expr::rule("init"),
                    Expr::lit(";"),
                    Expr::action("decl"),
                ]),
            ]),
        )
        .rule("init", Expr::seq([Expr::lit("="), Expr::token("INT")]));
    let g = ws(Grammar::builder("M")
        .import(s)
        .rule("prog", Expr::rule("decl"))
        .rule("type_", Expr::choice([Expr::lit("int"), Expr::lit("float")]))
        .token("ID", Pattern::range('a', 'z').plus())
        .token("INT", Pattern::range('0', '9').plus()))
    .build()
    .unwrap();
    let out = ParseHarness::new(g)
        .on_action("decl", |ctx| format!("Decl: {}", ctx.text()))
        .run("prog", "float x = 3;")
        .unwrap();
    assert_eq!(out.output, vec!["Decl: floatx=3;"]);
    assert!(out.errors.is_empty());
}

#[test]
fn test_delegator_rule_overrides_delegates() {
    let s = Grammar::builder("S")
        .rule("a", Expr::seq([Expr::rule("b"), Expr::action("S.a")]))
        .rule("b", Expr::lit("b"));
    let t = Grammar::builder("T")
        .tokens(["A"])
        .rule("b", Expr::seq([Expr::lit("b"), Expr::action("T.b")]));
    let g = ws(Grammar::builder("M").import(s).import(t).rule(
        "b",
        Expr::choice([
            Expr::lit("b"),
            Expr::seq([Expr::lit("c"), Expr::action("M.b")]),
            Expr::token("B"),
            Expr::token("A"),
        ]),
    ))
    .build()
    .unwrap();
    let out = ParseHarness::new(g)
        .on_action("S.a", print("S.a"))
        .on_action("T.b", print("T.b"))
        .on_action("M.b", print("M.b"))
        .run("a", "c")
        .unwrap();
    assert_eq!(out.output, vec!["M.b", "S.a"]);
    assert!(out.errors.is_empty());
}

#[test]
fn test_keyword_defined_before_imported_identifier() {
    let s = Grammar::builder("S").token("ID", Pattern::range('a', 'z').plus());
    let g = ws(Grammar::builder("M")
        .import(s)
        .rule("a", Expr::seq([Expr::label("A", Expr::token("A")), Expr::action("show")]))
        .token("A", Pattern::literal("abc")))
    .build()
    .unwrap();
    let out = ParseHarness::new(g)
        .on_action("show", |ctx| {
            format!("M.a: {}", ctx.label("A").map(ToString::to_string).unwrap_or_default())
        })
        .run("a", "abc")
        .unwrap();
    assert_eq!(out.output, vec!["M.a: [@0,0:2='abc',<1>,1:0]"]);
    assert!(out.errors.is_empty());
}

#[test]
fn test_imported_lexer_with_only_fragments() {
    let s = Grammar::builder("S").fragment(
        "UNICODE_CLASS_Zs",
        Pattern::class(CharSet::new(vec![
            ('\u{0020}', '\u{0020}'),
            ('\u{00A0}', '\u{00A0}'),
            ('\u{1680}', '\u{1680}'),
            ('\u{180E}', '\u{180E}'),
            ('\u{2000}', '\u{200A}'),
            ('\u{202F}', '\u{202F}'),
            ('\u{205F}', '\u{205F}'),
            ('\u{3000}', '\u{3000}'),
        ])),
    );
    let g = Grammar::builder("M")
        .import(s)
        .rule("program", Expr::seq([Expr::lit("test"), Expr::lit("test")]))
        .skip("WS", Pattern::fragment("UNICODE_CLASS_Zs").plus())
        .build()
        .unwrap();
    let out = ParseHarness::new(g).run("program", "test test").unwrap();
    assert!(out.errors.is_empty(), "{:?}", out.errors);
}
