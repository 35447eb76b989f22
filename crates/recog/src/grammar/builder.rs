use super::compile::{CompiledRule, compile};
use super::expr::Expr;
use super::left_recursion::{check_closures, check_no_left_recursion, rewrite};
use super::{Grammar, Vocabulary};
use crate::error::GrammarError;
use crate::lexer::{LexerRule, LexerRuleKind, LexerSpec, Pattern};
use compact_str::CompactString;
use hashbrown::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexerDefKind {
    Rule(LexerRuleKind),
    Fragment,
}

#[derive(Debug, Clone)]
struct LexerDef {
    name: CompactString,
    pattern: Pattern,
    kind: LexerDefKind,
}

/// Builder for a (possibly composite) grammar.
///
/// Parser rules, lexer rules and `tokens {}` declarations are added in
/// grammar order. Imported grammars contribute every rule the importing
/// grammar does not define itself; among imports the first definition wins.
///
/// # Examples
///
/// ```rust
/// use recog::grammar::{Expr, Grammar};
/// use recog::lexer::Pattern;
///
/// let grammar = Grammar::builder("G")
///     .rule("s", Expr::seq([Expr::lit("a"), Expr::token("ID")]))
///     .token("ID", Pattern::range('a', 'z').plus())
///     .skip("WS", Pattern::literal(" "))
///     .build()
///     .unwrap();
/// assert_eq!(grammar.vocabulary().name_map(), "{EOF=-1, ID=2, WS=3}");
/// ```
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    name: CompactString,
    rules: Vec<(CompactString, Expr)>,
    lexer: Vec<LexerDef>,
    tokens: Vec<CompactString>,
    imports: Vec<GrammarBuilder>,
}

impl GrammarBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: CompactString::new(name),
            rules: Vec::new(),
            lexer: Vec::new(),
            tokens: Vec::new(),
            imports: Vec::new(),
        }
    }

    /// Add a parser rule.
    #[must_use]
    pub fn rule(mut self, name: &str, body: Expr) -> Self {
        self.rules.push((CompactString::new(name), body));
        self
    }

    fn lexer_def(mut self, name: &str, pattern: Pattern, kind: LexerDefKind) -> Self {
        self.lexer.push(LexerDef {
            name: CompactString::new(name),
            pattern,
            kind,
        });
        self
    }

    /// Add a lexer rule that emits tokens on the default channel.
    #[must_use]
    pub fn token(self, name: &str, pattern: Pattern) -> Self {
        self.lexer_def(name, pattern, LexerDefKind::Rule(LexerRuleKind::Emit))
    }

    /// Add a lexer rule whose matches are dropped (`-> skip`).
    #[must_use]
    pub fn skip(self, name: &str, pattern: Pattern) -> Self {
        self.lexer_def(name, pattern, LexerDefKind::Rule(LexerRuleKind::Skip))
    }

    /// Add a lexer rule whose tokens go to the hidden channel.
    #[must_use]
    pub fn hidden(self, name: &str, pattern: Pattern) -> Self {
        self.lexer_def(name, pattern, LexerDefKind::Rule(LexerRuleKind::Hidden))
    }

    /// Add a `fragment` rule, usable only inside other lexer rules.
    #[must_use]
    pub fn fragment(self, name: &str, pattern: Pattern) -> Self {
        self.lexer_def(name, pattern, LexerDefKind::Fragment)
    }

    /// `tokens { A, B, C }`
    #[must_use]
    pub fn tokens<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.tokens.extend(names.into_iter().map(CompactString::new));
        self
    }

    /// Import another grammar's rules.
    #[must_use]
    pub fn import(mut self, grammar: Self) -> Self {
        self.imports.push(grammar);
        self
    }

    fn check_duplicates(&self) -> Result<(), GrammarError> {
        let mut seen = HashSet::new();
        let names = self.rules.iter().map(|(n, _)| n).chain(self.lexer.iter().map(|d| &d.name));
        for name in names {
            if !seen.insert(name) {
                return Err(GrammarError::DuplicateRule {
                    rule: name.clone(),
                    grammar: self.name.clone(),
                });
            }
        }
        self.imports.iter().try_for_each(Self::check_duplicates)
    }

    /// Own definitions first, then each import's, depth first; the first
    /// definition of a name wins.
    fn merge_into(
        &self,
        rules: &mut Vec<(CompactString, Expr)>,
        lexer: &mut Vec<LexerDef>,
        tokens: &mut Vec<CompactString>,
    ) {
        for (name, body) in &self.rules {
            if !rules.iter().any(|(n, _)| n == name) {
                rules.push((name.clone(), body.clone()));
            }
        }
        for def in &self.lexer {
            if !lexer.iter().any(|d| d.name == def.name) {
                lexer.push(def.clone());
            }
        }
        tokens.extend(self.tokens.iter().cloned());
        for import in &self.imports {
            import.merge_into(rules, lexer, tokens);
        }
    }

    /// Merge imports, assign token types, rewrite left recursion and compile.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] for duplicate or undefined rules, lexer rules
    /// that can match nothing, unrewritable left recursion, misplaced labels,
    /// or a malformed resulting network.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        self.check_duplicates()?;
        let mut rules = Vec::new();
        let mut lexer = Vec::new();
        let mut tokens = Vec::new();
        self.merge_into(&mut rules, &mut lexer, &mut tokens);
        if rules.is_empty() {
            return Err(GrammarError::NoRules { grammar: self.name });
        }

        let vocabulary = build_vocabulary(&rules, &lexer, &tokens);
        let lexer_spec = build_lexer(&lexer, &vocabulary)?;

        let mut compiled = Vec::with_capacity(rules.len());
        for (name, body) in rules {
            let (body, left_recursive) = match rewrite(&name, &body)? {
                Some(rewritten) => (rewritten, true),
                None => (body, false),
            };
            compiled.push(CompiledRule {
                name,
                body,
                left_recursive,
            });
        }
        let view: Vec<(CompactString, Expr)> = compiled
            .iter()
            .map(|r| (r.name.clone(), r.body.clone()))
            .collect();
        check_no_left_recursion(&view)?;
        check_closures(&view)?;

        let atn = compile(&compiled, &vocabulary)?;
        Ok(Grammar {
            name: self.name,
            atn: Arc::new(atn),
            vocabulary: Arc::new(vocabulary),
            lexer: Arc::new(lexer_spec),
        })
    }
}

/// Token types: implicit literals (in order of appearance in parser rules),
/// named lexer rules, `tokens {}` names, then names only referenced.
fn build_vocabulary(rules: &[(CompactString, Expr)], lexer: &[LexerDef], tokens: &[CompactString]) -> Vocabulary {
    let spelled: HashSet<&str> = lexer
        .iter()
        .filter(|d| d.kind != LexerDefKind::Fragment)
        .filter_map(|d| d.pattern.as_literal())
        .collect();

    let mut vocab = Vocabulary::new();
    for (_, body) in rules {
        body.walk(&mut |e| {
            if let Expr::Literal(text) = e
                && !spelled.contains(text.as_str())
            {
                vocab.define_literal(text);
            }
        });
    }
    for def in lexer.iter().filter(|d| d.kind != LexerDefKind::Fragment) {
        let t = vocab.define_name(&def.name);
        if let Some(lit) = def.pattern.as_literal() {
            vocab.alias_literal(t, lit);
        }
    }
    for name in tokens {
        vocab.define_name(name);
    }
    for (_, body) in rules {
        body.walk(&mut |e| {
            if let Expr::Token(name) = e
                && name != "EOF"
            {
                vocab.define_name(name);
            }
        });
    }
    vocab
}

fn build_lexer(lexer: &[LexerDef], vocab: &Vocabulary) -> Result<LexerSpec, GrammarError> {
    let fragments: HashMap<&str, &Pattern> = lexer
        .iter()
        .filter(|d| d.kind == LexerDefKind::Fragment)
        .map(|d| (d.name.as_str(), &d.pattern))
        .collect();

    let mut out = Vec::new();
    let mut implicit = 0usize;
    for t in 1..=vocab.max_token_type() {
        if vocab.symbolic_name(t).is_none()
            && let Some(lit) = vocab.literal_name(t)
        {
            let text = &lit[1..lit.len() - 1];
            out.push(LexerRule::token(&format!("T__{implicit}"), t, Pattern::literal(text)));
            implicit += 1;
        }
    }
    for def in lexer {
        let LexerDefKind::Rule(kind) = def.kind else {
            continue;
        };
        let pattern = inline_fragments(&def.pattern, &fragments, &mut Vec::new())?;
        if pattern.is_nullable() {
            return Err(GrammarError::EmptyToken {
                name: def.name.clone(),
            });
        }
        let token_type = vocab.type_of_name(&def.name).ok_or_else(|| GrammarError::UndefinedToken {
            name: def.name.clone(),
            rule: def.name.clone(),
        })?;
        out.push(LexerRule {
            name: def.name.clone(),
            token_type,
            pattern,
            kind,
        });
    }
    Ok(LexerSpec::new(out))
}

fn inline_fragments(
    pattern: &Pattern,
    fragments: &HashMap<&str, &Pattern>,
    active: &mut Vec<CompactString>,
) -> Result<Pattern, GrammarError> {
    pattern.resolve(&mut |name: &str| {
        if active.iter().any(|a| a == name) {
            return Err(GrammarError::RecursiveFragment {
                name: CompactString::new(name),
            });
        }
        let body = fragments.get(name).ok_or_else(|| GrammarError::UndefinedFragment {
            name: CompactString::new(name),
        })?;
        active.push(CompactString::new(name));
        let resolved = inline_fragments(body, fragments, active);
        active.pop();
        resolved
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::CharSet;

    #[test]
    fn test_literals_before_named_tokens() {
        let g = GrammarBuilder::new("G")
            .rule("s", Expr::seq([Expr::token("ID"), Expr::lit("="), Expr::lit("x")]))
            .token("ID", Pattern::range('a', 'z').plus())
            .token("X", Pattern::literal("x"))
            .build()
            .unwrap();
        let v = g.vocabulary();
        assert_eq!(v.type_of_literal("="), Some(1));
        assert_eq!(v.type_of_name("ID"), Some(2));
        assert_eq!(v.type_of_name("X"), Some(3));
        assert_eq!(v.type_of_literal("x"), Some(3));
        assert_eq!(v.display_name(3), "'x'");
    }

    #[test]
    fn test_implicit_literal_rules_lex_first() {
        let g = GrammarBuilder::new("G")
            .rule("s", Expr::seq([Expr::lit("if"), Expr::token("ID")]))
            .token("ID", Pattern::range('a', 'z').plus())
            .build()
            .unwrap();
        let rules = g.lexer_spec().rules();
        assert_eq!(rules[0].name, "T__0");
        assert_eq!(rules[0].token_type, 1);
        assert_eq!(rules[1].name, "ID");
    }

    #[test]
    fn test_import_first_definition_wins() {
        let s = GrammarBuilder::new("S").rule("a", Expr::lit("s"));
        let t = GrammarBuilder::new("T").rule("a", Expr::lit("t")).rule("b", Expr::lit("b"));
        let m = GrammarBuilder::new("M")
            .rule("start", Expr::seq([Expr::rule("a"), Expr::rule("b")]))
            .import(s)
            .import(t)
            .build()
            .unwrap();
        let names: Vec<_> = m.atn().rules().iter().map(|r| r.name.to_string()).collect();
        assert_eq!(names, vec!["start", "a", "b"]);
        assert!(m.vocabulary().type_of_literal("s").is_some());
        assert!(m.vocabulary().type_of_literal("t").is_none());
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let err = GrammarBuilder::new("G")
            .rule("a", Expr::lit("x"))
            .rule("a", Expr::lit("y"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            GrammarError::DuplicateRule {
                rule: "a".into(),
                grammar: "G".into()
            }
        );
    }

    #[test]
    fn test_fragments_inlined() {
        let g = GrammarBuilder::new("G")
            .rule("s", Expr::token("NUM"))
            .fragment("DIGIT", Pattern::class(CharSet::digits()))
            .token("NUM", Pattern::fragment("DIGIT").plus())
            .build()
            .unwrap();
        assert_eq!(g.vocabulary().name_map(), "{EOF=-1, NUM=1}");
        assert_eq!(
            g.lexer_spec().rules()[0].pattern,
            Pattern::class(CharSet::digits()).plus()
        );
    }

    #[test]
    fn test_recursive_fragment_rejected() {
        let err = GrammarBuilder::new("G")
            .rule("s", Expr::token("A"))
            .fragment("F", Pattern::seq([Pattern::literal("x"), Pattern::fragment("F")]))
            .token("A", Pattern::fragment("F"))
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::RecursiveFragment { name: "F".into() });
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = GrammarBuilder::new("G")
            .rule("s", Expr::token("A"))
            .token("A", Pattern::literal("a").star())
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::EmptyToken { name: "A".into() });
    }

    #[test]
    fn test_no_rules() {
        let err = GrammarBuilder::new("L").token("A", Pattern::literal("a")).build().unwrap_err();
        assert_eq!(err, GrammarError::NoRules { grammar: "L".into() });
    }

    #[test]
    fn test_left_recursive_rule_flagged() {
        let g = GrammarBuilder::new("G")
            .rule(
                "e",
                Expr::choice([
                    Expr::seq([Expr::rule("e"), Expr::lit("+"), Expr::rule("e")]),
                    Expr::token("INT"),
                ]),
            )
            .token("INT", Pattern::class(CharSet::digits()).plus())
            .build()
            .unwrap();
        assert!(g.atn().rules()[0].left_recursive);
    }
}
