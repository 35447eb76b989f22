//! Rewrite of directly left-recursive rules into precedence loops, and the
//! check that no other left recursion remains.
//!
//! For a rule with alternatives numbered `1..=n`, alternative `i` gets
//! precedence `n - i + 1`, so earlier alternatives bind tighter:
//!
//! ```text
//! e : e '*' e        binary  -> {precpred(4)}? '*' e[5]
//!   | e '+' e        binary  -> {precpred(3)}? '+' e[4]
//!   | '-' e          prefix  -> '-' e[2]
//!   | INT            primary
//!   ;
//! e : ('-' e[2] | INT) ( {precpred(4)}? '*' e[5] | {precpred(3)}? '+' e[4] )*
//! ```
//!
//! A right-associative binary alternative recurses with its own precedence
//! instead of the next one. Suffix alternatives (`e '++'`) become loop
//! alternatives without a trailing call.

use super::expr::Expr;
use crate::error::GrammarError;
use compact_str::CompactString;
use hashbrown::{HashMap, HashSet};

fn is_self(e: &Expr, rule: &str) -> bool {
    matches!(e, Expr::Rule { name, .. } if name == rule)
}

fn self_call(rule: &str, precedence: i32) -> Expr {
    Expr::Rule {
        name: CompactString::new(rule),
        precedence,
    }
}

/// Whether some top-level alternative of `body` starts with a call to `rule`.
#[must_use]
pub(crate) fn is_directly_left_recursive(rule: &str, body: &Expr) -> bool {
    body.alternatives()
        .iter()
        .any(|alt| alt.elements().first().is_some_and(|e| is_self(e, rule)))
}

/// Rewrite a directly left-recursive rule; `None` if it is not one.
pub(crate) fn rewrite(rule: &str, body: &Expr) -> Result<Option<Expr>, GrammarError> {
    if !is_directly_left_recursive(rule, body) {
        return Ok(None);
    }
    let alts = body.alternatives();
    let n = alts.len();
    let mut primaries = Vec::new();
    let mut ops = Vec::new();

    for (i, alt) in alts.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let prec = (n - i) as i32;
        let right = matches!(alt, Expr::RightAssoc(_));
        let elems = alt.elements();
        let starts = elems.first().is_some_and(|e| is_self(e, rule));
        // Trailing actions and predicates may follow the last recursive call.
        let tail = elems
            .iter()
            .rposition(|e| !matches!(e, Expr::Action(_) | Expr::Predicate(_)))
            .unwrap_or(0);
        let ends = tail > 0 && is_self(elems[tail], rule);

        if starts && elems.len() == 1 {
            return Err(GrammarError::EmptyRecursiveAlternative {
                rule: CompactString::new(rule),
                alt: i + 1,
            });
        }

        if starts && ends {
            let next = if right { prec } else { prec + 1 };
            let mut seq = vec![Expr::PrecedencePredicate(prec)];
            seq.extend(elems[1..tail].iter().map(|e| (*e).clone()));
            seq.push(self_call(rule, next));
            seq.extend(elems[tail + 1..].iter().map(|e| (*e).clone()));
            ops.push(Expr::Seq(seq));
        } else if starts {
            let mut seq = vec![Expr::PrecedencePredicate(prec)];
            seq.extend(elems[1..].iter().map(|e| (*e).clone()));
            ops.push(Expr::Seq(seq));
        } else if ends {
            let mut seq: Vec<Expr> = elems[..tail].iter().map(|e| (*e).clone()).collect();
            seq.push(self_call(rule, prec));
            seq.extend(elems[tail + 1..].iter().map(|e| (*e).clone()));
            primaries.push(Expr::Seq(seq));
        } else {
            primaries.push(Expr::Seq(elems.into_iter().cloned().collect()));
        }
    }

    if primaries.is_empty() {
        return Err(GrammarError::NoPrimaryAlternative {
            rule: CompactString::new(rule),
        });
    }
    let primary = if primaries.len() == 1 {
        primaries.remove(0)
    } else {
        Expr::Choice(primaries.into_iter().map(unwrap_single).collect())
    };
    let ops = if ops.len() == 1 {
        ops.remove(0)
    } else {
        Expr::Choice(ops)
    };
    Ok(Some(Expr::Seq(vec![primary, Expr::PrecedenceLoop(Box::new(ops))])))
}

/// `Seq([x])` back to `x`, so token-only primaries still collapse into a set.
fn unwrap_single(e: Expr) -> Expr {
    match e {
        Expr::Seq(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    }
}

/// Rules that can derive the empty string.
pub(crate) fn nullable_rules(rules: &[(CompactString, Expr)]) -> HashSet<CompactString> {
    let mut nullable = HashSet::new();
    loop {
        let before = nullable.len();
        for (name, body) in rules {
            if !nullable.contains(name) && is_nullable(body, &nullable) {
                nullable.insert(name.clone());
            }
        }
        if nullable.len() == before {
            return nullable;
        }
    }
}

fn is_nullable(e: &Expr, nullable: &HashSet<CompactString>) -> bool {
    match e {
        Expr::Literal(_) | Expr::Token(_) | Expr::Eof | Expr::Wildcard => false,
        Expr::Rule { name, .. } => nullable.contains(name),
        Expr::Seq(items) => items.iter().all(|i| is_nullable(i, nullable)),
        Expr::Choice(items) => items.iter().any(|i| is_nullable(i, nullable)),
        Expr::Plus(inner) | Expr::Label(_, inner) | Expr::RightAssoc(inner) => {
            is_nullable(inner, nullable)
        }
        Expr::Opt(_)
        | Expr::Star(_)
        | Expr::PrecedenceLoop(_)
        | Expr::Empty
        | Expr::Action(_)
        | Expr::Predicate(_)
        | Expr::PrecedencePredicate(_) => true,
    }
}

/// Reject `(...)*`, `(...)+` and operator loops whose body can match nothing.
pub(crate) fn check_closures(rules: &[(CompactString, Expr)]) -> Result<(), GrammarError> {
    let nullable = nullable_rules(rules);
    for (name, body) in rules {
        let mut empty = false;
        body.walk(&mut |e| {
            if let Expr::Star(inner) | Expr::Plus(inner) | Expr::PrecedenceLoop(inner) = e {
                empty |= is_nullable(inner, &nullable);
            }
        });
        if empty {
            return Err(GrammarError::EmptyClosure { rule: name.clone() });
        }
    }
    Ok(())
}

/// Rules that can be called before any token is consumed.
fn left_edge(e: &Expr, nullable: &HashSet<CompactString>, out: &mut Vec<CompactString>) {
    match e {
        Expr::Rule { name, .. } => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        Expr::Seq(items) => {
            for item in items {
                left_edge(item, nullable, out);
                if !is_nullable(item, nullable) {
                    break;
                }
            }
        }
        Expr::Choice(items) => items.iter().for_each(|i| left_edge(i, nullable, out)),
        Expr::Opt(inner)
        | Expr::Star(inner)
        | Expr::Plus(inner)
        | Expr::Label(_, inner)
        | Expr::RightAssoc(inner)
        | Expr::PrecedenceLoop(inner) => left_edge(inner, nullable, out),
        _ => {}
    }
}

/// Reject any left recursion left after the rewrite: mutual recursion, or a
/// self call hidden behind a nullable prefix.
pub(crate) fn check_no_left_recursion(rules: &[(CompactString, Expr)]) -> Result<(), GrammarError> {
    let nullable = nullable_rules(rules);
    let mut edges: HashMap<&str, Vec<CompactString>> = HashMap::new();
    for (name, body) in rules {
        let mut out = Vec::new();
        left_edge(body, &nullable, &mut out);
        edges.insert(name.as_str(), out);
    }

    let mut done: HashSet<&str> = HashSet::new();
    for (name, _) in rules {
        let mut path: Vec<&str> = Vec::new();
        if let Some(cycle) = find_cycle(name, &edges, &mut path, &mut done) {
            return Err(GrammarError::IndirectLeftRecursion { rules: cycle });
        }
    }
    Ok(())
}

fn find_cycle<'a>(
    rule: &'a str,
    edges: &'a HashMap<&'a str, Vec<CompactString>>,
    path: &mut Vec<&'a str>,
    done: &mut HashSet<&'a str>,
) -> Option<Vec<String>> {
    if let Some(pos) = path.iter().position(|r| *r == rule) {
        return Some(path[pos..].iter().map(|r| (*r).to_string()).collect());
    }
    if done.contains(rule) {
        return None;
    }
    path.push(rule);
    for next in edges.get(rule).into_iter().flatten() {
        if let Some((key, _)) = edges.get_key_value(next.as_str())
            && let Some(cycle) = find_cycle(*key, edges, path, done)
        {
            return Some(cycle);
        }
    }
    path.pop();
    done.insert(rule);
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc() -> Expr {
        Expr::choice([
            Expr::seq([Expr::rule("e"), Expr::lit("*"), Expr::rule("e")]),
            Expr::right_assoc(Expr::seq([Expr::rule("e"), Expr::lit("^"), Expr::rule("e")])),
            Expr::seq([Expr::lit("-"), Expr::rule("e")]),
            Expr::seq([Expr::rule("e"), Expr::lit("!")]),
            Expr::token("INT"),
        ])
    }

    #[test]
    fn test_rewrite_shapes() {
        let out = rewrite("e", &calc()).unwrap().unwrap();
        let Expr::Seq(parts) = out else {
            panic!("expected sequence");
        };
        assert_eq!(
            parts[0],
            Expr::choice([
                Expr::seq([Expr::lit("-"), self_call("e", 3)]),
                Expr::token("INT"),
            ])
        );
        let Expr::PrecedenceLoop(ops) = &parts[1] else {
            panic!("expected loop");
        };
        assert_eq!(
            ops.alternatives(),
            &[
                Expr::seq([Expr::PrecedencePredicate(5), Expr::lit("*"), self_call("e", 6)]),
                Expr::seq([Expr::PrecedencePredicate(4), Expr::lit("^"), self_call("e", 4)]),
                Expr::seq([Expr::PrecedencePredicate(2), Expr::lit("!")]),
            ]
        );
    }

    #[test]
    fn test_trailing_action_keeps_binary_shape() {
        let body = Expr::choice([
            Expr::seq([Expr::rule("e"), Expr::lit("*"), Expr::rule("e"), Expr::action("show")]),
            Expr::seq([Expr::lit("-"), Expr::rule("e"), Expr::predicate("ok")]),
            Expr::token("INT"),
        ]);
        let Expr::Seq(parts) = rewrite("e", &body).unwrap().unwrap() else {
            panic!("expected sequence");
        };
        assert_eq!(
            parts[0],
            Expr::choice([
                Expr::seq([Expr::lit("-"), self_call("e", 2), Expr::predicate("ok")]),
                Expr::token("INT"),
            ])
        );
        assert_eq!(
            parts[1],
            Expr::PrecedenceLoop(Box::new(Expr::seq([
                Expr::PrecedencePredicate(3),
                Expr::lit("*"),
                self_call("e", 4),
                Expr::action("show"),
            ])))
        );
    }

    #[test]
    fn test_not_left_recursive() {
        assert_eq!(rewrite("a", &Expr::seq([Expr::lit("x"), Expr::rule("a")])), Ok(None));
    }

    #[test]
    fn test_no_primary_rejected() {
        let body = Expr::seq([Expr::rule("e"), Expr::lit("+"), Expr::rule("e")]);
        assert!(matches!(
            rewrite("e", &body),
            Err(GrammarError::NoPrimaryAlternative { .. })
        ));
    }

    #[test]
    fn test_mutual_recursion_rejected() {
        let rules = vec![
            (CompactString::new("a"), Expr::seq([Expr::rule("b"), Expr::lit("x")])),
            (CompactString::new("b"), Expr::choice([Expr::seq([Expr::rule("a"), Expr::lit("y")]), Expr::lit("z")])),
        ];
        let err = check_no_left_recursion(&rules).unwrap_err();
        assert_eq!(
            err,
            GrammarError::IndirectLeftRecursion {
                rules: vec!["a".into(), "b".into()]
            }
        );
    }

    #[test]
    fn test_recursion_behind_nullable_prefix_rejected() {
        let rules = vec![
            (CompactString::new("a"), Expr::seq([Expr::rule("n"), Expr::rule("a"), Expr::lit("x")])),
            (CompactString::new("n"), Expr::opt(Expr::lit("y"))),
        ];
        assert!(check_no_left_recursion(&rules).is_err());
    }

    #[test]
    fn test_nullable_loop_body_rejected() {
        let rules = vec![
            (
                CompactString::new("s"),
                Expr::seq([Expr::star(Expr::opt(Expr::lit("x"))), Expr::lit("y")]),
            ),
        ];
        assert_eq!(
            check_closures(&rules),
            Err(GrammarError::EmptyClosure { rule: "s".into() })
        );
        let ok = vec![(CompactString::new("s"), Expr::star(Expr::lit("x")))];
        assert!(check_closures(&ok).is_ok());
    }

    #[test]
    fn test_rewritten_rule_passes_check() {
        let body = rewrite("e", &calc()).unwrap().unwrap();
        let rules = vec![(CompactString::new("e"), body)];
        assert!(check_no_left_recursion(&rules).is_ok());
    }
}
