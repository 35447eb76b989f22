//! Lowering of parser rule expressions to the transition network.
//!
//! Every expression becomes a fragment with one entry and one exit state;
//! fragments are chained with epsilon edges. Blocks and loops get the state
//! kinds the error strategy keys its resynchronization on:
//!
//! ```text
//! (a|b)    BlockStart -> a|b -> BlockEnd
//! x?       BlockStart -> x|ε -> BlockEnd
//! x*       StarLoopEntry -> StarBlockStart -> x -> BlockEnd -> StarLoopBack -> StarLoopEntry
//!                       \-> LoopEnd
//! x+       PlusBlockStart -> x -> BlockEnd -> PlusLoopBack -> PlusBlockStart
//!                                                         \-> LoopEnd
//! ```

use super::Vocabulary;
use super::expr::Expr;
use crate::atn::{Atn, AtnBuilder, IntervalSet, RuleIndex, StateId, StateKind, Transition};
use crate::error::GrammarError;
use crate::lexer::{EOF, TokenType};
use compact_str::CompactString;
use hashbrown::HashMap;

/// Parser rule ready for lowering.
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    pub name: CompactString,
    pub body: Expr,
    pub left_recursive: bool,
}

type Fragment = (StateId, StateId);

struct Lowering<'v> {
    b: AtnBuilder,
    vocab: &'v Vocabulary,
    rules: HashMap<CompactString, RuleIndex>,
    current: RuleIndex,
    current_name: CompactString,
}

/// Build the network for `rules`; rule `i` of the slice becomes rule index `i`.
pub(crate) fn compile(rules: &[CompiledRule], vocab: &Vocabulary) -> Result<Atn, GrammarError> {
    let mut lowering = Lowering {
        b: AtnBuilder::new(),
        vocab,
        rules: HashMap::new(),
        current: 0,
        current_name: CompactString::default(),
    };
    for rule in rules {
        let index = lowering.b.add_rule(&rule.name, rule.left_recursive);
        lowering.rules.insert(rule.name.clone(), index);
    }
    for (index, rule) in rules.iter().enumerate() {
        lowering.current = index;
        lowering.current_name = rule.name.clone();
        let (entry, exit) = lowering.emit(&rule.body)?;
        let (start, stop) = (lowering.b.rule_start(index), lowering.b.rule_stop(index));
        lowering.b.add_transition(start, Transition::Epsilon { target: entry });
        lowering.b.add_transition(exit, Transition::Epsilon { target: stop });
    }
    Ok(lowering.b.finish(vocab.max_token_type())?)
}

impl Lowering<'_> {
    fn basic(&mut self) -> StateId {
        self.b.add_state(StateKind::Basic, self.current)
    }

    fn edge(&mut self, make: impl FnOnce(StateId) -> Transition) -> Fragment {
        let from = self.basic();
        let to = self.basic();
        self.b.add_transition(from, make(to));
        (from, to)
    }

    fn epsilon(&mut self, from: StateId, to: StateId) {
        self.b.add_transition(from, Transition::Epsilon { target: to });
    }

    fn token_type(&self, e: &Expr) -> Result<TokenType, GrammarError> {
        let found = match e {
            Expr::Literal(text) => self.vocab.type_of_literal(text),
            Expr::Token(name) => self.vocab.type_of_name(name),
            Expr::Eof => Some(EOF),
            _ => None,
        };
        found.ok_or_else(|| GrammarError::UndefinedToken {
            name: match e {
                Expr::Literal(text) => CompactString::new(format!("'{text}'")),
                Expr::Token(name) => name.clone(),
                _ => CompactString::new("?"),
            },
            rule: self.current_name.clone(),
        })
    }

    fn emit(&mut self, e: &Expr) -> Result<Fragment, GrammarError> {
        Ok(match e {
            Expr::Literal(_) | Expr::Token(_) | Expr::Eof => {
                let token = self.token_type(e)?;
                self.edge(|target| Transition::Atom { target, token })
            }
            Expr::Wildcard => self.edge(|target| Transition::Wildcard { target }),
            Expr::Empty => self.edge(|target| Transition::Epsilon { target }),
            Expr::Action(text) => {
                let (rule, index) = (self.current, self.b.add_action(text));
                self.edge(|target| Transition::Action { target, rule, index })
            }
            Expr::Predicate(text) => {
                let (rule, index) = (self.current, self.b.add_predicate(text));
                self.edge(|target| Transition::Predicate { target, rule, index })
            }
            Expr::PrecedencePredicate(precedence) => {
                let precedence = *precedence;
                self.edge(|target| Transition::Precedence { target, precedence })
            }
            Expr::Rule { name, precedence } => {
                let rule = *self.rules.get(name).ok_or_else(|| GrammarError::UndefinedRule {
                    rule: name.clone(),
                    referenced_from: self.current_name.clone(),
                })?;
                let target = self.b.rule_start(rule);
                let (from, follow) = (self.basic(), self.basic());
                self.b.add_transition(
                    from,
                    Transition::Rule {
                        target,
                        rule,
                        follow,
                        precedence: *precedence,
                    },
                );
                (from, follow)
            }
            Expr::Seq(items) => {
                let mut frags = Vec::with_capacity(items.len());
                for item in items {
                    frags.push(self.emit(item)?);
                }
                match (frags.first().copied(), frags.last().copied()) {
                    (Some((entry, _)), Some((_, exit))) => {
                        for pair in frags.windows(2) {
                            self.epsilon(pair[0].1, pair[1].0);
                        }
                        (entry, exit)
                    }
                    _ => self.edge(|target| Transition::Epsilon { target }),
                }
            }
            Expr::Choice(alts) => {
                if alts.is_empty() {
                    return Err(GrammarError::EmptyChoice {
                        rule: self.current_name.clone(),
                    });
                }
                if e.is_token_set() {
                    let mut set = IntervalSet::new();
                    for alt in alts {
                        set.add(self.token_type(alt)?);
                    }
                    self.edge(|target| Transition::Set { target, set })
                } else if alts.len() == 1 {
                    self.emit(&alts[0])?
                } else {
                    self.block(StateKind::BlockStart, alts)?
                }
            }
            Expr::Opt(inner) => {
                let mut alts = block_alternatives(inner).to_vec();
                alts.push(Expr::Empty);
                self.block(StateKind::BlockStart, &alts)?
            }
            Expr::Star(inner) => self.star(block_alternatives(inner), false)?,
            Expr::PrecedenceLoop(inner) => self.star(block_alternatives(inner), true)?,
            Expr::Plus(inner) => {
                let (block, block_end) = self.block(StateKind::PlusBlockStart, block_alternatives(inner))?;
                let back = self.b.add_state(StateKind::PlusLoopBack, self.current);
                let end = self.b.add_state(StateKind::LoopEnd, self.current);
                self.epsilon(block_end, back);
                self.epsilon(back, block);
                self.epsilon(back, end);
                (block, end)
            }
            Expr::Label(name, inner) => {
                let labelable = matches!(**inner, Expr::Literal(_) | Expr::Token(_) | Expr::Eof | Expr::Wildcard)
                    || inner.is_token_set();
                if !labelable {
                    return Err(GrammarError::InvalidLabel {
                        label: name.clone(),
                        rule: self.current_name.clone(),
                    });
                }
                let frag = self.emit(inner)?;
                self.b.set_label(frag.0, name);
                frag
            }
            Expr::RightAssoc(inner) => self.emit(inner)?,
        })
    }

    fn block(&mut self, kind: StateKind, alts: &[Expr]) -> Result<Fragment, GrammarError> {
        let start = self.b.add_state(kind, self.current);
        let end = self.b.add_state(StateKind::BlockEnd, self.current);
        for alt in alts {
            let (entry, exit) = self.emit(alt)?;
            self.epsilon(start, entry);
            self.epsilon(exit, end);
        }
        Ok((start, end))
    }

    fn star(&mut self, alts: &[Expr], precedence: bool) -> Result<Fragment, GrammarError> {
        let entry = self
            .b
            .add_state(StateKind::StarLoopEntry { precedence }, self.current);
        let (block, block_end) = self.block(StateKind::StarBlockStart, alts)?;
        let back = self.b.add_state(StateKind::StarLoopBack, self.current);
        let end = self.b.add_state(StateKind::LoopEnd, self.current);
        self.epsilon(entry, block);
        self.epsilon(entry, end);
        self.epsilon(block_end, back);
        self.epsilon(back, entry);
        Ok((entry, end))
    }
}

/// Alternatives of a loop or optional body. A token-only choice stays whole so
/// that it lowers to one set transition.
fn block_alternatives(inner: &Expr) -> &[Expr] {
    match inner {
        Expr::Choice(alts) if !inner.is_token_set() && alts.len() > 1 => alts,
        other => std::slice::from_ref(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        let mut v = Vocabulary::new();
        v.define_literal("a");
        v.define_literal("b");
        v.define_literal("c");
        v
    }

    fn rule(name: &str, body: Expr) -> CompiledRule {
        CompiledRule {
            name: CompactString::new(name),
            body,
            left_recursive: false,
        }
    }

    #[test]
    fn test_token_choice_collapses_to_set() {
        let atn = compile(
            &[rule("s", Expr::seq([Expr::lit("a"), Expr::choice([Expr::lit("b"), Expr::lit("c")])]))],
            &vocab(),
        )
        .unwrap();
        assert_eq!(atn.num_decisions(), 0);
        assert!(atn
            .states()
            .iter()
            .flat_map(|s| &s.transitions)
            .any(|t| matches!(t, Transition::Set { .. })));
    }

    #[test]
    fn test_star_shape() {
        let atn = compile(&[rule("s", Expr::star(Expr::lit("a")))], &vocab()).unwrap();
        assert_eq!(atn.num_decisions(), 1);
        let entry = atn.decision_state(0).unwrap();
        assert_eq!(
            atn.state(entry).unwrap().kind,
            StateKind::StarLoopEntry { precedence: false }
        );
        let kinds: Vec<_> = atn.states().iter().map(|s| s.kind).collect();
        assert!(kinds.contains(&StateKind::StarLoopBack));
        assert!(kinds.contains(&StateKind::LoopEnd));
    }

    #[test]
    fn test_plus_decision_is_loop_back() {
        let atn = compile(&[rule("s", Expr::plus(Expr::lit("a")))], &vocab()).unwrap();
        let back = atn.decision_state(0).unwrap();
        assert_eq!(atn.state(back).unwrap().kind, StateKind::PlusLoopBack);
    }

    #[test]
    fn test_label_stored_on_matching_state() {
        let atn = compile(
            &[rule("s", Expr::label("x", Expr::choice([Expr::lit("b"), Expr::lit("c")])))],
            &vocab(),
        )
        .unwrap();
        let labelled = atn.states().iter().find(|s| s.label.is_some()).unwrap();
        assert!(matches!(labelled.transitions[0], Transition::Set { .. }));
    }

    #[test]
    fn test_label_on_rule_rejected() {
        let err = compile(
            &[rule("s", Expr::label("x", Expr::rule("s")))],
            &vocab(),
        )
        .unwrap_err();
        assert!(matches!(err, GrammarError::InvalidLabel { .. }));
    }

    #[test]
    fn test_undefined_rule_rejected() {
        let err = compile(&[rule("s", Expr::rule("t"))], &vocab()).unwrap_err();
        assert_eq!(
            err,
            GrammarError::UndefinedRule {
                rule: "t".into(),
                referenced_from: "s".into()
            }
        );
    }
}
