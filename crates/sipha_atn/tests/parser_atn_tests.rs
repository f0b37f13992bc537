//! Construction tests for parser grammars, checked against the line dump

use sipha_atn::atn::{Atn, AtnPrinter, StateId, StateKind, TransitionKind};
use sipha_atn::build::{AtnConfig, build_atn};
use sipha_atn::error::{AtnError, DiagnosticKind};
use sipha_atn::grammar::{Alternative, Block, Element, Grammar, GrammarBuilder, SetItem};
use sipha_atn::symbol;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn build(grammar: &Grammar) -> Atn {
    init();
    let build = build_atn(grammar, &AtnConfig::default()).expect("construction succeeds");
    assert!(
        build.is_usable(),
        "unexpected errors: {:?}",
        build.diagnostics.errors().collect::<Vec<_>>()
    );
    build.atn
}

fn dump(grammar: &Grammar, atn: &Atn, rule: usize) -> String {
    let start = atn.rule_start(rule).expect("rule exists");
    AtnPrinter::new(atn)
        .with_vocabulary(grammar.vocabulary())
        .as_string(start)
}

fn parser(tokens: &[&str]) -> GrammarBuilder {
    GrammarBuilder::parser("T").tokens(tokens.iter().copied())
}

#[test]
fn test_optional_alternative_block() {
    // a : A (B | ) C ;
    let grammar = parser(&["A", "B", "C"])
        .rule(
            "a",
            Block::seq([
                Element::token("A"),
                Element::block(Block::of([
                    Alternative::new([Element::token("B")]),
                    Alternative::empty(),
                ])),
                Element::token("C"),
            ]),
        )
        .build()
        .unwrap();
    let atn = build(&grammar);
    let expected = "\
RuleStart_a_0->s2
s2-A->BlockStart_5
BlockStart_5->s3
BlockStart_5->s4
s3-B->BlockEnd_6
s4->BlockEnd_6
BlockEnd_6->s7
s7-C->s8
s8->RuleStop_a_1
RuleStop_a_1-EOF->s9
";
    assert_eq!(dump(&grammar, &atn, 0), expected);
    assert_eq!(atn.decisions().len(), 1);
}

#[test]
fn test_question_mark_bypass() {
    // a : A B? C ;
    let grammar = parser(&["A", "B", "C"])
        .rule(
            "a",
            Block::seq([
                Element::token("A"),
                Element::optional(Block::seq([Element::token("B")])),
                Element::token("C"),
            ]),
        )
        .build()
        .unwrap();
    let atn = build(&grammar);
    let expected = "\
RuleStart_a_0->s2
s2-A->BlockStart_4
BlockStart_4->s3
BlockStart_4->BlockEnd_5
s3-B->BlockEnd_5
BlockEnd_5->s6
s6-C->s7
s7->RuleStop_a_1
RuleStop_a_1-EOF->s8
";
    assert_eq!(dump(&grammar, &atn, 0), expected);
}

#[test]
fn test_star_loop_shape() {
    // a : A* ;
    let grammar = parser(&["A"])
        .rule("a", Block::seq([Element::star(Block::seq([Element::token("A")]))]))
        .build()
        .unwrap();
    let atn = build(&grammar);
    let expected = "\
RuleStart_a_0->StarLoopEntry_5
StarLoopEntry_5->StarBlockStart_3
StarLoopEntry_5->s6
StarBlockStart_3->s2
s6->RuleStop_a_1
s2-A->BlockEnd_4
RuleStop_a_1-EOF->s8
BlockEnd_4->StarLoopBack_7
StarLoopBack_7->StarLoopEntry_5
";
    assert_eq!(dump(&grammar, &atn, 0), expected);
    // the single-alternative block is not a decision; the loop entry is
    assert_eq!(atn.decisions(), &[StateId(5)]);
}

#[test]
fn test_plus_loop_shape() {
    // a : A+ ;
    let grammar = parser(&["A"])
        .rule("a", Block::seq([Element::plus(Block::seq([Element::token("A")]))]))
        .build()
        .unwrap();
    let atn = build(&grammar);
    let expected = "\
RuleStart_a_0->PlusBlockStart_3
PlusBlockStart_3->s2
s2-A->BlockEnd_4
BlockEnd_4->PlusLoopBack_5
PlusLoopBack_5->PlusBlockStart_3
PlusLoopBack_5->s6
s6->RuleStop_a_1
RuleStop_a_1-EOF->s7
";
    assert_eq!(dump(&grammar, &atn, 0), expected);

    let StateKind::BlockStart { end, .. } = atn[StateId(3)].kind else {
        panic!("expected a block start");
    };
    assert_eq!(end, Some(StateId(4)));
}

#[test]
fn test_rule_call_and_follow_link() {
    // a : b A ; b : B ;
    let grammar = parser(&["A", "B"])
        .rule("a", Block::seq([Element::rule("b"), Element::token("A")]))
        .rule("b", Block::seq([Element::token("B")]))
        .build()
        .unwrap();
    let atn = build(&grammar);
    let expected_a = "\
RuleStart_a_0->s4
s4-b->RuleStart_b_2
s5-A->s6
s6->RuleStop_a_1
RuleStop_a_1-EOF->s9
";
    assert_eq!(dump(&grammar, &atn, 0), expected_a);

    let expected_b = "\
RuleStart_b_2->s7
s7-B->s8
s8->RuleStop_b_3
RuleStop_b_3->s5
";
    assert_eq!(dump(&grammar, &atn, 1), expected_b);

    let call = &atn[StateId(4)].transitions()[0];
    assert_eq!(call.follow_state(), Some(StateId(5)));
    assert!(matches!(call.kind, TransitionKind::Rule { rule_index: 1, .. }));
}

#[test]
fn test_next_and_expected_tokens() {
    // a : b A ; b : B | ;
    let grammar = parser(&["A", "B"])
        .rule("a", Block::seq([Element::rule("b"), Element::token("A")]))
        .rule(
            "b",
            Block::of([
                Alternative::new([Element::token("B")]),
                Alternative::empty(),
            ]),
        )
        .build()
        .unwrap();
    let atn = build(&grammar);
    let vocabulary = grammar.vocabulary();
    let name = |t: i32| vocabulary.display_name(t);

    let b_start = atn.rule_start(1).unwrap();
    let block_start = atn[b_start].transitions()[0].target;
    assert!(atn[block_start].kind.is_block_start());

    let next = atn.next_tokens(block_start);
    assert_eq!(next.to_string_with(name), "{<EPSILON>, B}");

    let expected = atn.expected_tokens(block_start, &[]);
    assert_eq!(expected.to_string_with(name), "{<EOF>, B}");

    let a_start = atn.rule_start(0).unwrap();
    let invoking = atn[a_start].transitions()[0].target;
    assert!(matches!(
        atn[invoking].transitions()[0].kind,
        TransitionKind::Rule { rule_index: 1, .. }
    ));
    let expected = atn.expected_tokens(block_start, &[invoking]);
    assert_eq!(expected.to_string_with(name), "{A, B}");
}

#[test]
fn test_unreferenced_rules_share_eof_sink() {
    let grammar = parser(&["A", "B"])
        .rule("a", Block::seq([Element::token("A")]))
        .rule("b", Block::seq([Element::token("B")]))
        .build()
        .unwrap();
    let atn = build(&grammar);
    let sink = |rule: usize| {
        let stop = atn.rule_stop(rule).unwrap();
        let t = &atn[stop].transitions()[0];
        assert_eq!(t.kind, TransitionKind::Atom(symbol::EOF));
        t.target
    };
    assert_eq!(sink(0), sink(1));
}

#[test]
fn test_non_greedy_star_prefers_exit() {
    // a : A*? B ;
    let grammar = parser(&["A", "B"])
        .rule(
            "a",
            Block::seq([
                Element::star(Block::seq([Element::token("A")])).non_greedy(),
                Element::token("B"),
            ]),
        )
        .build()
        .unwrap();
    let atn = build(&grammar);
    let (entry, state) = atn
        .states()
        .find(|(_, s)| matches!(s.kind, StateKind::StarLoopEntry { .. }))
        .expect("loop entry");
    assert!(state.non_greedy);
    let exit = state.transitions()[0].target;
    assert!(matches!(atn[exit].kind, StateKind::LoopEnd { .. }));
    assert_eq!(atn.decisions(), &[entry]);
}

#[test]
fn test_precedence_decision_is_marked() {
    // e : INT ({2 >= _p}? PLUS e[3])* ;
    let grammar = parser(&["INT", "PLUS"])
        .rule_with(
            "e",
            Block::seq([
                Element::token("INT"),
                Element::star(Block::seq([
                    Element::precedence_predicate(2),
                    Element::token("PLUS"),
                    Element::rule_with_precedence("e", 3),
                ])),
            ]),
            |rule| rule.left_recursive = true,
        )
        .build()
        .unwrap();
    let atn = build(&grammar);
    let marked: Vec<_> = atn
        .states()
        .filter(|(_, s)| {
            matches!(
                s.kind,
                StateKind::StarLoopEntry {
                    precedence_decision: true,
                    ..
                }
            )
        })
        .collect();
    assert_eq!(marked.len(), 1);

    let has_predicate = atn.states().any(|(_, s)| {
        s.transitions()
            .iter()
            .any(|t| t.kind == TransitionKind::PrecedencePredicate { precedence: 2 })
    });
    assert!(has_predicate);
}

#[test]
fn test_outermost_precedence_return_is_tagged() {
    // s : e ; e : INT (PLUS e[1])* ;
    let grammar = parser(&["INT", "PLUS"])
        .rule("s", Block::seq([Element::rule("e")]))
        .rule_with(
            "e",
            Block::seq([
                Element::token("INT"),
                Element::star(Block::seq([
                    Element::token("PLUS"),
                    Element::rule_with_precedence("e", 1),
                ])),
            ]),
            |rule| rule.left_recursive = true,
        )
        .build()
        .unwrap();
    let atn = build(&grammar);
    let stop = atn.rule_stop(1).unwrap();
    let tags: Vec<_> = atn[stop]
        .transitions()
        .iter()
        .map(|t| match t.kind {
            TransitionKind::Epsilon {
                outermost_precedence_return,
            } => outermost_precedence_return,
            _ => panic!("follow links are epsilon edges"),
        })
        .collect();
    assert_eq!(tags.len(), 2);
    assert!(tags.contains(&Some(1)));
    assert!(tags.contains(&None));
}

#[test]
fn test_token_set_and_wildcard() {
    // a : (A | B) ~C . ;
    let grammar = parser(&["A", "B", "C"])
        .rule(
            "a",
            Block::seq([
                Element::set([
                    SetItem::Token("A".into()),
                    SetItem::Token("B".into()),
                ]),
                Element::not_set([SetItem::Token("C".into())]),
                Element::wildcard(),
            ]),
        )
        .build()
        .unwrap();
    let atn = build(&grammar);
    let text = dump(&grammar, &atn, 0);
    assert!(text.contains("-{A, B}->"), "{text}");
    assert!(text.contains("-~C->"), "{text}");
    assert!(text.contains("-.->"), "{text}");
}

#[test]
fn test_undefined_token_is_reported() {
    init();
    let grammar = parser(&["A"])
        .rule("a", Block::seq([Element::token("A"), Element::token("NOPE")]))
        .build()
        .unwrap();
    let build = build_atn(&grammar, &AtnConfig::default()).unwrap();
    assert!(!build.is_usable());
    assert_eq!(
        build.diagnostics.errors().next().map(|d| d.kind.clone()),
        Some(DiagnosticKind::UndefinedToken {
            name: "NOPE".into()
        })
    );
    assert_eq!(build.into_atn().unwrap_err(), AtnError::GrammarErrors { count: 1 });
}

#[test]
fn test_char_range_in_parser_is_reported() {
    init();
    let grammar = parser(&["A"])
        .rule("a", Block::seq([Element::range("a", "z")]))
        .build()
        .unwrap();
    let build = build_atn(&grammar, &AtnConfig::default()).unwrap();
    assert!(matches!(
        build.diagnostics.errors().next().map(|d| &d.kind),
        Some(DiagnosticKind::TokenRangeInParser { .. })
    ));
}

#[test]
fn test_undefined_rule_is_fatal() {
    init();
    let grammar = parser(&["A"])
        .rule("a", Block::seq([Element::rule("missing")]))
        .build()
        .unwrap();
    assert_eq!(
        build_atn(&grammar, &AtnConfig::default()).unwrap_err(),
        AtnError::UndefinedRule {
            name: "missing".into()
        }
    );
}

#[test]
fn test_limits_are_enforced() {
    init();
    let grammar = parser(&["A"])
        .rule(
            "a",
            Block::seq([Element::block(Block::seq([Element::token("A")]))]),
        )
        .build()
        .unwrap();

    let nested = build_atn(&grammar, &AtnConfig::default().with_max_nesting_depth(1));
    assert_eq!(
        nested.unwrap_err(),
        AtnError::NestingTooDeep {
            rule: "a".into(),
            limit: 1
        }
    );

    let small = build_atn(&grammar, &AtnConfig::default().with_max_states(3));
    assert_eq!(small.unwrap_err(), AtnError::StateLimitExceeded { limit: 3 });
}

#[test]
fn test_states_are_contiguous_after_compaction() {
    let grammar = parser(&["A", "B", "C"])
        .rule(
            "a",
            Block::of([
                Alternative::new([Element::token("A"), Element::token("B")]),
                Alternative::new([Element::optional(Block::seq([Element::token("C")]))]),
            ]),
        )
        .build()
        .unwrap();
    let atn = build(&grammar);
    assert_eq!(atn.num_slots(), atn.num_states());
    for (id, state) in atn.states() {
        for t in state.transitions() {
            assert!(atn.contains_state(t.target), "s{id} points at a removed state");
        }
    }
}

#[test]
fn test_dot_export() {
    let grammar = parser(&["A"])
        .rule("a", Block::seq([Element::token("A")]))
        .build()
        .unwrap();
    let atn = build(&grammar);
    let start = atn.rule_start(0).unwrap();
    let dot = AtnPrinter::new(&atn)
        .with_vocabulary(grammar.vocabulary())
        .to_dot(start);
    let expected = "\
digraph ATN {
  rankdir=LR;
  node [shape=circle];
  s0 [label=\"RuleStart_a_0\", shape=box];
  s2 [label=\"s2\", shape=circle];
  s3 [label=\"s3\", shape=circle];
  s1 [label=\"RuleStop_a_1\", shape=doublecircle];
  s4 [label=\"s4\", shape=circle];

  s0 -> s2 [style=dashed];
  s2 -> s3 [label=\"A\"];
  s3 -> s1 [style=dashed];
  s1 -> s4 [label=\"EOF\"];
}
";
    assert_eq!(dot, expected);
}
