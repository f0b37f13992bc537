use criterion::{Criterion, criterion_group, criterion_main};
use sipha_atn::atn::AtnPrinter;
use sipha_atn::build::{AtnConfig, build_atn};
use sipha_atn::grammar::{Alternative, Block, Element, Grammar, GrammarBuilder};
use std::hint::black_box;

/// Expression grammar in the shape the left-recursion rewrite produces.
fn expression_grammar() -> Grammar {
    let operator = |op: &str, precedence: i32, next: i32| {
        Alternative::new([
            Element::precedence_predicate(precedence),
            Element::literal(op),
            Element::rule_with_precedence("expr", next),
        ])
    };
    GrammarBuilder::parser("Expr")
        .tokens(["INT", "ID", "LPAREN", "RPAREN"])
        .literal("+", "PLUS")
        .literal("-", "MINUS")
        .literal("*", "STAR")
        .literal("/", "SLASH")
        .literal(",", "COMMA")
        .rule("prog", Block::seq([Element::plus(Block::seq([Element::rule("expr")]))]))
        .rule_with(
            "expr",
            Block::seq([
                Element::rule("primary"),
                Element::star(Block::of([
                    operator("*", 4, 5),
                    operator("/", 4, 5),
                    operator("+", 3, 4),
                    operator("-", 3, 4),
                ])),
            ]),
            |rule| rule.left_recursive = true,
        )
        .rule(
            "primary",
            Block::of([
                Alternative::new([Element::token("INT")]),
                Alternative::new([
                    Element::token("ID"),
                    Element::optional(Block::seq([
                        Element::token("LPAREN"),
                        Element::optional(Block::seq([
                            Element::rule("expr"),
                            Element::star(Block::seq([
                                Element::literal(","),
                                Element::rule("expr"),
                            ])),
                        ])),
                        Element::token("RPAREN"),
                    ])),
                ]),
                Alternative::new([
                    Element::token("LPAREN"),
                    Element::rule("expr"),
                    Element::token("RPAREN"),
                ]),
            ]),
        )
        .build()
        .expect("valid grammar")
}

fn keyword_lexer() -> Grammar {
    let keywords = [
        "if", "else", "while", "for", "return", "fn", "let", "match", "loop", "break",
    ];
    let mut builder = GrammarBuilder::lexer("Keywords").case_insensitive(true);
    for keyword in keywords {
        builder = builder.rule(&keyword.to_uppercase(), Block::seq([Element::literal(keyword)]));
    }
    builder
        .rule(
            "ID",
            Block::seq([
                Element::char_set("a-zA-Z_"),
                Element::star(Block::seq([Element::char_set("a-zA-Z0-9_")])),
            ]),
        )
        .rule(
            "OP",
            Block::of(
                ["+", "-", "*", "/", "%", "<", ">", "=", "!", "&", "|"]
                    .into_iter()
                    .map(|op| Alternative::new([Element::literal(op)])),
            ),
        )
        .rule(
            "WS",
            Block::of([Alternative::new([Element::plus(Block::seq([Element::char_set(
                " \\t\\r\\n",
            )]))])
            .command("skip")]),
        )
        .build()
        .expect("valid grammar")
}

fn bench_parser_construction(c: &mut Criterion) {
    let grammar = expression_grammar();
    let config = AtnConfig::default();

    c.bench_function("parser_atn_expression", |b| {
        b.iter(|| black_box(build_atn(black_box(&grammar), &config).unwrap()));
    });
}

fn bench_lexer_construction(c: &mut Criterion) {
    let grammar = keyword_lexer();
    let config = AtnConfig::default();

    c.bench_function("lexer_atn_keywords", |b| {
        b.iter(|| black_box(build_atn(black_box(&grammar), &config).unwrap()));
    });

    let unoptimized = config.clone().with_optimize(false).with_check_closures(false);
    c.bench_function("lexer_atn_keywords_no_passes", |b| {
        b.iter(|| black_box(build_atn(black_box(&grammar), &unoptimized).unwrap()));
    });
}

fn bench_lookahead(c: &mut Criterion) {
    let grammar = expression_grammar();
    let atn = build_atn(&grammar, &AtnConfig::default()).unwrap().atn;

    c.bench_function("next_tokens_all_decisions", |b| {
        b.iter(|| {
            for &decision in atn.decisions() {
                black_box(atn.next_tokens(decision));
            }
        });
    });
}

fn bench_printer(c: &mut Criterion) {
    let grammar = expression_grammar();
    let atn = build_atn(&grammar, &AtnConfig::default()).unwrap().atn;
    let printer = AtnPrinter::new(&atn).with_vocabulary(grammar.vocabulary());
    let start = atn.rule_start(1).unwrap();

    c.bench_function("printer_dump_expr", |b| {
        b.iter(|| black_box(printer.as_string(start)));
    });
}

criterion_group!(
    benches,
    bench_parser_construction,
    bench_lexer_construction,
    bench_lookahead,
    bench_printer
);
criterion_main!(benches);
