#![cfg(feature = "serialize")]
//! Built automata survive a JSON round trip unchanged

use sipha_atn::atn::Atn;
use sipha_atn::build::{AtnConfig, build_atn};
use sipha_atn::grammar::{Alternative, Block, Element, GrammarBuilder};

#[test]
fn test_lexer_atn_json_round_trip() {
    let grammar = GrammarBuilder::lexer("L")
        .rule(
            "ID",
            Block::seq([
                Element::char_set("a-z"),
                Element::star(Block::seq([Element::char_set("a-z0-9")])),
            ]),
        )
        .rule(
            "WS",
            Block::of([Alternative::new([Element::literal(" ")]).command("skip")]),
        )
        .build()
        .unwrap();
    let atn = build_atn(&grammar, &AtnConfig::default()).unwrap().atn;

    let json = serde_json::to_string(&atn).unwrap();
    let restored: Atn = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, atn);
    assert_eq!(restored.next_tokens(restored.decisions()[1]), atn.next_tokens(atn.decisions()[1]));
}
