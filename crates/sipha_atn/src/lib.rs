//! # Sipha ATN
//!
//! Augmented transition network construction for parser and lexer grammars.
//!
//! ## Overview
//!
//! An ATN is the state machine a prediction runtime walks to recognize
//! input: one start/stop state pair per rule, typed states for blocks and
//! loops, and edges that consume a token or character, call another rule,
//! or move without consuming anything. This crate builds it from a grammar:
//!
//! - **Grammar model** ([`grammar`]): rules, alternatives, quantifiers,
//!   sets and lexer commands, assembled with [`GrammarBuilder`]
//! - **Construction** ([`build`]): token-level automata for parser
//!   grammars and character-level automata with mode entries and lexer
//!   actions for lexer grammars
//! - **Optimization** ([`optimize`]): set merging of single-symbol
//!   alternatives and contiguous state renumbering
//! - **Analysis** ([`analysis`]): single-symbol lookahead and the
//!   epsilon/`EOF` closure checks on loops and optional blocks
//! - **Output** ([`atn::AtnPrinter`]): a line-per-edge dump and Graphviz DOT
//!
//! Grammar defects are collected as [`Diagnostics`]; only broken input
//! trees and exceeded limits abort with an [`AtnError`].
//!
//! ## Quick Start
//!
//! ```rust
//! use sipha_atn::{build_atn, AtnConfig, AtnPrinter, GrammarBuilder};
//! use sipha_atn::grammar::{Alternative, Block, Element};
//!
//! // a : A (B | ) C ;
//! let grammar = GrammarBuilder::parser("T")
//!     .tokens(["A", "B", "C"])
//!     .rule(
//!         "a",
//!         Block::seq([
//!             Element::token("A"),
//!             Element::block(Block::of([
//!                 Alternative::new([Element::token("B")]),
//!                 Alternative::empty(),
//!             ])),
//!             Element::token("C"),
//!         ]),
//!     )
//!     .build()
//!     .expect("valid grammar");
//!
//! let build = build_atn(&grammar, &AtnConfig::default()).expect("construction succeeds");
//! assert!(build.is_usable());
//!
//! let atn = build.into_atn().expect("no grammar errors");
//! let start = atn.rule_start(0).expect("rule a exists");
//! let dump = AtnPrinter::new(&atn)
//!     .with_vocabulary(grammar.vocabulary())
//!     .as_string(start);
//! assert!(dump.starts_with("RuleStart_a_0->s2\n"));
//! ```
//!
//! ## Feature Flags
//!
//! - `diagnostics`: derive `miette::Diagnostic` for errors and
//!   diagnostics
//! - `serialize`: serde support for the automaton types

pub mod analysis;
pub mod atn;
pub mod build;
pub mod error;
pub mod grammar;
pub mod interval;
pub mod optimize;
pub mod symbol;

pub use analysis::{CallStack, Ll1Analyzer, LookaheadOracle};
pub use atn::{Atn, AtnPrinter, AtnState, AtnType, StateId, StateKind, Transition, TransitionKind};
pub use build::{AtnBuild, AtnConfig, build_atn, build_atn_with_oracle};
pub use error::{AtnError, Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use grammar::{Grammar, GrammarBuilder, GrammarError};
pub use interval::{Interval, IntervalSet};
pub use optimize::{AtnOptimizer, StateRemap};
