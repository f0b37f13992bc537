//! Textual and Graphviz dumps of an automaton.
//!
//! The line dump walks breadth-first from a start state and writes one
//! `Source-Label->Target` line per edge (`Source->Target` for epsilon
//! edges). State labels carry the state type and number, so the dump pins
//! the exact shape of a construction:
//!
//! ```text
//! RuleStart_a_0->s2
//! s2-A->s3
//! s3->RuleStop_a_1
//! RuleStop_a_1-EOF->s4
//! ```

use std::collections::VecDeque;
use std::fmt::Write;

use hashbrown::HashSet;

use super::{Atn, AtnState, AtnType, BlockFlavor, StateId, StateKind, Transition, TransitionKind};
use crate::grammar::Vocabulary;
use crate::interval::char_literal;
use crate::symbol;

/// Renders edges reachable from a start state.
#[derive(Debug, Clone, Copy)]
pub struct AtnPrinter<'a> {
    atn: &'a Atn,
    vocabulary: Option<&'a Vocabulary>,
}

impl<'a> AtnPrinter<'a> {
    #[must_use]
    pub const fn new(atn: &'a Atn) -> Self {
        Self {
            atn,
            vocabulary: None,
        }
    }

    /// Token names for parser automata. Without a vocabulary token types
    /// print as numbers.
    #[must_use]
    pub const fn with_vocabulary(mut self, vocabulary: &'a Vocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    /// The line dump starting at `start`.
    #[must_use]
    pub fn as_string(&self, start: StateId) -> String {
        let mut out = String::new();
        for (source, transition) in self.edges(start) {
            out.push_str(&self.state_label(source));
            match &transition.kind {
                TransitionKind::Epsilon { .. } => {}
                _ => {
                    out.push('-');
                    out.push_str(&self.transition_label(transition));
                }
            }
            out.push_str("->");
            out.push_str(&self.state_label(transition.target));
            out.push('\n');
        }
        out
    }

    /// Graphviz rendering of the edges reachable from `start`.
    #[must_use]
    pub fn to_dot(&self, start: StateId) -> String {
        let mut output = String::new();
        writeln!(output, "digraph ATN {{").unwrap();
        writeln!(output, "  rankdir=LR;").unwrap();
        writeln!(output, "  node [shape=circle];").unwrap();

        let edges = self.edges(start);
        let mut nodes: Vec<StateId> = Vec::new();
        let mut seen = HashSet::new();
        for (source, t) in &edges {
            for id in [*source, t.target] {
                if seen.insert(id) {
                    nodes.push(id);
                }
            }
        }
        if nodes.is_empty() {
            nodes.push(start);
        }
        for id in &nodes {
            let shape = match self.atn.state(*id).map(|s| s.kind) {
                Some(StateKind::RuleStop) => "doublecircle",
                Some(StateKind::RuleStart { .. } | StateKind::TokensStart) => "box",
                _ => "circle",
            };
            writeln!(
                output,
                "  s{id} [label=\"{}\", shape={shape}];",
                escape_dot(&self.state_label(*id))
            )
            .unwrap();
        }
        writeln!(output).unwrap();
        for (source, t) in &edges {
            if t.is_plain_epsilon() {
                writeln!(output, "  s{source} -> s{} [style=dashed];", t.target).unwrap();
            } else {
                writeln!(
                    output,
                    "  s{source} -> s{} [label=\"{}\"];",
                    t.target,
                    escape_dot(&self.transition_label(t))
                )
                .unwrap();
            }
        }
        writeln!(output, "}}").unwrap();
        output
    }

    /// Breadth-first edge walk. Edges out of rule stop states are listed
    /// but not followed; rule calls continue at their follow state.
    fn edges(&self, start: StateId) -> Vec<(StateId, &'a Transition)> {
        let mut edges = Vec::new();
        let mut marked = HashSet::new();
        let mut work = VecDeque::from([start]);
        while let Some(id) = work.pop_front() {
            if !marked.insert(id) {
                continue;
            }
            let Some(state) = self.atn.state(id) else {
                continue;
            };
            for t in state.transitions() {
                if !state.kind.is_rule_stop() {
                    work.push_back(t.continuation());
                }
                edges.push((id, t));
            }
        }
        edges
    }

    /// `RuleStart_expr_0`, `BlockStart_5`, `s7`.
    #[must_use]
    pub fn state_label(&self, id: StateId) -> String {
        let Some(state) = self.atn.state(id) else {
            return format!("s{id}");
        };
        match state.kind {
            StateKind::BlockStart { flavor, .. } => match flavor {
                BlockFlavor::Star => format!("StarBlockStart_{id}"),
                BlockFlavor::Plus { .. } => format!("PlusBlockStart_{id}"),
                BlockFlavor::Basic => format!("BlockStart_{id}"),
            },
            StateKind::BlockEnd { .. } => format!("BlockEnd_{id}"),
            StateKind::RuleStart { .. } => format!("RuleStart_{}_{id}", self.rule_name(state)),
            StateKind::RuleStop => format!("RuleStop_{}_{id}", self.rule_name(state)),
            StateKind::PlusLoopBack => format!("PlusLoopBack_{id}"),
            StateKind::StarLoopBack => format!("StarLoopBack_{id}"),
            StateKind::StarLoopEntry { .. } => format!("StarLoopEntry_{id}"),
            StateKind::Basic | StateKind::LoopEnd { .. } | StateKind::TokensStart => {
                format!("s{id}")
            }
        }
    }

    fn rule_name(&self, state: &AtnState) -> &'a str {
        state
            .rule_index
            .and_then(|r| self.atn.rule_name(r))
            .unwrap_or("?")
    }

    /// Edge label as it appears between the dashes of a dump line.
    #[must_use]
    pub fn transition_label(&self, t: &Transition) -> String {
        let lexer = self.atn.grammar_type() == AtnType::Lexer;
        match &t.kind {
            TransitionKind::Epsilon { .. } => String::new(),
            TransitionKind::Atom(v) => self.symbol_name(*v),
            TransitionKind::Range(a, b) => format!("{}..{}", char_literal(*a), char_literal(*b)),
            TransitionKind::Set(set) | TransitionKind::NotSet(set) => {
                let not = if matches!(t.kind, TransitionKind::NotSet(_)) {
                    "~"
                } else {
                    ""
                };
                let body = if lexer {
                    set.to_char_string()
                } else {
                    set.to_string_with(|v| self.symbol_name(v))
                };
                format!("{not}{body}")
            }
            TransitionKind::Wildcard => ".".to_string(),
            TransitionKind::Action {
                rule_index,
                action_index,
                ..
            } => match action_index {
                Some(index) => format!("action_{rule_index}:{index}"),
                None => format!("action_{rule_index}:-1"),
            },
            TransitionKind::Predicate {
                rule_index,
                pred_index,
                ..
            } => format!("pred_{rule_index}:{pred_index}"),
            TransitionKind::PrecedencePredicate { precedence } => format!("{precedence} >= _p"),
            TransitionKind::Rule { rule_index, .. } => self
                .atn
                .rule_name(*rule_index)
                .map_or_else(|| rule_index.to_string(), str::to_string),
        }
    }

    fn symbol_name(&self, value: i32) -> String {
        if self.atn.grammar_type() == AtnType::Lexer {
            return char_literal(value);
        }
        match self.vocabulary {
            Some(vocab) => vocab.display_name(value),
            None if value == symbol::EOF => "EOF".to_string(),
            None => value.to_string(),
        }
    }
}

fn escape_dot(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
