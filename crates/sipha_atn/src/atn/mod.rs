//! # Augmented Transition Networks
//!
//! The graph vocabulary produced by construction and consumed by a runtime
//! simulator.
//!
//! ## Overview
//!
//! An [`Atn`] owns every state in an arena indexed by [`StateId`]. Ids are
//! stable during construction: removing a state empties its slot instead of
//! shifting the ones after it, and only the optimizer's compaction step
//! assigns new, contiguous numbers.
//!
//! Besides the states the automaton records
//!
//! - the start and stop state of every rule, by rule index
//! - the decision states, by decision number
//! - for lexers, the start state of every mode, the token type each rule
//!   produces and the deduplicated lexer action table
//!
//! ## States and transitions
//!
//! A state is a [`StateKind`] tag plus an ordered list of [`Transition`]s.
//! Rule calls are [`TransitionKind::Rule`] edges into the callee's start
//! state; they carry the follow state where the caller resumes, so a rule's
//! stop state can fan out to every call site.

mod lexer_action;
pub mod printer;
mod state;
mod transition;

pub use lexer_action::LexerAction;
pub use printer::AtnPrinter;
pub use state::{AtnState, BlockFlavor, StateKind};
pub use transition::{Transition, TransitionKind};

use std::fmt;
use std::ops::{Index, IndexMut};

use compact_str::CompactString;

use crate::symbol;

/// Stable index of a state within its automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StateId(pub u32);

impl StateId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into the decision table.
pub type DecisionId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum AtnType {
    Lexer,
    Parser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Atn {
    pub(crate) grammar_type: AtnType,
    pub(crate) max_token_type: i32,
    pub(crate) states: Vec<Option<AtnState>>,
    pub(crate) rule_names: Vec<CompactString>,
    pub(crate) rule_to_start_state: Vec<StateId>,
    pub(crate) rule_to_stop_state: Vec<StateId>,
    pub(crate) rule_to_token_type: Vec<i32>,
    pub(crate) decision_to_state: Vec<StateId>,
    pub(crate) mode_names: Vec<CompactString>,
    pub(crate) mode_to_start_state: Vec<StateId>,
    pub(crate) lexer_actions: Vec<LexerAction>,
}

impl Atn {
    #[must_use]
    pub const fn new(grammar_type: AtnType, max_token_type: i32) -> Self {
        Self {
            grammar_type,
            max_token_type,
            states: Vec::new(),
            rule_names: Vec::new(),
            rule_to_start_state: Vec::new(),
            rule_to_stop_state: Vec::new(),
            rule_to_token_type: Vec::new(),
            decision_to_state: Vec::new(),
            mode_names: Vec::new(),
            mode_to_start_state: Vec::new(),
            lexer_actions: Vec::new(),
        }
    }

    #[must_use]
    pub const fn grammar_type(&self) -> AtnType {
        self.grammar_type
    }

    #[must_use]
    pub const fn max_token_type(&self) -> i32 {
        self.max_token_type
    }

    /// Largest symbol a wildcard or not-set edge can match: the last code
    /// point for lexers, the last token type for parsers.
    #[must_use]
    pub const fn max_symbol(&self) -> i32 {
        match self.grammar_type {
            AtnType::Lexer => symbol::MAX_CHAR_VALUE,
            AtnType::Parser => self.max_token_type,
        }
    }

    /// Smallest symbol a wildcard or not-set edge can match.
    #[must_use]
    pub const fn min_symbol(&self) -> i32 {
        match self.grammar_type {
            AtnType::Lexer => symbol::MIN_CHAR_VALUE,
            AtnType::Parser => symbol::MIN_USER_TOKEN_TYPE,
        }
    }

    /// Append a state and return its id.
    pub fn add_state(&mut self, kind: StateKind, rule_index: Option<usize>) -> StateId {
        let id = StateId(u32::try_from(self.states.len()).unwrap_or(u32::MAX));
        self.states.push(Some(AtnState::new(kind, rule_index)));
        id
    }

    /// Empty the slot of `id`. Edges into it must already be rewired.
    pub fn remove_state(&mut self, id: StateId) {
        if let Some(slot) = self.states.get_mut(id.index()) {
            *slot = None;
        }
    }

    #[must_use]
    pub fn state(&self, id: StateId) -> Option<&AtnState> {
        self.states.get(id.index()).and_then(Option::as_ref)
    }

    pub fn state_mut(&mut self, id: StateId) -> Option<&mut AtnState> {
        self.states.get_mut(id.index()).and_then(Option::as_mut)
    }

    #[must_use]
    pub fn contains_state(&self, id: StateId) -> bool {
        self.state(id).is_some()
    }

    /// Live states in id order.
    pub fn states(&self) -> impl Iterator<Item = (StateId, &AtnState)> {
        self.states.iter().enumerate().filter_map(|(i, slot)| {
            slot.as_ref()
                .map(|s| (StateId(u32::try_from(i).unwrap_or(u32::MAX)), s))
        })
    }

    /// Number of slots, including removed ones.
    #[must_use]
    pub fn num_slots(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn num_states(&self) -> usize {
        self.states.iter().filter(|s| s.is_some()).count()
    }

    pub fn add_transition(&mut self, from: StateId, transition: Transition) {
        self[from].add_transition(transition);
    }

    /// Register `id` as a decision state and return its decision number.
    pub fn define_decision_state(&mut self, id: StateId) -> DecisionId {
        let decision = self.decision_to_state.len();
        self.decision_to_state.push(id);
        self[id].decision = Some(decision);
        decision
    }

    #[must_use]
    pub fn decision_state(&self, decision: DecisionId) -> Option<StateId> {
        self.decision_to_state.get(decision).copied()
    }

    #[must_use]
    pub fn decisions(&self) -> &[StateId] {
        &self.decision_to_state
    }

    #[must_use]
    pub fn num_rules(&self) -> usize {
        self.rule_to_start_state.len()
    }

    #[must_use]
    pub fn rule_name(&self, rule_index: usize) -> Option<&str> {
        self.rule_names.get(rule_index).map(CompactString::as_str)
    }

    #[must_use]
    pub fn rule_start(&self, rule_index: usize) -> Option<StateId> {
        self.rule_to_start_state.get(rule_index).copied()
    }

    #[must_use]
    pub fn rule_stop(&self, rule_index: usize) -> Option<StateId> {
        self.rule_to_stop_state.get(rule_index).copied()
    }

    #[must_use]
    pub fn rule_start_states(&self) -> &[StateId] {
        &self.rule_to_start_state
    }

    #[must_use]
    pub fn rule_stop_states(&self) -> &[StateId] {
        &self.rule_to_stop_state
    }

    /// Token type emitted by each lexer rule, `0` for fragments.
    #[must_use]
    pub fn rule_to_token_type(&self) -> &[i32] {
        &self.rule_to_token_type
    }

    #[must_use]
    pub fn mode_start_states(&self) -> &[StateId] {
        &self.mode_to_start_state
    }

    #[must_use]
    pub fn mode_start(&self, name: &str) -> Option<StateId> {
        self.mode_names
            .iter()
            .position(|m| m == name)
            .and_then(|i| self.mode_to_start_state.get(i).copied())
    }

    #[must_use]
    pub fn mode_names(&self) -> &[CompactString] {
        &self.mode_names
    }

    #[must_use]
    pub fn lexer_actions(&self) -> &[LexerAction] {
        &self.lexer_actions
    }
}

impl Index<StateId> for Atn {
    type Output = AtnState;

    fn index(&self, id: StateId) -> &AtnState {
        match self.state(id) {
            Some(state) => state,
            None => panic!("state {id} was removed or never existed"),
        }
    }
}

impl IndexMut<StateId> for Atn {
    fn index_mut(&mut self, id: StateId) -> &mut AtnState {
        match self.state_mut(id) {
            Some(state) => state,
            None => panic!("state {id} was removed or never existed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_keeps_ids_stable() {
        let mut atn = Atn::new(AtnType::Parser, 3);
        let a = atn.add_state(StateKind::Basic, Some(0));
        let b = atn.add_state(StateKind::Basic, Some(0));
        let c = atn.add_state(StateKind::Basic, Some(0));
        atn.remove_state(b);
        assert!(atn.contains_state(a));
        assert!(!atn.contains_state(b));
        assert_eq!(c, StateId(2));
        assert_eq!(atn.num_states(), 2);
        assert_eq!(atn.num_slots(), 3);
    }

    #[test]
    fn test_define_decision_state() {
        let mut atn = Atn::new(AtnType::Parser, 1);
        let s = atn.add_state(StateKind::block_start(BlockFlavor::Basic), Some(0));
        assert_eq!(atn.define_decision_state(s), 0);
        assert_eq!(atn[s].decision, Some(0));
        assert_eq!(atn.decision_state(0), Some(s));
    }

    #[test]
    fn test_max_symbol_depends_on_type() {
        assert_eq!(Atn::new(AtnType::Parser, 7).max_symbol(), 7);
        assert_eq!(
            Atn::new(AtnType::Lexer, 7).max_symbol(),
            symbol::MAX_CHAR_VALUE
        );
    }
}
