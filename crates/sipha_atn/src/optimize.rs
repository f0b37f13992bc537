//! # ATN Optimizer
//!
//! Post-construction passes over a finished automaton.
//!
//! - **Set merging** (lexer automata only): adjacent alternatives of a
//!   decision that each match one atom, range or set and then reach the
//!   block end are folded into the first of them, which then matches the
//!   union of their labels. Only adjacent alternatives are merged so that
//!   alternative priority is unchanged.
//! - **Compaction**: removed states leave empty slots; compaction renumbers
//!   the surviving states contiguously, in their original order, and
//!   rewrites every stored id.
//!
//! Both passes are idempotent.
//!
//! ## Usage
//!
//! ```rust
//! use sipha_atn::atn::{Atn, AtnType, StateKind};
//! use sipha_atn::optimize::AtnOptimizer;
//!
//! let mut atn = Atn::new(AtnType::Lexer, 0);
//! let gone = atn.add_state(StateKind::Basic, None);
//! let kept = atn.add_state(StateKind::Basic, None);
//! atn.remove_state(gone);
//!
//! let remap = AtnOptimizer::new().compact(&mut atn);
//! assert_eq!(remap.get(kept).map(|id| id.index()), Some(0));
//! assert_eq!(atn.num_slots(), 1);
//! ```

use std::mem;

use crate::atn::{Atn, AtnType, StateId, Transition, TransitionKind};
use crate::error::{DiagnosticKind, Diagnostics};
use crate::interval::{IntervalSet, char_literal};

/// Old state id to new state id, `None` for removed states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateRemap {
    map: Vec<Option<StateId>>,
}

impl StateRemap {
    /// New id of `old`, or `None` if it was removed.
    #[must_use]
    pub fn get(&self, old: StateId) -> Option<StateId> {
        self.map.get(old.index()).copied().flatten()
    }

    /// Nothing moved.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.map
            .iter()
            .enumerate()
            .all(|(i, new)| new.is_some_and(|id| id.index() == i))
    }

    /// Number of slots that were empty.
    #[must_use]
    pub fn removed(&self) -> usize {
        self.map.iter().filter(|new| new.is_none()).count()
    }

    fn apply(&self, id: &mut StateId) {
        if let Some(new) = self.get(*id) {
            *id = new;
        }
    }
}

/// Runs set merging and compaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtnOptimizer;

impl AtnOptimizer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Merge runs of single-symbol alternatives into set transitions.
    /// Returns the number of states removed; parser automata are left
    /// untouched.
    pub fn optimize_sets(&self, atn: &mut Atn, diagnostics: &mut Diagnostics) -> usize {
        if atn.grammar_type() == AtnType::Parser {
            return 0;
        }
        let mut removed = 0;
        for decision in atn.decisions().to_vec() {
            removed += merge_decision(atn, decision, diagnostics);
        }
        log::debug!("set merging removed {removed} state(s)");
        removed
    }

    /// Renumber live states contiguously and rewrite every id the automaton
    /// stores.
    pub fn compact(&self, atn: &mut Atn) -> StateRemap {
        let mut next = 0u32;
        let map = atn
            .states
            .iter()
            .map(|slot| {
                slot.as_ref().map(|_| {
                    let id = StateId(next);
                    next += 1;
                    id
                })
            })
            .collect();
        let remap = StateRemap { map };
        if remap.is_identity() {
            return remap;
        }

        let states = mem::take(&mut atn.states);
        atn.states = states
            .into_iter()
            .flatten()
            .map(|mut state| {
                for t in state.transitions_mut() {
                    remap.apply(&mut t.target);
                    if let TransitionKind::Rule { follow_state, .. } = &mut t.kind {
                        remap.apply(follow_state);
                    }
                }
                state.kind.remap_links(|id| remap.get(id));
                Some(state)
            })
            .collect();

        for id in atn
            .rule_to_start_state
            .iter_mut()
            .chain(atn.rule_to_stop_state.iter_mut())
            .chain(atn.decision_to_state.iter_mut())
            .chain(atn.mode_to_start_state.iter_mut())
        {
            remap.apply(id);
        }
        log::debug!(
            "compaction: {} state(s) renumbered, {} empty slot(s) dropped",
            atn.num_states(),
            remap.removed()
        );
        remap
    }
}

/// Indices of the alternatives of `decision` shaped
/// `decision -ε-> s -x-> blockEnd` where `x` is an atom, range or set.
fn merge_candidates(atn: &Atn, decision: StateId) -> IntervalSet {
    let mut candidates = IntervalSet::new();
    let Some(state) = atn.state(decision) else {
        return candidates;
    };
    for (i, eps) in state.transitions().iter().enumerate() {
        if !eps.is_plain_epsilon() {
            continue;
        }
        let Some(only) = atn.state(eps.target).and_then(|s| s.sole_transition()) else {
            continue;
        };
        if !atn
            .state(only.target)
            .is_some_and(|end| end.kind.is_block_end())
        {
            continue;
        }
        if matches!(
            only.kind,
            TransitionKind::Atom(_) | TransitionKind::Range(..) | TransitionKind::Set(_)
        ) {
            if let Ok(i) = i32::try_from(i) {
                candidates.add(i);
            }
        }
    }
    candidates
}

fn merge_decision(atn: &mut Atn, decision: StateId, diagnostics: &mut Diagnostics) -> usize {
    let candidates = merge_candidates(atn, decision);
    let mut removed = 0;
    // back to front so earlier indices stay valid
    for run in candidates.intervals().iter().rev() {
        if run.len() <= 1 {
            continue;
        }
        let (first, last) = (run.a as usize, run.b as usize);
        let alt_state = |atn: &Atn, j: usize| atn[decision].transitions()[j].target;

        let first_state = alt_state(atn, first);
        let block_end = atn[first_state].transitions()[0].target;
        let mut merged = IntervalSet::new();
        for j in first..=last {
            let label = atn[alt_state(atn, j)].transitions()[0]
                .label()
                .unwrap_or_default();
            for iv in label.intervals() {
                if iv.a == -1 || iv.b == -1 {
                    continue;
                }
                if let Some(v) = merged.and(&IntervalSet::of_range(iv.a, iv.b)).min_element() {
                    diagnostics.report(
                        DiagnosticKind::CharactersCollisionInSet {
                            chars: char_literal(v),
                            set: merged.to_char_string(),
                        },
                        None,
                    );
                    break;
                }
            }
            merged.add_all(&label);
        }

        let replacement = match merged.intervals() {
            [only] => Transition::code_point_range(block_end, only.a, only.b),
            _ => Transition::set(block_end, merged),
        };
        atn[first_state].set_transition(0, replacement);
        for _ in first + 1..=last {
            let gone = atn[decision].remove_transition(first + 1);
            atn.remove_state(gone.target);
            removed += 1;
        }
        log::trace!(
            "decision s{decision}: merged alternatives {first}..={last} into one set edge"
        );
    }
    removed
}
