//! # Lookahead Analysis
//!
//! Static queries over a finished automaton.
//!
//! ## Overview
//!
//! - [`LookaheadOracle`]: the question the closure check asks, namely which
//!   symbols can come first when walking from one state towards another.
//! - [`Ll1Analyzer`]: the default oracle. It follows epsilon, action,
//!   predicate and rule edges and collects the labels of the first
//!   consuming edges it meets.
//! - [`Atn::next_tokens`] and [`Atn::expected_tokens`]: the same walk with
//!   no stop state, optionally continued through an explicit stack of rule
//!   invocations.
//!
//! Two marker symbols show up in results. [`EPSILON`](symbol::EPSILON)
//! means the walk fell off the end of the region it was asked about
//! (reached `stop`, or a rule stop state with unknown caller) without
//! consuming anything. [`EOF`](symbol::EOF) means the same happened with a
//! known, exhausted call stack, so the next symbol is end of input.
//!
//! ## Usage
//!
//! ```rust
//! use sipha_atn::build::{build_atn, AtnConfig};
//! use sipha_atn::grammar::{Alternative, Block, Element, GrammarBuilder};
//! use sipha_atn::symbol;
//!
//! let grammar = GrammarBuilder::parser("P")
//!     .tokens(["A", "B"])
//!     .rule(
//!         "a",
//!         Block::of([
//!             Alternative::new([Element::token("A")]),
//!             Alternative::empty(),
//!         ]),
//!     )
//!     .build()
//!     .expect("valid grammar");
//! let atn = build_atn(&grammar, &AtnConfig::default()).expect("builds").atn;
//! let start = atn.rule_start(0).expect("rule a");
//!
//! let next = atn.next_tokens(start);
//! assert!(next.contains(1));
//! assert!(next.contains(symbol::EPSILON));
//! ```

pub mod closure;

use hashbrown::HashSet;

use crate::atn::{Atn, StateId, TransitionKind};
use crate::interval::IntervalSet;
use crate::symbol;

/// Answers "which symbols can start a walk from `start` that ends at
/// `stop`".
///
/// The result contains [`symbol::EPSILON`] when `stop` (or the end of the
/// enclosing rule) is reachable without consuming a symbol.
pub trait LookaheadOracle {
    fn leading_tokens(&self, atn: &Atn, start: StateId, stop: StateId) -> IntervalSet;
}

/// Rule invocations still pending, as the follow states to return to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CallStack {
    /// Innermost call last.
    frames: Vec<StateId>,
}

impl CallStack {
    #[must_use]
    pub const fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Stack for a list of invoking states, innermost first, as a runtime
    /// records them. Each invoking state's first transition is the rule
    /// call; states without one are skipped.
    #[must_use]
    pub fn from_invoking_states(atn: &Atn, invoking_states: &[StateId]) -> Self {
        let frames = invoking_states
            .iter()
            .rev()
            .filter_map(|&id| atn.state(id)?.transition(0)?.follow_state())
            .collect();
        Self { frames }
    }

    /// Enter a call that returns to `follow_state`.
    pub fn push(&mut self, follow_state: StateId) {
        self.frames.push(follow_state);
    }

    /// Follow states, innermost last.
    #[must_use]
    pub fn frames(&self) -> &[StateId] {
        &self.frames
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Pending unit of work for the analyzer.
struct Visit {
    state: StateId,
    frames: Vec<StateId>,
    /// Rules entered since the walk last returned; calling one of them
    /// again would be left recursion.
    called: Vec<usize>,
}

/// Single-symbol lookahead over the automaton graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ll1Analyzer;

impl Ll1Analyzer {
    /// Symbols that can be consumed first when leaving `start`.
    ///
    /// The walk ends at `stop` when given. Falling off the bottom of the
    /// stack, at `stop` or at a rule stop state, adds [`symbol::EPSILON`]
    /// when `ctx` is `None` and [`symbol::EOF`] when a call stack was given.
    /// A non-empty `ctx` is unwound first.
    #[must_use]
    pub fn look(
        &self,
        atn: &Atn,
        start: StateId,
        stop: Option<StateId>,
        ctx: Option<&CallStack>,
    ) -> IntervalSet {
        let bottom = if ctx.is_some() {
            symbol::EOF
        } else {
            symbol::EPSILON
        };
        let mut look = IntervalSet::new();
        let mut busy: HashSet<(StateId, Vec<StateId>)> = HashSet::new();
        let mut work = vec![Visit {
            state: start,
            frames: ctx.map(|c| c.frames.clone()).unwrap_or_default(),
            called: Vec::new(),
        }];

        while let Some(Visit {
            state: id,
            mut frames,
            mut called,
        }) = work.pop()
        {
            if !busy.insert((id, frames.clone())) {
                continue;
            }
            let Some(state) = atn.state(id) else {
                continue;
            };

            if Some(id) == stop && frames.is_empty() {
                look.add(bottom);
                continue;
            }
            if state.kind.is_rule_stop() {
                let Some(return_state) = frames.pop() else {
                    look.add(bottom);
                    continue;
                };
                if let Some(rule) = state.rule_index {
                    called.retain(|&r| r != rule);
                }
                work.push(Visit {
                    state: return_state,
                    frames,
                    called,
                });
                continue;
            }

            // reversed so edges are explored in transition order
            for t in state.transitions().iter().rev() {
                match &t.kind {
                    TransitionKind::Rule {
                        rule_index,
                        follow_state,
                        ..
                    } => {
                        if called.contains(rule_index) {
                            continue;
                        }
                        let mut frames = frames.clone();
                        frames.push(*follow_state);
                        let mut called = called.clone();
                        called.push(*rule_index);
                        work.push(Visit {
                            state: t.target,
                            frames,
                            called,
                        });
                    }
                    _ if t.is_epsilon() => work.push(Visit {
                        state: t.target,
                        frames: frames.clone(),
                        called: called.clone(),
                    }),
                    TransitionKind::Wildcard => {
                        look.add_range(atn.min_symbol(), atn.max_symbol());
                    }
                    TransitionKind::NotSet(set) => {
                        let vocabulary = IntervalSet::of_range(atn.min_symbol(), atn.max_symbol());
                        look.add_all(&set.complement(&vocabulary));
                    }
                    _ => {
                        if let Some(label) = t.label() {
                            look.add_all(&label);
                        }
                    }
                }
            }
        }
        look
    }
}

impl LookaheadOracle for Ll1Analyzer {
    fn leading_tokens(&self, atn: &Atn, start: StateId, stop: StateId) -> IntervalSet {
        self.look(atn, start, Some(stop), None)
    }
}

impl Atn {
    /// Symbols that can follow `state` within its rule. Contains
    /// [`symbol::EPSILON`] if the end of the rule is reachable without
    /// consuming anything.
    #[must_use]
    pub fn next_tokens(&self, state: StateId) -> IntervalSet {
        Ll1Analyzer.look(self, state, None, None)
    }

    /// Symbols acceptable at `state` given the states that invoked the
    /// enclosing rules, innermost first.
    ///
    /// Callers are consulted only while the end of the current rule is
    /// reachable without consuming anything. If the stack runs out in that
    /// situation, [`symbol::EOF`] is acceptable too. The result never
    /// contains [`symbol::EPSILON`].
    #[must_use]
    pub fn expected_tokens(&self, state: StateId, invoking_states: &[StateId]) -> IntervalSet {
        let mut following = self.next_tokens(state);
        if !following.contains(symbol::EPSILON) {
            return following;
        }

        let mut expected = following.clone();
        expected.remove(symbol::EPSILON);
        for &invoking in invoking_states {
            if !following.contains(symbol::EPSILON) {
                break;
            }
            let Some(follow) = self
                .state(invoking)
                .and_then(|s| s.transition(0))
                .and_then(|t| t.follow_state())
            else {
                continue;
            };
            following = self.next_tokens(follow);
            expected.add_all(&following);
            expected.remove(symbol::EPSILON);
        }
        if following.contains(symbol::EPSILON) {
            expected.add(symbol::EOF);
        }
        expected
    }
}
