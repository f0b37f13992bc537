use smallvec::SmallVec;

use super::{StateId, Transition};

/// Which loop construct a block start opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockFlavor {
    /// Plain `( ... )` or `( ... )?`.
    Basic,
    /// Body of `( ... )*`.
    Star,
    /// Body of `( ... )+`; the loop-back decides repeat or exit.
    Plus { loop_back: Option<StateId> },
}

/// State type tag with the links each type carries.
///
/// Links are `Option` only while the construct is half-built; once a
/// block, loop or rule has been wired they are always set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum StateKind {
    Basic,
    RuleStart {
        stop: Option<StateId>,
        left_recursive: bool,
    },
    RuleStop,
    BlockStart {
        flavor: BlockFlavor,
        end: Option<StateId>,
    },
    BlockEnd {
        start: Option<StateId>,
    },
    StarLoopEntry {
        loop_back: Option<StateId>,
        precedence_decision: bool,
    },
    StarLoopBack,
    PlusLoopBack,
    LoopEnd {
        loop_back: Option<StateId>,
    },
    /// Lexer mode entry, one per mode.
    TokensStart,
}

impl StateKind {
    #[must_use]
    pub const fn block_start(flavor: BlockFlavor) -> Self {
        Self::BlockStart { flavor, end: None }
    }

    #[must_use]
    pub const fn is_basic(&self) -> bool {
        matches!(self, Self::Basic)
    }

    #[must_use]
    pub const fn is_block_start(&self) -> bool {
        matches!(self, Self::BlockStart { .. })
    }

    #[must_use]
    pub const fn is_block_end(&self) -> bool {
        matches!(self, Self::BlockEnd { .. })
    }

    #[must_use]
    pub const fn is_loop_back(&self) -> bool {
        matches!(self, Self::StarLoopBack | Self::PlusLoopBack)
    }

    #[must_use]
    pub const fn is_rule_stop(&self) -> bool {
        matches!(self, Self::RuleStop)
    }

    /// Apply `f` to every state id this kind links to.
    pub(crate) fn remap_links(&mut self, mut f: impl FnMut(StateId) -> Option<StateId>) {
        let mut map = |slot: &mut Option<StateId>| {
            if let Some(id) = *slot {
                *slot = f(id);
            }
        };
        match self {
            Self::RuleStart { stop, .. } => map(stop),
            Self::BlockStart { flavor, end } => {
                map(end);
                if let BlockFlavor::Plus { loop_back } = flavor {
                    map(loop_back);
                }
            }
            Self::BlockEnd { start } => map(start),
            Self::StarLoopEntry { loop_back, .. } | Self::LoopEnd { loop_back } => map(loop_back),
            Self::Basic
            | Self::RuleStop
            | Self::StarLoopBack
            | Self::PlusLoopBack
            | Self::TokensStart => {}
        }
    }
}

/// A node of the automaton.
///
/// Transition order is significant: it encodes alternative priority, and
/// for loops it encodes greediness.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AtnState {
    pub kind: StateKind,
    /// `None` for states outside any rule (mode starts, the EOF sink).
    pub rule_index: Option<usize>,
    /// Decision number once registered as a decision state.
    pub decision: Option<usize>,
    pub non_greedy: bool,
    transitions: SmallVec<[Transition; 2]>,
}

impl AtnState {
    #[must_use]
    pub fn new(kind: StateKind, rule_index: Option<usize>) -> Self {
        Self {
            kind,
            rule_index,
            decision: None,
            non_greedy: false,
            transitions: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    #[must_use]
    pub fn transition(&self, index: usize) -> Option<&Transition> {
        self.transitions.get(index)
    }

    #[must_use]
    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    pub fn add_transition(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    pub fn insert_transition(&mut self, index: usize, transition: Transition) {
        self.transitions.insert(index, transition);
    }

    pub fn set_transition(&mut self, index: usize, transition: Transition) {
        self.transitions[index] = transition;
    }

    pub fn remove_transition(&mut self, index: usize) -> Transition {
        self.transitions.remove(index)
    }

    pub(crate) fn transitions_mut(&mut self) -> &mut [Transition] {
        &mut self.transitions
    }

    /// True when the state has transitions and all of them are epsilon-like.
    #[must_use]
    pub fn only_epsilon_transitions(&self) -> bool {
        !self.transitions.is_empty() && self.transitions.iter().all(Transition::is_epsilon)
    }

    /// The single transition of a state that has exactly one.
    #[must_use]
    pub fn sole_transition(&self) -> Option<&Transition> {
        match self.transitions.as_slice() {
            [t] => Some(t),
            _ => None,
        }
    }
}
