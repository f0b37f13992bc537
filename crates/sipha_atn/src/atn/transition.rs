use crate::interval::IntervalSet;

use super::StateId;

/// Edge label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum TransitionKind {
    /// Set on rule-stop follow links returning from the outermost
    /// precedence level of a left-recursive rule.
    Epsilon {
        outermost_precedence_return: Option<usize>,
    },
    Atom(i32),
    Range(i32, i32),
    Set(IntervalSet),
    NotSet(IntervalSet),
    Wildcard,
    Action {
        rule_index: usize,
        action_index: Option<usize>,
        ctx_dependent: bool,
    },
    Predicate {
        rule_index: usize,
        pred_index: usize,
        ctx_dependent: bool,
    },
    PrecedencePredicate {
        precedence: i32,
    },
    /// Call of another rule. `target` is the callee's start state and
    /// execution resumes at `follow_state` once the callee's stop state is
    /// reached.
    Rule {
        rule_index: usize,
        precedence: i32,
        follow_state: StateId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Transition {
    pub target: StateId,
    pub kind: TransitionKind,
}

impl Transition {
    #[must_use]
    pub const fn new(target: StateId, kind: TransitionKind) -> Self {
        Self { target, kind }
    }

    #[must_use]
    pub const fn epsilon(target: StateId) -> Self {
        Self::new(
            target,
            TransitionKind::Epsilon {
                outermost_precedence_return: None,
            },
        )
    }

    #[must_use]
    pub const fn atom(target: StateId, value: i32) -> Self {
        Self::new(target, TransitionKind::Atom(value))
    }

    #[must_use]
    pub const fn range(target: StateId, a: i32, b: i32) -> Self {
        Self::new(target, TransitionKind::Range(a, b))
    }

    /// Single code point or range transition: an atom when `a == b`.
    #[must_use]
    pub const fn code_point_range(target: StateId, a: i32, b: i32) -> Self {
        if a == b {
            Self::atom(target, a)
        } else {
            Self::range(target, a, b)
        }
    }

    #[must_use]
    pub const fn set(target: StateId, set: IntervalSet) -> Self {
        Self::new(target, TransitionKind::Set(set))
    }

    #[must_use]
    pub const fn not_set(target: StateId, set: IntervalSet) -> Self {
        Self::new(target, TransitionKind::NotSet(set))
    }

    #[must_use]
    pub const fn wildcard(target: StateId) -> Self {
        Self::new(target, TransitionKind::Wildcard)
    }

    #[must_use]
    pub const fn rule(
        start: StateId,
        rule_index: usize,
        precedence: i32,
        follow_state: StateId,
    ) -> Self {
        Self::new(
            start,
            TransitionKind::Rule {
                rule_index,
                precedence,
                follow_state,
            },
        )
    }

    /// Epsilon, action, predicate and rule transitions consume nothing.
    #[must_use]
    pub const fn is_epsilon(&self) -> bool {
        matches!(
            self.kind,
            TransitionKind::Epsilon { .. }
                | TransitionKind::Action { .. }
                | TransitionKind::Predicate { .. }
                | TransitionKind::PrecedencePredicate { .. }
                | TransitionKind::Rule { .. }
        )
    }

    #[must_use]
    pub const fn is_plain_epsilon(&self) -> bool {
        matches!(self.kind, TransitionKind::Epsilon { .. })
    }

    #[must_use]
    pub const fn follow_state(&self) -> Option<StateId> {
        match self.kind {
            TransitionKind::Rule { follow_state, .. } => Some(follow_state),
            _ => None,
        }
    }

    /// The state execution continues at after this edge: the follow state
    /// for rule calls, the target otherwise.
    #[must_use]
    pub const fn continuation(&self) -> StateId {
        match self.kind {
            TransitionKind::Rule { follow_state, .. } => follow_state,
            _ => self.target,
        }
    }

    /// Symbols matched, for atom, range and (not-)set edges.
    #[must_use]
    pub fn label(&self) -> Option<IntervalSet> {
        match &self.kind {
            TransitionKind::Atom(v) => Some(IntervalSet::of(*v)),
            TransitionKind::Range(a, b) => Some(IntervalSet::of_range(*a, *b)),
            TransitionKind::Set(set) | TransitionKind::NotSet(set) => Some(set.clone()),
            _ => None,
        }
    }

    /// Whether the edge consumes `symbol` within the vocabulary `min..=max`.
    #[must_use]
    pub fn matches(&self, symbol: i32, min: i32, max: i32) -> bool {
        match &self.kind {
            TransitionKind::Atom(v) => *v == symbol,
            TransitionKind::Range(a, b) => (*a..=*b).contains(&symbol),
            TransitionKind::Set(set) => set.contains(symbol),
            TransitionKind::NotSet(set) => {
                (min..=max).contains(&symbol) && !set.contains(symbol)
            }
            TransitionKind::Wildcard => (min..=max).contains(&symbol),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_point_range_collapses_to_atom() {
        let t = Transition::code_point_range(StateId(3), 97, 97);
        assert_eq!(t.kind, TransitionKind::Atom(97));
        let t = Transition::code_point_range(StateId(3), 97, 122);
        assert_eq!(t.kind, TransitionKind::Range(97, 122));
    }

    #[test]
    fn test_not_set_matches_within_vocabulary() {
        let t = Transition::not_set(StateId(1), IntervalSet::of(2));
        assert!(t.matches(1, 1, 4));
        assert!(!t.matches(2, 1, 4));
        assert!(!t.matches(5, 1, 4));
    }

    #[test]
    fn test_rule_transition_continues_at_follow() {
        let t = Transition::rule(StateId(0), 1, 0, StateId(9));
        assert!(t.is_epsilon());
        assert_eq!(t.continuation(), StateId(9));
        assert_eq!(t.target, StateId(0));
    }
}
