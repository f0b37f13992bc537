//! Removal of the epsilon hop at the end of block alternatives.
//!
//! Block wiring leaves alternatives shaped `p -x-> q -ε-> end` where `q` is
//! a plain basic state. Such a `q` carries no information: `p`'s edge (or,
//! for a rule call, its follow state) can point at `end` directly.

use hashbrown::HashSet;

use crate::atn::{Atn, StateId, StateKind, TransitionKind};

/// Collapse tail epsilons reachable from `start` without entering called
/// rules. Returns the number of states removed.
pub(crate) fn remove_tail_epsilons(atn: &mut Atn, start: StateId) -> usize {
    let mut removed = 0;
    let mut visited = HashSet::new();
    let mut work = vec![start];

    while let Some(p) = work.pop() {
        if !visited.insert(p) {
            continue;
        }
        if let Some((q, r)) = collapsible_tail(atn, p) {
            if let Some(t) = atn[p].transitions_mut().first_mut() {
                match &mut t.kind {
                    TransitionKind::Rule { follow_state, .. } => *follow_state = r,
                    _ => t.target = r,
                }
            }
            atn.remove_state(q);
            removed += 1;
            log::trace!("tail epsilon: s{p} now reaches s{r} directly, s{q} removed");
        }
        let Some(state) = atn.state(p) else {
            continue;
        };
        if state.kind.is_rule_stop() {
            continue;
        }
        for t in state.transitions().iter().rev() {
            work.push(t.continuation());
        }
    }
    removed
}

/// `(q, r)` when `p -x-> q -ε-> r` with `p` and `q` basic, `q` having no
/// other edge and `r` a block end or loop back.
fn collapsible_tail(atn: &Atn, p: StateId) -> Option<(StateId, StateId)> {
    let state = atn.state(p)?;
    if !state.kind.is_basic() {
        return None;
    }
    let q = state.sole_transition()?.continuation();
    let q_state = atn.state(q)?;
    if !q_state.kind.is_basic() {
        return None;
    }
    let hop = q_state.sole_transition()?;
    if !hop.is_plain_epsilon() {
        return None;
    }
    let r = hop.target;
    let r_kind = atn.state(r)?.kind;
    matches!(
        r_kind,
        StateKind::BlockEnd { .. } | StateKind::StarLoopBack | StateKind::PlusLoopBack
    )
    .then_some((q, r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atn::{AtnType, Transition};

    #[test]
    fn test_collapses_alternative_tail() {
        let mut atn = Atn::new(AtnType::Parser, 2);
        let p = atn.add_state(StateKind::Basic, Some(0));
        let q = atn.add_state(StateKind::Basic, Some(0));
        let end = atn.add_state(StateKind::BlockEnd { start: None }, Some(0));
        atn.add_transition(p, Transition::atom(q, 1));
        atn.add_transition(q, Transition::epsilon(end));

        assert_eq!(remove_tail_epsilons(&mut atn, p), 1);
        assert_eq!(atn[p].transitions()[0].target, end);
        assert!(!atn.contains_state(q));
    }

    #[test]
    fn test_keeps_hop_into_rule_stop() {
        let mut atn = Atn::new(AtnType::Parser, 2);
        let p = atn.add_state(StateKind::Basic, Some(0));
        let q = atn.add_state(StateKind::Basic, Some(0));
        let stop = atn.add_state(StateKind::RuleStop, Some(0));
        atn.add_transition(p, Transition::atom(q, 1));
        atn.add_transition(q, Transition::epsilon(stop));

        assert_eq!(remove_tail_epsilons(&mut atn, p), 0);
        assert!(atn.contains_state(q));
    }

    #[test]
    fn test_rule_call_follow_is_retargeted() {
        let mut atn = Atn::new(AtnType::Parser, 2);
        let callee = atn.add_state(
            StateKind::RuleStart {
                stop: None,
                left_recursive: false,
            },
            Some(1),
        );
        let p = atn.add_state(StateKind::Basic, Some(0));
        let q = atn.add_state(StateKind::Basic, Some(0));
        let end = atn.add_state(StateKind::BlockEnd { start: None }, Some(0));
        atn.add_transition(p, Transition::rule(callee, 1, 0, q));
        atn.add_transition(q, Transition::epsilon(end));

        assert_eq!(remove_tail_epsilons(&mut atn, p), 1);
        assert_eq!(atn[p].transitions()[0].follow_state(), Some(end));
        assert_eq!(atn[p].transitions()[0].target, callee);
    }
}
