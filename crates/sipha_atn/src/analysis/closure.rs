//! Epsilon and `EOF` closure checks for loop and optional blocks.
//!
//! A `*` or `+` body that can match nothing would let the loop spin
//! without consuming input, and one that can reach end of input would loop
//! past it; both are errors. An optional block whose content can itself
//! match nothing has a second, hidden bypass and only earns a warning.

use crate::atn::{Atn, StateId};
use crate::error::{AtnError, DiagnosticKind, Diagnostics};
use crate::grammar::{Grammar, Rule};
use crate::optimize::StateRemap;
use crate::symbol;

use super::LookaheadOracle;

/// Start and end state of a block recorded for checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuardedBlock {
    pub rule: usize,
    pub start: StateId,
    pub end: StateId,
}

impl GuardedBlock {
    pub(crate) const fn new(rule: usize, start: StateId, end: StateId) -> Self {
        Self { rule, start, end }
    }

    /// Follow a renumbering of the automaton.
    pub fn remap(&mut self, remap: &StateRemap) {
        if let Some(start) = remap.get(self.start) {
            self.start = start;
        }
        if let Some(end) = remap.get(self.end) {
            self.end = end;
        }
    }
}

fn rule_of<'g>(grammar: &'g Grammar, block: &GuardedBlock) -> Result<&'g Rule, AtnError> {
    grammar.rule(block.rule).ok_or_else(|| {
        AtnError::malformed(
            grammar.name(),
            format!("guarded block refers to unknown rule index {}", block.rule),
        )
    })
}

/// Check every recorded loop and optional block against the final graph.
///
/// # Errors
///
/// Returns [`AtnError::OptionalBypass`] when an optional block does not
/// have exactly one direct edge from its start to its end, which means
/// construction produced an inconsistent graph.
pub fn check_closures(
    atn: &Atn,
    grammar: &Grammar,
    oracle: &dyn LookaheadOracle,
    closure_blocks: &[GuardedBlock],
    optional_blocks: &[GuardedBlock],
    diagnostics: &mut Diagnostics,
) -> Result<(), AtnError> {
    let before = diagnostics.len();

    for block in closure_blocks {
        if !atn.contains_state(block.start) {
            continue;
        }
        let rule = rule_of(grammar, block)?;
        let pos = Some(rule.pos).filter(|p| p.line != 0);
        let look = oracle.leading_tokens(atn, block.start, block.end);
        if look.contains(symbol::EPSILON) {
            let name = rule.name.to_string();
            let kind = if rule.left_recursive {
                DiagnosticKind::EpsilonLeftRecursiveFollow { rule: name }
            } else {
                DiagnosticKind::EpsilonClosure { rule: name }
            };
            diagnostics.report(kind, pos);
        }
        if look.contains(symbol::EOF) {
            diagnostics.report(
                DiagnosticKind::EofClosure {
                    rule: rule.name.to_string(),
                },
                pos,
            );
        }
    }

    'blocks: for block in optional_blocks {
        let Some(start) = atn.state(block.start) else {
            continue;
        };
        let rule = rule_of(grammar, block)?;
        let mut bypass = 0;
        for t in start.transitions() {
            if t.target == block.end {
                bypass += 1;
                continue;
            }
            let look = oracle.leading_tokens(atn, t.target, block.end);
            if look.contains(symbol::EPSILON) {
                diagnostics.report(
                    DiagnosticKind::EpsilonOptional {
                        rule: rule.name.to_string(),
                    },
                    Some(rule.pos).filter(|p| p.line != 0),
                );
                continue 'blocks;
            }
        }
        if bypass != 1 {
            return Err(AtnError::OptionalBypass {
                rule: rule.name.clone(),
                count: bypass,
            });
        }
    }

    log::debug!(
        "closure check: {} loop block(s), {} optional block(s), {} finding(s)",
        closure_blocks.len(),
        optional_blocks.len(),
        diagnostics.len() - before
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Ll1Analyzer;
    use crate::atn::{AtnType, BlockFlavor, StateKind, Transition};
    use crate::grammar::{Block, Element, GrammarBuilder};
    use crate::optimize::AtnOptimizer;

    fn grammar() -> Grammar {
        GrammarBuilder::parser("P")
            .token("A")
            .rule("a", Block::seq([Element::token("A")]))
            .build()
            .unwrap()
    }

    /// `start -> alt -A-> end` plus `bypasses` direct edges.
    fn optional_block(bypasses: usize) -> (Atn, GuardedBlock) {
        let mut atn = Atn::new(AtnType::Parser, 1);
        let start = atn.add_state(StateKind::block_start(BlockFlavor::Basic), Some(0));
        let end = atn.add_state(StateKind::BlockEnd { start: Some(start) }, Some(0));
        let alt = atn.add_state(StateKind::Basic, Some(0));
        atn.add_transition(start, Transition::epsilon(alt));
        atn.add_transition(alt, Transition::atom(end, 1));
        for _ in 0..bypasses {
            atn.add_transition(start, Transition::epsilon(end));
        }
        (atn, GuardedBlock::new(0, start, end))
    }

    #[test]
    fn test_single_bypass_passes() {
        let (atn, block) = optional_block(1);
        let mut diags = Diagnostics::new();
        let result = check_closures(&atn, &grammar(), &Ll1Analyzer, &[], &[block], &mut diags);
        assert!(result.is_ok());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_double_bypass_is_fatal() {
        let (atn, block) = optional_block(2);
        let result = check_closures(
            &atn,
            &grammar(),
            &Ll1Analyzer,
            &[],
            &[block],
            &mut Diagnostics::new(),
        );
        assert_eq!(
            result,
            Err(AtnError::OptionalBypass {
                rule: "a".into(),
                count: 2,
            })
        );
    }

    #[test]
    fn test_empty_loop_body_is_an_error() {
        let (atn, block) = optional_block(1);
        let mut diags = Diagnostics::new();
        check_closures(&atn, &grammar(), &Ll1Analyzer, &[block], &[], &mut diags).unwrap();
        assert_eq!(
            diags.iter().map(|d| d.kind.clone()).collect::<Vec<_>>(),
            vec![DiagnosticKind::EpsilonClosure { rule: "a".into() }]
        );
    }

    #[test]
    fn test_remap_follows_compaction() {
        let mut atn = Atn::new(AtnType::Parser, 1);
        let gone = atn.add_state(StateKind::Basic, Some(0));
        let start = atn.add_state(StateKind::Basic, Some(0));
        let end = atn.add_state(StateKind::Basic, Some(0));
        atn.remove_state(gone);
        let mut block = GuardedBlock::new(0, start, end);

        let remap = AtnOptimizer::new().compact(&mut atn);
        block.remap(&remap);
        assert_eq!(block.start, StateId(0));
        assert_eq!(block.end, StateId(1));
    }
}
