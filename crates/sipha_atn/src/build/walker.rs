//! Depth-first walk over a rule body, building each node through a factory.

use super::Handle;
use super::factory::AtnFactory;
use super::tail_epsilon;
use crate::error::AtnError;
use crate::grammar::{Alternative, Block, Element, ElementKind, Quantifier, Rule};

/// Build `rule` into the automaton owned by `factory`.
pub(crate) fn build_rule<'g, F: AtnFactory<'g>>(
    factory: &mut F,
    rule: &Rule,
) -> Result<Handle, AtnError> {
    factory.core().set_current_rule(rule.index);
    log::trace!("building rule {} ({})", rule.name, rule.index);

    let limit = factory.core().max_nesting_depth;
    let body = {
        let mut walker = Walker {
            factory: &mut *factory,
            rule,
            depth: 0,
            limit,
        };
        walker.block(&rule.block, None)?
    };
    let handle = factory.core().rule(rule.index, body)?;
    factory.end_rule();

    let removed = tail_epsilon::remove_tail_epsilons(&mut factory.core().atn, handle.left);
    if removed > 0 {
        log::trace!("rule {}: removed {removed} tail epsilon state(s)", rule.name);
    }
    Ok(handle)
}

struct Walker<'f, F> {
    factory: &'f mut F,
    rule: &'f Rule,
    depth: usize,
    limit: usize,
}

impl<'g, F: AtnFactory<'g>> Walker<'_, F> {
    fn block(
        &mut self,
        block: &Block,
        ebnf: Option<(Quantifier, bool)>,
    ) -> Result<Handle, AtnError> {
        if self.depth >= self.limit {
            return Err(AtnError::NestingTooDeep {
                rule: self.rule.name.clone(),
                limit: self.limit,
            });
        }
        if block.alternatives.is_empty() {
            return Err(AtnError::malformed(&self.rule.name, "block has no alternatives"));
        }

        self.depth += 1;
        let mut alts = Vec::with_capacity(block.alternatives.len());
        for alt in &block.alternatives {
            alts.push(self.alternative(alt)?);
        }
        self.depth -= 1;

        match ebnf {
            None => self.factory.core().block(&alts),
            Some((quantifier, greedy)) => {
                if quantifier != Quantifier::Optional {
                    self.factory.check_loop(block, quantifier, greedy);
                }
                self.factory.core().quantified_block(&alts, quantifier, greedy)
            }
        }
    }

    fn alternative(&mut self, alt: &Alternative) -> Result<Handle, AtnError> {
        let handle = if alt.elements.is_empty() {
            self.factory.core().epsilon_node()?
        } else {
            let mut els = Vec::with_capacity(alt.elements.len());
            for element in &alt.elements {
                els.push(self.element(element)?);
            }
            self.factory.core().elem_list(&els)?
        };
        if alt.commands.is_empty() {
            Ok(handle)
        } else {
            self.factory.alt_commands(handle, &alt.commands)
        }
    }

    fn element(&mut self, element: &Element) -> Result<Handle, AtnError> {
        let pos = element.pos;
        match &element.kind {
            ElementKind::TokenRef(name) => self.factory.token_ref(name, pos),
            ElementKind::RuleRef { name, precedence } => {
                self.factory.core().rule_ref(name, *precedence)
            }
            ElementKind::Literal(text) => self.factory.string_literal(text, pos),
            ElementKind::Range { from, to } => self.factory.range(from, to, pos),
            ElementKind::CharSet(text) => self.factory.char_set(text, pos),
            ElementKind::Set { items, inverted } => self.factory.set(items, *inverted, pos),
            ElementKind::Wildcard => self.factory.core().wildcard(),
            ElementKind::Action(text) => self.factory.action(text, pos),
            ElementKind::Predicate { text, precedence } => {
                self.factory.core().sempred(text, *precedence)
            }
            ElementKind::Epsilon => self.factory.core().epsilon_node(),
            ElementKind::Block(block) => self.block(block, None),
            ElementKind::Loop {
                block,
                quantifier,
                greedy,
            } => self.block(block, Some((*quantifier, *greedy))),
        }
    }
}
