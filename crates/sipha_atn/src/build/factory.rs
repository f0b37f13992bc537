//! Fragment composition shared by the parser and lexer factories.

use compact_str::CompactString;

use super::{AtnConfig, Handle, atn_type};
use crate::analysis::closure::GuardedBlock;
use crate::atn::{Atn, BlockFlavor, StateId, StateKind, Transition, TransitionKind};
use crate::error::{AtnError, DiagnosticKind, Diagnostics};
use crate::grammar::{Block, Grammar, LexerCommand, Quantifier, SetItem, SourcePos};

/// `None` for positions the grammar tree did not record.
pub(crate) const fn known(pos: SourcePos) -> Option<SourcePos> {
    if pos.line == 0 { None } else { Some(pos) }
}

/// Automaton under construction plus the bookkeeping of the current rule.
pub(crate) struct FactoryCore<'g> {
    pub(crate) grammar: &'g Grammar,
    pub(crate) atn: Atn,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) closure_blocks: Vec<GuardedBlock>,
    pub(crate) optional_blocks: Vec<GuardedBlock>,
    pub(crate) max_nesting_depth: usize,
    max_states: usize,
    current_rule: usize,
    next_predicate: usize,
}

impl<'g> FactoryCore<'g> {
    pub(crate) fn new(grammar: &'g Grammar, config: &AtnConfig) -> Self {
        let mut atn = Atn::new(atn_type(grammar.kind()), grammar.max_token_type());
        atn.rule_names = grammar.rules().iter().map(|r| r.name.clone()).collect();
        Self {
            grammar,
            atn,
            diagnostics: Diagnostics::new(),
            closure_blocks: Vec::new(),
            optional_blocks: Vec::new(),
            max_nesting_depth: config.max_nesting_depth,
            max_states: config.max_states,
            current_rule: 0,
            next_predicate: 0,
        }
    }

    pub(crate) const fn current_rule(&self) -> usize {
        self.current_rule
    }

    pub(crate) const fn set_current_rule(&mut self, rule_index: usize) {
        self.current_rule = rule_index;
    }

    pub(crate) fn current_rule_name(&self) -> CompactString {
        self.grammar
            .rule(self.current_rule)
            .map(|r| r.name.clone())
            .unwrap_or_default()
    }

    pub(crate) fn report(&mut self, kind: DiagnosticKind, pos: SourcePos) {
        self.diagnostics.report(kind, known(pos));
    }

    /// Add a state owned by `rule_index`, enforcing the state bound.
    pub(crate) fn add_state(
        &mut self,
        kind: StateKind,
        rule_index: Option<usize>,
    ) -> Result<StateId, AtnError> {
        if self.atn.num_slots() >= self.max_states {
            return Err(AtnError::StateLimitExceeded {
                limit: self.max_states,
            });
        }
        Ok(self.atn.add_state(kind, rule_index))
    }

    /// New state of `kind` in the current rule.
    pub(crate) fn new_state_of(&mut self, kind: StateKind) -> Result<StateId, AtnError> {
        self.add_state(kind, Some(self.current_rule))
    }

    pub(crate) fn new_state(&mut self) -> Result<StateId, AtnError> {
        self.new_state_of(StateKind::Basic)
    }

    pub(crate) fn epsilon(&mut self, from: StateId, to: StateId) {
        self.atn.add_transition(from, Transition::epsilon(to));
    }

    /// Epsilon edge tried before every existing edge of `from`.
    pub(crate) fn epsilon_first(&mut self, from: StateId, to: StateId) {
        self.atn[from].insert_transition(0, Transition::epsilon(to));
    }

    /// Two fresh states joined by the transition `edge` builds for the
    /// right state.
    pub(crate) fn transition_node(
        &mut self,
        edge: impl FnOnce(StateId) -> Transition,
    ) -> Result<Handle, AtnError> {
        let left = self.new_state()?;
        let right = self.new_state()?;
        self.atn.add_transition(left, edge(right));
        Ok(Handle::new(left, right))
    }

    /// Two fresh states joined by an epsilon edge.
    pub(crate) fn epsilon_node(&mut self) -> Result<Handle, AtnError> {
        self.transition_node(Transition::epsilon)
    }

    /// Allocate every rule's start and stop state so that bodies can call
    /// rules defined later.
    pub(crate) fn create_rule_start_and_stop_states(&mut self) -> Result<(), AtnError> {
        let grammar = self.grammar;
        for rule in grammar.rules() {
            let start = self.add_state(
                StateKind::RuleStart {
                    stop: None,
                    left_recursive: rule.left_recursive,
                },
                Some(rule.index),
            )?;
            let stop = self.add_state(StateKind::RuleStop, Some(rule.index))?;
            if let StateKind::RuleStart { stop: link, .. } = &mut self.atn[start].kind {
                *link = Some(stop);
            }
            self.atn.rule_to_start_state.push(start);
            self.atn.rule_to_stop_state.push(stop);
        }
        Ok(())
    }

    /// Chain elements left to right.
    ///
    /// When an element is a lone basic-to-basic transition its edge is
    /// redirected to the next element and its right state dropped;
    /// otherwise an epsilon edge bridges the two.
    pub(crate) fn elem_list(&mut self, els: &[Handle]) -> Result<Handle, AtnError> {
        let (Some(first), Some(last)) = (els.first(), els.last()) else {
            return Err(AtnError::malformed(
                &self.current_rule_name(),
                "empty element list",
            ));
        };
        for pair in els.windows(2) {
            let (el, next) = (pair[0], pair[1]);
            let left = &self.atn[el.left];
            let right_is_basic = self.atn[el.right].kind.is_basic();
            let inline = left.kind.is_basic()
                && right_is_basic
                && left.sole_transition().is_some_and(|t| match t.kind {
                    TransitionKind::Rule { follow_state, .. } => follow_state == el.right,
                    _ => t.target == el.right,
                });
            if inline {
                if let Some(t) = self.atn[el.left].transitions_mut().first_mut() {
                    match &mut t.kind {
                        TransitionKind::Rule { follow_state, .. } => *follow_state = next.left,
                        _ => t.target = next.left,
                    }
                }
                self.atn.remove_state(el.right);
            } else {
                self.epsilon(el.right, next.left);
            }
        }
        Ok(Handle::new(first.left, last.right))
    }

    /// Plain `( ... )`. A single alternative is returned as is.
    pub(crate) fn block(&mut self, alts: &[Handle]) -> Result<Handle, AtnError> {
        if let [alt] = alts {
            return Ok(*alt);
        }
        let start = self.new_state_of(StateKind::block_start(BlockFlavor::Basic))?;
        if alts.len() > 1 {
            self.atn.define_decision_state(start);
        }
        self.make_block(start, alts)
    }

    /// Create the end state of the block opened by `start` and hang every
    /// alternative between the two.
    pub(crate) fn make_block(&mut self, start: StateId, alts: &[Handle]) -> Result<Handle, AtnError> {
        let end = self.new_state_of(StateKind::BlockEnd { start: Some(start) })?;
        if let StateKind::BlockStart { end: link, .. } = &mut self.atn[start].kind {
            *link = Some(end);
        }
        for alt in alts {
            self.epsilon(start, alt.left);
            self.epsilon(alt.right, end);
        }
        Ok(Handle::new(start, end))
    }

    /// Block under `?`, `*` or `+`.
    pub(crate) fn quantified_block(
        &mut self,
        alts: &[Handle],
        quantifier: Quantifier,
        greedy: bool,
    ) -> Result<Handle, AtnError> {
        match quantifier {
            Quantifier::Optional => {
                let start = self.new_state_of(StateKind::block_start(BlockFlavor::Basic))?;
                self.atn.define_decision_state(start);
                let blk = self.make_block(start, alts)?;
                Ok(self.optional(blk, greedy))
            }
            Quantifier::Star => {
                let start = self.new_state_of(StateKind::block_start(BlockFlavor::Star))?;
                if alts.len() > 1 {
                    self.atn.define_decision_state(start);
                }
                let blk = self.make_block(start, alts)?;
                self.star(blk, greedy)
            }
            Quantifier::Plus => {
                let start =
                    self.new_state_of(StateKind::block_start(BlockFlavor::Plus { loop_back: None }))?;
                if alts.len() > 1 {
                    self.atn.define_decision_state(start);
                }
                let blk = self.make_block(start, alts)?;
                self.plus(blk, greedy)
            }
        }
    }

    /// `( ... )?`: a bypass edge from the block start to its end, tried
    /// last when greedy and first otherwise.
    pub(crate) fn optional(&mut self, blk: Handle, greedy: bool) -> Handle {
        self.optional_blocks
            .push(GuardedBlock::new(self.current_rule, blk.left, blk.right));
        self.atn[blk.left].non_greedy = !greedy;
        if greedy {
            self.epsilon(blk.left, blk.right);
        } else {
            self.epsilon_first(blk.left, blk.right);
        }
        blk
    }

    /// `( ... )*`:
    ///
    /// ```text
    ///   entry --> blkStart ... blkEnd --> loopBack --> entry
    ///     \
    ///      --> loopEnd
    /// ```
    pub(crate) fn star(&mut self, blk: Handle, greedy: bool) -> Result<Handle, AtnError> {
        let (blk_start, blk_end) = (blk.left, blk.right);
        self.closure_blocks
            .push(GuardedBlock::new(self.current_rule, blk_start, blk_end));

        let entry = self.new_state_of(StateKind::StarLoopEntry {
            loop_back: None,
            precedence_decision: false,
        })?;
        self.atn[entry].non_greedy = !greedy;
        self.atn.define_decision_state(entry);
        let end = self.new_state_of(StateKind::LoopEnd { loop_back: None })?;
        let loop_back = self.new_state_of(StateKind::StarLoopBack)?;
        if let StateKind::StarLoopEntry { loop_back: link, .. } = &mut self.atn[entry].kind {
            *link = Some(loop_back);
        }
        if let StateKind::LoopEnd { loop_back: link } = &mut self.atn[end].kind {
            *link = Some(loop_back);
        }

        if greedy {
            self.epsilon(entry, blk_start);
            self.epsilon(entry, end);
        } else {
            self.epsilon(entry, end);
            self.epsilon(entry, blk_start);
        }
        self.epsilon(blk_end, loop_back);
        self.epsilon(loop_back, entry);
        Ok(Handle::new(entry, end))
    }

    /// `( ... )+`: the block is entered unconditionally and the loop-back
    /// state decides between another iteration and the exit.
    pub(crate) fn plus(&mut self, blk: Handle, greedy: bool) -> Result<Handle, AtnError> {
        let (blk_start, blk_end) = (blk.left, blk.right);
        self.closure_blocks
            .push(GuardedBlock::new(self.current_rule, blk_start, blk_end));

        let loop_back = self.new_state_of(StateKind::PlusLoopBack)?;
        self.atn[loop_back].non_greedy = !greedy;
        self.atn.define_decision_state(loop_back);
        let end = self.new_state_of(StateKind::LoopEnd { loop_back: None })?;
        if let StateKind::BlockStart {
            flavor: BlockFlavor::Plus { loop_back: link },
            ..
        } = &mut self.atn[blk_start].kind
        {
            *link = Some(loop_back);
        }
        if let StateKind::LoopEnd { loop_back: link } = &mut self.atn[end].kind {
            *link = Some(loop_back);
        }

        self.epsilon(blk_end, loop_back);
        if greedy {
            self.epsilon(loop_back, blk_start);
            self.epsilon(loop_back, end);
        } else {
            self.epsilon(loop_back, end);
            self.epsilon(loop_back, blk_start);
        }
        Ok(Handle::new(blk_start, end))
    }

    /// Call of rule `name`. The right state becomes the follow state.
    pub(crate) fn rule_ref(&mut self, name: &str, precedence: Option<i32>) -> Result<Handle, AtnError> {
        let Some(rule) = self.grammar.rule_by_name(name) else {
            return Err(AtnError::UndefinedRule { name: name.into() });
        };
        let rule_index = rule.index;
        let Some(start) = self.atn.rule_start(rule_index) else {
            return Err(AtnError::UndefinedRule { name: name.into() });
        };
        self.transition_node(|right| {
            Transition::rule(start, rule_index, precedence.unwrap_or(0), right)
        })
    }

    pub(crate) fn wildcard(&mut self) -> Result<Handle, AtnError> {
        self.transition_node(Transition::wildcard)
    }

    /// Semantic predicate. Predicates carrying a precedence become
    /// precedence predicates; the rest are numbered in grammar order.
    pub(crate) fn sempred(&mut self, text: &str, precedence: Option<i32>) -> Result<Handle, AtnError> {
        let kind = match precedence {
            Some(precedence) => TransitionKind::PrecedencePredicate { precedence },
            None => {
                let pred_index = self.next_predicate;
                self.next_predicate += 1;
                TransitionKind::Predicate {
                    rule_index: self.current_rule,
                    pred_index,
                    ctx_dependent: text.contains('$'),
                }
            }
        };
        self.transition_node(|right| Transition::new(right, kind))
    }

    /// Wire a finished rule body between the rule's start and stop states.
    pub(crate) fn rule(&mut self, rule_index: usize, blk: Handle) -> Result<Handle, AtnError> {
        let (Some(start), Some(stop)) = (self.atn.rule_start(rule_index), self.atn.rule_stop(rule_index))
        else {
            return Err(AtnError::malformed(
                &self.current_rule_name(),
                "rule has no start state",
            ));
        };
        self.epsilon(start, blk.left);
        self.epsilon(blk.right, stop);
        Ok(Handle::new(start, stop))
    }

    /// Give every called rule's stop state an epsilon edge back to the
    /// follow state of the call. Returns from the outermost precedence
    /// level of a left-recursive rule are tagged with the callee.
    pub(crate) fn add_rule_follow_links(&mut self) -> usize {
        let mut links = Vec::new();
        for (_, state) in self.atn.states() {
            for t in state.transitions() {
                if let TransitionKind::Rule {
                    rule_index,
                    precedence,
                    follow_state,
                } = t.kind
                {
                    links.push((rule_index, precedence, follow_state));
                }
            }
        }
        for &(rule_index, precedence, follow_state) in &links {
            let Some(stop) = self.atn.rule_stop(rule_index) else {
                continue;
            };
            let left_recursive = self
                .grammar
                .rule(rule_index)
                .is_some_and(|r| r.left_recursive);
            let outermost_precedence_return =
                (left_recursive && precedence == 0).then_some(rule_index);
            self.atn.add_transition(
                stop,
                Transition::new(
                    follow_state,
                    TransitionKind::Epsilon {
                        outermost_precedence_return,
                    },
                ),
            );
        }
        links.len()
    }

    /// Rules that nothing calls are entry rules; let them match `EOF` into
    /// one shared sink state.
    pub(crate) fn add_eof_transition_to_start_rules(&mut self) -> Result<usize, AtnError> {
        let sink = self.add_state(StateKind::Basic, None)?;
        let mut n = 0;
        for stop in self.atn.rule_to_stop_state.clone() {
            if self.atn[stop].num_transitions() > 0 {
                continue;
            }
            self.atn
                .add_transition(stop, Transition::atom(sink, crate::symbol::EOF));
            n += 1;
        }
        Ok(n)
    }

    pub(crate) fn into_construction(self) -> super::Construction {
        super::Construction {
            atn: self.atn,
            diagnostics: self.diagnostics,
            closure_blocks: self.closure_blocks,
            optional_blocks: self.optional_blocks,
        }
    }
}

/// The construction steps whose result depends on the grammar type.
///
/// Shared composition lives on [`FactoryCore`]; implementors build the
/// leaves and may hook into alternatives, loops and rule boundaries.
pub(crate) trait AtnFactory<'g> {
    fn core(&mut self) -> &mut FactoryCore<'g>;

    fn token_ref(&mut self, name: &str, pos: SourcePos) -> Result<Handle, AtnError>;

    fn string_literal(&mut self, text: &str, pos: SourcePos) -> Result<Handle, AtnError>;

    fn range(&mut self, from: &str, to: &str, pos: SourcePos) -> Result<Handle, AtnError>;

    fn char_set(&mut self, text: &str, pos: SourcePos) -> Result<Handle, AtnError>;

    fn set(&mut self, items: &[SetItem], inverted: bool, pos: SourcePos)
    -> Result<Handle, AtnError>;

    fn action(&mut self, text: &str, pos: SourcePos) -> Result<Handle, AtnError>;

    /// Append the lexer commands of an alternative.
    fn alt_commands(
        &mut self,
        alt: Handle,
        _commands: &[LexerCommand],
    ) -> Result<Handle, AtnError> {
        Ok(alt)
    }

    /// Called before the alternatives of a `*` or `+` block are wired.
    fn check_loop(&mut self, _block: &Block, _quantifier: Quantifier, _greedy: bool) {}

    /// Called once a rule body is complete.
    fn end_rule(&mut self) {}
}
