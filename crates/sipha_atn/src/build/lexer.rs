//! Construction for lexer grammars: leaves match code points.

use compact_str::CompactString;
use hashbrown::HashMap;
use smallvec::SmallVec;

use super::charset::{self, SetCollector};
use super::factory::{AtnFactory, FactoryCore, known};
use super::walker::build_rule;
use super::{AtnConfig, Construction, Handle};
use crate::atn::{LexerAction, StateId, StateKind, Transition, TransitionKind};
use crate::error::{AtnError, DiagnosticKind};
use crate::grammar::{Block, Grammar, LexerCommand, Quantifier, SetItem, SourcePos};
use crate::symbol;

/// Builds character-level automata, one entry state per lexer mode.
pub(crate) struct LexerAtnFactory<'g> {
    pub(super) core: FactoryCore<'g>,
    /// Index of each distinct action in the lexer action table.
    pub(super) action_index: HashMap<LexerAction, usize, ahash::RandomState>,
    /// Commands seen so far in the current rule.
    pub(super) rule_commands: SmallVec<[CompactString; 4]>,
    pub(super) next_custom_action: usize,
}

impl<'g> LexerAtnFactory<'g> {
    pub(crate) fn new(grammar: &'g Grammar, config: &AtnConfig) -> Self {
        Self {
            core: FactoryCore::new(grammar, config),
            action_index: HashMap::default(),
            rule_commands: SmallVec::new(),
            next_custom_action: 0,
        }
    }

    /// Build mode starts, every rule and the links from each mode start to
    /// the token rules of that mode.
    pub(crate) fn create_atn(mut self) -> Result<Construction, AtnError> {
        let grammar = self.core.grammar;
        for mode in grammar.modes() {
            let start = self.core.add_state(StateKind::TokensStart, None)?;
            self.core.atn.mode_to_start_state.push(start);
            self.core.atn.mode_names.push(mode.name.clone());
            self.core.atn.define_decision_state(start);
        }

        self.core.atn.rule_to_token_type = grammar
            .rules()
            .iter()
            .map(|rule| {
                if rule.fragment {
                    symbol::INVALID_TYPE
                } else {
                    grammar
                        .token_type(&rule.name)
                        .unwrap_or(symbol::INVALID_TYPE)
                }
            })
            .collect();

        self.core.create_rule_start_and_stop_states()?;
        for rule in grammar.rules() {
            build_rule(&mut self, rule)?;
        }
        let links = self.core.add_rule_follow_links();

        let mut entries = 0;
        let mode_starts = self.core.atn.mode_to_start_state.clone();
        for (mode, &start) in grammar.modes().iter().zip(&mode_starts) {
            for &rule_index in &mode.rules {
                let Some(rule) = grammar.rule(rule_index) else {
                    return Err(AtnError::malformed(
                        &mode.name,
                        format!("mode lists unknown rule index {rule_index}"),
                    ));
                };
                if rule.fragment {
                    continue;
                }
                let Some(rule_start) = self.core.atn.rule_start(rule_index) else {
                    return Err(AtnError::UndefinedRule {
                        name: rule.name.clone(),
                    });
                };
                self.core.epsilon(start, rule_start);
                entries += 1;
            }
        }
        log::debug!(
            "lexer ATN: {} mode(s), {entries} mode entry link(s), {links} follow link(s), {} lexer action(s)",
            grammar.modes().len(),
            self.core.atn.lexer_actions.len()
        );
        Ok(self.core.into_construction())
    }

    /// Effective case-insensitivity of the rule being built.
    fn case_insensitive(&self) -> bool {
        let grammar = self.core.grammar;
        grammar
            .rule(self.core.current_rule())
            .is_some_and(|rule| grammar.rule_case_insensitive(rule))
    }

    /// A single code point or range edge, split into both cases when the
    /// rule is case-insensitive and the range folds into two.
    fn code_point_transition(
        &mut self,
        target: StateId,
        from: i32,
        to: i32,
        pos: SourcePos,
    ) -> Transition {
        let fold = charset::check_case_fold(&mut self.core.diagnostics, known(pos), from, to);
        if self.case_insensitive() && !fold.is_single_range() {
            Transition::set(target, fold.both_ranges())
        } else {
            Transition::code_point_range(target, from, to)
        }
    }

    /// Action edge to the table entry for `action`, adding the entry if the
    /// same action has not been seen before.
    pub(super) fn action_node(&mut self, action: LexerAction) -> Result<Handle, AtnError> {
        let index = match self.action_index.get(&action) {
            Some(&index) => index,
            None => {
                let index = self.core.atn.lexer_actions.len();
                self.core.atn.lexer_actions.push(action);
                self.action_index.insert(action, index);
                index
            }
        };
        let rule_index = self.core.current_rule();
        self.core.transition_node(|right| {
            Transition::new(
                right,
                TransitionKind::Action {
                    rule_index,
                    action_index: Some(index),
                    ctx_dependent: false,
                },
            )
        })
    }

    /// A grammar action, numbered in grammar order within the lexer.
    pub(super) fn custom_action(&mut self) -> Result<Handle, AtnError> {
        let action = LexerAction::Custom {
            rule_index: self.core.current_rule(),
            action_index: self.next_custom_action,
        };
        self.next_custom_action += 1;
        self.action_node(action)
    }
}

fn set_item_text(item: &SetItem) -> String {
    match item {
        SetItem::Token(name) => name.to_string(),
        SetItem::Literal(text) => format!("'{text}'"),
        SetItem::Range(from, to) => format!("'{from}'..'{to}'"),
        SetItem::CharSet(text) => format!("[{text}]"),
    }
}

impl<'g> AtnFactory<'g> for LexerAtnFactory<'g> {
    fn core(&mut self) -> &mut FactoryCore<'g> {
        &mut self.core
    }

    /// Another lexer rule, or `EOF`.
    fn token_ref(&mut self, name: &str, _pos: SourcePos) -> Result<Handle, AtnError> {
        if name == "EOF" {
            return self
                .core
                .transition_node(|right| Transition::atom(right, symbol::EOF));
        }
        self.core.rule_ref(name, None)
    }

    /// One edge per code point.
    fn string_literal(&mut self, text: &str, pos: SourcePos) -> Result<Handle, AtnError> {
        let code_points = match charset::unescape_literal(text) {
            Ok(code_points) => code_points,
            Err(sequence) => {
                self.core
                    .report(DiagnosticKind::InvalidEscapeSequence { sequence }, pos);
                return self.core.epsilon_node();
            }
        };
        if code_points.is_empty() {
            self.core.report(
                DiagnosticKind::EmptyStringsAndSetsNotAllowed {
                    text: "''".to_string(),
                },
                pos,
            );
            return self.core.epsilon_node();
        }

        let left = self.core.new_state()?;
        let mut prev = left;
        for cp in code_points {
            let right = self.core.new_state()?;
            let transition = self.code_point_transition(right, cp, cp, pos);
            self.core.atn.add_transition(prev, transition);
            prev = right;
        }
        Ok(Handle::new(left, prev))
    }

    /// An invalid range leaves its two states unconnected.
    fn range(&mut self, from: &str, to: &str, pos: SourcePos) -> Result<Handle, AtnError> {
        let left = self.core.new_state()?;
        let right = self.core.new_state()?;
        if let Some((a, b)) =
            charset::checked_range(&mut self.core.diagnostics, known(pos), from, to)
        {
            let transition = self.code_point_transition(right, a, b, pos);
            self.core.atn.add_transition(left, transition);
        }
        Ok(Handle::new(left, right))
    }

    fn char_set(&mut self, text: &str, pos: SourcePos) -> Result<Handle, AtnError> {
        let case_insensitive = self.case_insensitive();
        let set = charset::char_set_literal(
            &mut self.core.diagnostics,
            known(pos),
            case_insensitive,
            text,
        );
        self.core.transition_node(|right| Transition::set(right, set))
    }

    fn set(
        &mut self,
        items: &[SetItem],
        inverted: bool,
        pos: SourcePos,
    ) -> Result<Handle, AtnError> {
        let case_insensitive = self.case_insensitive();
        let text = items.iter().map(set_item_text).collect::<Vec<_>>().join(" | ");
        let pos = known(pos);
        let mut collector =
            SetCollector::new(&mut self.core.diagnostics, pos, case_insensitive, text);

        for item in items {
            match item {
                SetItem::Range(from, to) => {
                    if let Some((a, b)) = charset::checked_range(collector.diagnostics(), pos, from, to)
                    {
                        collector.add_range(a, b);
                    }
                }
                SetItem::CharSet(text) => {
                    let chars = charset::char_set_literal(
                        collector.diagnostics(),
                        pos,
                        case_insensitive,
                        text,
                    );
                    collector.add_set(&chars);
                }
                SetItem::Literal(text) => match charset::char_value_of_literal(text) {
                    Some(cp) => collector.add_range(cp, cp),
                    None => collector.report(DiagnosticKind::InvalidLiteralInLexerSet {
                        text: format!("'{text}'"),
                    }),
                },
                SetItem::Token(name) => {
                    collector.report(DiagnosticKind::UnsupportedReferenceInLexerSet {
                        name: name.to_string(),
                    });
                }
            }
        }

        let set = collector.finish();
        self.core.transition_node(|right| {
            if inverted {
                return Transition::not_set(right, set);
            }
            match set.intervals() {
                [only] => Transition::code_point_range(right, only.a, only.b),
                _ => Transition::set(right, set),
            }
        })
    }

    fn action(&mut self, _text: &str, _pos: SourcePos) -> Result<Handle, AtnError> {
        self.custom_action()
    }

    fn alt_commands(
        &mut self,
        alt: Handle,
        commands: &[LexerCommand],
    ) -> Result<Handle, AtnError> {
        let mut handles = Vec::with_capacity(commands.len());
        for command in commands {
            handles.push(self.lexer_command(command)?);
        }
        let commands = self.core.elem_list(&handles)?;
        self.core.elem_list(&[alt, commands])
    }

    fn check_loop(&mut self, block: &Block, quantifier: Quantifier, greedy: bool) {
        if greedy && block.has_wildcard_alternative() {
            self.core.report(
                DiagnosticKind::ExpectedNonGreedyWildcardBlock {
                    op: quantifier.symbol().to_string(),
                },
                block.pos,
            );
        }
    }

    fn end_rule(&mut self) {
        self.rule_commands.clear();
    }
}
