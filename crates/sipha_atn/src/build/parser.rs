//! Construction for parser grammars: leaves match token types.

use super::factory::{AtnFactory, FactoryCore};
use super::walker::build_rule;
use super::{AtnConfig, Construction, Handle};
use crate::atn::{Transition, TransitionKind};
use crate::error::{AtnError, DiagnosticKind};
use crate::grammar::{Grammar, SetItem, SourcePos};
use crate::interval::IntervalSet;

/// Builds token- and rule-level automata.
pub(crate) struct ParserAtnFactory<'g> {
    core: FactoryCore<'g>,
}

impl<'g> ParserAtnFactory<'g> {
    pub(crate) fn new(grammar: &'g Grammar, config: &AtnConfig) -> Self {
        Self {
            core: FactoryCore::new(grammar, config),
        }
    }

    /// Build every rule, wire follow links and give entry rules their
    /// `EOF` edge.
    pub(crate) fn create_atn(mut self) -> Result<Construction, AtnError> {
        self.core.create_rule_start_and_stop_states()?;
        let grammar = self.core.grammar;
        for rule in grammar.rules() {
            build_rule(&mut self, rule)?;
        }
        let links = self.core.add_rule_follow_links();
        let entries = self.core.add_eof_transition_to_start_rules()?;
        log::debug!("parser ATN: {links} follow link(s), {entries} entry rule(s)");
        Ok(self.core.into_construction())
    }

    /// Token type named by `name`, or a diagnostic when it is unknown.
    fn resolve_token(&mut self, name: &str, pos: SourcePos) -> Option<i32> {
        let ttype = self.core.grammar.token_type(name);
        if ttype.is_none() {
            self.core.report(
                DiagnosticKind::UndefinedToken {
                    name: name.to_string(),
                },
                pos,
            );
        }
        ttype
    }

    fn resolve_literal(&mut self, text: &str, pos: SourcePos) -> Option<i32> {
        let ttype = self.core.grammar.literal_type(text);
        if ttype.is_none() {
            self.core.report(
                DiagnosticKind::UndefinedToken {
                    name: format!("'{text}'"),
                },
                pos,
            );
        }
        ttype
    }

    fn token_range_error(&mut self, text: String, pos: SourcePos) -> Result<Handle, AtnError> {
        self.core
            .report(DiagnosticKind::TokenRangeInParser { text }, pos);
        self.core.epsilon_node()
    }
}

impl<'g> AtnFactory<'g> for ParserAtnFactory<'g> {
    fn core(&mut self) -> &mut FactoryCore<'g> {
        &mut self.core
    }

    fn token_ref(&mut self, name: &str, pos: SourcePos) -> Result<Handle, AtnError> {
        match self.resolve_token(name, pos) {
            Some(ttype) => self.core.transition_node(|right| Transition::atom(right, ttype)),
            None => self.core.epsilon_node(),
        }
    }

    /// A literal matches the token it aliases.
    fn string_literal(&mut self, text: &str, pos: SourcePos) -> Result<Handle, AtnError> {
        match self.resolve_literal(text, pos) {
            Some(ttype) => self.core.transition_node(|right| Transition::atom(right, ttype)),
            None => self.core.epsilon_node(),
        }
    }

    fn range(&mut self, from: &str, to: &str, pos: SourcePos) -> Result<Handle, AtnError> {
        self.token_range_error(format!("'{from}'..'{to}'"), pos)
    }

    fn char_set(&mut self, text: &str, pos: SourcePos) -> Result<Handle, AtnError> {
        self.token_range_error(format!("[{text}]"), pos)
    }

    /// One flat set or not-set edge over the resolved token types.
    fn set(
        &mut self,
        items: &[SetItem],
        inverted: bool,
        pos: SourcePos,
    ) -> Result<Handle, AtnError> {
        let mut set = IntervalSet::new();
        for item in items {
            let ttype = match item {
                SetItem::Token(name) => self.resolve_token(name, pos),
                SetItem::Literal(text) => self.resolve_literal(text, pos),
                SetItem::Range(from, to) => {
                    self.core.report(
                        DiagnosticKind::TokenRangeInParser {
                            text: format!("'{from}'..'{to}'"),
                        },
                        pos,
                    );
                    None
                }
                SetItem::CharSet(text) => {
                    self.core.report(
                        DiagnosticKind::TokenRangeInParser {
                            text: format!("[{text}]"),
                        },
                        pos,
                    );
                    None
                }
            };
            if let Some(ttype) = ttype {
                set.add(ttype);
            }
        }
        self.core.transition_node(|right| {
            if inverted {
                Transition::not_set(right, set)
            } else {
                Transition::set(right, set)
            }
        })
    }

    /// Parser actions are executed by generated code, so the edge carries
    /// no action-table index.
    fn action(&mut self, _text: &str, _pos: SourcePos) -> Result<Handle, AtnError> {
        let rule_index = self.core.current_rule();
        self.core.transition_node(|right| {
            Transition::new(
                right,
                TransitionKind::Action {
                    rule_index,
                    action_index: None,
                    ctx_dependent: false,
                },
            )
        })
    }
}
