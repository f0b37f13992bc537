//! Lexer commands (`-> skip`, `-> pushMode(STRING)`, ...).
//!
//! Built-in commands resolve to a [`LexerAction`] that is deduplicated
//! into the lexer action table. Anything else falls back to the grammar's
//! [`CommandTemplate`](crate::grammar::CommandTemplate) for that command,
//! whose rendered text becomes a custom action.

use super::Handle;
use super::lexer::LexerAtnFactory;
use crate::atn::LexerAction;
use crate::error::{AtnError, DiagnosticKind};
use crate::grammar::{LexerCommand, SourcePos};
use crate::symbol;

/// Whether a built-in command takes an argument; `None` for other names.
fn builtin_takes_argument(command: &str) -> Option<bool> {
    match command {
        "skip" | "more" | "popMode" => Some(false),
        "mode" | "pushMode" | "type" | "channel" => Some(true),
        _ => None,
    }
}

/// First command already in `seen` that cannot be combined with `command`.
fn incompatible_with<'a>(command: &str, seen: &[&'a str]) -> Option<&'a str> {
    let conflicts: &[&'a str] = match command {
        "skip" => &["more", "type", "channel"],
        "more" => &["skip", "type", "channel"],
        "type" | "channel" => &["more", "skip"],
        _ => &[],
    };
    conflicts.iter().copied().find(|c| seen.contains(c))
}

impl LexerAtnFactory<'_> {
    /// Build the fragment for one command of an alternative.
    pub(super) fn lexer_command(&mut self, command: &LexerCommand) -> Result<Handle, AtnError> {
        let name = command.name.as_str();
        let arg = command.arg.as_deref();
        if let Some(action) = self.create_lexer_action(name, arg, command.pos) {
            return self.action_node(action);
        }

        let grammar = self.core.grammar;
        let template = grammar.command_template(name);
        let takes_argument = match (template, builtin_takes_argument(name)) {
            (Some(template), _) => template.takes_argument,
            (None, Some(takes_argument)) => takes_argument,
            (None, None) => {
                self.core.report(
                    DiagnosticKind::InvalidLexerCommand {
                        command: name.to_string(),
                    },
                    command.pos,
                );
                return self.core.epsilon_node();
            }
        };
        if arg.is_some() != takes_argument {
            let kind = if arg.is_some() {
                DiagnosticKind::UnwantedLexerCommandArgument {
                    command: name.to_string(),
                }
            } else {
                DiagnosticKind::MissingLexerCommandArgument {
                    command: name.to_string(),
                }
            };
            self.core.report(kind, command.pos);
            return self.core.epsilon_node();
        }

        // a built-in whose argument did not resolve; already reported
        let Some(template) = template else {
            return self.core.epsilon_node();
        };
        if template.render(arg).trim().is_empty() {
            return self.core.epsilon_node();
        }
        self.custom_action()
    }

    /// The built-in action `name(arg)` stands for, or `None` when the name
    /// is not built in, the arity is wrong or the argument does not resolve.
    fn create_lexer_action(
        &mut self,
        name: &str,
        arg: Option<&str>,
        pos: SourcePos,
    ) -> Option<LexerAction> {
        self.check_commands(name, pos);
        match (name, arg) {
            ("skip", None) => Some(LexerAction::Skip),
            ("more", None) => Some(LexerAction::More),
            ("popMode", None) => Some(LexerAction::PopMode),
            ("mode", Some(arg)) => self.mode_value(arg, pos).map(LexerAction::Mode),
            ("pushMode", Some(arg)) => self.mode_value(arg, pos).map(LexerAction::PushMode),
            ("type", Some(arg)) => self.token_value(arg, pos).map(LexerAction::Type),
            ("channel", Some(arg)) => self.channel_value(arg, pos).map(LexerAction::Channel),
            _ => None,
        }
    }

    /// Report repeated and conflicting commands within the current rule.
    /// Mode stack commands may repeat.
    fn check_commands(&mut self, name: &str, pos: SourcePos) {
        if name != "pushMode" && name != "popMode" {
            let seen: Vec<&str> = self.rule_commands.iter().map(|c| c.as_str()).collect();
            let duplicated = seen.contains(&name);
            let conflict = incompatible_with(name, &seen).map(str::to_string);
            if duplicated {
                self.core.report(
                    DiagnosticKind::DuplicatedCommand {
                        command: name.to_string(),
                    },
                    pos,
                );
            }
            if let Some(first) = conflict {
                self.core.report(
                    DiagnosticKind::IncompatibleCommands {
                        first,
                        second: name.to_string(),
                    },
                    pos,
                );
            }
        }
        self.rule_commands.push(name.into());
    }

    fn mode_value(&mut self, name: &str, pos: SourcePos) -> Option<i32> {
        let value = if name == symbol::DEFAULT_MODE_NAME {
            Some(symbol::DEFAULT_MODE)
        } else {
            symbol::common_constant(name)
                .or_else(|| {
                    self.core
                        .grammar
                        .mode_index(name)
                        .and_then(|index| i32::try_from(index).ok())
                })
                .or_else(|| name.parse().ok())
        };
        if value.is_none() {
            self.core.report(
                DiagnosticKind::UnrecognizedModeName {
                    name: name.to_string(),
                },
                pos,
            );
        }
        value
    }

    fn token_value(&mut self, name: &str, pos: SourcePos) -> Option<i32> {
        let value = if name == "EOF" {
            Some(symbol::EOF)
        } else {
            symbol::common_constant(name)
                .or_else(|| {
                    self.core
                        .grammar
                        .token_type(name)
                        .filter(|&t| t != symbol::INVALID_TYPE)
                })
                .or_else(|| name.parse().ok())
        };
        if value.is_none() {
            self.core.report(
                DiagnosticKind::UnrecognizedTokenName {
                    name: name.to_string(),
                },
                pos,
            );
        }
        value
    }

    fn channel_value(&mut self, name: &str, pos: SourcePos) -> Option<i32> {
        let value = match name {
            "HIDDEN" => Some(symbol::HIDDEN_CHANNEL),
            "DEFAULT_TOKEN_CHANNEL" => Some(symbol::DEFAULT_TOKEN_CHANNEL),
            _ => symbol::common_constant(name)
                .or_else(|| {
                    self.core
                        .grammar
                        .channel_value(name)
                        .filter(|&c| c >= symbol::MIN_USER_CHANNEL_VALUE)
                })
                .or_else(|| name.parse().ok()),
        };
        if value.is_none() {
            self.core.report(
                DiagnosticKind::UnrecognizedChannelName {
                    name: name.to_string(),
                },
                pos,
            );
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_arity() {
        assert_eq!(builtin_takes_argument("skip"), Some(false));
        assert_eq!(builtin_takes_argument("pushMode"), Some(true));
        assert_eq!(builtin_takes_argument("setText"), None);
    }

    #[test]
    fn test_incompatible_commands() {
        assert_eq!(incompatible_with("skip", &["type"]), Some("type"));
        assert_eq!(incompatible_with("skip", &["channel", "more"]), Some("more"));
        assert_eq!(incompatible_with("channel", &["skip"]), Some("skip"));
        assert_eq!(incompatible_with("type", &["channel"]), None);
        assert_eq!(incompatible_with("mode", &["skip"]), None);
    }
}
