use compact_str::CompactString;
use thiserror::Error;

use super::{
    Block, CommandTemplate, Grammar, GrammarKind, Mode, NameMap, Rule, SourcePos, Vocabulary,
};
use crate::symbol;

/// Builder for [`Grammar`].
///
/// Rules added after [`GrammarBuilder::mode`] belong to that mode; rules
/// added before any mode call belong to `DEFAULT_MODE`.
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    name: CompactString,
    kind: GrammarKind,
    tokens: Vec<CompactString>,
    literals: Vec<(CompactString, CompactString)>,
    channels: Vec<CompactString>,
    modes: Vec<CompactString>,
    current_mode: CompactString,
    rules: Vec<Rule>,
    command_templates: Vec<(CompactString, CommandTemplate)>,
    case_insensitive: bool,
}

impl GrammarBuilder {
    fn new(name: &str, kind: GrammarKind) -> Self {
        Self {
            name: name.into(),
            kind,
            tokens: Vec::new(),
            literals: Vec::new(),
            channels: Vec::new(),
            modes: vec![symbol::DEFAULT_MODE_NAME.into()],
            current_mode: symbol::DEFAULT_MODE_NAME.into(),
            rules: Vec::new(),
            command_templates: Vec::new(),
            case_insensitive: false,
        }
    }

    #[must_use]
    pub fn parser(name: &str) -> Self {
        Self::new(name, GrammarKind::Parser)
    }

    #[must_use]
    pub fn lexer(name: &str) -> Self {
        Self::new(name, GrammarKind::Lexer)
    }

    /// Declare a token type.
    #[must_use]
    pub fn token(mut self, name: &str) -> Self {
        self.tokens.push(name.into());
        self
    }

    #[must_use]
    pub fn tokens<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.tokens.extend(names.into_iter().map(CompactString::from));
        self
    }

    /// Alias a string literal (contents without quotes) to a token name.
    /// The token is declared if it was not already.
    #[must_use]
    pub fn literal(mut self, literal: &str, token: &str) -> Self {
        self.literals.push((literal.into(), token.into()));
        self
    }

    #[must_use]
    pub fn channel(mut self, name: &str) -> Self {
        self.channels.push(name.into());
        self
    }

    /// Switch the mode subsequent rules are added to.
    #[must_use]
    pub fn mode(mut self, name: &str) -> Self {
        if !self.modes.iter().any(|m| m == name) {
            self.modes.push(name.into());
        }
        self.current_mode = name.into();
        self
    }

    #[must_use]
    pub const fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    #[must_use]
    pub fn command_template(mut self, command: &str, takes_argument: bool, template: &str) -> Self {
        self.command_templates.push((
            command.into(),
            CommandTemplate {
                takes_argument,
                template: template.into(),
            },
        ));
        self
    }

    #[must_use]
    pub fn rule(self, name: &str, block: Block) -> Self {
        self.rule_with(name, block, |_| {})
    }

    /// Add a lexer fragment rule.
    #[must_use]
    pub fn fragment(self, name: &str, block: Block) -> Self {
        self.rule_with(name, block, |rule| rule.fragment = true)
    }

    /// Add a rule and adjust its options before it is stored.
    #[must_use]
    pub fn rule_with(mut self, name: &str, block: Block, f: impl FnOnce(&mut Rule)) -> Self {
        let mut rule = Rule {
            name: name.into(),
            index: self.rules.len(),
            block,
            fragment: false,
            case_insensitive: None,
            mode: self.current_mode.clone(),
            left_recursive: false,
            pos: SourcePos::default(),
        };
        f(&mut rule);
        rule.index = self.rules.len();
        self.rules.push(rule);
        self
    }

    /// Validate and assign token types, channels and modes.
    ///
    /// # Errors
    ///
    /// Returns an error if no rules were added, a rule name is reused or a
    /// lexer rule names a mode that was never declared.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        if self.rules.is_empty() {
            return Err(GrammarError::NoRules(self.name));
        }
        if self.kind == GrammarKind::Lexer {
            if let Some(rule) = self
                .rules
                .iter()
                .find(|r| !self.modes.iter().any(|m| *m == r.mode))
            {
                return Err(GrammarError::UnknownMode {
                    rule: rule.name.clone(),
                    mode: rule.mode.clone(),
                });
            }
        }

        let mut rule_by_name = NameMap::default();
        for rule in &self.rules {
            if rule_by_name.insert(rule.name.clone(), rule.index).is_some() {
                return Err(GrammarError::DuplicateRule(rule.name.clone()));
            }
        }

        let mut token_types: NameMap<i32> = NameMap::default();
        let mut vocabulary = Vocabulary::default();
        let mut next_type = symbol::MIN_USER_TOKEN_TYPE;
        let mut define = |name: &CompactString, types: &mut NameMap<i32>| -> i32 {
            if let Some(&ttype) = types.get(name) {
                return ttype;
            }
            let ttype = next_type;
            next_type += 1;
            types.insert(name.clone(), ttype);
            vocabulary.set_symbolic(ttype, name);
            ttype
        };

        for token in &self.tokens {
            define(token, &mut token_types);
        }
        if self.kind == GrammarKind::Lexer {
            for rule in self.rules.iter().filter(|r| !r.fragment) {
                define(&rule.name, &mut token_types);
            }
        }
        let mut literals: NameMap<i32> = NameMap::default();
        let mut aliases = Vec::with_capacity(self.literals.len());
        for (literal, token) in &self.literals {
            let ttype = define(token, &mut token_types);
            literals.insert(literal.clone(), ttype);
            aliases.push((ttype, literal.clone()));
        }
        let max_token_type = next_type - 1;
        for (ttype, literal) in aliases {
            vocabulary.set_literal(ttype, &literal);
        }

        let mut channels: NameMap<i32> = NameMap::default();
        for name in &self.channels {
            let offset = i32::try_from(channels.len()).unwrap_or(i32::MAX);
            let value = symbol::MIN_USER_CHANNEL_VALUE.saturating_add(offset);
            channels.entry(name.clone()).or_insert(value);
        }

        let modes = if self.kind == GrammarKind::Lexer {
            self.modes
                .iter()
                .map(|name| Mode {
                    name: name.clone(),
                    rules: self
                        .rules
                        .iter()
                        .filter(|r| &r.mode == name)
                        .map(|r| r.index)
                        .collect(),
                })
                .collect()
        } else {
            Vec::new()
        };

        log::trace!(
            "grammar {}: {} rules, {} token types",
            self.name,
            self.rules.len(),
            max_token_type
        );

        Ok(Grammar {
            name: self.name,
            kind: self.kind,
            rules: self.rules,
            rule_by_name,
            token_types,
            literals,
            channels,
            modes,
            command_templates: self.command_templates.into_iter().collect(),
            vocabulary,
            max_token_type,
            case_insensitive: self.case_insensitive,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("Grammar {0} has no rules")]
    NoRules(CompactString),

    #[error("Rule {0} is defined more than once")]
    DuplicateRule(CompactString),

    #[error("Rule {rule} belongs to undeclared mode {mode}")]
    UnknownMode {
        rule: CompactString,
        mode: CompactString,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Element;

    #[test]
    fn test_lexer_rules_define_token_types() {
        let grammar = GrammarBuilder::lexer("L")
            .token("KEYWORD")
            .rule("ID", Block::seq([Element::char_set("a-z")]))
            .fragment("DIGIT", Block::seq([Element::char_set("0-9")]))
            .rule("INT", Block::seq([Element::char_set("0-9")]))
            .build()
            .unwrap();
        assert_eq!(grammar.token_type("KEYWORD"), Some(1));
        assert_eq!(grammar.token_type("ID"), Some(2));
        assert_eq!(grammar.token_type("DIGIT"), None);
        assert_eq!(grammar.token_type("INT"), Some(3));
        assert_eq!(grammar.max_token_type(), 3);
    }

    #[test]
    fn test_modes_collect_rules() {
        let grammar = GrammarBuilder::lexer("L")
            .rule("A", Block::seq([Element::literal("a")]))
            .mode("STRING")
            .rule("B", Block::seq([Element::literal("b")]))
            .build()
            .unwrap();
        assert_eq!(grammar.modes().len(), 2);
        assert_eq!(grammar.modes()[0].rules, vec![0]);
        assert_eq!(grammar.modes()[1].rules, vec![1]);
        assert_eq!(grammar.mode_index("STRING"), Some(1));
    }

    #[test]
    fn test_literal_alias() {
        let grammar = GrammarBuilder::parser("P")
            .token("ID")
            .literal("+", "PLUS")
            .rule("a", Block::seq([Element::literal("+")]))
            .build()
            .unwrap();
        assert_eq!(grammar.literal_type("+"), Some(2));
        assert_eq!(grammar.vocabulary().display_name(2), "'+'");
    }

    #[test]
    fn test_duplicate_rule_is_rejected() {
        let result = GrammarBuilder::parser("P")
            .rule("a", Block::seq([Element::epsilon()]))
            .rule("a", Block::seq([Element::epsilon()]))
            .build();
        assert_eq!(result.unwrap_err(), GrammarError::DuplicateRule("a".into()));
    }

    #[test]
    fn test_undeclared_mode_is_rejected() {
        let result = GrammarBuilder::lexer("L")
            .rule("A", Block::seq([Element::literal("a")]))
            .rule_with("B", Block::seq([Element::literal("b")]), |rule| {
                rule.mode = "NOPE".into();
            })
            .build();
        assert_eq!(
            result.unwrap_err(),
            GrammarError::UnknownMode {
                rule: "B".into(),
                mode: "NOPE".into(),
            }
        );
    }

    #[test]
    fn test_rule_can_join_declared_mode() {
        let grammar = GrammarBuilder::lexer("L")
            .mode("STRING")
            .mode(symbol::DEFAULT_MODE_NAME)
            .rule_with("A", Block::seq([Element::literal("a")]), |rule| {
                rule.mode = "STRING".into();
            })
            .build()
            .unwrap();
        assert_eq!(grammar.modes()[1].rules, vec![0]);
    }

    #[test]
    fn test_channels_start_after_hidden() {
        let grammar = GrammarBuilder::lexer("L")
            .channel("COMMENTS")
            .channel("DOCS")
            .rule("A", Block::seq([Element::literal("a")]))
            .build()
            .unwrap();
        assert_eq!(grammar.channel_value("COMMENTS"), Some(2));
        assert_eq!(grammar.channel_value("DOCS"), Some(3));
    }
}
