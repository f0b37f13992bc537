//! # Grammar Input Model
//!
//! The read-only view of a grammar that automaton construction consumes:
//! an ordered rule table whose bodies are [`Block`] trees, the token-type,
//! literal and channel namespaces, the lexer mode table and the lexer
//! command templates.
//!
//! ## Overview
//!
//! Grammars are normally assembled with [`GrammarBuilder`], which assigns
//! token types and rule indices deterministically:
//!
//! - token types start at 1 in declaration order; a lexer's non-fragment
//!   rules define their own token types after the declared ones
//! - rule indices follow the order rules are added
//! - modes are numbered from `DEFAULT_MODE` (0) in declaration order
//! - user channels start at 2, after the default and hidden channels
//!
//! ## Usage
//!
//! ```rust
//! use sipha_atn::grammar::{Block, Element, GrammarBuilder};
//!
//! let grammar = GrammarBuilder::parser("Expr")
//!     .tokens(["INT", "PLUS"])
//!     .rule("sum", Block::seq([
//!         Element::token("INT"),
//!         Element::token("PLUS"),
//!         Element::token("INT"),
//!     ]))
//!     .build()
//!     .expect("valid grammar");
//! assert_eq!(grammar.token_type("PLUS"), Some(2));
//! ```

mod builder;
mod tree;

pub use builder::{GrammarBuilder, GrammarError};
pub use tree::{Alternative, Block, Element, ElementKind, LexerCommand, Quantifier, SetItem};

use std::fmt;

use compact_str::CompactString;
use hashbrown::HashMap;

use crate::symbol;

/// Line and column of a grammar token, 1-based when known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

impl SourcePos {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarKind {
    Parser,
    Lexer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: CompactString,
    pub index: usize,
    pub block: Block,
    pub fragment: bool,
    /// Overrides the grammar-level option when set.
    pub case_insensitive: Option<bool>,
    /// Owning lexer mode.
    pub mode: CompactString,
    /// Produced by the left-recursion rewrite.
    pub left_recursive: bool,
    pub pos: SourcePos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode {
    pub name: CompactString,
    /// Indices of the rules declared in this mode, in order.
    pub rules: Vec<usize>,
}

/// Fallback rendering for a lexer command without a built-in action.
///
/// `{arg}` in `template` is replaced with the command argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    pub takes_argument: bool,
    pub template: CompactString,
}

impl CommandTemplate {
    #[must_use]
    pub fn render(&self, arg: Option<&str>) -> String {
        match arg {
            Some(arg) => self.template.replace("{arg}", arg),
            None => self.template.to_string(),
        }
    }
}

/// Token type to display name mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    literal_names: Vec<Option<CompactString>>,
    symbolic_names: Vec<Option<CompactString>>,
}

impl Vocabulary {
    fn set_symbolic(&mut self, ttype: i32, name: &str) {
        if let Ok(idx) = usize::try_from(ttype) {
            grow(&mut self.symbolic_names, idx);
            self.symbolic_names[idx] = Some(name.into());
        }
    }

    fn set_literal(&mut self, ttype: i32, literal: &str) {
        if let Ok(idx) = usize::try_from(ttype) {
            grow(&mut self.literal_names, idx);
            self.literal_names[idx] = Some(format!("'{literal}'").into());
        }
    }

    #[must_use]
    pub fn literal_name(&self, ttype: i32) -> Option<&str> {
        let idx = usize::try_from(ttype).ok()?;
        self.literal_names.get(idx)?.as_deref()
    }

    #[must_use]
    pub fn symbolic_name(&self, ttype: i32) -> Option<&str> {
        if ttype == symbol::EOF {
            return Some("EOF");
        }
        let idx = usize::try_from(ttype).ok()?;
        self.symbolic_names.get(idx)?.as_deref()
    }

    /// Literal alias when present, else the symbolic name, else the number.
    #[must_use]
    pub fn display_name(&self, ttype: i32) -> String {
        self.literal_name(ttype)
            .or_else(|| self.symbolic_name(ttype))
            .map_or_else(|| ttype.to_string(), str::to_string)
    }
}

fn grow(names: &mut Vec<Option<CompactString>>, idx: usize) {
    if names.len() <= idx {
        names.resize(idx + 1, None);
    }
}

type NameMap<V> = HashMap<CompactString, V, ahash::RandomState>;

/// A validated grammar ready for automaton construction.
#[derive(Debug, Clone)]
pub struct Grammar {
    name: CompactString,
    kind: GrammarKind,
    rules: Vec<Rule>,
    rule_by_name: NameMap<usize>,
    token_types: NameMap<i32>,
    literals: NameMap<i32>,
    channels: NameMap<i32>,
    modes: Vec<Mode>,
    command_templates: NameMap<CommandTemplate>,
    vocabulary: Vocabulary,
    max_token_type: i32,
    case_insensitive: bool,
}

impl Grammar {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> GrammarKind {
        self.kind
    }

    #[must_use]
    pub fn is_lexer(&self) -> bool {
        self.kind == GrammarKind::Lexer
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn rule(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    #[must_use]
    pub fn rule_by_name(&self, name: &str) -> Option<&Rule> {
        self.rule_by_name.get(name).map(|&idx| &self.rules[idx])
    }

    /// Token type for a symbolic name; `EOF` is always defined.
    #[must_use]
    pub fn token_type(&self, name: &str) -> Option<i32> {
        if name == "EOF" {
            return Some(symbol::EOF);
        }
        self.token_types.get(name).copied()
    }

    /// Token type a parser literal (contents without quotes) aliases.
    #[must_use]
    pub fn literal_type(&self, literal: &str) -> Option<i32> {
        self.literals.get(literal).copied()
    }

    #[must_use]
    pub fn channel_value(&self, name: &str) -> Option<i32> {
        self.channels.get(name).copied()
    }

    #[must_use]
    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    #[must_use]
    pub fn mode_index(&self, name: &str) -> Option<usize> {
        self.modes.iter().position(|m| m.name == name)
    }

    #[must_use]
    pub fn command_template(&self, command: &str) -> Option<&CommandTemplate> {
        self.command_templates.get(command)
    }

    #[must_use]
    pub const fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[must_use]
    pub const fn max_token_type(&self) -> i32 {
        self.max_token_type
    }

    #[must_use]
    pub const fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Effective case-insensitivity of a rule.
    #[must_use]
    pub fn rule_case_insensitive(&self, rule: &Rule) -> bool {
        rule.case_insensitive.unwrap_or(self.case_insensitive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_prefers_literal() {
        let mut vocab = Vocabulary::default();
        vocab.set_symbolic(3, "PLUS");
        vocab.set_literal(3, "+");
        vocab.set_symbolic(4, "ID");
        assert_eq!(vocab.display_name(3), "'+'");
        assert_eq!(vocab.display_name(4), "ID");
        assert_eq!(vocab.display_name(9), "9");
        assert_eq!(vocab.display_name(symbol::EOF), "EOF");
    }

    #[test]
    fn test_command_template_render() {
        let template = CommandTemplate {
            takes_argument: true,
            template: "setText({arg});".into(),
        };
        assert_eq!(template.render(Some("\"x\"")), "setText(\"x\");");
    }
}
