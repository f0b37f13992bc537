//! Rule bodies: blocks of alternatives, each a sequence of elements.
//!
//! The tree is produced by an upstream grammar parser and is consumed
//! read-only by construction. Constructors here are the programmatic way to
//! write a body:
//!
//! ```rust
//! use sipha_atn::grammar::{Alternative, Block, Element};
//!
//! // a : A (B | ) C ;
//! let body = Block::seq([
//!     Element::token("A"),
//!     Element::block(Block::of([
//!         Alternative::new([Element::token("B")]),
//!         Alternative::empty(),
//!     ])),
//!     Element::token("C"),
//! ]);
//! assert_eq!(body.alternatives.len(), 1);
//! ```

use compact_str::CompactString;

use super::SourcePos;

/// `?`, `*` or `+` applied to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    Optional,
    Star,
    Plus,
}

impl Quantifier {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Optional => "?",
            Self::Star => "*",
            Self::Plus => "+",
        }
    }
}

/// A member of a set element `(A | B | 'x'..'z')` or `~(...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetItem {
    /// Token name (parser) or unsupported reference (lexer).
    Token(CompactString),
    /// String literal contents, escapes unprocessed.
    Literal(CompactString),
    /// Character range between two literal contents.
    Range(CompactString, CompactString),
    /// Character set contents between the brackets.
    CharSet(CompactString),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// Token reference. In a lexer this calls another lexer rule, except `EOF`.
    TokenRef(CompactString),
    RuleRef {
        name: CompactString,
        precedence: Option<i32>,
    },
    /// String literal contents without quotes, escapes unprocessed.
    Literal(CompactString),
    /// `'a'..'z'`, endpoint literal contents without quotes.
    Range {
        from: CompactString,
        to: CompactString,
    },
    /// `[a-z_]`, contents without brackets.
    CharSet(CompactString),
    Set {
        items: Vec<SetItem>,
        inverted: bool,
    },
    Wildcard,
    Action(CompactString),
    Predicate {
        text: CompactString,
        precedence: Option<i32>,
    },
    Epsilon,
    Block(Block),
    Loop {
        block: Block,
        quantifier: Quantifier,
        greedy: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    pub pos: SourcePos,
}

impl Element {
    #[must_use]
    pub const fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            pos: SourcePos::new(0, 0),
        }
    }

    #[must_use]
    pub fn token(name: &str) -> Self {
        Self::new(ElementKind::TokenRef(name.into()))
    }

    #[must_use]
    pub fn rule(name: &str) -> Self {
        Self::new(ElementKind::RuleRef {
            name: name.into(),
            precedence: None,
        })
    }

    /// Rule reference carrying a precedence argument, as produced by the
    /// left-recursion rewrite.
    #[must_use]
    pub fn rule_with_precedence(name: &str, precedence: i32) -> Self {
        Self::new(ElementKind::RuleRef {
            name: name.into(),
            precedence: Some(precedence),
        })
    }

    #[must_use]
    pub fn literal(text: &str) -> Self {
        Self::new(ElementKind::Literal(text.into()))
    }

    #[must_use]
    pub fn range(from: &str, to: &str) -> Self {
        Self::new(ElementKind::Range {
            from: from.into(),
            to: to.into(),
        })
    }

    #[must_use]
    pub fn char_set(text: &str) -> Self {
        Self::new(ElementKind::CharSet(text.into()))
    }

    #[must_use]
    pub fn set(items: impl IntoIterator<Item = SetItem>) -> Self {
        Self::new(ElementKind::Set {
            items: items.into_iter().collect(),
            inverted: false,
        })
    }

    #[must_use]
    pub fn not_set(items: impl IntoIterator<Item = SetItem>) -> Self {
        Self::new(ElementKind::Set {
            items: items.into_iter().collect(),
            inverted: true,
        })
    }

    #[must_use]
    pub const fn wildcard() -> Self {
        Self::new(ElementKind::Wildcard)
    }

    #[must_use]
    pub fn action(text: &str) -> Self {
        Self::new(ElementKind::Action(text.into()))
    }

    #[must_use]
    pub fn predicate(text: &str) -> Self {
        Self::new(ElementKind::Predicate {
            text: text.into(),
            precedence: None,
        })
    }

    #[must_use]
    pub fn precedence_predicate(precedence: i32) -> Self {
        Self::new(ElementKind::Predicate {
            text: CompactString::default(),
            precedence: Some(precedence),
        })
    }

    #[must_use]
    pub const fn epsilon() -> Self {
        Self::new(ElementKind::Epsilon)
    }

    #[must_use]
    pub fn block(block: Block) -> Self {
        Self::new(ElementKind::Block(block))
    }

    #[must_use]
    pub fn optional(block: Block) -> Self {
        Self::quantified(block, Quantifier::Optional)
    }

    #[must_use]
    pub fn star(block: Block) -> Self {
        Self::quantified(block, Quantifier::Star)
    }

    #[must_use]
    pub fn plus(block: Block) -> Self {
        Self::quantified(block, Quantifier::Plus)
    }

    #[must_use]
    pub fn quantified(block: Block, quantifier: Quantifier) -> Self {
        Self::new(ElementKind::Loop {
            block,
            quantifier,
            greedy: true,
        })
    }

    /// Make a quantified element non-greedy (`??`, `*?`, `+?`). No effect on
    /// other elements.
    #[must_use]
    pub fn non_greedy(mut self) -> Self {
        if let ElementKind::Loop { greedy, .. } = &mut self.kind {
            *greedy = false;
        }
        self
    }

    #[must_use]
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.pos = SourcePos::new(line, column);
        self
    }

    /// True for a bare `.`.
    #[must_use]
    pub const fn is_wildcard(&self) -> bool {
        matches!(self.kind, ElementKind::Wildcard)
    }
}

/// `-> name` or `-> name(arg)` attached to a lexer alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerCommand {
    pub name: CompactString,
    pub arg: Option<CompactString>,
    pub pos: SourcePos,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alternative {
    pub elements: Vec<Element>,
    pub commands: Vec<LexerCommand>,
    pub pos: SourcePos,
}

impl Alternative {
    #[must_use]
    pub fn new(elements: impl IntoIterator<Item = Element>) -> Self {
        Self {
            elements: elements.into_iter().collect(),
            commands: Vec::new(),
            pos: SourcePos::default(),
        }
    }

    /// An alternative matching nothing, as in `(B | )`.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn command(mut self, name: &str) -> Self {
        self.commands.push(LexerCommand {
            name: name.into(),
            arg: None,
            pos: self.pos,
        });
        self
    }

    #[must_use]
    pub fn call_command(mut self, name: &str, arg: &str) -> Self {
        self.commands.push(LexerCommand {
            name: name.into(),
            arg: Some(arg.into()),
            pos: self.pos,
        });
        self
    }

    #[must_use]
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.pos = SourcePos::new(line, column);
        self
    }

    /// The alternative is a lone `.`.
    #[must_use]
    pub fn is_lone_wildcard(&self) -> bool {
        matches!(self.elements.as_slice(), [e] if e.is_wildcard())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub alternatives: Vec<Alternative>,
    pub pos: SourcePos,
}

impl Block {
    #[must_use]
    pub fn of(alternatives: impl IntoIterator<Item = Alternative>) -> Self {
        Self {
            alternatives: alternatives.into_iter().collect(),
            pos: SourcePos::default(),
        }
    }

    /// A block with a single alternative made of `elements`.
    #[must_use]
    pub fn seq(elements: impl IntoIterator<Item = Element>) -> Self {
        Self::of([Alternative::new(elements)])
    }

    #[must_use]
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.pos = SourcePos::new(line, column);
        self
    }

    /// Some alternative is a lone `.`.
    #[must_use]
    pub fn has_wildcard_alternative(&self) -> bool {
        self.alternatives.iter().any(Alternative::is_lone_wildcard)
    }
}
