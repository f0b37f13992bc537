//! Grammar diagnostics accumulated during construction and checking.

use std::fmt;

use thiserror::Error;

use crate::grammar::SourcePos;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic as MietteDiagnostic;

/// Whether a diagnostic blocks the automaton from being used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// What went wrong, with the message arguments for that kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(MietteDiagnostic))]
pub enum DiagnosticKind {
    #[error("invalid escape sequence {sequence}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::invalid_escape)))]
    InvalidEscapeSequence { sequence: String },

    #[error("string literals and sets cannot be empty: {text}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::empty_literal_or_set)))]
    EmptyStringsAndSetsNotAllowed { text: String },

    #[error("{text} is not a single character and cannot be used in a lexer set")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::invalid_set_literal)))]
    InvalidLiteralInLexerSet { text: String },

    #[error("token reference {name} is not allowed in a lexer set")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::reference_in_lexer_set)))]
    UnsupportedReferenceInLexerSet { name: String },

    #[error("a Unicode property cannot be a range endpoint: {set}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::property_in_range)))]
    UnicodePropertyNotAllowedInRange { set: String },

    #[error("token ranges are not allowed in parser rules: {text}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::token_range_in_parser)))]
    TokenRangeInParser { text: String },

    #[error("token {name} is not defined")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::undefined_token)))]
    UndefinedToken { name: String },

    #[error("lexer command {command} is not recognized")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::invalid_command)))]
    InvalidLexerCommand { command: String },

    #[error("lexer command {command} requires an argument")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::missing_command_argument)))]
    MissingLexerCommandArgument { command: String },

    #[error("lexer command {command} does not take an argument")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::unwanted_command_argument)))]
    UnwantedLexerCommandArgument { command: String },

    #[error("lexer command {command} appears more than once in the same rule")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(atn::duplicated_command), severity(Warning))
    )]
    DuplicatedCommand { command: String },

    #[error("lexer command {second} cannot be used together with {first}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::incompatible_commands)))]
    IncompatibleCommands { first: String, second: String },

    #[error("{name} is not a recognized mode name")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::unknown_mode)))]
    UnrecognizedModeName { name: String },

    #[error("{name} is not a recognized token name")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::unknown_token)))]
    UnrecognizedTokenName { name: String },

    #[error("{name} is not a recognized channel name")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::unknown_channel)))]
    UnrecognizedChannelName { name: String },

    #[error("chars {chars} used multiple times in set {set}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(atn::set_collision), severity(Warning))
    )]
    CharactersCollisionInSet { chars: String, set: String },

    #[error("range {from}..{to} probably contains characters not implied by case folding: {chars}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(atn::range_not_implied), severity(Warning))
    )]
    RangeProbablyContainsNotImpliedCharacters {
        from: String,
        to: String,
        chars: String,
    },

    #[error("greedy loop {op} contains a wildcard alternative; {op}? may be intended")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(atn::greedy_wildcard_loop), severity(Warning))
    )]
    ExpectedNonGreedyWildcardBlock { op: String },

    #[error("rule {rule} contains a closure with at least one alternative that can match an empty string")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::epsilon_closure)))]
    EpsilonClosure { rule: String },

    #[error("left recursive rule {rule} contains a left recursive alternative which can be followed by the empty string")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::epsilon_lr_follow)))]
    EpsilonLeftRecursiveFollow { rule: String },

    #[error("rule {rule} contains an optional block with at least one alternative that can match an empty string")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(code(atn::epsilon_optional), severity(Warning))
    )]
    EpsilonOptional { rule: String },

    #[error("rule {rule} contains a closure with at least one alternative that can match EOF")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::eof_closure)))]
    EofClosure { rule: String },
}

impl DiagnosticKind {
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::DuplicatedCommand { .. }
            | Self::CharactersCollisionInSet { .. }
            | Self::RangeProbablyContainsNotImpliedCharacters { .. }
            | Self::ExpectedNonGreedyWildcardBlock { .. }
            | Self::EpsilonOptional { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Closure problems found by the lookahead check after optimization.
    #[must_use]
    pub const fn is_closure_error(&self) -> bool {
        matches!(
            self,
            Self::EpsilonClosure { .. }
                | Self::EpsilonLeftRecursiveFollow { .. }
                | Self::EofClosure { .. }
        )
    }
}

/// A reported grammar problem and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub pos: Option<SourcePos>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, pos: Option<SourcePos>) -> Self {
        let severity = kind.severity();
        Self {
            kind,
            severity,
            pos,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pos {
            Some(pos) => write!(f, "{}({pos}): {}", self.severity, self.kind),
            None => write!(f, "{}: {}", self.severity, self.kind),
        }
    }
}

/// Accumulates diagnostics in report order.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn report(&mut self, kind: DiagnosticKind, pos: Option<SourcePos>) {
        let diagnostic = Diagnostic::new(kind, pos);
        log::debug!("{diagnostic}");
        self.items.push(diagnostic);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| !d.is_error())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_classification() {
        let collision = DiagnosticKind::CharactersCollisionInSet {
            chars: "'a'".into(),
            set: "'a'..'z'".into(),
        };
        assert_eq!(collision.severity(), Severity::Warning);
        let closure = DiagnosticKind::EpsilonClosure { rule: "a".into() };
        assert_eq!(closure.severity(), Severity::Error);
        assert!(closure.is_closure_error());
    }

    #[test]
    fn test_display_includes_position() {
        let d = Diagnostic::new(
            DiagnosticKind::UndefinedToken { name: "X".into() },
            Some(SourcePos::new(3, 7)),
        );
        assert_eq!(d.to_string(), "error(3:7): token X is not defined");
    }

    #[test]
    fn test_collects_errors_and_warnings() {
        let mut diags = Diagnostics::new();
        diags.report(
            DiagnosticKind::DuplicatedCommand {
                command: "skip".into(),
            },
            None,
        );
        assert!(!diags.has_errors());
        diags.report(
            DiagnosticKind::InvalidLexerCommand {
                command: "frob".into(),
            },
            None,
        );
        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warnings().count(), 1);

        let items = diags.into_vec();
        assert_eq!(items.len(), 2);
        assert!(!items[0].is_error());
        assert!(items[1].is_error());
    }
}
