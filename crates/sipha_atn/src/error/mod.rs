//! # Error Types
//!
//! Two kinds of failure come out of automaton construction.
//!
//! - [`AtnError`]: fatal. The input grammar tree is inconsistent (a rule
//!   reference that does not resolve, a block with no alternatives) or a
//!   resource bound was hit. Construction stops and the error is returned.
//! - [`Diagnostic`]: a grammar defect found while building or checking the
//!   automaton. Diagnostics are accumulated in [`Diagnostics`] and never stop
//!   construction; a best-effort fragment stands in for the offending node.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, both types derive
//! [`miette::Diagnostic`] with stable `atn::*` codes.

mod diagnostics;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};

use compact_str::CompactString;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic as MietteDiagnostic;

/// Unrecoverable construction failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(MietteDiagnostic))]
pub enum AtnError {
    #[error("rule {name} is referenced but not defined")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::undefined_rule)))]
    UndefinedRule { name: CompactString },

    #[error("malformed grammar tree in rule {rule}: {reason}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::malformed_ast)))]
    MalformedAst { rule: CompactString, reason: String },

    #[error("automaton exceeds the limit of {limit} states")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::state_limit)))]
    StateLimitExceeded { limit: usize },

    #[error("rule {rule} nests deeper than {limit} levels")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::nesting_too_deep)))]
    NestingTooDeep { rule: CompactString, limit: usize },

    #[error("optional block in rule {rule} has {count} bypass edges, expected exactly one")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::optional_bypass)))]
    OptionalBypass { rule: CompactString, count: usize },

    #[error("grammar has {count} error(s); automaton is not usable")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(atn::grammar_errors)))]
    GrammarErrors { count: usize },
}

impl AtnError {
    #[must_use]
    pub fn malformed(rule: &str, reason: impl Into<String>) -> Self {
        Self::MalformedAst {
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}
