//! # Automaton Construction
//!
//! Turns a [`Grammar`] into an [`Atn`].
//!
//! ## Overview
//!
//! Construction composes *fragment handles*: every grammar node is built
//! into a small piece of graph with one entry state and one exit state
//! ([`Handle`]), and larger constructs wire the handles of their children
//! together. Parser and lexer grammars share the composition of sequences,
//! blocks and loops and differ in how leaves are built:
//!
//! - parser grammars match tokens, token sets and rule calls
//! - lexer grammars match characters: literals become chains of
//!   single-character transitions, character sets are parsed into interval
//!   sets and lexer commands become indexed lexer actions
//!
//! ## Pipeline
//!
//! 1. allocate a start/stop state pair for every rule
//! 2. build every rule body and strip redundant tail epsilons
//! 3. link rule stop states to the follow state of every call site
//! 4. parser: add `EOF` edges to rules nothing calls; lexer: link each
//!    mode start to the token rules of that mode
//! 5. merge single-symbol alternatives into set transitions (lexer only)
//! 6. compact state numbering
//! 7. mark precedence decisions of left-recursive rules
//! 8. check loop and optional blocks for epsilon and `EOF` closure
//!
//! Grammar defects found along the way are collected as diagnostics and
//! never stop construction. Only inconsistent input trees and exhausted
//! resource bounds return an [`AtnError`].
//!
//! ## Usage
//!
//! ```rust
//! use sipha_atn::build::{build_atn, AtnConfig};
//! use sipha_atn::grammar::{Block, Element, GrammarBuilder};
//!
//! let grammar = GrammarBuilder::parser("P")
//!     .tokens(["A", "B"])
//!     .rule("a", Block::seq([Element::token("A"), Element::token("B")]))
//!     .build()
//!     .expect("valid grammar");
//! let build = build_atn(&grammar, &AtnConfig::default()).expect("construction succeeds");
//! assert!(build.is_usable());
//! ```

mod charset;
mod commands;
mod factory;
mod lexer;
mod parser;
mod tail_epsilon;
mod walker;

use lexer::LexerAtnFactory;
use parser::ParserAtnFactory;

use crate::analysis::closure::{self, GuardedBlock};
use crate::analysis::{Ll1Analyzer, LookaheadOracle};
use crate::atn::{Atn, AtnType, StateId, StateKind};
use crate::error::{AtnError, Diagnostics};
use crate::grammar::{Grammar, GrammarKind};
use crate::optimize::AtnOptimizer;

/// Entry and exit state of a constructed fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    pub left: StateId,
    pub right: StateId,
}

impl Handle {
    #[must_use]
    pub const fn new(left: StateId, right: StateId) -> Self {
        Self { left, right }
    }
}

/// Construction settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtnConfig {
    /// Deepest block nesting accepted within one rule.
    pub max_nesting_depth: usize,

    /// Largest number of states, removed ones included.
    pub max_states: usize,

    /// Merge single-symbol lexer alternatives into set transitions.
    pub optimize: bool,

    /// Renumber surviving states contiguously.
    pub compact: bool,

    /// Run the epsilon/EOF closure check on loops and optional blocks.
    pub check_closures: bool,
}

impl Default for AtnConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 256,
            max_states: 1 << 22,
            optimize: true,
            compact: true,
            check_closures: true,
        }
    }
}

impl AtnConfig {
    #[must_use]
    pub const fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    #[must_use]
    pub const fn with_max_states(mut self, limit: usize) -> Self {
        self.max_states = limit;
        self
    }

    #[must_use]
    pub const fn with_optimize(mut self, enabled: bool) -> Self {
        self.optimize = enabled;
        self
    }

    #[must_use]
    pub const fn with_compact(mut self, enabled: bool) -> Self {
        self.compact = enabled;
        self
    }

    #[must_use]
    pub const fn with_check_closures(mut self, enabled: bool) -> Self {
        self.check_closures = enabled;
        self
    }
}

/// A finished automaton together with everything reported while building it.
#[derive(Debug, Clone)]
pub struct AtnBuild {
    pub atn: Atn,
    pub diagnostics: Diagnostics,
}

impl AtnBuild {
    /// No error-severity diagnostics were reported. Warnings are allowed.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// The automaton, if it may be handed to a runtime or code generator.
    ///
    /// # Errors
    ///
    /// Returns [`AtnError::GrammarErrors`] when any error diagnostic exists.
    pub fn into_atn(self) -> Result<Atn, AtnError> {
        let count = self.diagnostics.error_count();
        if count > 0 {
            return Err(AtnError::GrammarErrors { count });
        }
        Ok(self.atn)
    }
}

/// Raw output of a factory, before the post passes.
pub(crate) struct Construction {
    pub(crate) atn: Atn,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) closure_blocks: Vec<GuardedBlock>,
    pub(crate) optional_blocks: Vec<GuardedBlock>,
}

/// Build the automaton for `grammar` with the default LL(1) lookahead
/// oracle.
///
/// # Errors
///
/// Returns an error if a rule reference does not resolve, the grammar tree
/// is malformed, or a bound of `config` is exceeded.
pub fn build_atn(grammar: &Grammar, config: &AtnConfig) -> Result<AtnBuild, AtnError> {
    build_atn_with_oracle(grammar, config, &Ll1Analyzer)
}

/// Build the automaton for `grammar`, asking `oracle` for the leading
/// symbols of loop and optional blocks during the closure check.
///
/// # Errors
///
/// Same as [`build_atn`].
pub fn build_atn_with_oracle(
    grammar: &Grammar,
    config: &AtnConfig,
    oracle: &dyn LookaheadOracle,
) -> Result<AtnBuild, AtnError> {
    log::debug!(
        "building {:?} ATN for grammar {} ({} rules)",
        grammar.kind(),
        grammar.name(),
        grammar.rules().len()
    );

    let Construction {
        mut atn,
        mut diagnostics,
        mut closure_blocks,
        mut optional_blocks,
    } = match grammar.kind() {
        GrammarKind::Parser => ParserAtnFactory::new(grammar, config).create_atn()?,
        GrammarKind::Lexer => LexerAtnFactory::new(grammar, config).create_atn()?,
    };
    log::debug!("constructed {} states", atn.num_states());

    let optimizer = AtnOptimizer::new();
    if config.optimize {
        optimizer.optimize_sets(&mut atn, &mut diagnostics);
    }
    if config.compact {
        let remap = optimizer.compact(&mut atn);
        for block in closure_blocks.iter_mut().chain(optional_blocks.iter_mut()) {
            block.remap(&remap);
        }
    }

    let marked = mark_precedence_decisions(&mut atn);
    if marked > 0 {
        log::debug!("marked {marked} precedence decision(s)");
    }

    if config.check_closures {
        closure::check_closures(
            &atn,
            grammar,
            oracle,
            &closure_blocks,
            &optional_blocks,
            &mut diagnostics,
        )?;
    }

    log::debug!(
        "finished ATN: {} states, {} decisions, {} error(s), {} warning(s)",
        atn.num_states(),
        atn.decisions().len(),
        diagnostics.error_count(),
        diagnostics.warnings().count()
    );
    Ok(AtnBuild { atn, diagnostics })
}

/// Flag the star-loop entries of left-recursive rules whose exit leads
/// straight to the rule's stop state.
fn mark_precedence_decisions(atn: &mut Atn) -> usize {
    let mut marked = Vec::new();
    for (id, state) in atn.states() {
        if !matches!(state.kind, StateKind::StarLoopEntry { .. }) {
            continue;
        }
        let left_recursive = state
            .rule_index
            .and_then(|r| atn.rule_start(r))
            .and_then(|start| atn.state(start))
            .is_some_and(|start| {
                matches!(
                    start.kind,
                    StateKind::RuleStart {
                        left_recursive: true,
                        ..
                    }
                )
            });
        if !left_recursive {
            continue;
        }
        let Some(exit) = state.transitions().last() else {
            continue;
        };
        let Some(loop_end) = atn.state(exit.target) else {
            continue;
        };
        if !matches!(loop_end.kind, StateKind::LoopEnd { .. }) || !loop_end.only_epsilon_transitions()
        {
            continue;
        }
        let reaches_stop = loop_end
            .transition(0)
            .and_then(|t| atn.state(t.target))
            .is_some_and(|s| s.kind.is_rule_stop());
        if reaches_stop {
            marked.push(id);
        }
    }
    for id in &marked {
        if let StateKind::StarLoopEntry {
            precedence_decision,
            ..
        } = &mut atn[*id].kind
        {
            *precedence_decision = true;
        }
    }
    marked.len()
}

/// Type of automaton a grammar produces.
pub(crate) const fn atn_type(kind: GrammarKind) -> AtnType {
    match kind {
        GrammarKind::Parser => AtnType::Parser,
        GrammarKind::Lexer => AtnType::Lexer,
    }
}
