//! # Error Types
//!
//! Error types for grammar compilation and parsing.
//!
//! ## Overview
//!
//! Two failures are visible to callers:
//!
//! - [`GrammarError`]: raised while compiling a rule set; always setup-fatal.
//! - [`ParseError`]: raised when a parse cannot span the input (or exceeds its
//!   step budget). `ParseFailed` carries the best partial tree plus a 1-based
//!   line/column so interactive callers can point at the failure.
//!
//! Everything else (a terminal that does not match here, a growth attempt
//! that does not apply) is ordinary control flow inside the growth engine and
//! never surfaces as an error type.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors integrate with [`miette`]
//! for rich error reporting.

use crate::sppf::SharedPackedParseTree;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Error raised while compiling grammar rules into a [`RuleSet`](crate::RuleSet).
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    /// A rule reference could not be resolved to a declared rule.
    #[error("rule not found: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::rule_not_found)))]
    RuleNotFound(String),

    /// The same rule name was declared twice.
    #[error("duplicate rule declaration: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::duplicate_rule)))]
    DuplicateRule(String),

    /// A pattern terminal failed to compile.
    #[error("invalid pattern for rule {name}: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::invalid_pattern)))]
    InvalidPattern {
        /// Name of the terminal rule carrying the pattern.
        name: String,
        /// Error text reported by the regex compiler.
        message: String,
    },
}

/// Error raised by [`parse`](crate::parse) when no goal-spanning tree exists.
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ParseError {
    /// No complete node for the goal rule reaches end-of-input.
    #[error("parse failed at line {line}, column {column}: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::parse_failed)))]
    ParseFailed {
        /// Human-readable description of what went wrong.
        message: String,
        /// Best partial match, when any complete node exists at all.
        partial: Option<SharedPackedParseTree>,
        /// 1-based line of the furthest-progressed position.
        line: u32,
        /// 1-based column of the furthest-progressed position.
        column: u32,
    },

    /// The configured step budget was exhausted before the worklist drained.
    #[error("step limit exceeded after {steps} steps")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::step_limit)))]
    StepLimitExceeded {
        /// Number of growth steps taken before giving up.
        steps: usize,
    },
}

impl ParseError {
    /// Get the partial tree attached to a `ParseFailed`, if any.
    #[must_use]
    pub const fn partial(&self) -> Option<&SharedPackedParseTree> {
        match self {
            Self::ParseFailed { partial, .. } => partial.as_ref(),
            Self::StepLimitExceeded { .. } => None,
        }
    }

    /// Get the 1-based (line, column) of a `ParseFailed`.
    #[must_use]
    pub const fn location(&self) -> Option<(u32, u32)> {
        match self {
            Self::ParseFailed { line, column, .. } => Some((*line, *column)),
            Self::StepLimitExceeded { .. } => None,
        }
    }
}
