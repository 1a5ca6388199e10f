//! # sylva
//!
//! Scannerless generalized parsing over context-free grammars.
//!
//! ## Overview
//!
//! `sylva` parses text directly against a compiled [`RuleSet`] with no
//! separate lexing stage. The engine grows a graph-structured stack in three
//! directions (width, height, graft) until nothing can take another step,
//! packing every derivation it finds into a shared forest. Because growth is
//! generalized, arbitrary context-free grammars work: left recursion, right
//! recursion, and genuine ambiguity all parse, and ambiguous spans come back
//! as packed alternatives instead of an error.
//!
//! Supported grammar shapes: choices (unordered or priority-ordered),
//! concatenations, bounded repetitions, separator-delimited lists, literal
//! and regex pattern terminals, and skip terminals (whitespace, comments)
//! interleaved transparently between items.
//!
//! ## Usage
//!
//! ```rust
//! use sylva::{GrammarRule, RuleExpr, RuleSet};
//!
//! let rule_set = RuleSet::compile(vec![
//!     GrammarRule::rule(
//!         "list",
//!         RuleExpr::separated_list(1, None, RuleExpr::literal(","), RuleExpr::reference("num")),
//!     ),
//!     GrammarRule::pattern("num", "[0-9]+"),
//!     GrammarRule::skip_pattern("WS", r"\s+"),
//! ])?;
//! let goal = rule_set.rule_id("list").expect("declared rule");
//!
//! let tree = sylva::parse(&rule_set, goal, "1, 2, 3")?;
//! assert_eq!(tree.to_flat_string(), "1, 2, 3");
//!
//! let error = sylva::parse(&rule_set, goal, "1, 2,").unwrap_err();
//! assert!(error.location().is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Features
//!
//! - `diagnostics`: derive `miette::Diagnostic` on error types.
//! - `serialize`: derive `serde` traits on trees, ids, and stats.

#![warn(missing_docs)]

pub mod error;
mod graph;
pub mod input;
pub mod runtime;
pub mod sppf;

pub use error::{GrammarError, ParseError};
pub use graph::grow::{
    parse, parse_traced, parse_with_options, GrowEvent, GrowEventHandler, NullEventHandler,
    ParseOptions, ParseStats,
};
pub use input::{Leaf, LineCol, LineIndex};
pub use runtime::{GrammarRule, RuleExpr, RuleId, RuleSet};
pub use sppf::{SharedPackedParseTree, SpptBranch, SpptLeaf, SpptNode, SpptVisitor};
