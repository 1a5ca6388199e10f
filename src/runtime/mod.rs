//! # Runtime Grammar Module
//!
//! Grammar declarations and the compiled rule set.
//!
//! ## Overview
//!
//! Grammars enter the engine as a flat list of named [`GrammarRule`]
//! declarations whose bodies are [`RuleExpr`] trees. [`RuleSet::compile`]
//! flattens those trees into numbered [`RuntimeRule`]s, creating synthetic
//! rules for nested composites, implicit terminals for inline literals and
//! patterns, and empty terminals for zero-minimum repetitions, and then
//! precomputes the reachability tables that drive parsing:
//!
//! - `possible_first_terminals`: which terminals can start a rule (width growth)
//! - `possible_sub_rules` / `possible_super_rules`: reachability up and down
//!   the rule graph (height growth candidates and potential checks)
//! - `skip_terminals` / `empty_rule_for`: skip interleaving and empty matches
//!
//! The compiled set is immutable and may be shared across concurrent parses.
//!
//! ## Usage
//!
//! ```rust
//! use sylva::runtime::{GrammarRule, RuleExpr, RuleSet};
//!
//! let rule_set = RuleSet::compile(vec![
//!     GrammarRule::rule(
//!         "list",
//!         RuleExpr::separated_list(1, None, RuleExpr::literal(","), RuleExpr::reference("item")),
//!     ),
//!     GrammarRule::pattern("item", "[a-z]+"),
//!     GrammarRule::skip_pattern("WS", r"\s+"),
//! ])?;
//! assert!(rule_set.rule_id("list").is_some());
//! # Ok::<(), sylva::GrammarError>(())
//! ```

mod builder;
mod rule;
mod rule_set;

pub use builder::{GrammarRule, RuleExpr};
pub use rule::{Matcher, RuleId, RuleKind, RuleRhs, RuntimeRule, Terminal};
pub use rule_set::RuleSet;

pub(crate) use rule::RuleIdList;
