//! # Shared Packed Parse Forest Module
//!
//! The caller-facing result of a parse.
//!
//! ## Overview
//!
//! Once the growth engine reaches quiescence, extraction looks for a complete
//! node of the goal rule spanning the whole input and rebuilds it as an
//! immutable [`SharedPackedParseTree`]: a DAG of [`SpptNode`]s where every
//! distinct `(rule, start, length)` derivation appears once and ambiguous
//! spans carry one children list per derivation alternative. When no
//! spanning derivation exists, extraction instead produces a
//! [`ParseError::ParseFailed`] carrying the longest partial match from the
//! start of input and the line/column of the furthest position the engine
//! reached.
//!
//! Cyclic derivations (a rule deriving itself over the same span) are cut
//! during extraction by dropping the re-entrant alternative; the remaining
//! alternatives are kept.

pub mod node;
pub mod visitor;

pub use node::{SpptBranch, SpptLeaf, SpptNode};
pub use visitor::{walk, SpptVisitor};

use crate::error::ParseError;
use crate::graph::grow::ParseStats;
use crate::graph::node::{CompleteId, CompleteNode};
use crate::graph::ParseGraph;
use crate::input::{Input, LineIndex};
use crate::runtime::RuleSet;
use hashbrown::{HashMap, HashSet};
use std::sync::Arc;

/// An immutable parse result: the packed tree plus parse counters.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SharedPackedParseTree {
    root: Arc<SpptNode>,
    stats: ParseStats,
}

impl SharedPackedParseTree {
    /// The root node; its span covers the whole parsed text.
    #[must_use]
    pub fn root(&self) -> &Arc<SpptNode> {
        &self.root
    }

    /// Counters collected while parsing.
    #[must_use]
    pub const fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Concatenated leaf texts along first alternatives; reproduces the
    /// parsed text.
    #[must_use]
    pub fn to_flat_string(&self) -> String {
        self.root.to_flat_string()
    }

    /// Structural rendering along first alternatives; see
    /// [`SpptNode::to_bracket_string`].
    #[must_use]
    pub fn to_bracket_string(&self) -> String {
        self.root.to_bracket_string()
    }

    /// True if `other`'s root occurs anywhere in this tree, any alternative.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.root.contains(other.root())
    }

    /// Largest number of derivation alternatives on any branch; 1 for an
    /// unambiguous tree.
    #[must_use]
    pub fn max_alternatives(&self) -> usize {
        fn visit(node: &Arc<SpptNode>, seen: &mut HashSet<usize, ahash::RandomState>) -> usize {
            if !seen.insert(Arc::as_ptr(node) as usize) {
                return 1;
            }
            match node.as_ref() {
                SpptNode::Leaf(_) => 1,
                SpptNode::Branch(branch) => branch
                    .alternatives
                    .iter()
                    .flatten()
                    .map(|child| visit(child, seen))
                    .fold(branch.alternatives.len().max(1), usize::max),
            }
        }
        visit(&self.root, &mut HashSet::default())
    }
}

/// Build the parse result from a quiescent graph.
pub(crate) fn extract(
    rule_set: &RuleSet,
    input: &Input<'_>,
    graph: &ParseGraph,
    stats: ParseStats,
) -> Result<SharedPackedParseTree, ParseError> {
    let goal = graph.goal();
    let full_len = input.len() as u32;
    let spanning = graph
        .complete_nodes()
        .find(|(_, node)| node.rule == goal && node.start == 0 && node.len == full_len);
    let mut builder = TreeBuilder::new(rule_set, input, graph);
    if let Some((cid, _)) = spanning {
        // The root is never mid-construction here.
        let root = builder.build(cid).expect("root derivation is acyclic");
        return Ok(SharedPackedParseTree { root, stats });
    }

    let partial = best_partial(graph, &mut builder, stats);
    let at = LineIndex::new(input.text()).line_col(graph.max_progress() as usize);
    Err(ParseError::ParseFailed {
        message: format!(
            "no derivation of rule {} spans the input",
            rule_set.rule_name(goal)
        ),
        partial,
        line: at.line,
        column: at.column,
    })
}

/// Longest complete match anchored at the start of input, regardless of
/// rule; falls back to the globally longest match.
fn best_partial(
    graph: &ParseGraph,
    builder: &mut TreeBuilder<'_>,
    stats: ParseStats,
) -> Option<SharedPackedParseTree> {
    let longest = |predicate: &dyn Fn(&CompleteNode) -> bool| {
        graph
            .complete_nodes()
            .filter(|(_, node)| predicate(node))
            .max_by_key(|(_, node)| node.len)
            .map(|(cid, _)| cid)
    };
    let cid = longest(&|node| node.start == 0).or_else(|| longest(&|_| true))?;
    let root = builder.build(cid)?;
    Some(SharedPackedParseTree { root, stats })
}

/// Rebuilds complete nodes as shared tree nodes, one [`Arc`] per node.
struct TreeBuilder<'a> {
    rule_set: &'a RuleSet,
    input: &'a Input<'a>,
    graph: &'a ParseGraph,
    memo: HashMap<CompleteId, Arc<SpptNode>, ahash::RandomState>,
    in_progress: HashSet<CompleteId, ahash::RandomState>,
}

impl<'a> TreeBuilder<'a> {
    fn new(rule_set: &'a RuleSet, input: &'a Input<'a>, graph: &'a ParseGraph) -> Self {
        Self {
            rule_set,
            input,
            graph,
            memo: HashMap::default(),
            in_progress: HashSet::default(),
        }
    }

    /// Build the tree for `cid`, sharing already-built subtrees. Returns
    /// `None` only when `cid` is currently being built further up the stack,
    /// which cuts cyclic derivations.
    fn build(&mut self, cid: CompleteId) -> Option<Arc<SpptNode>> {
        if let Some(node) = self.memo.get(&cid) {
            return Some(node.clone());
        }
        if !self.in_progress.insert(cid) {
            return None;
        }
        let complete = self.graph.complete_node(cid);
        let rule = self.rule_set.rule(complete.rule);
        let start = complete.start as usize;
        let len = complete.len as usize;
        let built = if let Some(terminal) = rule.as_terminal() {
            SpptNode::Leaf(SpptLeaf {
                rule: complete.rule,
                name: self.rule_set.rule_name(complete.rule).into(),
                start,
                len,
                text: self.input.text()[start..start + len].into(),
                is_pattern: terminal.matcher.is_pattern(),
                is_skip: terminal.is_skip,
            })
        } else {
            let mut alternatives = Vec::with_capacity(complete.alternatives.len());
            for alt in &complete.alternatives {
                let mut children = Vec::with_capacity(alt.children.len());
                let mut acyclic = true;
                for &child in &alt.children {
                    match self.build(child) {
                        Some(node) => children.push(node),
                        None => {
                            acyclic = false;
                            break;
                        }
                    }
                }
                if acyclic {
                    alternatives.push(children);
                }
            }
            SpptNode::Branch(SpptBranch {
                rule: complete.rule,
                name: self.rule_set.rule_name(complete.rule).into(),
                start,
                len,
                alternatives,
            })
        };
        self.in_progress.remove(&cid);
        let node = Arc::new(built);
        self.memo.insert(cid, node.clone());
        Some(node)
    }
}
