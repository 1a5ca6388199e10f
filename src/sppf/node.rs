//! Shared packed parse tree nodes
//!
//! Extracted trees are immutable DAGs of [`SpptNode`]s behind [`Arc`]s.
//! Ambiguity survives extraction: a branch carries one children list per
//! derivation alternative, and shared subtrees are represented once.

use crate::runtime::RuleId;
use compact_str::CompactString;
use std::fmt::Write as _;
use std::sync::Arc;

/// A terminal match in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SpptLeaf {
    /// The terminal rule that matched.
    pub rule: RuleId,
    /// Rule name.
    pub name: CompactString,
    /// Byte position of the match start.
    pub start: usize,
    /// Match length in bytes; 0 for empty terminals.
    pub len: usize,
    /// The matched text.
    pub text: CompactString,
    /// True if the terminal is a pattern.
    pub is_pattern: bool,
    /// True if the terminal is a skip rule.
    pub is_skip: bool,
}

/// A non-terminal derivation in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SpptBranch {
    /// The derived rule.
    pub rule: RuleId,
    /// Rule name.
    pub name: CompactString,
    /// Span start in bytes.
    pub start: usize,
    /// Span length in bytes.
    pub len: usize,
    /// One children list per derivation alternative; more than one means the
    /// span is ambiguous for this rule.
    pub alternatives: Vec<Vec<Arc<SpptNode>>>,
}

impl SpptBranch {
    /// Children of the first derivation alternative.
    #[must_use]
    pub fn children(&self) -> &[Arc<SpptNode>] {
        self.alternatives.first().map_or(&[], Vec::as_slice)
    }
}

/// One node of a shared packed parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SpptNode {
    /// Terminal match.
    Leaf(SpptLeaf),
    /// Non-terminal derivation.
    Branch(SpptBranch),
}

impl SpptNode {
    /// The rule this node derives.
    #[must_use]
    pub const fn rule(&self) -> RuleId {
        match self {
            Self::Leaf(leaf) => leaf.rule,
            Self::Branch(branch) => branch.rule,
        }
    }

    /// The rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Leaf(leaf) => &leaf.name,
            Self::Branch(branch) => &branch.name,
        }
    }

    /// Span start in bytes.
    #[must_use]
    pub const fn start(&self) -> usize {
        match self {
            Self::Leaf(leaf) => leaf.start,
            Self::Branch(branch) => branch.start,
        }
    }

    /// Span length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::Leaf(leaf) => leaf.len,
            Self::Branch(branch) => branch.len,
        }
    }

    /// True if the span is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte position one past the span.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start() + self.len()
    }

    /// The leaf payload, if this node is a leaf.
    #[must_use]
    pub const fn as_leaf(&self) -> Option<&SpptLeaf> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::Branch(_) => None,
        }
    }

    /// The branch payload, if this node is a branch.
    #[must_use]
    pub const fn as_branch(&self) -> Option<&SpptBranch> {
        match self {
            Self::Branch(branch) => Some(branch),
            Self::Leaf(_) => None,
        }
    }

    /// True if `other` occurs in this tree, any alternative. A node contains
    /// itself. Branch comparison is insensitive to the order in which
    /// ambiguous alternatives were packed: two branches match when they cover
    /// the same rule and span and each alternative on either side has a
    /// matching alternative on the other.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        if self.same_structure(other) {
            return true;
        }
        match self {
            Self::Leaf(_) => false,
            Self::Branch(branch) => branch
                .alternatives
                .iter()
                .flatten()
                .any(|child| child.contains(other)),
        }
    }

    fn same_structure(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Leaf(a), Self::Leaf(b)) => a == b,
            (Self::Branch(a), Self::Branch(b)) => {
                a.rule == b.rule
                    && a.start == b.start
                    && a.len == b.len
                    && alternatives_covered(&a.alternatives, &b.alternatives)
                    && alternatives_covered(&b.alternatives, &a.alternatives)
            }
            _ => false,
        }
    }

    /// Concatenation of all leaf texts along the first alternative of every
    /// branch. For a tree spanning the whole input this reproduces the input.
    #[must_use]
    pub fn to_flat_string(&self) -> String {
        let mut out = String::new();
        self.write_flat(&mut out);
        out
    }

    fn write_flat(&self, out: &mut String) {
        match self {
            Self::Leaf(leaf) => out.push_str(&leaf.text),
            Self::Branch(branch) => {
                for child in branch.children() {
                    child.write_flat(out);
                }
            }
        }
    }

    /// Compact structural rendering along the first alternative of every
    /// branch: `rule{...}` for branches, `'text'` for leaves. Skip leaves are
    /// omitted.
    #[must_use]
    pub fn to_bracket_string(&self) -> String {
        let mut out = String::new();
        self.write_bracket(&mut out);
        out
    }

    fn write_bracket(&self, out: &mut String) {
        match self {
            Self::Leaf(leaf) => {
                if !leaf.is_skip {
                    // Writing to a String cannot fail.
                    let _ = write!(out, "'{}'", leaf.text);
                }
            }
            Self::Branch(branch) => {
                out.push_str(&branch.name);
                out.push('{');
                for child in branch.children() {
                    child.write_bracket(out);
                }
                out.push('}');
            }
        }
    }
}

/// Every alternative in `from` has a matching alternative in `into` whose
/// children pairwise match.
fn alternatives_covered(from: &[Vec<Arc<SpptNode>>], into: &[Vec<Arc<SpptNode>>]) -> bool {
    from.iter().all(|alt| {
        into.iter().any(|candidate| {
            alt.len() == candidate.len()
                && alt
                    .iter()
                    .zip(candidate)
                    .all(|(a, b)| a.same_structure(b))
        })
    })
}
