//! Tree traversal
//!
//! [`SpptVisitor`] walks the first derivation alternative of every branch in
//! depth-first order. Callbacks return [`ControlFlow`] so a traversal can
//! stop early once it has what it needs.

use super::node::{SpptBranch, SpptLeaf, SpptNode};
use std::ops::ControlFlow;

/// Depth-first observer over a parse tree.
///
/// All callbacks default to continuing, so implementors only override what
/// they care about.
pub trait SpptVisitor {
    /// Called for every leaf, skip leaves included.
    fn visit_leaf(&mut self, leaf: &SpptLeaf) -> ControlFlow<()> {
        let _ = leaf;
        ControlFlow::Continue(())
    }

    /// Called before a branch's children.
    fn enter_branch(&mut self, branch: &SpptBranch) -> ControlFlow<()> {
        let _ = branch;
        ControlFlow::Continue(())
    }

    /// Called after a branch's children.
    fn leave_branch(&mut self, branch: &SpptBranch) -> ControlFlow<()> {
        let _ = branch;
        ControlFlow::Continue(())
    }
}

/// Walk `node` depth-first along first alternatives, reporting to `visitor`.
pub fn walk<V: SpptVisitor + ?Sized>(node: &SpptNode, visitor: &mut V) -> ControlFlow<()> {
    match node {
        SpptNode::Leaf(leaf) => visitor.visit_leaf(leaf),
        SpptNode::Branch(branch) => {
            visitor.enter_branch(branch)?;
            for child in branch.children() {
                walk(child, visitor)?;
            }
            visitor.leave_branch(branch)
        }
    }
}

impl SpptNode {
    /// Walk this subtree with `visitor`; see [`walk`].
    pub fn accept<V: SpptVisitor + ?Sized>(&self, visitor: &mut V) -> ControlFlow<()> {
        walk(self, visitor)
    }
}
