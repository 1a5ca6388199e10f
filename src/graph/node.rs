//! Parse graph node types
//!
//! Two node populations share one arena-backed graph:
//!
//! - [`CompleteNode`]: a finished derivation, identified by
//!   `(rule, start, length)` regardless of how it was derived. Ambiguity is
//!   packed as multiple children alternatives under the one identity.
//! - [`GrowingNode`]: a partial derivation, identified by
//!   `(rule, start, end, next_item)`. Its previous set is the
//!   graph-structured stack: every context this node is stacked under.
//!
//! Nodes reference each other by index handles into the owning
//! [`ParseGraph`](super::ParseGraph); no owning pointers, no cycles.

use crate::runtime::{RuleId, RuleIdList, RuleRhs};
use smallvec::SmallVec;

/// Sentinel `next_item` for a repetition completed by its empty terminal.
/// Distinguishes "matched zero occurrences via the empty leaf" from
/// "not started yet", and blocks any further width growth.
pub(crate) const EMPTY_DONE: u32 = u32::MAX;

/// Handle of a growing node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GrowingId(pub(crate) u32);

impl GrowingId {
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle of a complete node in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CompleteId(pub(crate) u32);

impl CompleteId {
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a growing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GrowingKey {
    pub rule: RuleId,
    pub start: u32,
    pub end: u32,
    pub next_item: u32,
}

/// Identity of a complete node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CompleteKey {
    pub rule: RuleId,
    pub start: u32,
    pub len: u32,
}

/// Ordered children of one derivation alternative.
pub(crate) type ChildList = SmallVec<[CompleteId; 4]>;

/// One derivation alternative plus the choice priority it was derived under.
///
/// The priority is the declared alternative index of the first child within a
/// priority-choice parent; it is 0 and ignored everywhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChildAlt {
    pub children: ChildList,
    pub priority: u32,
}

/// A partial derivation stacked in the GSS.
#[derive(Debug)]
pub(crate) struct GrowingNode {
    pub rule: RuleId,
    pub start: u32,
    pub end: u32,
    /// Items consumed so far; parity doubles as separator state for
    /// separated lists. [`EMPTY_DONE`] marks empty-completed repetitions.
    pub next_item: u32,
    /// Derivation alternatives collected under this identity.
    pub alts: SmallVec<[ChildAlt; 1]>,
    /// GSS edges: every growing node this one is stacked under.
    pub previous: SmallVec<[GrowingId; 4]>,
    /// Terminal nodes stacked under this one by width growth; re-enqueued
    /// when this node changes so extensions see merged state.
    pub stacked: SmallVec<[GrowingId; 2]>,
    /// True while the node sits on the growable worklist.
    pub queued: bool,
}

/// A finished derivation with ambiguity-packed children alternatives.
///
/// For terminal rules the node is a leaf: `alternatives` stays empty and the
/// covered text is recovered from the input by span.
#[derive(Debug)]
pub(crate) struct CompleteNode {
    pub rule: RuleId,
    pub start: u32,
    pub len: u32,
    pub alternatives: SmallVec<[ChildAlt; 1]>,
}

/// Rules acceptable as the next child of a growing node with the given
/// right-hand side and progress. Empty when the node cannot take further
/// (non-skip) children.
pub(crate) fn expected_items(rhs: &RuleRhs, next_item: u32) -> RuleIdList {
    let mut expected = RuleIdList::new();
    if next_item == EMPTY_DONE {
        return expected;
    }
    match rhs {
        RuleRhs::Choice { alternatives } | RuleRhs::PriorityChoice { alternatives } => {
            if next_item == 0 {
                expected.extend(alternatives.iter().copied());
            }
        }
        RuleRhs::Concatenation { items } => {
            expected.extend(items.get(next_item as usize).copied());
        }
        RuleRhs::Multi { max, item, .. } => {
            if max.is_none_or(|max| (next_item as usize) < max) {
                expected.push(*item);
            }
        }
        RuleRhs::SeparatedList {
            max,
            separator,
            item,
            ..
        } => {
            let count = next_item as usize;
            if count % 2 == 0 {
                // Expecting an item next.
                if max.is_none_or(|max| count / 2 < max) {
                    expected.push(*item);
                }
            } else if max.is_none_or(|max| (count + 1) / 2 < max) {
                expected.push(*separator);
            }
        }
    }
    expected
}

/// Completion predicate per rule kind. `next_item` carries the progress;
/// callers additionally require at least one attached child before
/// materializing a complete node.
pub(crate) fn is_complete(rhs: &RuleRhs, next_item: u32) -> bool {
    if next_item == EMPTY_DONE {
        return true;
    }
    match rhs {
        RuleRhs::Choice { .. } | RuleRhs::PriorityChoice { .. } => next_item >= 1,
        RuleRhs::Concatenation { items } => next_item as usize >= items.len(),
        RuleRhs::Multi { min, .. } => next_item as usize >= *min,
        RuleRhs::SeparatedList { min, .. } => {
            let count = next_item as usize;
            count % 2 == 1 && (count + 1) / 2 >= *min
        }
    }
}
