//! # Parse Graph Module
//!
//! The graph-structured stack and packed derivation store behind the growth
//! engine.
//!
//! ## Overview
//!
//! A [`ParseGraph`] holds two arenas. Growing nodes are the frontier: partial
//! derivations keyed by `(rule, start, end, next_item)`, each carrying the
//! set of parent contexts (`previous`) it may graft back into. Complete nodes
//! are finished derivations keyed by `(rule, start, len)`; ambiguous
//! derivations of the same span pack as extra children alternatives under the
//! one node, so the stored forest stays polynomial even when the number of
//! parse trees is not.
//!
//! Creation is always find-or-create. When a second derivation path reaches
//! an existing growing node, its alternatives and previous set are merged in
//! place and the node (plus any terminal extensions stacked on it) is
//! re-enqueued, so state added after the first visit still propagates.

pub(crate) mod grow;
pub(crate) mod node;

use crate::input::Leaf;
use crate::runtime::{RuleId, RuleRhs, RuleSet};
use hashbrown::HashMap;
use node::{
    ChildAlt, CompleteId, CompleteKey, CompleteNode, GrowingId, GrowingKey, GrowingNode,
};
use smallvec::SmallVec;

/// The GSS plus the packed store of complete derivations for one parse.
pub(crate) struct ParseGraph {
    goal: RuleId,
    growing: Vec<GrowingNode>,
    growing_index: HashMap<GrowingKey, GrowingId, ahash::RandomState>,
    complete: Vec<CompleteNode>,
    complete_index: HashMap<CompleteKey, CompleteId, ahash::RandomState>,
    /// LIFO worklist of growing nodes that still need a step.
    growable: Vec<GrowingId>,
    /// Furthest byte position any node has reached; failure reports point here.
    max_progress: u32,
}

impl ParseGraph {
    pub(crate) fn new(goal: RuleId) -> Self {
        Self {
            goal,
            growing: Vec::new(),
            growing_index: HashMap::default(),
            complete: Vec::new(),
            complete_index: HashMap::default(),
            growable: Vec::new(),
            max_progress: 0,
        }
    }

    pub(crate) const fn goal(&self) -> RuleId {
        self.goal
    }

    pub(crate) const fn max_progress(&self) -> u32 {
        self.max_progress
    }

    pub(crate) fn growing_count(&self) -> usize {
        self.growing.len()
    }

    pub(crate) fn complete_count(&self) -> usize {
        self.complete.len()
    }

    pub(crate) fn growing(&self, id: GrowingId) -> &GrowingNode {
        &self.growing[id.index()]
    }

    pub(crate) fn complete_node(&self, id: CompleteId) -> &CompleteNode {
        &self.complete[id.index()]
    }

    pub(crate) fn complete_nodes(&self) -> impl Iterator<Item = (CompleteId, &CompleteNode)> {
        self.complete
            .iter()
            .enumerate()
            .map(|(i, node)| (CompleteId(i as u32), node))
    }

    /// Pop the next node to step, clearing its queued flag.
    pub(crate) fn next_growable(&mut self) -> Option<GrowingId> {
        let id = self.growable.pop()?;
        self.growing[id.index()].queued = false;
        Some(id)
    }

    pub(crate) fn enqueue(&mut self, id: GrowingId) {
        let gn = &mut self.growing[id.index()];
        if !gn.queued {
            gn.queued = true;
            self.growable.push(id);
        }
    }

    /// Record `child` as a terminal extension stacked on `parent`, so merges
    /// into `parent` re-enqueue the extension as well.
    pub(crate) fn add_stacked(&mut self, parent: GrowingId, child: GrowingId) {
        let gn = &mut self.growing[parent.index()];
        if !gn.stacked.contains(&child) {
            gn.stacked.push(child);
        }
    }

    /// Find or create the growing node for `key`, merging `alts` and
    /// `previous` into it. New nodes and changed nodes are enqueued; a merge
    /// change also re-enqueues the node's stacked terminal extensions.
    pub(crate) fn find_or_create_growing(
        &mut self,
        key: GrowingKey,
        alts: impl IntoIterator<Item = ChildAlt>,
        previous: impl IntoIterator<Item = GrowingId>,
    ) -> GrowingId {
        self.max_progress = self.max_progress.max(key.end);
        if let Some(&id) = self.growing_index.get(&key) {
            let gn = &mut self.growing[id.index()];
            let mut changed = false;
            for alt in alts {
                if !gn.alts.contains(&alt) {
                    gn.alts.push(alt);
                    changed = true;
                }
            }
            for prev in previous {
                if !gn.previous.contains(&prev) {
                    gn.previous.push(prev);
                    changed = true;
                }
            }
            if changed {
                let stacked: SmallVec<[GrowingId; 2]> = gn.stacked.clone();
                self.enqueue(id);
                for child in stacked {
                    self.enqueue(child);
                }
            }
            return id;
        }
        let id = GrowingId(self.growing.len() as u32);
        self.growing.push(GrowingNode {
            rule: key.rule,
            start: key.start,
            end: key.end,
            next_item: key.next_item,
            alts: alts.into_iter().collect(),
            previous: previous.into_iter().collect(),
            stacked: SmallVec::new(),
            queued: false,
        });
        self.growing_index.insert(key, id);
        self.enqueue(id);
        id
    }

    /// Intern the complete leaf node for a terminal match.
    pub(crate) fn leaf_complete(&mut self, leaf: &Leaf) -> CompleteId {
        let key = CompleteKey {
            rule: leaf.rule,
            start: leaf.start as u32,
            len: leaf.len as u32,
        };
        if let Some(&id) = self.complete_index.get(&key) {
            return id;
        }
        let id = CompleteId(self.complete.len() as u32);
        self.complete.push(CompleteNode {
            rule: key.rule,
            start: key.start,
            len: key.len,
            alternatives: SmallVec::new(),
        });
        self.complete_index.insert(key, id);
        self.max_progress = self.max_progress.max(key.start + key.len);
        id
    }

    /// Register the growing node `id` as complete, packing its derivation
    /// alternatives into the complete node for `(rule, start, end - start)`.
    ///
    /// Alternatives with no children (the goal seed) are not packed. For
    /// priority-choice rules only the lowest declared alternative index
    /// survives among same-span derivations; a lower-priority arrival evicts
    /// the packed higher-priority ones.
    pub(crate) fn register_complete(
        &mut self,
        rule_set: &RuleSet,
        id: GrowingId,
    ) -> Option<CompleteId> {
        let gn = &self.growing[id.index()];
        let incoming: SmallVec<[ChildAlt; 1]> = gn
            .alts
            .iter()
            .filter(|alt| !alt.children.is_empty())
            .cloned()
            .collect();
        if incoming.is_empty() {
            return None;
        }
        let prioritized = matches!(
            rule_set.rule(gn.rule).rhs(),
            Some(RuleRhs::PriorityChoice { .. })
        );
        let key = CompleteKey {
            rule: gn.rule,
            start: gn.start,
            len: gn.end - gn.start,
        };
        let cid = match self.complete_index.get(&key) {
            Some(&cid) => cid,
            None => {
                let cid = CompleteId(self.complete.len() as u32);
                self.complete.push(CompleteNode {
                    rule: key.rule,
                    start: key.start,
                    len: key.len,
                    alternatives: SmallVec::new(),
                });
                self.complete_index.insert(key, cid);
                cid
            }
        };
        let packed = &mut self.complete[cid.index()].alternatives;
        for alt in incoming {
            if prioritized {
                match packed.first().map(|existing| existing.priority) {
                    Some(current) if alt.priority > current => continue,
                    Some(current) if alt.priority < current => packed.clear(),
                    _ => {}
                }
            }
            if !packed.contains(&alt) {
                packed.push(alt);
            }
        }
        Some(cid)
    }
}

#[cfg(test)]
mod tests {
    use super::node::{ChildAlt, ChildList, GrowingKey};
    use super::*;
    use crate::runtime::{GrammarRule, RuleExpr};
    use smallvec::smallvec;

    fn sample_rule_set() -> RuleSet {
        RuleSet::compile(vec![
            GrammarRule::rule(
                "pick",
                RuleExpr::priority_choice(vec![
                    RuleExpr::reference("a"),
                    RuleExpr::reference("b"),
                ]),
            ),
            GrammarRule::literal("a", "a"),
            GrammarRule::literal("b", "a"),
        ])
        .unwrap()
    }

    fn alt(children: ChildList, priority: u32) -> ChildAlt {
        ChildAlt { children, priority }
    }

    #[test]
    fn growing_nodes_merge_under_one_identity() {
        let rule_set = sample_rule_set();
        let pick = rule_set.rule_id("pick").unwrap();
        let mut graph = ParseGraph::new(pick);
        let key = GrowingKey {
            rule: pick,
            start: 0,
            end: 1,
            next_item: 1,
        };
        let first = graph.find_or_create_growing(key, [alt(smallvec![CompleteId(0)], 0)], []);
        let second = graph.find_or_create_growing(key, [alt(smallvec![CompleteId(1)], 1)], []);
        assert_eq!(first, second);
        assert_eq!(graph.growing(first).alts.len(), 2);
        assert_eq!(graph.growing_count(), 1);
    }

    #[test]
    fn merge_change_requeues_node_and_stacked_children() {
        let rule_set = sample_rule_set();
        let pick = rule_set.rule_id("pick").unwrap();
        let mut graph = ParseGraph::new(pick);
        let key = GrowingKey {
            rule: pick,
            start: 0,
            end: 0,
            next_item: 0,
        };
        let parent = graph.find_or_create_growing(key, [alt(ChildList::new(), 0)], []);
        let child_key = GrowingKey {
            rule: rule_set.rule_id("a").unwrap(),
            start: 0,
            end: 1,
            next_item: 0,
        };
        let child =
            graph.find_or_create_growing(child_key, [alt(smallvec![CompleteId(0)], 0)], [parent]);
        graph.add_stacked(parent, child);
        while graph.next_growable().is_some() {}

        // A new previous edge on the parent must reschedule both.
        let other_key = GrowingKey {
            rule: pick,
            start: 0,
            end: 0,
            next_item: 1,
        };
        let other = graph.find_or_create_growing(other_key, [alt(ChildList::new(), 0)], []);
        while graph.next_growable().is_some() {}
        graph.find_or_create_growing(key, [], [other]);
        let mut requeued = Vec::new();
        while let Some(id) = graph.next_growable() {
            requeued.push(id);
        }
        assert!(requeued.contains(&parent));
        assert!(requeued.contains(&child));
    }

    #[test]
    fn priority_packing_keeps_lowest_alternative_index() {
        let rule_set = sample_rule_set();
        let pick = rule_set.rule_id("pick").unwrap();
        let mut graph = ParseGraph::new(pick);

        // Higher-priority derivation arrives first.
        let key = GrowingKey {
            rule: pick,
            start: 0,
            end: 1,
            next_item: 1,
        };
        let gid = graph.find_or_create_growing(key, [alt(smallvec![CompleteId(7)], 1)], []);
        let cid = graph.register_complete(&rule_set, gid).unwrap();
        assert_eq!(graph.complete_node(cid).alternatives.len(), 1);

        // A lower index for the same span evicts it.
        graph.find_or_create_growing(key, [alt(smallvec![CompleteId(3)], 0)], []);
        let cid2 = graph.register_complete(&rule_set, gid).unwrap();
        assert_eq!(cid, cid2);
        let packed = &graph.complete_node(cid).alternatives;
        assert_eq!(packed.len(), 1);
        assert_eq!(packed[0].priority, 0);
        assert_eq!(packed[0].children.as_slice(), &[CompleteId(3)]);
    }

    #[test]
    fn seed_alternative_with_no_children_is_not_packed() {
        let rule_set = sample_rule_set();
        let pick = rule_set.rule_id("pick").unwrap();
        let mut graph = ParseGraph::new(pick);
        let key = GrowingKey {
            rule: pick,
            start: 0,
            end: 0,
            next_item: 1,
        };
        let gid = graph.find_or_create_growing(key, [alt(ChildList::new(), 0)], []);
        assert!(graph.register_complete(&rule_set, gid).is_none());
        assert_eq!(graph.complete_count(), 0);
    }
}
