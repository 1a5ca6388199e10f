//! # Growth Engine
//!
//! Drives a parse by growing the graph in three directions until no node can
//! take another step:
//!
//! - **width**: match the first terminals of whatever a frontier node expects
//!   next, stacking the matched leaves under it.
//! - **height**: wrap a finished derivation in each rule that may have it as
//!   a first child, subject to a reachability check against the contexts the
//!   child is stacked under.
//! - **graft**: hand a finished derivation back to every stacked context that
//!   expects its rule, extending that context by one item.
//!
//! Skip terminals are tried before anything else at a node's frontier; a
//! non-empty skip match extends the node past the skipped text without
//! consuming an item slot, and suspends other growth at the pre-skip
//! position. The worklist is change-driven: merging new state into an
//! existing node re-enqueues it (and its stacked leaves), so derivations
//! discovered late still reach every context.

use super::node::{
    expected_items, is_complete, ChildAlt, ChildList, CompleteId, GrowingId, GrowingKey,
    EMPTY_DONE,
};
use super::ParseGraph;
use crate::error::ParseError;
use crate::input::Input;
use crate::runtime::{Matcher, RuleId, RuleIdList, RuleRhs, RuleSet};
use crate::sppf::SharedPackedParseTree;
use smallvec::{smallvec, SmallVec};

/// Tuning knobs for one parse invocation.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Abort with [`ParseError::StepLimitExceeded`] after this many growth
    /// steps. `None` parses to quiescence.
    pub max_steps: Option<usize>,
}

impl ParseOptions {
    /// Options with no limits set.
    #[must_use]
    pub const fn new() -> Self {
        Self { max_steps: None }
    }
}

/// Counters collected over one parse.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseStats {
    /// Growth steps taken.
    pub steps: usize,
    /// Growing nodes created.
    pub growing_nodes: usize,
    /// Complete nodes created.
    pub complete_nodes: usize,
    /// Leaf match attempts, memo hits included.
    pub leaf_attempts: usize,
    /// Leaf match attempts answered from the memo.
    pub leaf_cache_hits: usize,
}

/// One observable moment inside the growth loop.
///
/// Borrowed rule names are only valid for the duration of the callback.
#[derive(Debug, Clone, Copy)]
pub enum GrowEvent<'a> {
    /// The parse started with the given goal rule.
    Started {
        /// Name of the goal rule.
        goal: &'a str,
    },
    /// A growing node was taken off the worklist.
    NodeStepped {
        /// Name of the node's rule.
        rule: &'a str,
        /// Node start position.
        start: usize,
        /// Node frontier position.
        end: usize,
    },
    /// A derivation finished and was packed into a complete node.
    RuleCompleted {
        /// Name of the completed rule.
        rule: &'a str,
        /// Span start.
        start: usize,
        /// Span length in bytes.
        len: usize,
    },
    /// A terminal matched at a frontier.
    LeafMatched {
        /// Name of the terminal rule.
        rule: &'a str,
        /// Match start.
        start: usize,
        /// Match length in bytes.
        len: usize,
    },
    /// The worklist drained.
    Finished {
        /// Total growth steps taken.
        steps: usize,
    },
}

/// Observer hook for [`parse_traced`].
pub trait GrowEventHandler {
    /// Called once per event, in engine order.
    fn handle(&mut self, event: GrowEvent<'_>);
}

/// Handler that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventHandler;

impl GrowEventHandler for NullEventHandler {
    fn handle(&mut self, _event: GrowEvent<'_>) {}
}

/// Parse `text` against `goal` with default options.
///
/// # Errors
///
/// Returns [`ParseError::ParseFailed`] when no derivation of `goal` spans the
/// whole input.
pub fn parse(
    rule_set: &RuleSet,
    goal: RuleId,
    text: &str,
) -> Result<SharedPackedParseTree, ParseError> {
    parse_with_options(rule_set, goal, text, &ParseOptions::new())
}

/// Parse with explicit [`ParseOptions`].
///
/// # Errors
///
/// Returns [`ParseError::ParseFailed`] when no derivation of `goal` spans the
/// whole input, or [`ParseError::StepLimitExceeded`] when the step budget
/// runs out first.
pub fn parse_with_options(
    rule_set: &RuleSet,
    goal: RuleId,
    text: &str,
    options: &ParseOptions,
) -> Result<SharedPackedParseTree, ParseError> {
    let mut handler = NullEventHandler;
    parse_traced(rule_set, goal, text, options, &mut handler)
}

/// Parse while reporting [`GrowEvent`]s to `handler`.
///
/// # Errors
///
/// Same failure modes as [`parse_with_options`].
pub fn parse_traced(
    rule_set: &RuleSet,
    goal: RuleId,
    text: &str,
    options: &ParseOptions,
    handler: &mut dyn GrowEventHandler,
) -> Result<SharedPackedParseTree, ParseError> {
    handler.handle(GrowEvent::Started {
        goal: rule_set.rule_name(goal),
    });
    let mut engine = GrowthEngine {
        rule_set,
        input: Input::new(text),
        graph: ParseGraph::new(goal),
        handler,
        steps: 0,
    };
    engine.run(options.max_steps)?;
    engine.handler.handle(GrowEvent::Finished {
        steps: engine.steps,
    });
    let stats = ParseStats {
        steps: engine.steps,
        growing_nodes: engine.graph.growing_count(),
        complete_nodes: engine.graph.complete_count(),
        leaf_attempts: engine.input.attempts(),
        leaf_cache_hits: engine.input.cache_hits(),
    };
    crate::sppf::extract(rule_set, &engine.input, &engine.graph, stats)
}

struct GrowthEngine<'g, 't, 'h> {
    rule_set: &'g RuleSet,
    input: Input<'t>,
    graph: ParseGraph,
    handler: &'h mut dyn GrowEventHandler,
    steps: usize,
}

impl GrowthEngine<'_, '_, '_> {
    fn run(&mut self, max_steps: Option<usize>) -> Result<(), ParseError> {
        let seed = GrowingKey {
            rule: self.graph.goal(),
            start: 0,
            end: 0,
            next_item: 0,
        };
        self.graph.find_or_create_growing(
            seed,
            [ChildAlt {
                children: ChildList::new(),
                priority: 0,
            }],
            [],
        );
        while let Some(id) = self.graph.next_growable() {
            if max_steps.is_some_and(|limit| self.steps >= limit) {
                return Err(ParseError::StepLimitExceeded { steps: self.steps });
            }
            self.steps += 1;
            self.step(id);
        }
        Ok(())
    }

    fn step(&mut self, id: GrowingId) {
        let gn = self.graph.growing(id);
        let rule_id = gn.rule;
        let next_item = gn.next_item;
        let start = gn.start;
        let end = gn.end;
        let first_child = gn.alts.first().and_then(|alt| alt.children.first()).copied();
        self.handler.handle(GrowEvent::NodeStepped {
            rule: self.rule_set.rule_name(rule_id),
            start: start as usize,
            end: end as usize,
        });

        let rule = self.rule_set.rule(rule_id);
        if rule.is_terminal() {
            match first_child {
                Some(cid) => {
                    self.height_growth(id, cid);
                    self.graft_back(id, cid);
                }
                // A terminal goal has no stacked context; match it directly.
                None => self.terminal_goal(rule_id, end),
            }
            return;
        }

        // Skip text at the frontier suspends every other growth direction
        // until the node has been extended past it.
        if self.skip_width_growth(id) {
            return;
        }

        let Some(rhs) = rule.rhs() else { return };
        if is_complete(rhs, next_item) {
            if let Some(cid) = self.graph.register_complete(self.rule_set, id) {
                self.handler.handle(GrowEvent::RuleCompleted {
                    rule: self.rule_set.rule_name(rule_id),
                    start: start as usize,
                    len: (end - start) as usize,
                });
                self.height_growth(id, cid);
                self.graft_back(id, cid);
            }
        }
        self.width_growth(id);
    }

    /// Degenerate parse whose goal is itself a terminal.
    fn terminal_goal(&mut self, rule_id: RuleId, end: u32) {
        let Some(leaf) = self
            .input
            .fetch_or_create_leaf(self.rule_set.rule(rule_id), end as usize)
        else {
            return;
        };
        self.graph.leaf_complete(&leaf);
        self.handler.handle(GrowEvent::LeafMatched {
            rule: self.rule_set.rule_name(rule_id),
            start: leaf.start,
            len: leaf.len,
        });
    }

    /// Try every skip terminal at the node's frontier. A non-empty match
    /// extends the node past the skipped text, keeping `next_item` untouched.
    /// Returns true if anything matched.
    fn skip_width_growth(&mut self, id: GrowingId) -> bool {
        let end = self.graph.growing(id).end;
        let mut matched = false;
        for &skip in self.rule_set.skip_terminals() {
            let leaf = self
                .input
                .fetch_or_create_leaf(self.rule_set.rule(skip), end as usize);
            // Zero-length skip matches would suspend the node forever.
            let Some(leaf) = leaf.filter(|leaf| leaf.len > 0) else {
                continue;
            };
            matched = true;
            self.handler.handle(GrowEvent::LeafMatched {
                rule: self.rule_set.rule_name(skip),
                start: leaf.start,
                len: leaf.len,
            });
            let end = leaf.end() as u32;
            let cid = self.graph.leaf_complete(&leaf);
            self.grow_next_child(id, skip, cid, true, end);
        }
        matched
    }

    /// Match the first terminals of everything the node expects next,
    /// stacking each matched leaf under it. Zero-minimum repetitions that
    /// have consumed nothing yet are additionally closed off by their empty
    /// terminal.
    fn width_growth(&mut self, id: GrowingId) {
        let gn = self.graph.growing(id);
        let rule_id = gn.rule;
        let next_item = gn.next_item;
        let end = gn.end;
        let Some(rhs) = self.rule_set.rule(rule_id).rhs() else {
            return;
        };

        let mut candidates = RuleIdList::new();
        for &expected in &expected_items(rhs, next_item) {
            for &terminal in self.rule_set.possible_first_terminals(expected) {
                if !candidates.contains(&terminal) {
                    candidates.push(terminal);
                }
            }
        }

        let close_empty = next_item == 0
            && matches!(
                rhs,
                RuleRhs::Multi { min: 0, .. } | RuleRhs::SeparatedList { min: 0, .. }
            );

        for terminal in candidates {
            let Some(leaf) = self
                .input
                .fetch_or_create_leaf(self.rule_set.rule(terminal), end as usize)
            else {
                continue;
            };
            self.handler.handle(GrowEvent::LeafMatched {
                rule: self.rule_set.rule_name(terminal),
                start: leaf.start,
                len: leaf.len,
            });
            let key = GrowingKey {
                rule: terminal,
                start: end,
                end: leaf.end() as u32,
                next_item: 0,
            };
            let cid = self.graph.leaf_complete(&leaf);
            let alt = ChildAlt {
                children: smallvec![cid],
                priority: 0,
            };
            let child = self.graph.find_or_create_growing(key, [alt], [id]);
            self.graph.add_stacked(id, child);
        }

        if close_empty {
            if let Some(empty) = self.rule_set.empty_rule_for(rule_id) {
                if let Some(leaf) = self
                    .input
                    .fetch_or_create_leaf(self.rule_set.rule(empty), end as usize)
                {
                    let cid = self.graph.leaf_complete(&leaf);
                    self.close_with_empty(id, cid);
                }
            }
        }
    }

    /// Extend a zero-minimum repetition node with its empty terminal,
    /// marking it complete with zero consumed items.
    fn close_with_empty(&mut self, id: GrowingId, cid: CompleteId) {
        let gn = self.graph.growing(id);
        let key = GrowingKey {
            rule: gn.rule,
            start: gn.start,
            end: gn.end,
            next_item: EMPTY_DONE,
        };
        let alts: SmallVec<[ChildAlt; 1]> = gn
            .alts
            .iter()
            .map(|alt| {
                let mut children = alt.children.clone();
                children.push(cid);
                ChildAlt {
                    children,
                    priority: alt.priority,
                }
            })
            .collect();
        let previous: SmallVec<[GrowingId; 4]> = gn.previous.clone();
        self.graph.find_or_create_growing(key, alts, previous);
    }

    /// Wrap the finished derivation `cid` of node `id` in every rule that may
    /// have it as a first child and is reachable from some stacked context
    /// (or from the goal, for nodes with no context).
    fn height_growth(&mut self, id: GrowingId, cid: CompleteId) {
        let gn = self.graph.growing(id);
        let child_rule = gn.rule;
        let start = gn.start;
        let end = gn.end;
        let previous: SmallVec<[GrowingId; 4]> = gn.previous.clone();
        let empty_of = match self.rule_set.rule(child_rule).as_terminal() {
            Some(terminal) => match terminal.matcher {
                Matcher::Empty { of } => Some(of),
                _ => None,
            },
            None => None,
        };

        for &super_rule in self.rule_set.possible_super_rules(child_rule) {
            if !self.has_potential(super_rule, &previous) {
                continue;
            }
            let next_item = if empty_of == Some(super_rule) {
                EMPTY_DONE
            } else {
                1
            };
            let priority = self.alternative_priority(super_rule, child_rule);
            let key = GrowingKey {
                rule: super_rule,
                start,
                end,
                next_item,
            };
            let alt = ChildAlt {
                children: smallvec![cid],
                priority,
            };
            self.graph
                .find_or_create_growing(key, [alt], previous.iter().copied());
        }
    }

    /// True if a derivation of `super_rule` starting here could still reach a
    /// stacked context. Nodes with no context belong to the goal's own spine;
    /// for those, any rule reachable from the goal qualifies.
    fn has_potential(&self, super_rule: RuleId, previous: &[GrowingId]) -> bool {
        if previous.is_empty() {
            let goal = self.graph.goal();
            return super_rule == goal
                || self.rule_set.possible_sub_rules(goal).contains(&super_rule);
        }
        previous.iter().any(|&prev| {
            let pn = self.graph.growing(prev);
            let Some(rhs) = self.rule_set.rule(pn.rule).rhs() else {
                return false;
            };
            expected_items(rhs, pn.next_item)
                .iter()
                .any(|&expected| self.rule_set.first_position(expected).contains(&super_rule))
        })
    }

    /// Hand the finished derivation `cid` back to every stacked context that
    /// expects this node's rule as its next item.
    fn graft_back(&mut self, id: GrowingId, cid: CompleteId) {
        let gn = self.graph.growing(id);
        let rule_id = gn.rule;
        let end = gn.end;
        let previous: SmallVec<[GrowingId; 4]> = gn.previous.clone();
        for prev in previous {
            let pn = self.graph.growing(prev);
            let Some(rhs) = self.rule_set.rule(pn.rule).rhs() else {
                continue;
            };
            if expected_items(rhs, pn.next_item).contains(&rule_id) {
                self.grow_next_child(prev, rule_id, cid, false, end);
            }
        }
    }

    /// Extend `parent` with one more child, producing (or merging into) the
    /// node one item further along. Skip children do not advance `next_item`.
    fn grow_next_child(
        &mut self,
        parent: GrowingId,
        child_rule: RuleId,
        cid: CompleteId,
        is_skip_child: bool,
        child_end: u32,
    ) {
        let pn = self.graph.growing(parent);
        let parent_end = pn.end;
        let next_item = if is_skip_child {
            pn.next_item
        } else {
            pn.next_item + 1
        };
        // The first real child of a choice fixes the alternative priority.
        let priority = (!is_skip_child && pn.next_item == 0)
            .then(|| self.alternative_priority(pn.rule, child_rule));
        let alts: SmallVec<[ChildAlt; 1]> = pn
            .alts
            .iter()
            .filter(|alt| {
                // Refuse to stack the same zero-length derivation twice in a
                // row; it would regrow forever without consuming input.
                !(child_end == parent_end && alt.children.last() == Some(&cid))
            })
            .map(|alt| {
                let mut children = alt.children.clone();
                children.push(cid);
                ChildAlt {
                    children,
                    priority: priority.unwrap_or(alt.priority),
                }
            })
            .collect();
        if alts.is_empty() {
            return;
        }
        let key = GrowingKey {
            rule: pn.rule,
            start: pn.start,
            end: child_end,
            next_item,
        };
        let previous: SmallVec<[GrowingId; 4]> = pn.previous.clone();
        self.graph.find_or_create_growing(key, alts, previous);
    }

    /// Declared alternative index of `child` within a choice parent; 0 for
    /// every other rule shape.
    fn alternative_priority(&self, parent: RuleId, child: RuleId) -> u32 {
        match self.rule_set.rule(parent).rhs() {
            Some(
                RuleRhs::Choice { alternatives } | RuleRhs::PriorityChoice { alternatives },
            ) => alternatives
                .iter()
                .position(|&alt| alt == child)
                .map_or(0, |index| index as u32),
            _ => 0,
        }
    }
}
