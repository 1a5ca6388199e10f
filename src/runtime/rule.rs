//! Compiled runtime rule representation
//!
//! A [`RuntimeRule`] is either a terminal (literal, pattern, or synthetic
//! empty match) or a non-terminal whose right-hand side is a [`RuleRhs`].
//! Rules reference each other exclusively by [`RuleId`] so the compiled set
//! is a flat, immutable array shared read-only across parses.

use compact_str::CompactString;
use lasso::Spur;
use regex::Regex;
use smallvec::SmallVec;

/// Index of a rule inside its [`RuleSet`](super::RuleSet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleId(pub(crate) u32);

impl RuleId {
    /// Position of the rule in the rule-set array.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u32)
    }
}

/// Child-rule list stored inline for the common small case.
pub(crate) type RuleIdList = SmallVec<[RuleId; 4]>;

/// How a terminal rule matches text at a position.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact text match.
    Literal(CompactString),
    /// Anchored regular-expression match.
    Pattern(Regex),
    /// Zero-length match standing in for the empty derivation of `of`.
    Empty {
        /// The rule whose empty derivation this terminal represents.
        of: RuleId,
    },
}

impl Matcher {
    /// True for pattern terminals (used by leaf reporting).
    #[must_use]
    pub const fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }
}

/// A terminal rule: a matcher plus the skip flag.
#[derive(Debug, Clone)]
pub struct Terminal {
    /// How the terminal recognizes text.
    pub matcher: Matcher,
    /// Skip terminals (whitespace, comments) may be interleaved anywhere.
    pub is_skip: bool,
}

/// Right-hand side of a non-terminal rule.
///
/// One tagged union instead of an item-class hierarchy; the growth engine
/// drives completion and next-item decisions off a single exhaustive `match`.
#[derive(Debug, Clone)]
pub enum RuleRhs {
    /// Unordered alternatives; ambiguity between them is preserved.
    Choice {
        /// Candidate rules, any one of which derives this rule.
        alternatives: RuleIdList,
    },
    /// Ranked alternatives; on identical span the highest-priority
    /// (lowest-index) alternative wins.
    PriorityChoice {
        /// Candidate rules in declaration order; index 0 is highest priority.
        alternatives: RuleIdList,
    },
    /// Fixed sequence of items.
    Concatenation {
        /// Items in order.
        items: RuleIdList,
    },
    /// Bounded repetition of one item.
    Multi {
        /// Minimum number of occurrences.
        min: usize,
        /// Maximum number of occurrences; `None` means unbounded.
        max: Option<usize>,
        /// The repeated item.
        item: RuleId,
    },
    /// Items alternating with a separator, ending on an item.
    SeparatedList {
        /// Minimum number of items.
        min: usize,
        /// Maximum number of items; `None` means unbounded.
        max: Option<usize>,
        /// The separator rule.
        separator: RuleId,
        /// The item rule.
        item: RuleId,
    },
}

/// Discriminates terminals from non-terminals.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// Leaf rule matched directly against input text.
    Terminal(Terminal),
    /// Composite rule derived from child rules.
    NonTerminal(RuleRhs),
}

/// A single compiled rule.
#[derive(Debug, Clone)]
pub struct RuntimeRule {
    pub(crate) id: RuleId,
    pub(crate) name: Spur,
    pub(crate) kind: RuleKind,
}

impl RuntimeRule {
    /// This rule's id.
    #[must_use]
    pub const fn id(&self) -> RuleId {
        self.id
    }

    /// The rule kind (terminal or non-terminal).
    #[must_use]
    pub const fn kind(&self) -> &RuleKind {
        &self.kind
    }

    /// True if this rule is a terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.kind, RuleKind::Terminal(_))
    }

    /// The terminal payload, if this rule is a terminal.
    #[must_use]
    pub const fn as_terminal(&self) -> Option<&Terminal> {
        match &self.kind {
            RuleKind::Terminal(terminal) => Some(terminal),
            RuleKind::NonTerminal(_) => None,
        }
    }

    /// The right-hand side, if this rule is a non-terminal.
    #[must_use]
    pub const fn rhs(&self) -> Option<&RuleRhs> {
        match &self.kind {
            RuleKind::NonTerminal(rhs) => Some(rhs),
            RuleKind::Terminal(_) => None,
        }
    }

    /// True if this rule is a skip terminal.
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        match &self.kind {
            RuleKind::Terminal(terminal) => terminal.is_skip,
            RuleKind::NonTerminal(_) => false,
        }
    }

    /// True if this rule is a synthetic empty terminal.
    #[must_use]
    pub const fn is_empty_terminal(&self) -> bool {
        matches!(
            &self.kind,
            RuleKind::Terminal(Terminal {
                matcher: Matcher::Empty { .. },
                ..
            })
        )
    }
}
