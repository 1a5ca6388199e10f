//! # Input Module
//!
//! Source text ownership and the terminal ("leaf") recognizer.
//!
//! ## Overview
//!
//! Parsing is scannerless: there is no token stream. Instead the growth
//! engine asks [`Input::fetch_or_create_leaf`] whether a given terminal rule
//! matches at a given byte position. Results, failures included, are
//! memoized by `(terminal, position)` so the engine can re-ask freely while
//! exploring alternative derivations without re-scanning text. Empty
//! terminals yield a zero-length leaf exactly once per position; the cache
//! makes every later request return the same leaf, which keeps zero-length
//! rules from growing without bound at one position.
//!
//! All caches live on the [`Input`] value itself; one `Input` belongs to one
//! parse invocation and is discarded with it.

pub mod line_col;

pub use line_col::{LineCol, LineIndex};

use crate::runtime::{Matcher, RuleId, RuleKind, RuntimeRule};
use compact_str::CompactString;
use hashbrown::HashMap;

/// A terminal match: which rule matched, where, and what text it covered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Leaf {
    /// The terminal rule that matched.
    pub rule: RuleId,
    /// Byte position of the match start.
    pub start: usize,
    /// Matched length in bytes; 0 for empty terminals.
    pub len: usize,
    /// The matched text.
    pub text: CompactString,
    /// True if the terminal is a pattern (as opposed to a literal).
    pub is_pattern: bool,
    /// True if the terminal is a skip rule.
    pub is_skip: bool,
}

impl Leaf {
    /// Byte position one past the match.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.len
    }
}

/// The source text plus the position-keyed leaf memo.
pub struct Input<'t> {
    text: &'t str,
    memo: HashMap<(RuleId, usize), Option<Leaf>, ahash::RandomState>,
    attempts: usize,
    cache_hits: usize,
}

impl<'t> Input<'t> {
    /// Wrap a source text for one parse invocation.
    #[must_use]
    pub fn new(text: &'t str) -> Self {
        Self {
            text,
            memo: HashMap::default(),
            attempts: 0,
            cache_hits: 0,
        }
    }

    /// The full source text.
    #[must_use]
    pub const fn text(&self) -> &'t str {
        self.text
    }

    /// Source length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.text.len()
    }

    /// True if the source text is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// True if `pos` is the start of input.
    #[must_use]
    pub const fn is_start(&self, pos: usize) -> bool {
        pos == 0
    }

    /// True if `pos` is at or past the end of input.
    #[must_use]
    pub const fn is_end(&self, pos: usize) -> bool {
        pos >= self.text.len()
    }

    /// Number of leaf match attempts that hit the memo.
    #[must_use]
    pub const fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    /// Number of leaf match attempts overall.
    #[must_use]
    pub const fn attempts(&self) -> usize {
        self.attempts
    }

    /// Try to match `rule` at byte position `pos`.
    ///
    /// Returns the (possibly cached) leaf on success, `None` when the
    /// terminal does not match there. Both outcomes are memoized.
    pub fn fetch_or_create_leaf(&mut self, rule: &RuntimeRule, pos: usize) -> Option<Leaf> {
        let key = (rule.id(), pos);
        self.attempts += 1;
        if let Some(cached) = self.memo.get(&key) {
            self.cache_hits += 1;
            return cached.clone();
        }
        let leaf = self.attempt(rule, pos);
        self.memo.insert(key, leaf.clone());
        leaf
    }

    fn attempt(&self, rule: &RuntimeRule, pos: usize) -> Option<Leaf> {
        let RuleKind::Terminal(terminal) = rule.kind() else {
            return None;
        };
        if pos > self.text.len() {
            return None;
        }
        let rest = &self.text[pos..];
        let len = match &terminal.matcher {
            Matcher::Empty { .. } => 0,
            Matcher::Literal(literal) => {
                if rest.starts_with(literal.as_str()) {
                    literal.len()
                } else {
                    return None;
                }
            }
            Matcher::Pattern(regex) => regex.find(rest)?.end(),
        };
        Some(Leaf {
            rule: rule.id(),
            start: pos,
            len,
            text: rest[..len].into(),
            is_pattern: terminal.matcher.is_pattern(),
            is_skip: terminal.is_skip,
        })
    }
}
