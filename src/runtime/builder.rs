//! Grammar rule declarations
//!
//! The input model consumed by [`RuleSet::compile`](super::RuleSet::compile).
//! A [`GrammarRule`] names either a terminal (literal or pattern, optionally a
//! skip rule) or a non-terminal whose body is a [`RuleExpr`] tree. Nested
//! composite expressions are flattened into synthetic runtime rules during
//! compilation, so the declaration side stays free of rule-numbering concerns.

/// Body expression of a non-terminal declaration.
#[derive(Debug, Clone)]
pub enum RuleExpr {
    /// Reference to another declared rule by name.
    Ref(String),
    /// Inline literal terminal.
    Literal(String),
    /// Inline pattern terminal (anchored regex).
    Pattern(String),
    /// The empty derivation.
    Empty,
    /// Unordered alternatives.
    Choice(Vec<RuleExpr>),
    /// Ranked alternatives, declaration order = priority order.
    PriorityChoice(Vec<RuleExpr>),
    /// Sequence of items.
    Concat(Vec<RuleExpr>),
    /// Bounded repetition.
    Multi {
        /// Minimum occurrences.
        min: usize,
        /// Maximum occurrences; `None` is unbounded.
        max: Option<usize>,
        /// Repeated item.
        item: Box<RuleExpr>,
    },
    /// Separator-delimited list ending on an item.
    SeparatedList {
        /// Minimum items.
        min: usize,
        /// Maximum items; `None` is unbounded.
        max: Option<usize>,
        /// Separator expression.
        separator: Box<RuleExpr>,
        /// Item expression.
        item: Box<RuleExpr>,
    },
}

impl RuleExpr {
    /// Reference a declared rule by name.
    #[must_use]
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Ref(name.into())
    }

    /// Inline literal terminal.
    #[must_use]
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    /// Inline pattern terminal.
    #[must_use]
    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern(pattern.into())
    }

    /// Choice over alternatives.
    #[must_use]
    pub fn choice(alternatives: impl IntoIterator<Item = Self>) -> Self {
        Self::Choice(alternatives.into_iter().collect())
    }

    /// Priority choice over alternatives (first = highest priority).
    #[must_use]
    pub fn priority_choice(alternatives: impl IntoIterator<Item = Self>) -> Self {
        Self::PriorityChoice(alternatives.into_iter().collect())
    }

    /// Concatenation of items.
    #[must_use]
    pub fn concat(items: impl IntoIterator<Item = Self>) -> Self {
        Self::Concat(items.into_iter().collect())
    }

    /// Repetition of `item`, `min..=max` times (`None` = unbounded).
    #[must_use]
    pub fn multi(min: usize, max: Option<usize>, item: Self) -> Self {
        Self::Multi {
            min,
            max,
            item: Box::new(item),
        }
    }

    /// Separated list of `item` delimited by `separator`.
    #[must_use]
    pub fn separated_list(min: usize, max: Option<usize>, separator: Self, item: Self) -> Self {
        Self::SeparatedList {
            min,
            max,
            separator: Box::new(separator),
            item: Box::new(item),
        }
    }
}

/// How a declared terminal matches text.
#[derive(Debug, Clone)]
pub(crate) enum TerminalDecl {
    Literal(String),
    Pattern(String),
}

/// Declared body of a rule.
#[derive(Debug, Clone)]
pub(crate) enum RuleBody {
    Terminal {
        matcher: TerminalDecl,
        is_skip: bool,
    },
    NonTerminal(RuleExpr),
}

/// One named grammar rule handed to [`RuleSet::compile`](super::RuleSet::compile).
#[derive(Debug, Clone)]
pub struct GrammarRule {
    pub(crate) name: String,
    pub(crate) body: RuleBody,
}

impl GrammarRule {
    /// Declare a non-terminal rule.
    #[must_use]
    pub fn rule(name: impl Into<String>, body: RuleExpr) -> Self {
        Self {
            name: name.into(),
            body: RuleBody::NonTerminal(body),
        }
    }

    /// Declare a literal terminal.
    #[must_use]
    pub fn literal(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: RuleBody::Terminal {
                matcher: TerminalDecl::Literal(text.into()),
                is_skip: false,
            },
        }
    }

    /// Declare a pattern terminal.
    #[must_use]
    pub fn pattern(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: RuleBody::Terminal {
                matcher: TerminalDecl::Pattern(pattern.into()),
                is_skip: false,
            },
        }
    }

    /// Declare a literal skip terminal.
    #[must_use]
    pub fn skip_literal(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut decl = Self::literal(name, text);
        if let RuleBody::Terminal { is_skip, .. } = &mut decl.body {
            *is_skip = true;
        }
        decl
    }

    /// Declare a pattern skip terminal.
    #[must_use]
    pub fn skip_pattern(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        let mut decl = Self::pattern(name, pattern);
        if let RuleBody::Terminal { is_skip, .. } = &mut decl.body {
            *is_skip = true;
        }
        decl
    }

    /// The declared rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
