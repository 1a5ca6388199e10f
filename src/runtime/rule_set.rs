//! Compiled rule set and reachability tables
//!
//! [`RuleSet::compile`] flattens a list of [`GrammarRule`] declarations into
//! numbered [`RuntimeRule`]s and precomputes the lookup tables the growth
//! engine consults on every step: possible first terminals, reachable
//! sub-rules, direct super-rules, skip terminals, and per-rule empty
//! terminals. All queries after construction are pure slice lookups.

use super::builder::{GrammarRule, RuleBody, RuleExpr, TerminalDecl};
use super::rule::{Matcher, RuleId, RuleIdList, RuleKind, RuleRhs, RuntimeRule, Terminal};
use crate::error::GrammarError;
use hashbrown::{HashMap, HashSet};
use lasso::{Rodeo, Spur};
use regex::Regex;

/// A compiled, immutable grammar.
///
/// Built once via [`RuleSet::compile`]; shared read-only across any number of
/// parses. Never mutated during parsing.
pub struct RuleSet {
    rules: Vec<RuntimeRule>,
    names: Rodeo,
    by_name: HashMap<Spur, RuleId, ahash::RandomState>,
    first_terminals: Vec<Box<[RuleId]>>,
    first_position: Vec<Box<[RuleId]>>,
    sub_rules: Vec<Box<[RuleId]>>,
    super_rules: Vec<Box<[RuleId]>>,
    skip_terminals: Box<[RuleId]>,
    empty_rules: HashMap<RuleId, RuleId, ahash::RandomState>,
}

impl RuleSet {
    /// Compile grammar declarations into a rule set.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::RuleNotFound`] for an unresolved reference,
    /// [`GrammarError::DuplicateRule`] for a name declared twice, and
    /// [`GrammarError::InvalidPattern`] for a pattern that fails to compile.
    pub fn compile(rules: Vec<GrammarRule>) -> Result<Self, GrammarError> {
        let mut compiler = Compiler::default();

        // Register all declared names first so references resolve regardless
        // of declaration order.
        let mut declared = Vec::with_capacity(rules.len());
        for decl in &rules {
            let id = compiler.declare(&decl.name)?;
            declared.push(id);
        }

        for (decl, id) in rules.iter().zip(declared) {
            let kind = match &decl.body {
                RuleBody::Terminal { matcher, is_skip } => RuleKind::Terminal(Terminal {
                    matcher: compiler.lower_matcher(&decl.name, matcher)?,
                    is_skip: *is_skip,
                }),
                RuleBody::NonTerminal(expr) => {
                    RuleKind::NonTerminal(compiler.lower_body(id, expr)?)
                }
            };
            compiler.kinds[id.index()] = Some(kind);
        }

        compiler.finish()
    }

    /// Look up a rule id by declared name.
    #[must_use]
    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        let key = self.names.get(name)?;
        self.by_name.get(&key).copied()
    }

    /// The rule for an id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this rule set.
    #[must_use]
    pub fn rule(&self, id: RuleId) -> &RuntimeRule {
        &self.rules[id.index()]
    }

    /// The declared (or synthetic) name of a rule.
    #[must_use]
    pub fn rule_name(&self, id: RuleId) -> &str {
        self.names.resolve(&self.rules[id.index()].name)
    }

    /// Number of compiled rules, synthetic rules included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True if the rule set holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All compiled rules.
    pub fn rules(&self) -> impl Iterator<Item = &RuntimeRule> {
        self.rules.iter()
    }

    /// Terminals that can start a derivation of `rule`, empty terminals of
    /// zero-minimum repetitions included. Sorted by rule id.
    #[must_use]
    pub fn possible_first_terminals(&self, rule: RuleId) -> &[RuleId] {
        &self.first_terminals[rule.index()]
    }

    /// Rules reachable leftmost from `rule`, `rule` itself included.
    #[must_use]
    pub(crate) fn first_position(&self, rule: RuleId) -> &[RuleId] {
        &self.first_position[rule.index()]
    }

    /// Rules reachable anywhere in a derivation of `rule`, `rule` included.
    #[must_use]
    pub fn possible_sub_rules(&self, rule: RuleId) -> &[RuleId] {
        &self.sub_rules[rule.index()]
    }

    /// Rules that can have `rule` as their first child.
    #[must_use]
    pub fn possible_super_rules(&self, rule: RuleId) -> &[RuleId] {
        &self.super_rules[rule.index()]
    }

    /// True if `rule` is a skip terminal.
    #[must_use]
    pub fn is_skip_terminal(&self, rule: RuleId) -> bool {
        self.rules[rule.index()].is_skip()
    }

    /// All skip terminals, sorted by rule id.
    #[must_use]
    pub fn skip_terminals(&self) -> &[RuleId] {
        &self.skip_terminals
    }

    /// The synthetic empty terminal of `rule`, if one was compiled for it.
    #[must_use]
    pub fn empty_rule_for(&self, rule: RuleId) -> Option<RuleId> {
        self.empty_rules.get(&rule).copied()
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.rules.len())
            .field("skip_terminals", &self.skip_terminals.len())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Compiler {
    names: Rodeo,
    kinds: Vec<Option<RuleKind>>,
    rule_names: Vec<Spur>,
    by_name: HashMap<Spur, RuleId, ahash::RandomState>,
    implicit_terminals: HashMap<(bool, String), RuleId, ahash::RandomState>,
    empty_rules: HashMap<RuleId, RuleId, ahash::RandomState>,
}

impl Compiler {
    fn declare(&mut self, name: &str) -> Result<RuleId, GrammarError> {
        let key = self.names.get_or_intern(name);
        if self.by_name.contains_key(&key) {
            return Err(GrammarError::DuplicateRule(name.to_string()));
        }
        let id = self.alloc(key);
        self.by_name.insert(key, id);
        Ok(id)
    }

    fn alloc(&mut self, name: Spur) -> RuleId {
        let id = RuleId::new(self.kinds.len());
        self.kinds.push(None);
        self.rule_names.push(name);
        id
    }

    fn resolve(&self, name: &str) -> Result<RuleId, GrammarError> {
        self.names
            .get(name)
            .and_then(|key| self.by_name.get(&key).copied())
            .ok_or_else(|| GrammarError::RuleNotFound(name.to_string()))
    }

    fn lower_matcher(
        &self,
        name: &str,
        decl: &TerminalDecl,
    ) -> Result<Matcher, GrammarError> {
        match decl {
            TerminalDecl::Literal(text) => Ok(Matcher::Literal(text.as_str().into())),
            TerminalDecl::Pattern(pattern) => {
                let anchored = format!("^(?:{pattern})");
                let regex = Regex::new(&anchored).map_err(|e| GrammarError::InvalidPattern {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
                Ok(Matcher::Pattern(regex))
            }
        }
    }

    /// Lower a rule body. Single-item bodies become one-item concatenations so
    /// every non-terminal has a uniform composite right-hand side.
    fn lower_body(&mut self, owner: RuleId, expr: &RuleExpr) -> Result<RuleRhs, GrammarError> {
        match expr {
            RuleExpr::Choice(alternatives) => Ok(RuleRhs::Choice {
                alternatives: self.lower_items(owner, alternatives)?,
            }),
            RuleExpr::PriorityChoice(alternatives) => Ok(RuleRhs::PriorityChoice {
                alternatives: self.lower_items(owner, alternatives)?,
            }),
            RuleExpr::Concat(items) => Ok(RuleRhs::Concatenation {
                items: self.lower_items(owner, items)?,
            }),
            RuleExpr::Multi { min, max, item } => {
                let item = self.lower_item(owner, item)?;
                if *min == 0 {
                    self.ensure_empty_rule(owner);
                }
                Ok(RuleRhs::Multi {
                    min: *min,
                    max: *max,
                    item,
                })
            }
            RuleExpr::SeparatedList {
                min,
                max,
                separator,
                item,
            } => {
                let separator = self.lower_item(owner, separator)?;
                let item = self.lower_item(owner, item)?;
                if *min == 0 {
                    self.ensure_empty_rule(owner);
                }
                Ok(RuleRhs::SeparatedList {
                    min: *min,
                    max: *max,
                    separator,
                    item,
                })
            }
            single => Ok(RuleRhs::Concatenation {
                items: RuleIdList::from_iter([self.lower_item(owner, single)?]),
            }),
        }
    }

    fn lower_items(
        &mut self,
        owner: RuleId,
        items: &[RuleExpr],
    ) -> Result<RuleIdList, GrammarError> {
        items
            .iter()
            .map(|item| self.lower_item(owner, item))
            .collect()
    }

    /// Lower one item position to a rule id, creating synthetic rules for
    /// nested composites and implicit terminals for inline literals/patterns.
    fn lower_item(&mut self, owner: RuleId, expr: &RuleExpr) -> Result<RuleId, GrammarError> {
        match expr {
            RuleExpr::Ref(name) => self.resolve(name),
            RuleExpr::Literal(text) => Ok(self.implicit_terminal(false, text)),
            RuleExpr::Pattern(pattern) => {
                let key = (true, pattern.clone());
                if let Some(&id) = self.implicit_terminals.get(&key) {
                    return Ok(id);
                }
                let display = format!("\"{pattern}\"");
                let matcher =
                    self.lower_matcher(&display, &TerminalDecl::Pattern(pattern.clone()))?;
                let name = self.names.get_or_intern(&display);
                let id = self.alloc(name);
                self.kinds[id.index()] = Some(RuleKind::Terminal(Terminal {
                    matcher,
                    is_skip: false,
                }));
                self.implicit_terminals.insert(key, id);
                Ok(id)
            }
            RuleExpr::Empty => Ok(self.ensure_empty_rule(owner)),
            nested => {
                let display = format!("{}\u{a7}{}", self.display_name(owner), self.kinds.len());
                let name = self.names.get_or_intern(&display);
                let id = self.alloc(name);
                let rhs = self.lower_body(id, nested)?;
                self.kinds[id.index()] = Some(RuleKind::NonTerminal(rhs));
                Ok(id)
            }
        }
    }

    fn implicit_terminal(&mut self, is_pattern: bool, text: &str) -> RuleId {
        let key = (is_pattern, text.to_string());
        if let Some(&id) = self.implicit_terminals.get(&key) {
            return id;
        }
        let name = self.names.get_or_intern(format!("'{text}'"));
        let id = self.alloc(name);
        self.kinds[id.index()] = Some(RuleKind::Terminal(Terminal {
            matcher: Matcher::Literal(text.into()),
            is_skip: false,
        }));
        self.implicit_terminals.insert(key, id);
        id
    }

    fn ensure_empty_rule(&mut self, of: RuleId) -> RuleId {
        if let Some(&id) = self.empty_rules.get(&of) {
            return id;
        }
        let display = format!("{}\u{a7}empty", self.display_name(of));
        let name = self.names.get_or_intern(&display);
        let id = self.alloc(name);
        self.kinds[id.index()] = Some(RuleKind::Terminal(Terminal {
            matcher: Matcher::Empty { of },
            is_skip: false,
        }));
        self.empty_rules.insert(of, id);
        id
    }

    fn display_name(&self, id: RuleId) -> String {
        self.names.resolve(&self.rule_names[id.index()]).to_string()
    }

    fn finish(self) -> Result<RuleSet, GrammarError> {
        let rules: Vec<RuntimeRule> = self
            .kinds
            .into_iter()
            .enumerate()
            .map(|(index, kind)| RuntimeRule {
                id: RuleId::new(index),
                name: self.rule_names[index],
                // Every allocated slot is filled before finish() runs.
                kind: kind.expect("rule body lowered"),
            })
            .collect();

        let direct_first = direct_relation(&rules, &self.empty_rules, true);
        let direct_children = direct_relation(&rules, &self.empty_rules, false);

        let first_position = reachability_closure(&direct_first);
        let sub_rules = reachability_closure(&direct_children);

        let first_terminals = first_position
            .iter()
            .map(|reachable| {
                reachable
                    .iter()
                    .copied()
                    .filter(|id| rules[id.index()].is_terminal())
                    .collect::<Box<[RuleId]>>()
            })
            .collect();

        let mut super_rules: Vec<Vec<RuleId>> = vec![Vec::new(); rules.len()];
        for (index, firsts) in direct_first.iter().enumerate() {
            for child in firsts {
                super_rules[child.index()].push(RuleId::new(index));
            }
        }
        let super_rules = super_rules
            .into_iter()
            .map(|mut supers| {
                supers.sort_unstable();
                supers.dedup();
                supers.into_boxed_slice()
            })
            .collect();

        let mut skip_terminals: Vec<RuleId> = rules
            .iter()
            .filter(|rule| rule.is_skip())
            .map(RuntimeRule::id)
            .collect();
        skip_terminals.sort_unstable();

        Ok(RuleSet {
            rules,
            names: self.names,
            by_name: self.by_name,
            first_terminals,
            first_position,
            sub_rules,
            super_rules,
            skip_terminals: skip_terminals.into_boxed_slice(),
            empty_rules: self.empty_rules,
        })
    }
}

/// Direct child relation per rule: first-position children only when
/// `first_only`, otherwise every child position (separator included). The
/// empty terminal of a zero-minimum repetition counts as a first child.
fn direct_relation(
    rules: &[RuntimeRule],
    empty_rules: &HashMap<RuleId, RuleId, ahash::RandomState>,
    first_only: bool,
) -> Vec<RuleIdList> {
    rules
        .iter()
        .map(|rule| {
            let mut children = RuleIdList::new();
            if let RuleKind::NonTerminal(rhs) = &rule.kind {
                match rhs {
                    RuleRhs::Choice { alternatives } | RuleRhs::PriorityChoice { alternatives } => {
                        children.extend(alternatives.iter().copied());
                    }
                    RuleRhs::Concatenation { items } => {
                        if first_only {
                            children.extend(items.first().copied());
                        } else {
                            children.extend(items.iter().copied());
                        }
                    }
                    RuleRhs::Multi { item, .. } => {
                        children.push(*item);
                        children.extend(empty_rules.get(&rule.id).copied());
                    }
                    RuleRhs::SeparatedList {
                        separator, item, ..
                    } => {
                        children.push(*item);
                        if !first_only {
                            children.push(*separator);
                        }
                        children.extend(empty_rules.get(&rule.id).copied());
                    }
                }
            }
            children
        })
        .collect()
}

/// Reflexive-transitive closure of a direct relation, one sorted slice per rule.
fn reachability_closure(direct: &[RuleIdList]) -> Vec<Box<[RuleId]>> {
    (0..direct.len())
        .map(|start| {
            let mut seen: HashSet<RuleId, ahash::RandomState> = HashSet::default();
            let mut stack = vec![RuleId::new(start)];
            while let Some(id) = stack.pop() {
                if seen.insert(id) {
                    stack.extend(direct[id.index()].iter().copied());
                }
            }
            let mut reachable: Vec<RuleId> = seen.into_iter().collect();
            reachable.sort_unstable();
            reachable.into_boxed_slice()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_grammar() -> Vec<GrammarRule> {
        vec![
            GrammarRule::rule(
                "list",
                RuleExpr::separated_list(1, None, RuleExpr::literal(","), RuleExpr::reference("a")),
            ),
            GrammarRule::literal("a", "a"),
            GrammarRule::skip_pattern("WS", r"\s+"),
        ]
    }

    #[test]
    fn compile_resolves_references() {
        let rule_set = RuleSet::compile(list_grammar()).unwrap();
        let list = rule_set.rule_id("list").unwrap();
        let a = rule_set.rule_id("a").unwrap();
        assert!(rule_set.possible_sub_rules(list).contains(&a));
        assert!(rule_set.possible_super_rules(a).contains(&list));
    }

    #[test]
    fn unresolved_reference_fails() {
        let rules = vec![GrammarRule::rule("top", RuleExpr::reference("missing"))];
        match RuleSet::compile(rules) {
            Err(GrammarError::RuleNotFound(name)) => assert_eq!(name, "missing"),
            other => panic!("expected RuleNotFound, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_declaration_fails() {
        let rules = vec![
            GrammarRule::literal("a", "a"),
            GrammarRule::literal("a", "b"),
        ];
        assert!(matches!(
            RuleSet::compile(rules),
            Err(GrammarError::DuplicateRule(_))
        ));
    }

    #[test]
    fn invalid_pattern_fails() {
        let rules = vec![GrammarRule::pattern("bad", "(unclosed")];
        assert!(matches!(
            RuleSet::compile(rules),
            Err(GrammarError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn skip_terminals_are_collected() {
        let rule_set = RuleSet::compile(list_grammar()).unwrap();
        let ws = rule_set.rule_id("WS").unwrap();
        assert_eq!(rule_set.skip_terminals(), &[ws]);
        assert!(rule_set.is_skip_terminal(ws));
        assert!(!rule_set.is_skip_terminal(rule_set.rule_id("a").unwrap()));
    }

    #[test]
    fn first_terminals_of_list_is_item_terminal() {
        let rule_set = RuleSet::compile(list_grammar()).unwrap();
        let list = rule_set.rule_id("list").unwrap();
        let a = rule_set.rule_id("a").unwrap();
        assert_eq!(rule_set.possible_first_terminals(list), &[a]);
    }

    #[test]
    fn zero_minimum_repetition_gets_empty_rule() {
        let rules = vec![
            GrammarRule::rule(
                "maybe",
                RuleExpr::multi(0, Some(1), RuleExpr::reference("b")),
            ),
            GrammarRule::literal("b", "b"),
        ];
        let rule_set = RuleSet::compile(rules).unwrap();
        let maybe = rule_set.rule_id("maybe").unwrap();
        let empty = rule_set.empty_rule_for(maybe).expect("empty rule");
        assert!(rule_set.rule(empty).is_empty_terminal());
        assert!(rule_set.possible_first_terminals(maybe).contains(&empty));
    }

    #[test]
    fn nested_composites_become_synthetic_rules() {
        let rules = vec![
            GrammarRule::rule(
                "pair",
                RuleExpr::choice([
                    RuleExpr::concat([RuleExpr::reference("a"), RuleExpr::reference("a")]),
                    RuleExpr::reference("a"),
                ]),
            ),
            GrammarRule::literal("a", "a"),
        ];
        let rule_set = RuleSet::compile(rules).unwrap();
        // pair, a, plus one synthetic concatenation rule
        assert_eq!(rule_set.len(), 3);
        let pair = rule_set.rule_id("pair").unwrap();
        let Some(RuleRhs::Choice { alternatives }) = rule_set.rule(pair).rhs() else {
            panic!("expected choice rhs");
        };
        assert_eq!(alternatives.len(), 2);
    }
}
