//! End-to-end parsing behavior over small grammars.

use std::ops::ControlFlow;
use sylva::sppf::{SpptLeaf, SpptVisitor};
use sylva::{parse, GrammarRule, ParseError, RuleExpr, RuleSet};

fn compile(rules: Vec<GrammarRule>) -> RuleSet {
    RuleSet::compile(rules).expect("grammar compiles")
}

fn repeated_a_grammar() -> RuleSet {
    compile(vec![
        GrammarRule::rule("as", RuleExpr::multi(1, None, RuleExpr::reference("a"))),
        GrammarRule::literal("a", "a"),
        GrammarRule::skip_pattern("WS", r"\s+"),
    ])
}

/// Collects every leaf span along first alternatives.
struct LeafSpans(Vec<(usize, usize)>);

impl SpptVisitor for LeafSpans {
    fn visit_leaf(&mut self, leaf: &SpptLeaf) -> ControlFlow<()> {
        self.0.push((leaf.start, leaf.len));
        ControlFlow::Continue(())
    }
}

#[test]
fn skip_terminals_do_not_change_structure() {
    let rule_set = repeated_a_grammar();
    let goal = rule_set.rule_id("as").unwrap();
    let plain = parse(&rule_set, goal, "aaa").unwrap();
    let spaced = parse(&rule_set, goal, "a a a").unwrap();
    // Bracket rendering hides skip leaves, so the structures must agree.
    assert_eq!(plain.to_bracket_string(), spaced.to_bracket_string());
    assert_eq!(spaced.to_flat_string(), "a a a");
}

#[test]
fn leading_and_trailing_skip_text_is_covered() {
    let rule_set = repeated_a_grammar();
    let goal = rule_set.rule_id("as").unwrap();
    for text in ["  a", "a  ", "  a a  "] {
        let tree = parse(&rule_set, goal, text).unwrap();
        assert_eq!(tree.root().start(), 0);
        assert_eq!(tree.root().end(), text.len());
        assert_eq!(tree.to_flat_string(), text);
    }
}

#[test]
fn leaves_cover_the_input_contiguously() {
    let rule_set = repeated_a_grammar();
    let goal = rule_set.rule_id("as").unwrap();
    let text = " a a  a ";
    let tree = parse(&rule_set, goal, text).unwrap();
    let mut spans = LeafSpans(Vec::new());
    let _ = tree.root().accept(&mut spans);
    let mut position = 0;
    for (start, len) in spans.0 {
        assert_eq!(start, position);
        position += len;
    }
    assert_eq!(position, text.len());
}

#[test]
fn left_recursion_nests_leftward() {
    let rule_set = compile(vec![
        GrammarRule::rule(
            "as",
            RuleExpr::choice([
                RuleExpr::concat([RuleExpr::reference("as"), RuleExpr::reference("a")]),
                RuleExpr::reference("a"),
            ]),
        ),
        GrammarRule::literal("a", "a"),
    ]);
    let goal = rule_set.rule_id("as").unwrap();
    let tree = parse(&rule_set, goal, "aaa").unwrap();
    assert_eq!(tree.to_flat_string(), "aaa");

    // Three nested `as` derivations, growing toward the left.
    let mut depth = 0;
    let mut node = tree.root().clone();
    loop {
        let Some(branch) = node.as_branch() else { break };
        if branch.name == "as" {
            depth += 1;
        }
        let Some(first) = branch.children().first().cloned() else {
            break;
        };
        node = first;
    }
    assert_eq!(depth, 3);
}

#[test]
fn right_recursion_nests_rightward() {
    let rule_set = compile(vec![
        GrammarRule::rule(
            "as",
            RuleExpr::choice([
                RuleExpr::concat([RuleExpr::reference("a"), RuleExpr::reference("as")]),
                RuleExpr::reference("a"),
            ]),
        ),
        GrammarRule::literal("a", "a"),
    ]);
    let goal = rule_set.rule_id("as").unwrap();
    let tree = parse(&rule_set, goal, "aaa").unwrap();
    assert_eq!(tree.to_flat_string(), "aaa");

    let mut depth = 0;
    let mut node = tree.root().clone();
    loop {
        let Some(branch) = node.as_branch() else { break };
        if branch.name == "as" {
            depth += 1;
        }
        let Some(last) = branch.children().last().cloned() else {
            break;
        };
        node = last;
    }
    assert_eq!(depth, 3);
}

#[test]
fn failure_reports_location_and_best_partial() {
    let rule_set = compile(vec![
        GrammarRule::rule(
            "ab01",
            RuleExpr::concat([
                RuleExpr::reference("a"),
                RuleExpr::multi(0, Some(1), RuleExpr::reference("b")),
            ]),
        ),
        GrammarRule::literal("a", "a"),
        GrammarRule::literal("b", "b"),
    ]);
    let goal = rule_set.rule_id("ab01").unwrap();
    let error = parse(&rule_set, goal, "aa").unwrap_err();
    assert_eq!(error.location(), Some((1, 2)));
    let partial = error.partial().expect("partial tree");
    assert_eq!(partial.to_flat_string(), "a");
}

#[test]
fn failure_location_counts_lines() {
    let rule_set = compile(vec![
        GrammarRule::rule("bs", RuleExpr::multi(1, None, RuleExpr::reference("b"))),
        GrammarRule::literal("b", "b"),
        GrammarRule::skip_pattern("WS", r"\s+"),
    ]);
    let goal = rule_set.rule_id("bs").unwrap();
    let error = parse(&rule_set, goal, "b b\nb x").unwrap_err();
    let (line, column) = error.location().expect("location");
    assert_eq!(line, 2);
    assert!(column >= 2);
}

#[test]
fn separated_list_keeps_items_and_separators_flat() {
    let rule_set = compile(vec![
        GrammarRule::rule(
            "list",
            RuleExpr::separated_list(1, None, RuleExpr::literal(","), RuleExpr::reference("a")),
        ),
        GrammarRule::literal("a", "a"),
    ]);
    let goal = rule_set.rule_id("list").unwrap();
    let tree = parse(&rule_set, goal, "a,a,a").unwrap();
    let branch = tree.root().as_branch().expect("branch root");
    // Three items and two separators, all direct children.
    assert_eq!(branch.children().len(), 5);
    assert_eq!(tree.to_flat_string(), "a,a,a");

    assert!(parse(&rule_set, goal, "a").is_ok());
    assert!(parse(&rule_set, goal, "a,").is_err());
    assert!(parse(&rule_set, goal, ",a").is_err());
    assert!(parse(&rule_set, goal, "").is_err());
}

#[test]
fn separated_list_bounds_count_items() {
    let rule_set = compile(vec![
        GrammarRule::rule(
            "pair_or_triple",
            RuleExpr::separated_list(2, Some(3), RuleExpr::literal(","), RuleExpr::reference("a")),
        ),
        GrammarRule::literal("a", "a"),
    ]);
    let goal = rule_set.rule_id("pair_or_triple").unwrap();
    assert!(parse(&rule_set, goal, "a").is_err());
    assert!(parse(&rule_set, goal, "a,a").is_ok());
    assert!(parse(&rule_set, goal, "a,a,a").is_ok());
    assert!(parse(&rule_set, goal, "a,a,a,a").is_err());
}

#[test]
fn zero_minimum_separated_list_accepts_empty_input() {
    let rule_set = compile(vec![
        GrammarRule::rule(
            "list",
            RuleExpr::separated_list(0, None, RuleExpr::literal(","), RuleExpr::reference("a")),
        ),
        GrammarRule::literal("a", "a"),
        GrammarRule::skip_pattern("WS", r"\s+"),
    ]);
    let goal = rule_set.rule_id("list").unwrap();
    assert!(parse(&rule_set, goal, "").is_ok());
    assert!(parse(&rule_set, goal, "  ").is_ok());
    assert!(parse(&rule_set, goal, "a, a").is_ok());
}

#[test]
fn bounded_repetition_enforces_both_ends() {
    let rule_set = compile(vec![GrammarRule::rule(
        "as",
        RuleExpr::multi(2, Some(3), RuleExpr::literal("a")),
    )]);
    let goal = rule_set.rule_id("as").unwrap();
    assert!(parse(&rule_set, goal, "a").is_err());
    assert!(parse(&rule_set, goal, "aa").is_ok());
    assert!(parse(&rule_set, goal, "aaa").is_ok());
    assert!(parse(&rule_set, goal, "aaaa").is_err());
}

#[test]
fn priority_choice_is_deterministic() {
    let rule_set = compile(vec![
        GrammarRule::rule(
            "abc",
            RuleExpr::priority_choice([
                RuleExpr::reference("a"),
                RuleExpr::reference("b"),
                RuleExpr::reference("c"),
            ]),
        ),
        GrammarRule::literal("a", "a"),
        GrammarRule::literal("b", "b"),
        GrammarRule::literal("c", "c"),
    ]);
    let goal = rule_set.rule_id("abc").unwrap();
    let tree = parse(&rule_set, goal, "b").unwrap();
    assert_eq!(tree.to_bracket_string(), "abc{'b'}");
    assert_eq!(tree.max_alternatives(), 1);
}

#[test]
fn priority_choice_picks_the_declared_order_winner() {
    // Both alternatives match the same span; declaration order decides.
    let rule_set = compile(vec![
        GrammarRule::rule(
            "pick",
            RuleExpr::priority_choice([RuleExpr::reference("x"), RuleExpr::reference("y")]),
        ),
        GrammarRule::literal("x", "a"),
        GrammarRule::literal("y", "a"),
    ]);
    let goal = rule_set.rule_id("pick").unwrap();
    let tree = parse(&rule_set, goal, "a").unwrap();
    assert_eq!(tree.max_alternatives(), 1);
    assert_eq!(tree.to_bracket_string(), "pick{'a'}");
    let child = tree.root().as_branch().unwrap().children()[0].clone();
    assert_eq!(child.name(), "x");

    // Swapping the declaration order swaps the winner.
    let swapped = compile(vec![
        GrammarRule::rule(
            "pick",
            RuleExpr::priority_choice([RuleExpr::reference("y"), RuleExpr::reference("x")]),
        ),
        GrammarRule::literal("x", "a"),
        GrammarRule::literal("y", "a"),
    ]);
    let goal = swapped.rule_id("pick").unwrap();
    let tree = parse(&swapped, goal, "a").unwrap();
    let child = tree.root().as_branch().unwrap().children()[0].clone();
    assert_eq!(child.name(), "y");
}

#[test]
fn plain_choice_keeps_equal_span_alternatives() {
    let rule_set = compile(vec![
        GrammarRule::rule(
            "either",
            RuleExpr::choice([RuleExpr::reference("x"), RuleExpr::reference("y")]),
        ),
        GrammarRule::literal("x", "a"),
        GrammarRule::literal("y", "a"),
    ]);
    let goal = rule_set.rule_id("either").unwrap();
    let tree = parse(&rule_set, goal, "a").unwrap();
    assert_eq!(tree.max_alternatives(), 2);
}

#[test]
fn pattern_terminals_match_greedily() {
    let rule_set = compile(vec![
        GrammarRule::rule(
            "idents",
            RuleExpr::separated_list(1, None, RuleExpr::literal(","), RuleExpr::reference("ident")),
        ),
        GrammarRule::pattern("ident", "[a-z][a-z0-9]*"),
        GrammarRule::skip_pattern("WS", r"\s+"),
    ]);
    let goal = rule_set.rule_id("idents").unwrap();
    let tree = parse(&rule_set, goal, "foo, bar9, baz").unwrap();
    assert_eq!(tree.to_flat_string(), "foo, bar9, baz");
    assert!(parse(&rule_set, goal, "foo, 9bar").is_err());
}

#[test]
fn inline_literals_compile_to_implicit_terminals() {
    let rule_set = compile(vec![GrammarRule::rule(
        "kw",
        RuleExpr::concat([RuleExpr::literal("let"), RuleExpr::pattern("[a-z]+")]),
    )]);
    let goal = rule_set.rule_id("kw").unwrap();
    assert_eq!(parse(&rule_set, goal, "letx").unwrap().to_flat_string(), "letx");
    assert!(parse(&rule_set, goal, "let").is_err());
}

#[test]
fn empty_input_fails_for_non_empty_goals() {
    let rule_set = repeated_a_grammar();
    let goal = rule_set.rule_id("as").unwrap();
    let error = parse(&rule_set, goal, "").unwrap_err();
    assert!(matches!(error, ParseError::ParseFailed { .. }));
    assert_eq!(error.location(), Some((1, 1)));
}

#[test]
fn nested_composites_parse_without_explicit_declarations() {
    // An optional sign followed by digits, all inline.
    let rule_set = compile(vec![GrammarRule::rule(
        "number",
        RuleExpr::concat([
            RuleExpr::multi(
                0,
                Some(1),
                RuleExpr::choice([RuleExpr::literal("+"), RuleExpr::literal("-")]),
            ),
            RuleExpr::pattern("[0-9]+"),
        ]),
    )]);
    let goal = rule_set.rule_id("number").unwrap();
    for text in ["42", "+42", "-7"] {
        assert_eq!(parse(&rule_set, goal, text).unwrap().to_flat_string(), text);
    }
    assert!(parse(&rule_set, goal, "+-42").is_err());
    assert!(parse(&rule_set, goal, "+").is_err());
}
