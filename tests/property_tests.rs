//! Randomized invariants over a small skip-interleaved grammar.

use proptest::prelude::*;
use sylva::{parse, GrammarRule, RuleExpr, RuleSet};

fn letters_grammar() -> RuleSet {
    // seq = (a | b)*, whitespace skipped
    RuleSet::compile(vec![
        GrammarRule::rule(
            "seq",
            RuleExpr::multi(
                0,
                None,
                RuleExpr::choice([RuleExpr::reference("a"), RuleExpr::reference("b")]),
            ),
        ),
        GrammarRule::literal("a", "a"),
        GrammarRule::literal("b", "b"),
        GrammarRule::skip_pattern("WS", r"\s+"),
    ])
    .expect("grammar compiles")
}

proptest! {
    #[test]
    fn flat_string_reproduces_input(text in "[ab ]{0,12}") {
        let rule_set = letters_grammar();
        let goal = rule_set.rule_id("seq").unwrap();
        let tree = parse(&rule_set, goal, &text).unwrap();
        prop_assert_eq!(tree.to_flat_string(), text);
    }

    #[test]
    fn spans_always_cover_the_whole_input(text in "[ab ]{0,12}") {
        let rule_set = letters_grammar();
        let goal = rule_set.rule_id("seq").unwrap();
        let tree = parse(&rule_set, goal, &text).unwrap();
        prop_assert_eq!(tree.root().start(), 0);
        prop_assert_eq!(tree.root().end(), text.len());
    }

    #[test]
    fn parsing_is_deterministic(text in "[ab ]{0,10}") {
        let rule_set = letters_grammar();
        let goal = rule_set.rule_id("seq").unwrap();
        let first = parse(&rule_set, goal, &text).unwrap();
        let second = parse(&rule_set, goal, &text).unwrap();
        prop_assert_eq!(first.root(), second.root());
        prop_assert_eq!(first.to_bracket_string(), second.to_bracket_string());
    }

    #[test]
    fn failures_stay_in_bounds(text in "[abc ]{1,10}") {
        prop_assume!(text.contains('c'));
        let rule_set = letters_grammar();
        let goal = rule_set.rule_id("seq").unwrap();
        let error = parse(&rule_set, goal, &text).unwrap_err();
        let (line, column) = error.location().expect("failure location");
        prop_assert_eq!(line, 1);
        prop_assert!((column as usize) <= text.len() + 1);
    }

    #[test]
    fn skip_placement_does_not_change_structure(count in 1usize..6, spaced in any::<bool>()) {
        let rule_set = letters_grammar();
        let goal = rule_set.rule_id("seq").unwrap();
        let plain = "a".repeat(count);
        let text = if spaced {
            plain.chars().map(|c| format!("{c} ")).collect::<String>()
        } else {
            plain.clone()
        };
        let reference = parse(&rule_set, goal, &plain).unwrap();
        let tree = parse(&rule_set, goal, &text).unwrap();
        prop_assert_eq!(tree.to_bracket_string(), reference.to_bracket_string());
    }
}
