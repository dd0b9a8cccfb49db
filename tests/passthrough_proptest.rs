//! Property-based tests for the preprocessor
//!
//! Unguarded sources must pass through untouched, and a guard must only ever
//! affect its own block.

use condiment::condiment::{ParseOptions, Preprocessor};
use proptest::prelude::*;
use std::collections::HashMap;

fn preprocessor(vars: &[(&str, &str)]) -> Preprocessor<HashMap<String, String>> {
    let env = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Preprocessor::with_environment(ParseOptions::default(), env)
}

/// Lines without flags, guards or exclude markers, keeping their terminators
fn unguarded_source() -> impl Strategy<Value = String> {
    let line = (
        "[ \t]{0,6}",
        "[a-z =()0-9.:,]{0,30}",
        prop_oneof![Just("\n"), Just("\r\n")],
    )
        .prop_map(|(indent, text, end)| format!("{}{}{}", indent, text, end));
    (prop::collection::vec(line, 0..40), "[a-z ]{0,10}")
        .prop_map(|(lines, last)| format!("{}{}", lines.concat(), last))
}

/// Non-blank lines at column 0
fn top_level_lines() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z][a-z =0-9]{0,20}", 0..8)
}

/// Non-blank lines indented by four spaces
fn body_lines() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z][a-z =0-9]{0,20}", 1..8)
}

fn joined(lines: &[String], indent: &str) -> String {
    lines
        .iter()
        .map(|line| format!("{}{}\n", indent, line))
        .collect()
}

proptest! {
    #[test]
    fn unguarded_input_is_identical(source in unguarded_source()) {
        let processed = preprocessor(&[]).process(&source).unwrap();
        prop_assert_eq!(processed.text(), source.as_str());
        prop_assert!(processed.flags.is_empty());
    }

    #[test]
    fn false_guard_removes_exactly_its_block(
        before in top_level_lines(),
        body in body_lines(),
        after in top_level_lines(),
    ) {
        let source = format!(
            "{}if WITH_OFF:\n{}{}",
            joined(&before, ""),
            joined(&body, "    "),
            joined(&after, ""),
        );
        let processed = preprocessor(&[]).process(&source).unwrap();
        prop_assert_eq!(processed.text(), format!("{}{}", joined(&before, ""), joined(&after, "")));
    }

    #[test]
    fn true_guard_shifts_its_block_to_the_guard(
        before in top_level_lines(),
        body in body_lines(),
        after in top_level_lines(),
    ) {
        let source = format!(
            "{}if WITH_ON:\n{}{}",
            joined(&before, ""),
            joined(&body, "    "),
            joined(&after, ""),
        );
        let processed = preprocessor(&[("WITH_ON", "1")]).process(&source).unwrap();
        prop_assert_eq!(
            processed.text(),
            format!("{}{}{}", joined(&before, ""), joined(&body, ""), joined(&after, "")),
        );
    }
}
