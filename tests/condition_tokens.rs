//! Snapshot tests for the guard condition lexer
//!
//! These pin the token streams of representative guard conditions so changes to
//! keyword priority or literal handling show up as snapshot diffs.

use condiment::condiment::condition::tokens::{tokenize, Token};

/// Helper: strip locations from lexer output
fn kinds(source: &str) -> Vec<Token> {
    tokenize(source)
        .expect("condition to tokenize")
        .into_iter()
        .map(|(token, _)| token)
        .collect()
}

#[test]
fn test_boolean_guard_tokenization() {
    let tokens = kinds("WITH_A == '1' and not WITH_B");
    insta::assert_debug_snapshot!("boolean_guard", tokens);
}

#[test]
fn test_arithmetic_guard_tokenization() {
    let tokens = kinds("int(WITH_LEVEL) // 2 >= 3");
    insta::assert_debug_snapshot!("arithmetic_guard", tokens);
}

#[test]
fn test_membership_guard_tokenization() {
    let tokens = kinds(r#"WITH_MODE not in ("a", "b")"#);
    insta::assert_debug_snapshot!("membership_guard", tokens);
}
