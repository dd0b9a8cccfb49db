//! End-to-end scenarios for the block state machine
//!
//! Each case runs a whole source through the preprocessor against a fixed
//! environment and compares the surviving text.

use condiment::condiment::{CondimentError, ParseOptions, Preprocessor};
use rstest::rstest;
use std::collections::HashMap;

fn run(source: &str, vars: &[(&str, &str)]) -> Result<String, CondimentError> {
    let env: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Preprocessor::with_environment(ParseOptions::default(), env)
        .process(source)
        .map(|processed| processed.text())
}

#[rstest]
#[case::enabled("if WITH_X:\n    a = 1\nb = 2\n", &[("WITH_X", "1")], "a = 1\nb = 2\n")]
#[case::disabled("if WITH_X:\n    a = 1\nb = 2\n", &[], "b = 2\n")]
#[case::empty_value_is_false("if WITH_X:\n    a = 1\nb = 2\n", &[("WITH_X", "")], "b = 2\n")]
#[case::zero_string_is_true("if WITH_X:\n    a\n", &[("WITH_X", "0")], "a\n")]
#[case::bare_word("name = WITH_Y\n", &[("WITH_Y", "hello")], "name = hello\n")]
#[case::bare_word_inside_emitted_block(
    "if WITH_A:\n    print(WITH_A)\n",
    &[("WITH_A", "yes")],
    "print(yes)\n"
)]
#[case::nested_both_true(
    "if WITH_A:\n    x\n    if WITH_B:\n        y\n    z\nw\n",
    &[("WITH_A", "1"), ("WITH_B", "1")],
    "x\ny\nz\nw\n"
)]
#[case::nested_inner_false(
    "if WITH_A:\n    x\n    if WITH_B:\n        y\n    z\nw\n",
    &[("WITH_A", "1")],
    "x\nz\nw\n"
)]
#[case::nested_outer_false(
    "if WITH_A:\n    x\n    if WITH_B:\n        y\n    z\nw\n",
    &[("WITH_B", "1")],
    "w\n"
)]
#[case::indented_guard(
    "def f():\n    if WITH_A:\n        return 1\n    return 0\n",
    &[("WITH_A", "1")],
    "def f():\n    return 1\n    return 0\n"
)]
#[case::indented_guard_stripped(
    "def f():\n    if WITH_A:\n        return 1\n    return 0\n",
    &[],
    "def f():\n    return 0\n"
)]
#[case::blank_lines_kept_in_emitted_block(
    "if WITH_A:\n    a\n\n    b\nc\n",
    &[("WITH_A", "1")],
    "a\n\nb\nc\n"
)]
#[case::blank_lines_dropped_with_stripped_block("if WITH_A:\n    a\n\n    b\nc\n", &[], "c\n")]
#[case::block_closed_by_end_of_input("x\nif WITH_A:\n    a\n    b", &[("WITH_A", "1")], "x\na\nb")]
#[case::comparison("if WITH_MODE == 'prod':\n    p\nq\n", &[("WITH_MODE", "prod")], "p\nq\n")]
#[case::comparison_false("if WITH_MODE == 'prod':\n    p\nq\n", &[("WITH_MODE", "dev")], "q\n")]
#[case::boolean_operators(
    "if WITH_A and not WITH_B:\n    only_a\n",
    &[("WITH_A", "1")],
    "only_a\n"
)]
#[case::membership(
    "if WITH_OS in 'linux macos':\n    unix\n",
    &[("WITH_OS", "linux")],
    "unix\n"
)]
#[case::arithmetic(
    "if int(WITH_LEVEL) % 2 == 1:\n    odd\n",
    &[("WITH_LEVEL", "3")],
    "odd\n"
)]
#[case::if_without_prefix_is_plain("if ready:\n    go\n", &[], "if ready:\n    go\n")]
#[case::exclude_region(
    "a\n#exclude\nif WITH_A:\n    b\n#endexclude\nc\n",
    &[("WITH_A", "1")],
    "a\nc\n"
)]
#[case::exclude_does_not_nest(
    "a\n#exclude\n#exclude\nb\n#endexclude\nc\n#endexclude\n",
    &[],
    "a\nc\n#endexclude\n"
)]
#[case::unterminated_exclude_runs_to_end("a\n#exclude\nb\nc\n", &[], "a\n")]
fn scenario(#[case] source: &str, #[case] vars: &[(&str, &str)], #[case] expected: &str) {
    assert_eq!(run(source, vars).unwrap(), expected);
}

#[rstest]
#[case::dangling_operator("if WITH_A ==:\n    a\n", 1)]
#[case::unclosed_paren("x\nif (WITH_A:\n    a\n", 2)]
fn malformed_guards_abort(#[case] source: &str, #[case] line: usize) {
    match run(source, &[]) {
        Err(CondimentError::MalformedGuard { line: found, .. }) => assert_eq!(found, line),
        other => panic!("expected a malformed guard error, got {:?}", other),
    }
}

#[rstest]
#[case::unknown_name("if WITH_A == DEBUG:\n    a\n")]
#[case::mixed_ordering("if WITH_A < 3:\n    a\n")]
#[case::division_by_zero("if int(WITH_A) // 0:\n    a\n")]
#[case::huge_string_repeat("if WITH_A * 9223372036854775807:\n    a\n")]
fn evaluation_errors_abort(#[case] source: &str) {
    let err = run(source, &[("WITH_A", "1")]).unwrap_err();
    assert!(matches!(err, CondimentError::GuardEvaluation { line: 1, .. }));
}

#[test]
fn flags_resolve_once_per_run() {
    let env: HashMap<String, String> = [("WITH_A".to_string(), "1".to_string())]
        .into_iter()
        .collect();
    let preprocessor = Preprocessor::with_environment(ParseOptions::default(), env);
    let processed = preprocessor
        .process("if WITH_A:\n    a\nv = WITH_A\nif WITH_B:\n    b\n")
        .unwrap();
    let names: Vec<&str> = processed.flags.iter().map(|flag| flag.name.as_str()).collect();
    assert_eq!(names, vec!["WITH_A", "WITH_B"]);
    assert_eq!(processed.text(), "a\nv = 1\n");
}
