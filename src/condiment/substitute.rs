//! Bare-word flag substitution
//!
//! Outside of guards a flag can be used as a value: every standalone word that
//! starts with the prefix is replaced by the flag's resolved value. The flag is
//! resolved on first reference, so a flag never mentioned in a guard still
//! substitutes.

use crate::condiment::flags::{Environment, FlagTable};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

static WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// Is `word` a flag name under `prefix`?
pub fn is_flag_name(word: &str, prefix: &str) -> bool {
    !prefix.is_empty() && word.len() > prefix.len() && word.starts_with(prefix)
}

/// Replace every flag word in `text` with its value, resolving new flags into `flags`.
pub fn substitute<'t, E: Environment + ?Sized>(
    text: &'t str,
    prefix: &str,
    flags: &mut FlagTable,
    env: &E,
) -> Cow<'t, str> {
    if prefix.is_empty() || !text.contains(prefix) {
        return Cow::Borrowed(text);
    }
    WORD_REGEX.replace_all(text, |caps: &Captures| {
        let word = &caps[0];
        if is_flag_name(word, prefix) {
            flags.define(word, env).to_string()
        } else {
            word.to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_standalone_words_only() {
        let mut flags = FlagTable::new();
        let out = substitute(
            "name = 'WITH_Y' + WITH_Y + NO_WITH_Y + WITH_YZ\n",
            "WITH_",
            &mut flags,
            &env(&[("WITH_Y", "hello"), ("WITH_YZ", "z")]),
        );
        assert_eq!(out, "name = 'hello' + hello + NO_WITH_Y + z\n");
        assert_eq!(flags.get("WITH_Y"), Some("hello"));
    }

    #[test]
    fn untouched_lines_stay_borrowed() {
        let mut flags = FlagTable::new();
        let out = substitute("x = 1\n", "WITH_", &mut flags, &env(&[]));
        assert!(matches!(out, Cow::Borrowed(_)));
        assert!(flags.is_empty());
    }

    #[test]
    fn unset_flags_substitute_empty() {
        let mut flags = FlagTable::new();
        let out = substitute("print(WITH_GONE)\n", "WITH_", &mut flags, &env(&[]));
        assert_eq!(out, "print()\n");
    }

    #[test]
    fn bare_prefix_is_not_a_flag() {
        assert!(!is_flag_name("WITH_", "WITH_"));
        assert!(is_flag_name("WITH_A", "WITH_"));
        assert!(!is_flag_name("WITH_A", ""));
    }
}
