//! Text validators. Lengths are counted in characters, not bytes.

use regex::Regex;

use crate::error::ValidatorResult;
use crate::validator::{Inspect, Validator};

fn char_len<V: Inspect>(value: &V) -> Option<usize> {
    value.as_text().map(|text| text.chars().count())
}

/// The value has to be text.
pub fn string<V: Inspect + 'static>() -> Validator<V> {
    Validator::builtin("value has to be a string", |value: &V| {
        value.as_text().is_some()
    })
}

/// The value has to be text longer than `min_length` characters.
pub fn string_longer_than<V: Inspect + 'static>(min_length: usize) -> Validator<V> {
    Validator::builtin(
        format!("value has to be a string longer than {min_length} characters"),
        move |value: &V| char_len(value).is_some_and(|len| len > min_length),
    )
}

/// The value has to be text shorter than `max_length` characters.
pub fn string_shorter_than<V: Inspect + 'static>(max_length: usize) -> Validator<V> {
    Validator::builtin(
        format!("value has to be a string shorter than {max_length} characters"),
        move |value: &V| char_len(value).is_some_and(|len| len < max_length),
    )
}

/// The value has to be text of at least `min_length` characters.
pub fn string_at_least<V: Inspect + 'static>(min_length: usize) -> Validator<V> {
    Validator::builtin(
        format!("value has to be a string no shorter than {min_length} characters"),
        move |value: &V| char_len(value).is_some_and(|len| len >= min_length),
    )
}

/// The value has to be text of at most `max_length` characters.
pub fn string_at_most<V: Inspect + 'static>(max_length: usize) -> Validator<V> {
    Validator::builtin(
        format!("value has to be a string no longer than {max_length} characters"),
        move |value: &V| char_len(value).is_some_and(|len| len <= max_length),
    )
}

/// The value has to be text matching `pattern`.
///
/// Fails if the pattern does not compile.
pub fn matches<V: Inspect + 'static>(pattern: &str) -> ValidatorResult<Validator<V>> {
    Ok(matches_regex(Regex::new(pattern)?))
}

/// The value has to be text matching an already compiled expression.
pub fn matches_regex<V: Inspect + 'static>(re: Regex) -> Validator<V> {
    Validator::builtin(
        format!("value has to be a string and match: {}", re.as_str()),
        move |value: &V| value.as_text().is_some_and(|text| re.is_match(text)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidatorError;

    #[test]
    fn string_shape() {
        assert!(string::<String>().is_valid(&"test".to_string()));
        assert!(!string::<Option<String>>().is_valid(&None));
        assert!(!string::<i32>().is_valid(&5));
    }

    #[test]
    fn lengths_count_characters() {
        // Four characters, eight bytes.
        let text = "ěščř";
        assert!(string_at_most::<&str>(4).is_valid(&text));
        assert!(string_shorter_than::<&str>(5).is_valid(&text));
        assert!(!string_longer_than::<&str>(4).is_valid(&text));
        assert!(string_at_least::<&str>(4).is_valid(&text));
    }

    #[test]
    fn pattern_match() {
        let v = matches::<&str>(r"^(true|false) \d+ .*$").unwrap();
        assert!(v.is_valid(&"false 7 seven"));
        assert!(!v.is_valid(&"false7seven"));
        assert_eq!(
            v.description(),
            r"value has to be a string and match: ^(true|false) \d+ .*$"
        );
    }

    #[test]
    fn bad_pattern_is_an_error() {
        let err = matches::<&str>("(unclosed").unwrap_err();
        assert!(matches!(err, ValidatorError::InvalidPattern(_)));
    }
}
