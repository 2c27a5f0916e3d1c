//! Combinators over several validators.
//!
//! The combined description lists the sub-validators as an indented bullet
//! list under a header, one line per sub-validator.

use crate::validator::Validator;

fn sublist<V>(header: &str, validators: &[Validator<V>]) -> String {
    std::iter::once(format!("{header}:"))
        .chain(
            validators
                .iter()
                .map(|validator| format!("  - {}", validator.description())),
        )
        .collect::<Vec<_>>()
        .join("\n")
}

/// Passes when every validator passes.
pub fn and<V: 'static>(validators: Vec<Validator<V>>) -> Validator<V> {
    let description = sublist("value has to satisfy all of", &validators);
    Validator::builtin(description, move |value: &V| {
        validators.iter().all(|validator| validator.is_valid(value))
    })
}

/// Passes when at least one validator passes.
pub fn or<V: 'static>(validators: Vec<Validator<V>>) -> Validator<V> {
    let description = sublist("value has to satisfy at least one of", &validators);
    Validator::builtin(description, move |value: &V| {
        validators.iter().any(|validator| validator.is_valid(value))
    })
}

/// Passes when exactly one validator passes.
pub fn xor<V: 'static>(validators: Vec<Validator<V>>) -> Validator<V> {
    let description = sublist("value has to satisfy exactly one of", &validators);
    Validator::builtin(description, move |value: &V| {
        validators
            .iter()
            .filter(|validator| validator.is_valid(value))
            .count()
            == 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{boolean, number, number_at_least, number_integer, string};
    use serde_json::{json, Value};

    #[test]
    fn and_requires_all() {
        let v = and(vec![number::<Value>(), number_integer()]);
        assert!(v.is_valid(&json!(77)));
        assert!(!v.is_valid(&json!(3.5)));
    }

    #[test]
    fn or_requires_any() {
        let v = or(vec![string::<Value>(), boolean()]);
        assert!(v.is_valid(&json!("x")));
        assert!(v.is_valid(&json!(true)));
        assert!(!v.is_valid(&json!(1)));
    }

    #[test]
    fn xor_requires_exactly_one() {
        let v = xor(vec![number::<f64>(), number_at_least(0.0)]);
        // Both pass.
        assert!(!v.is_valid(&5.0));
        // Only `number` passes.
        assert!(v.is_valid(&-5.0));
    }

    #[test]
    fn description_is_a_bulleted_sublist() {
        let v = and(vec![number::<f64>(), number_at_least(0.0)]);
        assert_eq!(
            v.description(),
            "value has to satisfy all of:\n  - value has to be a number\n  - value has to be a number no lower than 0"
        );
    }

    #[test]
    fn empty_combinators() {
        assert!(and::<i32>(Vec::new()).is_valid(&1));
        assert!(!or::<i32>(Vec::new()).is_valid(&1));
        assert!(!xor::<i32>(Vec::new()).is_valid(&1));
    }
}
