//! Validators that do not inspect the shape of a value.

use std::fmt::Debug;

use crate::validator::Validator;

/// The value has to equal one of `valid_values`.
pub fn one_of<V>(valid_values: impl IntoIterator<Item = V>) -> Validator<V>
where
    V: PartialEq + Debug + Send + Sync + 'static,
{
    let valid: Vec<V> = valid_values.into_iter().collect();
    let listed = valid
        .iter()
        .map(|value| format!("{value:?}"))
        .collect::<Vec<_>>()
        .join(", ");
    Validator::builtin(format!("value has to be one of: {listed}"), move |value: &V| {
        valid.contains(value)
    })
}

/// Every value passes.
pub fn pass<V: 'static>() -> Validator<V> {
    Validator::builtin("all values will pass", |_: &V| true)
}

/// Every value fails.
pub fn fail<V: 'static>() -> Validator<V> {
    Validator::builtin("all values will fail", |_: &V| false)
}
