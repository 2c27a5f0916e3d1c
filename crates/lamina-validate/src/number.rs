//! Numeric validators.
//!
//! The bounded variants close over their boundary and embed it in the
//! description, so a rejection reads e.g. "value has to be a number no lower
//! than 0".

use crate::validator::{Inspect, Validator};

/// The value has to be a number.
pub fn number<V: Inspect + 'static>() -> Validator<V> {
    Validator::builtin("value has to be a number", |value: &V| {
        value.as_number().is_some()
    })
}

/// The value has to be a positive odd integer.
///
/// The remainder keeps the sign of the value, so negative odd numbers are
/// rejected.
pub fn number_odd<V: Inspect + 'static>() -> Validator<V> {
    Validator::builtin("value has to be an odd number", |value: &V| {
        value.as_number().is_some_and(|n| n % 2.0 == 1.0)
    })
}

/// The value has to be an even integer.
pub fn number_even<V: Inspect + 'static>() -> Validator<V> {
    Validator::builtin("value has to be an even number", |value: &V| {
        value.as_number().is_some_and(|n| n % 2.0 == 0.0)
    })
}

/// The value has to be a whole number.
pub fn number_integer<V: Inspect + 'static>() -> Validator<V> {
    Validator::builtin("value has to be an integer number", |value: &V| {
        value
            .as_number()
            .is_some_and(|n| n.is_finite() && n.fract() == 0.0)
    })
}

/// The value has to be a number strictly above `min`.
pub fn number_higher_than<V: Inspect + 'static>(min: f64) -> Validator<V> {
    Validator::builtin(
        format!("value has to be a number higher than {min}"),
        move |value: &V| value.as_number().is_some_and(|n| n > min),
    )
}

/// The value has to be a number strictly below `max`.
pub fn number_lower_than<V: Inspect + 'static>(max: f64) -> Validator<V> {
    Validator::builtin(
        format!("value has to be a number lower than {max}"),
        move |value: &V| value.as_number().is_some_and(|n| n < max),
    )
}

/// The value has to be a number no lower than `min`.
pub fn number_at_least<V: Inspect + 'static>(min: f64) -> Validator<V> {
    Validator::builtin(
        format!("value has to be a number no lower than {min}"),
        move |value: &V| value.as_number().is_some_and(|n| n >= min),
    )
}

/// The value has to be a number no higher than `max`.
pub fn number_at_most<V: Inspect + 'static>(max: f64) -> Validator<V> {
    Validator::builtin(
        format!("value has to be a number no higher than {max}"),
        move |value: &V| value.as_number().is_some_and(|n| n <= max),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    #[test]
    fn number_rejects_other_shapes() {
        let v = number::<Value>();
        assert!(v.is_valid(&json!(3.5)));
        assert!(!v.is_valid(&json!("3.5")));
        assert!(!v.is_valid(&json!(null)));
    }

    #[test]
    fn parity() {
        assert!(number_odd::<i32>().is_valid(&7));
        assert!(!number_odd::<i32>().is_valid(&-7));
        assert!(!number_odd::<f64>().is_valid(&7.5));
        assert!(!number_odd::<i32>().is_valid(&8));
        assert!(number_even::<i32>().is_valid(&8));
        assert!(!number_even::<f64>().is_valid(&8.5));
    }

    #[test]
    fn integer() {
        assert!(number_integer::<f64>().is_valid(&77.0));
        assert!(!number_integer::<f64>().is_valid(&3.5));
        assert!(!number_integer::<f64>().is_valid(&f64::INFINITY));
        assert!(!number_integer::<Value>().is_valid(&json!("3")));
    }

    #[test]
    fn bounded_descriptions_embed_the_boundary() {
        assert_eq!(
            number_at_least::<f64>(0.0).description(),
            "value has to be a number no lower than 0"
        );
        assert_eq!(
            number_lower_than::<f64>(7.0).description(),
            "value has to be a number lower than 7"
        );
    }

    proptest! {
        #[test]
        fn bounds_agree_with_comparisons(bound in -1e6f64..1e6, value in -1e6f64..1e6) {
            prop_assert_eq!(number_higher_than::<f64>(bound).is_valid(&value), value > bound);
            prop_assert_eq!(number_lower_than::<f64>(bound).is_valid(&value), value < bound);
            prop_assert_eq!(number_at_least::<f64>(bound).is_valid(&value), value >= bound);
            prop_assert_eq!(number_at_most::<f64>(bound).is_valid(&value), value <= bound);
        }
    }
}
