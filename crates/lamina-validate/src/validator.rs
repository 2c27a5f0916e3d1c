//! The [`Validator`] type.
//!
//! Validators are cheap to clone (the predicate is shared) and type-erased
//! over the closure, so a store can keep any mix of them in one list.

use std::fmt;
use std::sync::Arc;

use crate::error::{ValidatorError, ValidatorResult};

/// Outcome of running a single predicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The value meets the requirement.
    Valid,
    /// The value does not meet the requirement; the validator's description
    /// is the message.
    Invalid,
    /// The value does not meet the requirement, with a custom message.
    Reason(String),
}

impl From<bool> for Verdict {
    fn from(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid
        }
    }
}

type Predicate<V> = dyn Fn(&V) -> Verdict + Send + Sync;

/// A value predicate with a human-readable description.
pub struct Validator<V> {
    description: Arc<str>,
    predicate: Arc<Predicate<V>>,
}

impl<V> Clone for Validator<V> {
    fn clone(&self) -> Self {
        Self {
            description: Arc::clone(&self.description),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<V> fmt::Debug for Validator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<V: 'static> Validator<V> {
    /// Create a validator from a boolean predicate.
    ///
    /// The description should read as a requirement starting with a
    /// lowercase letter and without a trailing period, e.g. "value has to be
    /// a string". It must not be empty.
    pub fn new<F>(description: impl Into<String>, predicate: F) -> ValidatorResult<Self>
    where
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        Self::with_verdict(description, move |value| Verdict::from(predicate(value)))
    }

    /// Create a validator whose predicate may explain a rejection itself.
    pub fn with_verdict<F>(description: impl Into<String>, predicate: F) -> ValidatorResult<Self>
    where
        F: Fn(&V) -> Verdict + Send + Sync + 'static,
    {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(ValidatorError::EmptyDescription);
        }
        Ok(Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        })
    }

    /// Built-ins always carry a description, so they skip the check.
    pub(crate) fn builtin<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into().into(),
            predicate: Arc::new(move |value| Verdict::from(predicate(value))),
        }
    }
}

impl<V> Validator<V> {
    /// The requirement this validator enforces.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Run the predicate and return its raw verdict.
    pub fn verdict(&self, value: &V) -> Verdict {
        (self.predicate)(value)
    }

    /// Returns `true` if `value` meets the requirement.
    pub fn is_valid(&self, value: &V) -> bool {
        self.verdict(value) == Verdict::Valid
    }

    /// Check a value, returning the failure message on rejection.
    pub fn check(&self, value: &V) -> Result<(), String> {
        match self.verdict(value) {
            Verdict::Valid => Ok(()),
            Verdict::Invalid => Err(self.description.to_string()),
            Verdict::Reason(reason) => Err(reason),
        }
    }
}

/// Read access to the dynamic shape of a value.
///
/// Built-in validators inspect values through this trait, so the same
/// `number()` validator works for `f64`, `i32` or a `serde_json::Value`.
/// Every view defaults to `None`.
pub trait Inspect {
    /// The value as a number, if it is one.
    fn as_number(&self) -> Option<f64> {
        None
    }

    /// The value as text, if it is text.
    fn as_text(&self) -> Option<&str> {
        None
    }

    /// The value as a boolean, if it is one.
    fn as_flag(&self) -> Option<bool> {
        None
    }
}

macro_rules! inspect_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Inspect for $ty {
                fn as_number(&self) -> Option<f64> {
                    Some(*self as f64)
                }
            }
        )*
    };
}

inspect_number!(f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Inspect for bool {
    fn as_flag(&self) -> Option<bool> {
        Some(*self)
    }
}

impl Inspect for str {
    fn as_text(&self) -> Option<&str> {
        Some(self)
    }
}

impl Inspect for String {
    fn as_text(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl<T: Inspect + ?Sized> Inspect for &T {
    fn as_number(&self) -> Option<f64> {
        (**self).as_number()
    }

    fn as_text(&self) -> Option<&str> {
        (**self).as_text()
    }

    fn as_flag(&self) -> Option<bool> {
        (**self).as_flag()
    }
}

impl<T: Inspect> Inspect for Option<T> {
    fn as_number(&self) -> Option<f64> {
        self.as_ref().and_then(Inspect::as_number)
    }

    fn as_text(&self) -> Option<&str> {
        self.as_ref().and_then(Inspect::as_text)
    }

    fn as_flag(&self) -> Option<bool> {
        self.as_ref().and_then(Inspect::as_flag)
    }
}

impl Inspect for serde_json::Value {
    fn as_number(&self) -> Option<f64> {
        self.as_f64()
    }

    fn as_text(&self) -> Option<&str> {
        self.as_str()
    }

    fn as_flag(&self) -> Option<bool> {
        self.as_bool()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_description_is_rejected() {
        let err = Validator::<i32>::new("   ", |_| true).unwrap_err();
        assert!(matches!(err, ValidatorError::EmptyDescription));
    }

    #[test]
    fn false_predicate_reports_description() {
        let positive = Validator::<i32>::new("value has to be positive", |v| *v > 0).unwrap();
        assert_eq!(positive.check(&1), Ok(()));
        assert_eq!(
            positive.check(&-1),
            Err("value has to be positive".to_string())
        );
    }

    #[test]
    fn custom_reason_overrides_description() {
        let v = Validator::<i32>::with_verdict("value has to be small", |v| {
            if *v < 10 {
                Verdict::Valid
            } else {
                Verdict::Reason(format!("{v} is not small"))
            }
        })
        .unwrap();
        assert_eq!(v.check(&42), Err("42 is not small".to_string()));
        assert!(!v.is_valid(&42));
    }

    #[test]
    fn clones_share_predicate() {
        let v = Validator::<i32>::new("value has to be even", |v| v % 2 == 0).unwrap();
        let w = v.clone();
        assert_eq!(w.description(), v.description());
        assert!(w.is_valid(&4));
    }

    #[test]
    fn json_values_are_inspectable() {
        // `Value` has an inherent `as_number`, so go through the trait.
        assert_eq!(Inspect::as_number(&json!(3.5)), Some(3.5));
        assert_eq!(Inspect::as_text(&json!("x")), Some("x"));
        assert_eq!(Inspect::as_flag(&json!(true)), Some(true));
        assert_eq!(Inspect::as_number(&json!(null)), None);
    }

    #[test]
    fn option_inspects_inner_value() {
        assert_eq!(Some(7_i64).as_number(), Some(7.0));
        assert_eq!(None::<i64>.as_number(), None);
    }
}
