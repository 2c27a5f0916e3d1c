//! Composable value validators for the Lamina override store.
//!
//! A [`Validator`] is a predicate paired with a human-readable description.
//! The description is written as the requirement a value has to meet
//! ("value has to be a string") and is used as the rejection message when the
//! predicate returns `false`.
//!
//! # Modules
//!
//! - [`validator`] — The [`Validator`] type, [`Verdict`] and the [`Inspect`]
//!   trait built-in validators read values through
//! - [`boolean`], [`number`], [`string`], [`other`] — Built-in validators
//! - [`operators`] — `and`/`or`/`xor` combinators
//! - [`error`] — Construction errors
//!
//! # Example
//!
//! ```rust
//! use lamina_validate::{and, number, number_at_least};
//!
//! let non_negative = and(vec![number::<f64>(), number_at_least(0.0)]);
//! assert!(non_negative.check(&3.5).is_ok());
//! assert!(non_negative.check(&-1.0).is_err());
//! ```

pub mod boolean;
pub mod error;
pub mod number;
pub mod operators;
pub mod other;
pub mod string;
pub mod validator;

pub use boolean::boolean;
pub use error::{ValidatorError, ValidatorResult};
pub use number::{
    number, number_at_least, number_at_most, number_even, number_higher_than, number_integer,
    number_lower_than, number_odd,
};
pub use operators::{and, or, xor};
pub use other::{fail, one_of, pass};
pub use string::{
    matches, matches_regex, string, string_at_least, string_at_most, string_longer_than,
    string_shorter_than,
};
pub use validator::{Inspect, Validator, Verdict};
