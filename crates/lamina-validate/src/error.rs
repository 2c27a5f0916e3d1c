//! Error types for validator construction.

use thiserror::Error;

/// Errors that can occur while building a validator.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// Every validator needs a description; it doubles as the rejection message.
    #[error("a validator description must not be empty")]
    EmptyDescription,

    /// The pattern given to [`crate::matches`] does not compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Convenience type alias for validator construction.
pub type ValidatorResult<T> = std::result::Result<T, ValidatorError>;
