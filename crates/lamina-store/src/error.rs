//! Error types for store operations.

use std::fmt::Debug;

use thiserror::Error;

use crate::types::SegmentId;

/// Errors that can occur during store operations.
///
/// A missing key is never an error; reads return `Option`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The layer is not an integer or not one of the configured layers.
    #[error("invalid layer {layer}: {reason}")]
    InvalidLayer { layer: String, reason: String },

    /// A value failed one or more validators and the invalid-value handler
    /// escalated the rejection.
    #[error("invalid value for {key}: {}", .messages.join("; "))]
    InvalidValue { key: String, messages: Vec<String> },

    /// Validators or an expander are already registered for the key.
    #[error("{kind} already registered for {key}")]
    DuplicateRegistration { key: String, kind: &'static str },

    /// The clone target was already written to or cloned into.
    #[error("segment already exists: {segment}")]
    DuplicateSegment { segment: SegmentId },

    /// Recursive expansion did not reach a fixed point within the limit.
    #[error("expansion of {key} exceeded depth {depth}")]
    ExpansionTooDeep { key: String, depth: usize },

    /// A listener key pattern does not compile.
    #[error("invalid key pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Serialization failure while exporting values.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The configuration is malformed or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Build an [`StoreError::InvalidValue`] for a key.
    ///
    /// Meant for custom invalid-value handlers that want to escalate.
    pub fn invalid_value(key: &impl Debug, messages: &[String]) -> Self {
        Self::InvalidValue {
            key: format!("{key:?}"),
            messages: messages.to_vec(),
        }
    }
}

/// Convenience type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
