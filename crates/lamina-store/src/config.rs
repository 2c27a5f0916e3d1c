use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::types::Layer;

/// Default bound on recursive expansion.
pub const DEFAULT_MAX_EXPANSION_DEPTH: usize = 16;

/// What a store does with values its validators reject.
///
/// The policy only selects the handler installed at construction;
/// [`LayeredStore::set_invalid_handler`](crate::LayeredStore::set_invalid_handler)
/// replaces it afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidValuePolicy {
    /// Log a warning and skip the write.
    #[default]
    Warn,
    /// Skip the write silently.
    Ignore,
    /// Fail the triggering call with [`StoreError::InvalidValue`].
    Reject,
}

/// Configuration for a [`LayeredStore`](crate::LayeredStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Layers values may be written to. `None` allows any layer.
    pub layers: Option<BTreeSet<i32>>,
    /// How many rounds of nested expansion a single write may trigger.
    pub max_expansion_depth: usize,
    /// Handling of values rejected by validators.
    pub invalid_values: InvalidValuePolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            layers: None,
            max_expansion_depth: DEFAULT_MAX_EXPANSION_DEPTH,
            invalid_values: InvalidValuePolicy::Warn,
        }
    }
}

impl StoreConfig {
    /// A configuration restricted to the given layers.
    pub fn with_layers(layers: impl IntoIterator<Item = i32>) -> Self {
        Self {
            layers: Some(layers.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Parse a configuration from TOML.
    ///
    /// ```toml
    /// layers = [1, 4, 9]
    /// max_expansion_depth = 8
    /// invalid_values = "reject"
    /// ```
    pub fn from_toml_str(source: &str) -> StoreResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no store could work with.
    pub fn validate(&self) -> StoreResult<()> {
        if matches!(&self.layers, Some(layers) if layers.is_empty()) {
            return Err(StoreError::Config("allowed layer set is empty".into()));
        }
        if self.max_expansion_depth == 0 {
            return Err(StoreError::Config(
                "max_expansion_depth must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Fail with [`StoreError::InvalidLayer`] unless `layer` is allowed.
    pub fn check_layer(&self, layer: Layer) -> StoreResult<()> {
        match &self.layers {
            Some(allowed) if !allowed.contains(&layer.priority()) => {
                Err(StoreError::InvalidLayer {
                    layer: layer.to_string(),
                    reason: format!("allowed layers are {allowed:?}"),
                })
            }
            _ => Ok(()),
        }
    }
}
