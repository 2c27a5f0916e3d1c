//! Per-key validator and expander registrations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lamina_validate::Validator;

use crate::error::{StoreError, StoreResult};
use crate::types::StoreKey;

/// Function splitting a composite value into `(key, value)` pairs.
pub type ExpandFn<K, V> = dyn Fn(&V) -> Vec<(K, V)> + Send + Sync;

/// An expander registered for one composite key.
pub struct Expander<K, V> {
    /// Keys removed when the composite key is deleted.
    pub affects: Vec<K>,
    expand: Arc<ExpandFn<K, V>>,
}

impl<K, V> Expander<K, V> {
    pub fn new<F>(affects: Vec<K>, expand: F) -> Self
    where
        F: Fn(&V) -> Vec<(K, V)> + Send + Sync + 'static,
    {
        Self {
            affects,
            expand: Arc::new(expand),
        }
    }

    /// Split `value` into the pairs to store.
    pub fn expand(&self, value: &V) -> Vec<(K, V)> {
        (self.expand)(value)
    }
}

impl<K: Clone, V> Clone for Expander<K, V> {
    fn clone(&self) -> Self {
        Self {
            affects: self.affects.clone(),
            expand: Arc::clone(&self.expand),
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Expander<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expander")
            .field("affects", &self.affects)
            .finish_non_exhaustive()
    }
}

/// Validators and expanders, keyed by store key.
///
/// Any key may or may not carry either; lookups of unregistered keys return
/// nothing rather than failing.
pub struct Registry<K, V> {
    validators: HashMap<K, Vec<Validator<V>>>,
    expanders: HashMap<K, Expander<K, V>>,
}

impl<K: StoreKey, V> Registry<K, V> {
    pub fn new() -> Self {
        Self {
            validators: HashMap::new(),
            expanders: HashMap::new(),
        }
    }

    /// Register the validators for `key`.
    ///
    /// Fails with [`StoreError::DuplicateRegistration`] if the key already has
    /// validators and `replace` is `false`.
    pub fn set_validators(
        &mut self,
        key: K,
        validators: Vec<Validator<V>>,
        replace: bool,
    ) -> StoreResult<()> {
        if !replace && self.validators.contains_key(&key) {
            return Err(StoreError::DuplicateRegistration {
                key: format!("{key:?}"),
                kind: "validators",
            });
        }
        self.validators.insert(key, validators);
        Ok(())
    }

    /// Register the expander for `key`.
    ///
    /// Fails with [`StoreError::DuplicateRegistration`] if the key already has
    /// an expander and `replace` is `false`.
    pub fn set_expander(&mut self, key: K, expander: Expander<K, V>, replace: bool) -> StoreResult<()> {
        if !replace && self.expanders.contains_key(&key) {
            return Err(StoreError::DuplicateRegistration {
                key: format!("{key:?}"),
                kind: "expander",
            });
        }
        self.expanders.insert(key, expander);
        Ok(())
    }

    /// The validators registered for `key`, in registration order.
    pub fn validators_for(&self, key: &K) -> Vec<Validator<V>> {
        self.validators.get(key).cloned().unwrap_or_default()
    }

    pub fn expander_for(&self, key: &K) -> Option<Expander<K, V>> {
        self.expanders.get(key).cloned()
    }

    pub fn has_expander(&self, key: &K) -> bool {
        self.expanders.contains_key(key)
    }
}

impl<K: StoreKey, V> Default for Registry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for Registry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("validated_keys", &self.validators.len())
            .field("expanded_keys", &self.expanders.len())
            .finish()
    }
}
