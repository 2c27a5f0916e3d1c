//! The [`LayeredStore`] facade.

use std::fmt;
use std::sync::Arc;

use lamina_validate::Validator;
use serde::Serialize;
use tracing::info;

use crate::config::StoreConfig;
use crate::core::StorageCore;
use crate::dump::StorageDump;
use crate::error::StoreResult;
use crate::listener::{KeyMatcher, ListenerId, ListenerRegistry};
use crate::segment::Segment;
use crate::transaction::{CommitSummary, StoreTransaction, TransactionQueue};
use crate::types::{Layer, SegmentId, StoreKey, StoreValue};

/// A layered, segmented override store.
///
/// Cloning a store is cheap and yields another handle to the same data.
///
/// ```rust
/// use lamina_store::LayeredStore;
///
/// let store: LayeredStore<&'static str, i32> = LayeredStore::new();
/// let global = store.global();
/// global.set(1, "volume", 3).unwrap();
/// global.set(9, "volume", 11).unwrap();
///
/// let kitchen = store.open_segment("kitchen");
/// assert_eq!(kitchen.get(&"volume"), Some(11));
/// ```
pub struct LayeredStore<K, V> {
    core: Arc<StorageCore<K, V>>,
    listeners: Arc<ListenerRegistry<K>>,
}

impl<K, V> Clone for LayeredStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<K: StoreKey, V: StoreValue> LayeredStore<K, V> {
    /// Create a store with the default configuration.
    pub fn new() -> Self {
        Self::from_core(StorageCore::new(StoreConfig::default()))
    }

    /// Create a store with a custom configuration.
    pub fn with_config(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self::from_core(StorageCore::new(config)))
    }

    fn from_core(core: StorageCore<K, V>) -> Self {
        Self {
            core: Arc::new(core),
            listeners: Arc::new(ListenerRegistry::new()),
        }
    }

    /// Direct access to the storage primitives. Writes made here bypass
    /// transactions and do not notify listeners.
    pub fn core(&self) -> &StorageCore<K, V> {
        &self.core
    }

    pub fn config(&self) -> &StoreConfig {
        self.core.config()
    }

    // -----------------------------------------------------------------------
    // Segments
    // -----------------------------------------------------------------------

    /// Handle to the global segment.
    pub fn global(&self) -> Segment<K, V> {
        self.open_segment(SegmentId::Global)
    }

    pub fn open_segment(&self, id: impl Into<SegmentId>) -> Segment<K, V> {
        Segment::new(id.into(), Arc::clone(&self.core), Arc::clone(&self.listeners))
    }

    /// Handle to a new segment with a generated identifier.
    pub fn open_unique_segment(&self) -> Segment<K, V> {
        self.open_segment(SegmentId::unique())
    }

    pub fn clone_segment(
        &self,
        source: impl Into<SegmentId>,
        target: impl Into<SegmentId>,
    ) -> StoreResult<Segment<K, V>> {
        self.open_segment(source).clone_segment(target)
    }

    /// Remove all data, cached lookups, inheritance and listeners of a
    /// segment.
    pub fn delete_segment_data(&self, segment: impl Into<SegmentId>) {
        self.open_segment(segment).close();
    }

    pub fn set_inheritance<I>(&self, segment: impl Into<SegmentId>, ancestors: I, include_global: bool)
    where
        I: IntoIterator,
        I::Item: Into<SegmentId>,
    {
        self.open_segment(segment)
            .set_inheritance(ancestors, include_global);
    }

    /// The effective lookup chain of a segment.
    pub fn inheritance(&self, segment: impl Into<SegmentId>) -> Vec<SegmentId> {
        self.core.inheritance(&segment.into())
    }

    // -----------------------------------------------------------------------
    // Reads and writes
    // -----------------------------------------------------------------------

    pub fn get(&self, segment: &SegmentId, key: &K) -> Option<V> {
        self.core.get(segment, key)
    }

    pub fn has(&self, segment: &SegmentId, key: &K) -> bool {
        self.core.has(segment, key)
    }

    pub fn set(
        &self,
        layer: impl Into<Layer>,
        segment: impl Into<SegmentId>,
        key: K,
        value: V,
    ) -> StoreResult<CommitSummary<K>> {
        let mut tx = self.open_transaction();
        tx.set_in(layer, segment, key, value)?;
        tx.commit()
    }

    pub fn delete(
        &self,
        layer: impl Into<Layer>,
        segment: impl Into<SegmentId>,
        key: &K,
    ) -> StoreResult<CommitSummary<K>> {
        let mut tx = self.open_transaction();
        tx.delete_in(layer, segment, key)?;
        tx.commit()
    }

    /// A transaction that may write to any segment.
    pub fn open_transaction(&self) -> StoreTransaction<K, V> {
        StoreTransaction::new(TransactionQueue::new(
            Arc::clone(&self.core),
            Arc::clone(&self.listeners),
        ))
    }

    /// Run `build` against a fresh whole-store transaction and commit it if
    /// `build` succeeds.
    pub fn run_transaction<F>(&self, build: F) -> StoreResult<CommitSummary<K>>
    where
        F: FnOnce(&mut StoreTransaction<K, V>) -> StoreResult<()>,
    {
        let mut tx = self.open_transaction();
        match build(&mut tx) {
            Ok(()) => tx.commit(),
            Err(e) => {
                tx.abort();
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Registrations
    // -----------------------------------------------------------------------

    /// Register validators for `key`. Fails if it already has some.
    pub fn set_validators(&self, key: K, validators: Vec<Validator<V>>) -> StoreResult<()> {
        self.core.set_validators(key, validators, false)
    }

    pub fn replace_validators(&self, key: K, validators: Vec<Validator<V>>) -> StoreResult<()> {
        self.core.set_validators(key, validators, true)
    }

    /// Register an expander splitting values written to `key`; deleting
    /// `key` deletes `affects`. Fails if `key` already has an expander.
    pub fn set_expander<F>(&self, key: K, affects: Vec<K>, expand: F) -> StoreResult<()>
    where
        F: Fn(&V) -> Vec<(K, V)> + Send + Sync + 'static,
    {
        self.core.set_expander(key, affects, expand, false)
    }

    pub fn replace_expander<F>(&self, key: K, affects: Vec<K>, expand: F) -> StoreResult<()>
    where
        F: Fn(&V) -> Vec<(K, V)> + Send + Sync + 'static,
    {
        self.core.set_expander(key, affects, expand, true)
    }

    /// Replace the handler called with `(key, value, messages)` for rejected
    /// values.
    pub fn set_invalid_handler<F>(&self, handler: F)
    where
        F: Fn(&K, &V, &[String]) -> StoreResult<()> + Send + Sync + 'static,
    {
        self.core.set_invalid_handler(handler);
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    pub fn on<F>(&self, segment: impl Into<SegmentId>, matchers: Vec<KeyMatcher<K>>, callback: F) -> ListenerId
    where
        F: Fn(&[K]) + Send + Sync + 'static,
    {
        self.listeners.on(segment.into(), matchers, callback)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.listeners.off(id)
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    pub fn export_to_object(&self, segment: &SegmentId, keys: &[K]) -> StoreResult<serde_json::Value>
    where
        V: Serialize,
    {
        self.core.export_to_object(segment, keys)
    }

    pub fn dump(&self) -> StorageDump {
        self.core.dump()
    }

    /// Emit a [`StorageDump`] through `tracing` at info level.
    pub fn dump_content(&self) {
        let dump = self.dump();
        info!(
            layers = dump.layers.len(),
            segments = dump.segments.len(),
            cached = dump.cache.len(),
            cells = dump.data.len(),
            "{dump}"
        );
    }
}

impl<K: StoreKey, V: StoreValue> Default for LayeredStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for LayeredStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredStore")
            .field("core", &self.core)
            .field("listeners", &self.listeners)
            .finish()
    }
}
