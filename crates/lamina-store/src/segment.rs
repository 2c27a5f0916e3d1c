use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::core::StorageCore;
use crate::error::StoreResult;
use crate::listener::{KeyMatcher, ListenerId, ListenerRegistry};
use crate::transaction::{CommitSummary, SegmentTransaction, TransactionQueue};
use crate::types::{Layer, SegmentId, StoreKey, StoreValue};

/// A handle bound to one segment of a store.
///
/// Handles are cheap to clone. Writes through a handle go through a
/// single-operation transaction, so listeners are notified.
pub struct Segment<K, V> {
    id: SegmentId,
    core: Arc<StorageCore<K, V>>,
    listeners: Arc<ListenerRegistry<K>>,
}

impl<K, V> Clone for Segment<K, V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            core: Arc::clone(&self.core),
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<K: StoreKey, V: StoreValue> Segment<K, V> {
    pub(crate) fn new(
        id: SegmentId,
        core: Arc<StorageCore<K, V>>,
        listeners: Arc<ListenerRegistry<K>>,
    ) -> Self {
        Self { id, core, listeners }
    }

    pub fn id(&self) -> &SegmentId {
        &self.id
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.core.get(&self.id, key)
    }

    pub fn has(&self, key: &K) -> bool {
        self.core.has(&self.id, key)
    }

    pub fn set(&self, layer: impl Into<Layer>, key: K, value: V) -> StoreResult<CommitSummary<K>> {
        let mut tx = self.open_transaction();
        tx.set(layer, key, value)?;
        tx.commit()
    }

    pub fn delete(&self, layer: impl Into<Layer>, key: &K) -> StoreResult<CommitSummary<K>> {
        let mut tx = self.open_transaction();
        tx.delete(layer, key)?;
        tx.commit()
    }

    /// Delete every key this segment stores on `layer`.
    pub fn delete_layer(&self, layer: impl Into<Layer>) -> StoreResult<CommitSummary<K>> {
        let layer = layer.into();
        self.core.config().check_layer(layer)?;
        let mut tx = self.open_transaction();
        for key in self.core.keys_on(layer, &self.id) {
            tx.delete_exact(layer, key);
        }
        tx.commit()
    }

    /// Replace this segment's lookup chain with `[self, ancestors.., Global?]`.
    pub fn set_inheritance<I>(&self, ancestors: I, include_global: bool)
    where
        I: IntoIterator,
        I::Item: Into<SegmentId>,
    {
        self.core.set_inheritance(
            &self.id,
            ancestors.into_iter().map(Into::into),
            include_global,
        );
    }

    /// Copy this segment's data into `target` and return a handle to it.
    pub fn clone_segment(&self, target: impl Into<SegmentId>) -> StoreResult<Segment<K, V>> {
        let target = target.into();
        self.core.clone_segment_data(&self.id, &target)?;
        Ok(Self::new(target, Arc::clone(&self.core), Arc::clone(&self.listeners)))
    }

    pub fn export_to_object(&self, keys: &[K]) -> StoreResult<serde_json::Value>
    where
        V: Serialize,
    {
        self.core.export_to_object(&self.id, keys)
    }

    pub fn open_transaction(&self) -> SegmentTransaction<K, V> {
        SegmentTransaction::new(
            self.id.clone(),
            TransactionQueue::new(Arc::clone(&self.core), Arc::clone(&self.listeners)),
        )
    }

    /// Run `build` against a fresh transaction and commit it if `build`
    /// succeeds. On error nothing is applied and the error is returned.
    pub fn run_transaction<F>(&self, build: F) -> StoreResult<CommitSummary<K>>
    where
        F: FnOnce(&mut SegmentTransaction<K, V>) -> StoreResult<()>,
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

    /// Subscribe to changes of matching keys in this segment.
    pub fn on<F>(&self, matchers: Vec<KeyMatcher<K>>, callback: F) -> ListenerId
    where
        F: Fn(&[K]) + Send + Sync + 'static,
    {
        self.listeners.on(self.id.clone(), matchers, callback)
    }

    /// Remove this segment's data, cache, inheritance and listeners.
    pub fn close(&self) {
        self.core.delete_segment_data(&self.id);
        self.listeners.remove_segment(&self.id);
    }
}

impl<K, V> fmt::Debug for Segment<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment").field("id", &self.id).finish()
    }
}
