//! Transactions: validated, expanded mutations applied on commit.
//!
//! Values are validated and expanded when they are queued, so an invalid
//! top-level value is reported at the `set` call. Nothing queued is visible
//! to readers until `commit` applies the queue in order. Once the queue has
//! been applied, listeners are notified with the keys that were touched.

use std::sync::Arc;

use tracing::debug;

use crate::core::StorageCore;
use crate::error::StoreResult;
use crate::listener::ListenerRegistry;
use crate::types::{Layer, SegmentId, StoreKey, StoreValue};

/// One queued write.
#[derive(Clone, Debug)]
pub(crate) enum Mutation<K, V> {
    Set {
        layer: Layer,
        segment: SegmentId,
        key: K,
        value: V,
    },
    Delete {
        layer: Layer,
        segment: SegmentId,
        key: K,
    },
}

impl<K, V> Mutation<K, V> {
    pub(crate) fn target(&self) -> (&SegmentId, &K) {
        match self {
            Mutation::Set { segment, key, .. } | Mutation::Delete { segment, key, .. } => (segment, key),
        }
    }
}

/// Outcome of a commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitSummary<K> {
    /// Mutations that changed storage (deletes always count).
    pub applied: usize,
    /// Sets skipped because their leaf value was rejected.
    pub skipped: usize,
    /// Touched keys per segment, in touch order, without repeats.
    pub touched: Vec<(SegmentId, Vec<K>)>,
}

impl<K> CommitSummary<K> {
    fn empty() -> Self {
        Self {
            applied: 0,
            skipped: 0,
            touched: Vec::new(),
        }
    }

    /// The keys touched in `segment`.
    pub fn touched_in(&self, segment: &SegmentId) -> &[K] {
        self.touched
            .iter()
            .find(|(touched, _)| touched == segment)
            .map(|(_, keys)| keys.as_slice())
            .unwrap_or_default()
    }
}

fn record<K: StoreKey>(touched: &mut Vec<(SegmentId, Vec<K>)>, segment: &SegmentId, key: &K) {
    match touched.iter_mut().find(|(s, _)| s == segment) {
        Some((_, keys)) => {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        None => touched.push((segment.clone(), vec![key.clone()])),
    }
}

/// The queue shared by both transaction shapes.
pub(crate) struct TransactionQueue<K, V> {
    core: Arc<StorageCore<K, V>>,
    listeners: Arc<ListenerRegistry<K>>,
    queue: Vec<Mutation<K, V>>,
}

impl<K: StoreKey, V: StoreValue> TransactionQueue<K, V> {
    pub(crate) fn new(core: Arc<StorageCore<K, V>>, listeners: Arc<ListenerRegistry<K>>) -> Self {
        Self {
            core,
            listeners,
            queue: Vec::new(),
        }
    }

    pub(crate) fn set(&mut self, layer: Layer, segment: &SegmentId, key: K, value: V) -> StoreResult<()> {
        self.core.config().check_layer(layer)?;
        for (key, value) in self.core.expand_for_set(key, value)? {
            self.queue.push(Mutation::Set {
                layer,
                segment: segment.clone(),
                key,
                value,
            });
        }
        Ok(())
    }

    pub(crate) fn delete(&mut self, layer: Layer, segment: &SegmentId, key: &K) -> StoreResult<()> {
        self.core.config().check_layer(layer)?;
        for key in self.core.expand_for_delete(key)? {
            self.delete_exact(layer, segment, key);
        }
        Ok(())
    }

    /// Queue a delete of `key` itself, bypassing expansion.
    pub(crate) fn delete_exact(&mut self, layer: Layer, segment: &SegmentId, key: K) {
        self.queue.push(Mutation::Delete {
            layer,
            segment: segment.clone(),
            key,
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    /// Apply the queue in order, then notify listeners.
    ///
    /// Leaves are validated first, without the storage lock, so the invalid
    /// handler may read the store. The accepted prefix is then written under
    /// one lock acquisition; concurrent readers see all of it or none of it.
    ///
    /// On the first failing mutation the rest of the queue is dropped;
    /// listeners still hear about what was applied before the error is
    /// returned. Applied mutations are not rolled back.
    pub(crate) fn commit(&mut self) -> StoreResult<CommitSummary<K>> {
        let mutations = std::mem::take(&mut self.queue);
        let mut summary = CommitSummary::empty();
        let mut accepted = Vec::with_capacity(mutations.len());
        let mut failure = None;

        for mutation in mutations {
            match self.core.admit(&mutation) {
                Ok(true) => {
                    summary.applied += 1;
                    let (segment, key) = mutation.target();
                    record(&mut summary.touched, segment, key);
                    accepted.push(mutation);
                }
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        self.core.apply(accepted);

        debug!(
            applied = summary.applied,
            skipped = summary.skipped,
            segments = summary.touched.len(),
            failed = failure.is_some(),
            "transaction committed"
        );
        self.listeners.dispatch(&summary.touched);
        match failure {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    /// Discard the queue. Returns how many mutations were dropped.
    pub(crate) fn abort(&mut self) -> usize {
        let dropped = self.queue.len();
        self.queue.clear();
        dropped
    }
}

// ---------------------------------------------------------------------------
// Segment-bound transaction
// ---------------------------------------------------------------------------

/// A transaction writing to one segment.
///
/// After `commit` or `abort` the transaction is empty and may be reused.
pub struct SegmentTransaction<K, V> {
    segment: SegmentId,
    queue: TransactionQueue<K, V>,
}

impl<K: StoreKey, V: StoreValue> SegmentTransaction<K, V> {
    pub(crate) fn new(segment: SegmentId, queue: TransactionQueue<K, V>) -> Self {
        Self { segment, queue }
    }

    pub fn segment(&self) -> &SegmentId {
        &self.segment
    }

    /// Validate, expand and queue `value` for `key`.
    pub fn set(&mut self, layer: impl Into<Layer>, key: K, value: V) -> StoreResult<()> {
        self.queue.set(layer.into(), &self.segment, key, value)
    }

    /// Queue deletion of `key` and every key it expands to.
    pub fn delete(&mut self, layer: impl Into<Layer>, key: &K) -> StoreResult<()> {
        self.queue.delete(layer.into(), &self.segment, key)
    }

    pub(crate) fn delete_exact(&mut self, layer: Layer, key: K) {
        self.queue.delete_exact(layer, &self.segment, key);
    }

    /// Number of queued mutations.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.len() == 0
    }

    pub fn commit(&mut self) -> StoreResult<CommitSummary<K>> {
        self.queue.commit()
    }

    pub fn abort(&mut self) -> usize {
        self.queue.abort()
    }
}

// ---------------------------------------------------------------------------
// Whole-storage transaction
// ---------------------------------------------------------------------------

/// A transaction writing to any segment.
///
/// `set` and `delete` target the global segment; `set_in` and `delete_in`
/// name the segment explicitly.
pub struct StoreTransaction<K, V> {
    queue: TransactionQueue<K, V>,
}

impl<K: StoreKey, V: StoreValue> StoreTransaction<K, V> {
    pub(crate) fn new(queue: TransactionQueue<K, V>) -> Self {
        Self { queue }
    }

    pub fn set(&mut self, layer: impl Into<Layer>, key: K, value: V) -> StoreResult<()> {
        self.queue.set(layer.into(), &SegmentId::Global, key, value)
    }

    pub fn set_in(
        &mut self,
        layer: impl Into<Layer>,
        segment: impl Into<SegmentId>,
        key: K,
        value: V,
    ) -> StoreResult<()> {
        self.queue.set(layer.into(), &segment.into(), key, value)
    }

    pub fn delete(&mut self, layer: impl Into<Layer>, key: &K) -> StoreResult<()> {
        self.queue.delete(layer.into(), &SegmentId::Global, key)
    }

    pub fn delete_in(&mut self, layer: impl Into<Layer>, segment: impl Into<SegmentId>, key: &K) -> StoreResult<()> {
        self.queue.delete(layer.into(), &segment.into(), key)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.len() == 0
    }

    pub fn commit(&mut self) -> StoreResult<CommitSummary<K>> {
        self.queue.commit()
    }

    pub fn abort(&mut self) -> usize {
        self.queue.abort()
    }
}
