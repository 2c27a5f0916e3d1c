//! The storage core: layered data, inheritance, the result cache and the
//! registries, behind one type.
//!
//! Reads go cache first. On a miss the value is resolved by walking layers
//! from highest to lowest priority and, within each layer, the segment's
//! inheritance chain in order. Layer priority always dominates chain order.
//!
//! Writes here are the low-level primitives. They validate and invalidate
//! but never notify listeners; transactions do that on commit.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use lamina_validate::Validator;
use tracing::{debug, trace, warn};

use crate::cache::{Cached, ResultCache};
use crate::config::{InvalidValuePolicy, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::registry::{Expander, Registry};
use crate::transaction::Mutation;
use crate::types::{Layer, SegmentId, StoreKey, StoreValue};

/// Callback invoked with `(key, value, messages)` when validators reject a
/// value. Returning an error aborts the triggering operation.
pub type InvalidHandler<K, V> = Arc<dyn Fn(&K, &V, &[String]) -> StoreResult<()> + Send + Sync>;

/// The handler installed for a policy.
pub(crate) fn policy_handler<K: StoreKey, V: StoreValue>(
    policy: InvalidValuePolicy,
) -> InvalidHandler<K, V> {
    match policy {
        InvalidValuePolicy::Warn => Arc::new(|key: &K, value: &V, messages: &[String]| {
            warn!(
                key = ?key,
                value = ?value,
                messages = %messages.join("; "),
                "rejected invalid value"
            );
            Ok(())
        }),
        InvalidValuePolicy::Ignore => Arc::new(|_: &K, _: &V, _: &[String]| Ok(())),
        InvalidValuePolicy::Reject => Arc::new(|key: &K, _: &V, messages: &[String]| {
            Err(StoreError::invalid_value(key, messages))
        }),
    }
}

/// Storage maps guarded together, so a write and its cache invalidation are
/// observed as one step.
pub(crate) struct CoreState<K, V> {
    /// layer -> segment -> key -> value. No empty inner map persists.
    pub(crate) data: BTreeMap<Layer, HashMap<SegmentId, HashMap<K, V>>>,
    /// Explicit lookup chains, each starting with its own segment.
    pub(crate) inheritance: HashMap<SegmentId, Vec<SegmentId>>,
    /// Segments written to or cloned into since their last deletion.
    pub(crate) registered: HashSet<SegmentId>,
    pub(crate) cache: ResultCache<K, V>,
}

impl<K: StoreKey, V: StoreValue> CoreState<K, V> {
    fn new() -> Self {
        Self {
            data: BTreeMap::new(),
            inheritance: HashMap::new(),
            registered: HashSet::new(),
            cache: ResultCache::new(),
        }
    }

    pub(crate) fn chain(&self, segment: &SegmentId) -> Cow<'_, [SegmentId]> {
        match self.inheritance.get(segment) {
            Some(chain) => Cow::Borrowed(chain.as_slice()),
            None if segment.is_global() => Cow::Owned(vec![SegmentId::Global]),
            None => Cow::Owned(vec![segment.clone(), SegmentId::Global]),
        }
    }

    fn resolve(&self, segment: &SegmentId, key: &K) -> Option<V> {
        let chain = self.chain(segment);
        self.data.values().rev().find_map(|segments| {
            chain
                .iter()
                .find_map(|link| segments.get(link).and_then(|entries| entries.get(key)))
                .cloned()
        })
    }

    fn insert(&mut self, layer: Layer, segment: &SegmentId, key: K, value: V) {
        let segments = self.data.entry(layer).or_insert_with(|| {
            debug!(%layer, "layer created");
            HashMap::new()
        });
        segments.entry(segment.clone()).or_default().insert(key, value);
        if !self.registered.contains(segment) {
            self.registered.insert(segment.clone());
        }
    }

    fn remove(&mut self, layer: Layer, segment: &SegmentId, key: &K) -> bool {
        let Some(segments) = self.data.get_mut(&layer) else {
            return false;
        };
        let Some(entries) = segments.get_mut(segment) else {
            return false;
        };
        let removed = entries.remove(key).is_some();
        if entries.is_empty() {
            segments.remove(segment);
        }
        if segments.is_empty() {
            self.data.remove(&layer);
            debug!(%layer, "layer purged");
        }
        removed
    }
}

/// Layered, segmented key-value storage with memoized lookups.
///
/// Usually reached through [`LayeredStore`](crate::LayeredStore) and
/// [`Segment`](crate::Segment) handles; the methods here are the primitives
/// they build on and do not notify listeners.
pub struct StorageCore<K, V> {
    config: StoreConfig,
    state: RwLock<CoreState<K, V>>,
    registry: RwLock<Registry<K, V>>,
    invalid_handler: RwLock<InvalidHandler<K, V>>,
}

impl<K: StoreKey, V: StoreValue> StorageCore<K, V> {
    /// Create an empty core. The configuration is assumed valid.
    pub fn new(config: StoreConfig) -> Self {
        let handler = policy_handler(config.invalid_values);
        Self {
            config,
            state: RwLock::new(CoreState::new()),
            registry: RwLock::new(Registry::new()),
            invalid_handler: RwLock::new(handler),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, CoreState<K, V>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CoreState<K, V>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_registry(&self) -> RwLockReadGuard<'_, Registry<K, V>> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, Registry<K, V>> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// The current value of `key` as seen from `segment`.
    pub fn get(&self, segment: &SegmentId, key: &K) -> Option<V> {
        {
            let state = self.read_state();
            if let Some(hit) = state.cache.lookup(segment, key) {
                trace!(%segment, ?key, "cache hit");
                return hit.as_option().cloned();
            }
        }

        let mut state = self.write_state();
        let resolved = state.resolve(segment, key);
        trace!(%segment, ?key, found = resolved.is_some(), "cache miss");
        state
            .cache
            .remember(segment, key.clone(), Cached::from(resolved.clone()));
        resolved
    }

    /// Returns `true` if `key` resolves to a value from `segment`.
    pub fn has(&self, segment: &SegmentId, key: &K) -> bool {
        self.get(segment, key).is_some()
    }

    /// The effective lookup chain of `segment`, starting with itself.
    pub fn inheritance(&self, segment: &SegmentId) -> Vec<SegmentId> {
        self.read_state().chain(segment).into_owned()
    }

    /// Layers currently holding data, highest priority first.
    pub fn layers(&self) -> Vec<Layer> {
        self.read_state().data.keys().rev().copied().collect()
    }

    /// Segments holding data on any layer, sorted.
    pub fn segments(&self) -> Vec<SegmentId> {
        let state = self.read_state();
        let mut segments: Vec<SegmentId> = state
            .data
            .values()
            .flat_map(|segments| segments.keys().cloned())
            .collect();
        segments.sort();
        segments.dedup();
        segments
    }

    /// Keys `segment` itself stores on `layer`, ignoring inheritance.
    pub fn keys_on(&self, layer: Layer, segment: &SegmentId) -> Vec<K> {
        self.read_state()
            .data
            .get(&layer)
            .and_then(|segments| segments.get(segment))
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of memoized lookups.
    pub fn cached_entries(&self) -> usize {
        self.read_state().cache.len()
    }

    /// Number of segments with memoized lookups.
    pub fn cached_segments(&self) -> usize {
        self.read_state().cache.segment_count()
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Store `value` at `(layer, segment, key)`.
    ///
    /// Returns `Ok(false)` if validators rejected the value and the invalid
    /// handler chose to skip it.
    pub fn set(&self, layer: Layer, segment: &SegmentId, key: K, value: V) -> StoreResult<bool> {
        self.config.check_layer(layer)?;
        if !self.accept(&key, &value)? {
            return Ok(false);
        }

        let mut state = self.write_state();
        state.cache.invalidate(segment, &key);
        state.insert(layer, segment, key, value);
        Ok(true)
    }

    /// Remove the value at `(layer, segment, key)`.
    ///
    /// Returns whether a value was stored there.
    pub fn delete(&self, layer: Layer, segment: &SegmentId, key: &K) -> StoreResult<bool> {
        self.config.check_layer(layer)?;
        let mut state = self.write_state();
        let removed = state.remove(layer, segment, key);
        state.cache.invalidate(segment, key);
        Ok(removed)
    }

    /// Decide whether a queued mutation should be written.
    ///
    /// Checks the layer and, for sets, runs the leaf validators. Returns
    /// `Ok(false)` for a set the invalid handler chose to skip.
    pub(crate) fn admit(&self, mutation: &Mutation<K, V>) -> StoreResult<bool> {
        match mutation {
            Mutation::Set { layer, key, value, .. } => {
                self.config.check_layer(*layer)?;
                self.accept(key, value)
            }
            Mutation::Delete { layer, .. } => {
                self.config.check_layer(*layer)?;
                Ok(true)
            }
        }
    }

    /// Write admitted mutations in order under a single lock acquisition.
    pub(crate) fn apply(&self, mutations: Vec<Mutation<K, V>>) {
        if mutations.is_empty() {
            return;
        }
        let mut state = self.write_state();
        for mutation in mutations {
            match mutation {
                Mutation::Set {
                    layer,
                    segment,
                    key,
                    value,
                } => {
                    state.cache.invalidate(&segment, &key);
                    state.insert(layer, &segment, key, value);
                }
                Mutation::Delete { layer, segment, key } => {
                    state.remove(layer, &segment, &key);
                    state.cache.invalidate(&segment, &key);
                }
            }
        }
    }

    /// Copy every layer's data of `source` into `target`.
    ///
    /// Fails with [`StoreError::DuplicateSegment`] before copying anything if
    /// `target` was written to or cloned into since it was last deleted, even
    /// when it holds no data now.
    pub fn clone_segment_data(&self, source: &SegmentId, target: &SegmentId) -> StoreResult<()> {
        let mut state = self.write_state();
        if state.registered.contains(target) {
            return Err(StoreError::DuplicateSegment {
                segment: target.clone(),
            });
        }

        let mut layers = 0;
        for segments in state.data.values_mut() {
            if let Some(entries) = segments.get(source) {
                let copy = entries.clone();
                segments.insert(target.clone(), copy);
                layers += 1;
            }
        }
        state.registered.insert(target.clone());

        if target.is_global() {
            state.cache.clear();
        } else {
            state.cache.invalidate_segment(target);
        }
        debug!(%source, %target, layers, "segment cloned");
        Ok(())
    }

    /// Remove all data, cached lookups and the inheritance chain of `segment`.
    pub fn delete_segment_data(&self, segment: &SegmentId) {
        let mut state = self.write_state();
        state.data.retain(|layer, segments| {
            segments.remove(segment);
            if segments.is_empty() {
                debug!(%layer, "layer purged");
            }
            !segments.is_empty()
        });
        state.inheritance.remove(segment);
        state.registered.remove(segment);
        if segment.is_global() {
            state.cache.clear();
        } else {
            state.cache.invalidate_segment(segment);
        }
        debug!(%segment, "segment data deleted");
    }

    /// Replace the lookup chain of `segment` with
    /// `[segment, ancestors.., Global?]`.
    ///
    /// Repeated segments keep their first position. Only the cache of
    /// `segment` itself is dropped; segments inheriting from it keep theirs.
    pub fn set_inheritance<I>(&self, segment: &SegmentId, ancestors: I, include_global: bool)
    where
        I: IntoIterator<Item = SegmentId>,
    {
        let mut chain = vec![segment.clone()];
        let tail = ancestors
            .into_iter()
            .chain(include_global.then_some(SegmentId::Global));
        for link in tail {
            if !chain.contains(&link) {
                chain.push(link);
            }
        }

        debug!(%segment, chain = ?chain, "inheritance changed");
        let mut state = self.write_state();
        state.inheritance.insert(segment.clone(), chain);
        state.cache.invalidate_segment(segment);
    }

    // -----------------------------------------------------------------------
    // Registrations
    // -----------------------------------------------------------------------

    pub fn set_validators(&self, key: K, validators: Vec<Validator<V>>, replace: bool) -> StoreResult<()> {
        self.write_registry().set_validators(key, validators, replace)
    }

    pub fn set_expander<F>(&self, key: K, affects: Vec<K>, expand: F, replace: bool) -> StoreResult<()>
    where
        F: Fn(&V) -> Vec<(K, V)> + Send + Sync + 'static,
    {
        self.write_registry()
            .set_expander(key, Expander::new(affects, expand), replace)
    }

    pub fn set_invalid_handler<F>(&self, handler: F)
    where
        F: Fn(&K, &V, &[String]) -> StoreResult<()> + Send + Sync + 'static,
    {
        *self
            .invalid_handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(handler);
    }

    /// Run the validators of `key` against `value`.
    ///
    /// All validators run; every failure message is collected. On rejection
    /// the invalid handler is called and `Ok(false)` returned unless it fails.
    pub fn accept(&self, key: &K, value: &V) -> StoreResult<bool> {
        let validators = self.read_registry().validators_for(key);
        let messages: Vec<String> = validators
            .iter()
            .filter_map(|validator| validator.check(value).err())
            .collect();
        if messages.is_empty() {
            return Ok(true);
        }

        let handler: InvalidHandler<K, V> = self
            .invalid_handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        handler(key, value, &messages)?;
        Ok(false)
    }

    // -----------------------------------------------------------------------
    // Expansion
    // -----------------------------------------------------------------------

    /// Validate `value` and split it into the leaf pairs to store.
    ///
    /// Output keys that have expanders of their own are validated and
    /// expanded again until only leaves remain. Leaves are validated later,
    /// when written. An invalid top-level or intermediate value yields no
    /// pairs for its subtree.
    pub fn expand_for_set(&self, key: K, value: V) -> StoreResult<Vec<(K, V)>> {
        let mut leaves = Vec::new();
        self.expand_into(key, value, 0, &mut leaves)?;
        if leaves.len() > 1 {
            debug!(count = leaves.len(), "value expanded");
        }
        Ok(leaves)
    }

    fn expand_into(&self, key: K, value: V, depth: usize, leaves: &mut Vec<(K, V)>) -> StoreResult<()> {
        if !self.accept(&key, &value)? {
            return Ok(());
        }
        let Some(expander) = self.read_registry().expander_for(&key) else {
            leaves.push((key, value));
            return Ok(());
        };
        if depth >= self.config.max_expansion_depth {
            return Err(StoreError::ExpansionTooDeep {
                key: format!("{key:?}"),
                depth,
            });
        }

        for (child_key, child_value) in expander.expand(&value) {
            if child_key != key && self.read_registry().has_expander(&child_key) {
                self.expand_into(child_key, child_value, depth + 1, leaves)?;
            } else {
                leaves.push((child_key, child_value));
            }
        }
        Ok(())
    }

    /// The stored keys removed by deleting `key`.
    pub fn expand_for_delete(&self, key: &K) -> StoreResult<Vec<K>> {
        let mut keys = Vec::new();
        self.expand_delete_into(key, 0, &mut keys)?;
        Ok(keys)
    }

    fn expand_delete_into(&self, key: &K, depth: usize, keys: &mut Vec<K>) -> StoreResult<()> {
        let Some(expander) = self.read_registry().expander_for(key) else {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
            return Ok(());
        };
        if depth >= self.config.max_expansion_depth {
            return Err(StoreError::ExpansionTooDeep {
                key: format!("{key:?}"),
                depth,
            });
        }

        for affected in &expander.affects {
            if affected != key && self.read_registry().has_expander(affected) {
                self.expand_delete_into(affected, depth + 1, keys)?;
            } else if !keys.contains(affected) {
                keys.push(affected.clone());
            }
        }
        Ok(())
    }
}

impl<K: StoreKey, V: StoreValue> Default for StorageCore<K, V> {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl<K, V> std::fmt::Debug for StorageCore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageCore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
