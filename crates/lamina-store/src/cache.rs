//! Memoized lookup results.
//!
//! The cache maps `(segment, key)` to the outcome of the last resolution.
//! A key that resolved to nothing is remembered as [`Cached::Absent`], which
//! is distinct from having no entry at all ("not yet computed").
//!
//! Invalidation is the only policy here:
//! - a write to the global segment drops the key from every cached segment,
//!   since every segment may inherit through global;
//! - a write to any other segment drops the key from that segment only.
//!
//! Segments whose entries all get invalidated are removed, so an idle cache
//! holds no empty maps.

use std::collections::HashMap;

use crate::types::{SegmentId, StoreKey};

/// A memoized resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cached<V> {
    /// The key resolved to this value.
    Present(V),
    /// The key was confirmed absent.
    Absent,
}

impl<V> Cached<V> {
    /// The cached outcome as an `Option`.
    pub fn as_option(&self) -> Option<&V> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }
}

impl<V> From<Option<V>> for Cached<V> {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(value) => Self::Present(value),
            None => Self::Absent,
        }
    }
}

/// Per-segment cache of resolved lookups.
#[derive(Debug)]
pub struct ResultCache<K, V> {
    segments: HashMap<SegmentId, HashMap<K, Cached<V>>>,
}

impl<K: StoreKey, V: Clone> ResultCache<K, V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            segments: HashMap::new(),
        }
    }

    /// The memoized outcome for `(segment, key)`, if one was computed.
    pub fn lookup(&self, segment: &SegmentId, key: &K) -> Option<&Cached<V>> {
        self.segments.get(segment)?.get(key)
    }

    /// Record the outcome of a resolution.
    pub fn remember(&mut self, segment: &SegmentId, key: K, outcome: Cached<V>) {
        self.segments
            .entry(segment.clone())
            .or_default()
            .insert(key, outcome);
    }

    /// Forget `key` after a write to `segment`.
    ///
    /// A write to [`SegmentId::Global`] forgets the key in every segment.
    pub fn invalidate(&mut self, segment: &SegmentId, key: &K) {
        if segment.is_global() {
            self.segments.retain(|_, entries| {
                entries.remove(key);
                !entries.is_empty()
            });
        } else if let Some(entries) = self.segments.get_mut(segment) {
            entries.remove(key);
            if entries.is_empty() {
                self.segments.remove(segment);
            }
        }
    }

    /// Forget everything memoized for `segment`.
    pub fn invalidate_segment(&mut self, segment: &SegmentId) {
        self.segments.remove(segment);
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Number of segments with at least one memoized entry.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Total number of memoized entries.
    pub fn len(&self) -> usize {
        self.segments.values().map(HashMap::len).sum()
    }

    /// Returns `true` if nothing is memoized.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Iterate over `(segment, key, outcome)` triples in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&SegmentId, &K, &Cached<V>)> {
        self.segments
            .iter()
            .flat_map(|(segment, entries)| entries.iter().map(move |(k, v)| (segment, k, v)))
    }
}

impl<K: StoreKey, V: Clone> Default for ResultCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
