//! Change listeners.
//!
//! A listener belongs to one segment and watches keys through
//! [`KeyMatcher`]s. After a commit it is called once per touched segment
//! group with the touched keys it matches, in the order they were touched.
//! Touches of the global segment reach the listeners of every segment.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use regex::Regex;
use tracing::debug;

use crate::error::StoreResult;
use crate::types::{SegmentId, StoreKey};

/// Callback receiving the matching subset of touched keys.
pub type ListenerFn<K> = Arc<dyn Fn(&[K]) + Send + Sync>;

/// Handle returned by `on`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Selects the keys a listener is interested in.
#[derive(Clone, Debug)]
pub enum KeyMatcher<K> {
    /// Every key.
    Any,
    /// Exactly this key.
    Key(K),
    /// Keys whose text form matches the pattern. Keys without a text form
    /// never match.
    Pattern(Regex),
}

impl<K: StoreKey> KeyMatcher<K> {
    pub fn key(key: K) -> Self {
        Self::Key(key)
    }

    /// Compile `pattern` into a matcher.
    pub fn pattern(pattern: &str) -> StoreResult<Self> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }

    pub fn matches(&self, key: &K) -> bool {
        match self {
            Self::Any => true,
            Self::Key(expected) => expected == key,
            Self::Pattern(re) => key.as_text().is_some_and(|text| re.is_match(text)),
        }
    }
}

/// Matchers for the given keys.
pub fn keys<K: StoreKey>(keys: impl IntoIterator<Item = K>) -> Vec<KeyMatcher<K>> {
    keys.into_iter().map(KeyMatcher::Key).collect()
}

struct Listener<K> {
    id: ListenerId,
    segment: SegmentId,
    matchers: Vec<KeyMatcher<K>>,
    callback: ListenerFn<K>,
}

impl<K: StoreKey> Listener<K> {
    fn accepts(&self, key: &K) -> bool {
        self.matchers.iter().any(|matcher| matcher.matches(key))
    }
}

struct ListenerTable<K> {
    next_id: u64,
    /// Registration order.
    listeners: Vec<Listener<K>>,
}

/// Listener subscriptions of one store.
pub struct ListenerRegistry<K> {
    table: RwLock<ListenerTable<K>>,
}

impl<K: StoreKey> ListenerRegistry<K> {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(ListenerTable {
                next_id: 0,
                listeners: Vec::new(),
            }),
        }
    }

    /// Subscribe `callback` to changes of matching keys in `segment`.
    pub fn on<F>(&self, segment: SegmentId, matchers: Vec<KeyMatcher<K>>, callback: F) -> ListenerId
    where
        F: Fn(&[K]) + Send + Sync + 'static,
    {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let id = ListenerId(table.next_id);
        table.next_id += 1;
        debug!(%id, %segment, "listener registered");
        table.listeners.push(Listener {
            id,
            segment,
            matchers,
            callback: Arc::new(callback),
        });
        id
    }

    /// Unsubscribe. Returns `false` if `id` was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let before = table.listeners.len();
        table.listeners.retain(|listener| listener.id != id);
        before != table.listeners.len()
    }

    /// Drop every listener of `segment`.
    pub fn remove_segment(&self, segment: &SegmentId) -> usize {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let before = table.listeners.len();
        table.listeners.retain(|listener| &listener.segment != segment);
        before - table.listeners.len()
    }

    pub fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notify listeners of the touched keys, grouped by segment.
    ///
    /// Calls are collected first and made with no lock held, so callbacks
    /// may read the store or change subscriptions.
    pub fn dispatch(&self, touched: &[(SegmentId, Vec<K>)]) {
        let calls: Vec<(ListenerFn<K>, Vec<K>)> = {
            let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
            let mut calls = Vec::new();
            for (segment, keys) in touched {
                let audience = table
                    .listeners
                    .iter()
                    .filter(|listener| segment.is_global() || &listener.segment == segment);
                for listener in audience {
                    let matching: Vec<K> = keys
                        .iter()
                        .filter(|key| listener.accepts(key))
                        .cloned()
                        .collect();
                    if !matching.is_empty() {
                        calls.push((Arc::clone(&listener.callback), matching));
                    }
                }
            }
            calls
        };

        for (callback, keys) in calls {
            callback(&keys);
        }
    }
}

impl<K: StoreKey> Default for ListenerRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Debug for ListenerRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len();
        f.debug_struct("ListenerRegistry")
            .field("listener_count", &count)
            .finish()
    }
}
