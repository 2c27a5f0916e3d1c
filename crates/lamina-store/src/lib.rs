//! Layered, segmented override store for Lamina.
//!
//! A value is addressed by `(layer, segment, key)`. Reading a key from a
//! segment resolves one current value: the highest layer holding a value
//! anywhere on the segment's inheritance chain wins, and within a layer the
//! chain is consulted in order. Every segment falls back to the global
//! segment unless its chain says otherwise. Lookups are memoized per segment.
//!
//! Writes go through transactions: values are validated and expanded when
//! queued, applied together on commit, and listeners hear about the touched
//! keys afterwards.
//!
//! # Modules
//!
//! - [`store`] — [`LayeredStore`], the entry point
//! - [`segment`] — [`Segment`] handles bound to one segment
//! - [`transaction`] — Segment-bound and whole-store transactions
//! - [`core`] — [`StorageCore`], the storage primitives
//! - [`cache`] — [`ResultCache`] of memoized lookups
//! - [`registry`] — Validator and expander registrations
//! - [`listener`] — Change listeners
//! - [`export`] — Export to nested JSON
//! - [`dump`] — Diagnostic snapshots
//! - [`config`] — [`StoreConfig`]
//! - [`types`] — [`Layer`], [`SegmentId`], key and value bounds
//! - [`error`] — Error types

pub mod cache;
pub mod config;
pub mod core;
pub mod dump;
pub mod error;
pub mod export;
pub mod listener;
pub mod registry;
pub mod segment;
pub mod store;
pub mod transaction;
pub mod types;

pub use cache::{Cached, ResultCache};
pub use config::{InvalidValuePolicy, StoreConfig, DEFAULT_MAX_EXPANSION_DEPTH};
pub use self::core::{InvalidHandler, StorageCore};
pub use dump::{CacheLine, DataLine, StorageDump};
pub use error::{StoreError, StoreResult};
pub use listener::{keys, KeyMatcher, ListenerId, ListenerRegistry};
pub use registry::{Expander, Registry};
pub use segment::Segment;
pub use store::LayeredStore;
pub use transaction::{CommitSummary, SegmentTransaction, StoreTransaction};
pub use types::{Layer, SegmentId, StoreKey, StoreValue};

pub use lamina_validate as validate;
