//! Export of resolved values as a JSON object.
//!
//! Text keys are treated as dotted paths: `"a.b.c"` is written to
//! `{"a": {"b": {"c": ..}}}`. Keys without a text form become flat
//! properties named after the key. Absent keys are left out.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::StorageCore;
use crate::error::StoreResult;
use crate::types::{SegmentId, StoreKey, StoreValue};

impl<K: StoreKey, V: StoreValue + Serialize> StorageCore<K, V> {
    /// Resolve `keys` from `segment` into a nested JSON object.
    pub fn export_to_object(&self, segment: &SegmentId, keys: &[K]) -> StoreResult<Value> {
        let mut root = Map::new();
        for key in keys {
            let Some(value) = self.get(segment, key) else {
                continue;
            };
            let value = serde_json::to_value(&value)?;
            match key.as_text() {
                Some(path) => insert_path(&mut root, path, value),
                None => {
                    root.insert(key.property_name(), value);
                }
            }
        }
        Ok(Value::Object(root))
    }
}

/// Assign `value` at a dotted `path`, creating intermediate objects.
///
/// A non-object found where an intermediate object is needed is replaced.
fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut parts = path.split('.');
    let Some(last) = parts.next_back() else {
        return;
    };
    let mut node = root;
    for part in parts {
        let child = node
            .entry(part)
            .or_insert_with(|| Value::Object(Map::new()));
        if !child.is_object() {
            *child = Value::Object(Map::new());
        }
        node = match child {
            Value::Object(map) => map,
            _ => return,
        };
    }
    node.insert(last.to_string(), value);
}
