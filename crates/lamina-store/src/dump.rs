//! Diagnostic snapshot of a store's internals.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::StorageCore;
use crate::types::{Layer, SegmentId, StoreKey, StoreValue};

/// A stored cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DataLine {
    pub layer: Layer,
    pub segment: String,
    pub key: String,
    pub value: String,
}

/// A memoized lookup. `value` is `None` for a cached absence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CacheLine {
    pub segment: String,
    pub key: String,
    pub value: Option<String>,
}

/// Read-only snapshot of layers, segments, cache and data.
///
/// Keys and values are rendered with `Debug`; lines are sorted so two dumps
/// of the same state compare equal apart from `taken_at`.
#[derive(Clone, Debug, Serialize)]
pub struct StorageDump {
    pub taken_at: DateTime<Utc>,
    /// Highest priority first.
    pub layers: Vec<Layer>,
    pub segments: Vec<String>,
    /// Explicit inheritance chains only.
    pub inheritance: BTreeMap<String, Vec<String>>,
    pub cache: Vec<CacheLine>,
    pub data: Vec<DataLine>,
}

impl<K: StoreKey, V: StoreValue> StorageCore<K, V> {
    /// Take a [`StorageDump`].
    pub fn dump(&self) -> StorageDump {
        let state = self.read_state();

        let layers: Vec<Layer> = state.data.keys().rev().copied().collect();

        let mut segment_ids: Vec<&SegmentId> = state
            .data
            .values()
            .flat_map(|segments| segments.keys())
            .collect();
        segment_ids.sort();
        segment_ids.dedup();

        let inheritance = state
            .inheritance
            .iter()
            .map(|(segment, chain)| {
                (
                    segment.to_string(),
                    chain.iter().map(ToString::to_string).collect(),
                )
            })
            .collect();

        let mut cache: Vec<CacheLine> = state
            .cache
            .iter()
            .map(|(segment, key, outcome)| CacheLine {
                segment: segment.to_string(),
                key: format!("{key:?}"),
                value: outcome.as_option().map(|value| format!("{value:?}")),
            })
            .collect();
        cache.sort_by(|a, b| (&a.segment, &a.key).cmp(&(&b.segment, &b.key)));

        let mut data = Vec::new();
        for (layer, segments) in state.data.iter().rev() {
            let mut lines: Vec<DataLine> = segments
                .iter()
                .flat_map(|(segment, entries)| {
                    entries.iter().map(move |(key, value)| DataLine {
                        layer: *layer,
                        segment: segment.to_string(),
                        key: format!("{key:?}"),
                        value: format!("{value:?}"),
                    })
                })
                .collect();
            lines.sort_by(|a, b| (&a.segment, &a.key).cmp(&(&b.segment, &b.key)));
            data.extend(lines);
        }

        StorageDump {
            taken_at: Utc::now(),
            layers,
            segments: segment_ids.into_iter().map(ToString::to_string).collect(),
            inheritance,
            cache,
            data,
        }
    }
}

impl fmt::Display for StorageDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "storage dump at {}", self.taken_at.to_rfc3339())?;

        let layers: Vec<String> = self.layers.iter().map(ToString::to_string).collect();
        writeln!(f, "layers: [{}]", layers.join(", "))?;
        writeln!(f, "segments: [{}]", self.segments.join(", "))?;

        writeln!(f, "inheritance:")?;
        for (segment, chain) in &self.inheritance {
            writeln!(f, "  {segment}: {}", chain.join(" -> "))?;
        }

        writeln!(f, "cache ({} entries):", self.cache.len())?;
        for line in &self.cache {
            match &line.value {
                Some(value) => writeln!(f, "  {} {} = {value}", line.segment, line.key)?,
                None => writeln!(f, "  {} {} = <absent>", line.segment, line.key)?,
            }
        }

        writeln!(f, "data ({} cells):", self.data.len())?;
        for line in &self.data {
            writeln!(
                f,
                "  [{}] {} {} = {}",
                line.layer, line.segment, line.key, line.value
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_lists_everything() {
        let core: StorageCore<&'static str, i32> = StorageCore::default();
        core.set(Layer::new(1), &SegmentId::Global, "v", 1).unwrap();
        core.set(Layer::new(9), &SegmentId::from("s"), "v", 9).unwrap();
        core.set_inheritance(&SegmentId::from("t"), [SegmentId::from("s")], false);
        core.get(&SegmentId::from("s"), &"v");
        core.get(&SegmentId::from("t"), &"missing");

        let dump = core.dump();
        assert_eq!(dump.layers, vec![Layer::new(9), Layer::new(1)]);
        assert_eq!(dump.segments, vec!["<global>", "s"]);
        assert_eq!(dump.inheritance["t"], vec!["t", "s"]);
        assert_eq!(
            dump.cache,
            vec![
                CacheLine {
                    segment: "s".into(),
                    key: "\"v\"".into(),
                    value: Some("9".into()),
                },
                CacheLine {
                    segment: "t".into(),
                    key: "\"missing\"".into(),
                    value: None,
                },
            ]
        );
        assert_eq!(dump.data.len(), 2);
        assert_eq!(dump.data[0].layer, Layer::new(9));

        let text = dump.to_string();
        assert!(text.contains("layers: [9, 1]"));
        assert!(text.contains("t: t -> s"));
        assert!(text.contains("\"missing\" = <absent>"));
    }

    #[test]
    fn dump_serializes() {
        let core: StorageCore<&'static str, i32> = StorageCore::default();
        core.set(Layer::new(2), &SegmentId::Global, "k", 5).unwrap();
        let json = serde_json::to_value(core.dump()).unwrap();
        assert_eq!(json["layers"], serde_json::json!([2]));
        assert_eq!(json["data"][0]["value"], "5");
    }
}
