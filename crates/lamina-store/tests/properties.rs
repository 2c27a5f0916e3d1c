use std::collections::BTreeMap;

use proptest::prelude::*;

use lamina_store::{LayeredStore, SegmentId};

type Store = LayeredStore<&'static str, i64>;

const KEYS: [&str; 3] = ["alpha", "beta", "gamma"];

#[derive(Clone, Debug)]
enum Op {
    Set { layer: i32, segment: u8, key: usize, value: i64 },
    Delete { layer: i32, segment: u8, key: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-3..4i32, 0..3u8, 0..KEYS.len(), any::<i64>())
            .prop_map(|(layer, segment, key, value)| Op::Set { layer, segment, key, value }),
        (-3..4i32, 0..3u8, 0..KEYS.len())
            .prop_map(|(layer, segment, key)| Op::Delete { layer, segment, key }),
    ]
}

/// Segment 0 is global; 1 and 2 are named segments with default inheritance.
fn segment_id(index: u8) -> SegmentId {
    match index {
        0 => SegmentId::Global,
        n => SegmentId::Numbered(i64::from(n)),
    }
}

/// Reference model: (layer, segment, key) -> value.
type Model = BTreeMap<(i32, u8, usize), i64>;

fn expected(model: &Model, segment: u8, key: usize) -> Option<i64> {
    let chain: &[u8] = if segment == 0 { &[0] } else { &[segment, 0] };
    let mut layers: Vec<i32> = model.keys().map(|(layer, _, _)| *layer).collect();
    layers.sort_unstable();
    layers.dedup();
    layers.iter().rev().find_map(|layer| {
        chain
            .iter()
            .find_map(|link| model.get(&(*layer, *link, key)).copied())
    })
}

proptest! {
    /// Cached lookups agree with a from-scratch resolution after any
    /// sequence of writes, whether or not lookups were interleaved.
    #[test]
    fn lookups_match_reference_model(
        ops in prop::collection::vec(op(), 1..60),
        read_between in any::<bool>(),
    ) {
        let store = Store::new();
        let mut model = Model::new();

        for op in &ops {
            match *op {
                Op::Set { layer, segment, key, value } => {
                    store.set(layer, segment_id(segment), KEYS[key], value).unwrap();
                    model.insert((layer, segment, key), value);
                }
                Op::Delete { layer, segment, key } => {
                    store.delete(layer, segment_id(segment), &KEYS[key]).unwrap();
                    model.remove(&(layer, segment, key));
                }
            }
            if read_between {
                for segment in 0..3u8 {
                    for key in 0..KEYS.len() {
                        store.get(&segment_id(segment), &KEYS[key]);
                    }
                }
            }
        }

        for segment in 0..3u8 {
            for key in 0..KEYS.len() {
                prop_assert_eq!(
                    store.get(&segment_id(segment), &KEYS[key]),
                    expected(&model, segment, key),
                    "segment {} key {}", segment, KEYS[key]
                );
            }
        }

        let mut layers: Vec<i32> = model.keys().map(|(layer, _, _)| *layer).collect();
        layers.sort_unstable_by(|a, b| b.cmp(a));
        layers.dedup();
        let stored: Vec<i32> = store.core().layers().iter().map(|l| l.priority()).collect();
        prop_assert_eq!(stored, layers);
    }

    /// The highest layer holding a value always wins.
    #[test]
    fn highest_layer_wins(values in prop::collection::btree_map(-50..50i32, any::<i64>(), 1..10)) {
        let store = Store::new();
        for (layer, value) in &values {
            store.global().set(*layer, "k", *value).unwrap();
        }
        let (_, top) = values.iter().next_back().unwrap();
        prop_assert_eq!(store.global().get(&"k"), Some(*top));
        prop_assert_eq!(store.open_segment("other").get(&"k"), Some(*top));
    }

    /// A clone starts equal to its source and the two diverge independently.
    #[test]
    fn clones_are_independent(
        values in prop::collection::vec((0..4i32, 0..KEYS.len(), any::<i64>()), 1..20),
        overwrite in any::<i64>(),
    ) {
        let store = Store::new();
        let source = store.open_segment("source");
        for (layer, key, value) in &values {
            source.set(*layer, KEYS[*key], *value).unwrap();
        }
        let before: Vec<Option<i64>> = KEYS.iter().map(|key| source.get(key)).collect();

        let copy = source.clone_segment("copy").unwrap();
        let copied: Vec<Option<i64>> = KEYS.iter().map(|key| copy.get(key)).collect();
        prop_assert_eq!(&copied, &before);

        for key in KEYS {
            copy.set(10, key, overwrite).unwrap();
        }
        let after: Vec<Option<i64>> = KEYS.iter().map(|key| source.get(key)).collect();
        prop_assert_eq!(after, before);
    }
}
