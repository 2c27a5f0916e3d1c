//! Listener dispatch for direct writes and both transaction shapes.

use std::sync::{Arc, Mutex};

use lamina_store::{keys, KeyMatcher, LayeredStore};

type Store = LayeredStore<&'static str, i32>;
type Calls = Arc<Mutex<Vec<Vec<&'static str>>>>;

/// Every way of selecting the `test.*` keys.
fn selections() -> Vec<(&'static str, Vec<KeyMatcher<&'static str>>)> {
    let test_keys = || KeyMatcher::pattern(r"^test\..*$").unwrap();
    let never = || KeyMatcher::pattern("^nonexistent$").unwrap();
    let literals = || keys(["test.value1", "test.value2", "test.value3"]);
    vec![
        ("single pattern", vec![test_keys()]),
        ("literals", literals()),
        ("two patterns", vec![never(), test_keys()]),
        ("failing pattern and literals", {
            let mut matchers = vec![never()];
            matchers.extend(literals());
            matchers
        }),
        (
            "failing literal and pattern",
            vec![KeyMatcher::key("nonexistent"), test_keys()],
        ),
    ]
}

fn spy() -> (Calls, impl Fn(&[&'static str]) + Send + Sync + 'static) {
    let calls: Calls = Arc::default();
    let sink = Arc::clone(&calls);
    (calls, move |keys: &[&'static str]| {
        sink.lock().unwrap().push(keys.to_vec())
    })
}

fn count(calls: &Calls) -> usize {
    calls.lock().unwrap().len()
}

fn last(calls: &Calls) -> Vec<&'static str> {
    calls.lock().unwrap().last().cloned().unwrap_or_default()
}

#[test]
fn global_writes() {
    for (name, matchers) in selections() {
        let store = Store::new();
        let (calls, callback) = spy();
        store.global().on(matchers, callback);

        store.global().set(4, "other.value1", 7).unwrap();
        assert_eq!(count(&calls), 0, "{name}");

        store.global().set(1, "test.value1", 6).unwrap();
        assert_eq!(count(&calls), 1, "{name}");
        assert_eq!(last(&calls), ["test.value1"], "{name}");

        store.global().set(4, "test.value2", 5).unwrap();
        assert_eq!(count(&calls), 2, "{name}");
        assert_eq!(last(&calls), ["test.value2"], "{name}");

        // Deleting a key that was never set still notifies.
        store.global().delete(4, &"test.value3").unwrap();
        assert_eq!(count(&calls), 3, "{name}");
        assert_eq!(last(&calls), ["test.value3"], "{name}");

        store.global().delete(1, &"test.value1").unwrap();
        assert_eq!(count(&calls), 4, "{name}");
        assert_eq!(last(&calls), ["test.value1"], "{name}");
    }
}

#[test]
fn segmented_writes() {
    for (name, matchers) in selections() {
        let store = Store::new();
        let segment = store.open_segment("a");
        let (global_calls, global_cb) = spy();
        let (segment_calls, segment_cb) = spy();
        store.global().on(matchers.clone(), global_cb);
        segment.on(matchers, segment_cb);

        store.global().set(4, "other.value1", 7).unwrap();
        assert_eq!((count(&global_calls), count(&segment_calls)), (0, 0), "{name}");

        // Global writes reach every segment's listeners.
        store.global().set(1, "test.value1", 6).unwrap();
        assert_eq!((count(&global_calls), count(&segment_calls)), (1, 1), "{name}");
        assert_eq!(last(&segment_calls), ["test.value1"], "{name}");

        // Segment writes reach only that segment's listeners.
        segment.set(1, "test.value1", 6).unwrap();
        assert_eq!((count(&global_calls), count(&segment_calls)), (1, 2), "{name}");

        store.global().set(4, "test.value2", 5).unwrap();
        assert_eq!((count(&global_calls), count(&segment_calls)), (2, 3), "{name}");
        assert_eq!(last(&global_calls), ["test.value2"], "{name}");

        store.global().delete(4, &"test.value3").unwrap();
        assert_eq!((count(&global_calls), count(&segment_calls)), (3, 4), "{name}");

        segment.delete(4, &"test.value2").unwrap();
        assert_eq!((count(&global_calls), count(&segment_calls)), (3, 5), "{name}");
        assert_eq!(last(&segment_calls), ["test.value2"], "{name}");

        store.global().delete(1, &"test.value1").unwrap();
        assert_eq!((count(&global_calls), count(&segment_calls)), (4, 6), "{name}");
        assert_eq!(last(&global_calls), ["test.value1"], "{name}");
        assert_eq!(last(&segment_calls), ["test.value1"], "{name}");
    }
}

#[test]
fn whole_store_transaction_notifies_once() {
    for (name, matchers) in selections() {
        let store = Store::new();
        let segment = store.open_segment("a");
        let (global_calls, global_cb) = spy();
        let (segment_calls, segment_cb) = spy();
        store.global().on(matchers.clone(), global_cb);
        segment.on(matchers, segment_cb);

        store
            .run_transaction(|tx| {
                tx.set(4, "other.value1", 7)?;
                tx.set(1, "test.value1", 6)?;
                tx.set(4, "test.value2", 5)?;
                tx.delete(4, &"test.value3")?;
                tx.delete(1, &"test.value1")?;
                assert_eq!(count(&global_calls) + count(&segment_calls), 0);
                Ok(())
            })
            .unwrap();

        let expected = ["test.value1", "test.value2", "test.value3"];
        assert_eq!((count(&global_calls), count(&segment_calls)), (1, 1), "{name}");
        assert_eq!(last(&global_calls), expected, "{name}");
        assert_eq!(last(&segment_calls), expected, "{name}");
    }
}

#[test]
fn segment_transaction_notifies_only_its_segment() {
    for (name, matchers) in selections() {
        let store = Store::new();
        let segment = store.open_segment("a");
        let (global_calls, global_cb) = spy();
        let (segment_calls, segment_cb) = spy();
        store.global().on(matchers.clone(), global_cb);
        segment.on(matchers, segment_cb);

        segment
            .run_transaction(|tx| {
                tx.set(4, "other.value1", 7)?;
                tx.set(1, "test.value1", 6)?;
                tx.set(4, "test.value2", 5)?;
                tx.delete(4, &"test.value3")?;
                tx.delete(1, &"test.value1")?;
                Ok(())
            })
            .unwrap();

        assert_eq!((count(&global_calls), count(&segment_calls)), (0, 1), "{name}");
        assert_eq!(
            last(&segment_calls),
            ["test.value1", "test.value2", "test.value3"],
            "{name}"
        );
    }
}

#[test]
fn mixed_transaction_groups_by_segment() {
    let store = Store::new();
    let (a_calls, a_cb) = spy();
    let (b_calls, b_cb) = spy();
    store.on("a", vec![KeyMatcher::Any], a_cb);
    store.on("b", vec![KeyMatcher::Any], b_cb);

    let summary = store
        .run_transaction(|tx| {
            tx.set_in(0, "a", "x", 1)?;
            tx.set_in(0, "b", "y", 1)?;
            tx.set(0, "z", 1)
        })
        .unwrap();
    assert_eq!(summary.touched.len(), 3);

    // "a" and "b" each hear their own key, then the global one.
    assert_eq!(*a_calls.lock().unwrap(), vec![vec!["x"], vec!["z"]]);
    assert_eq!(*b_calls.lock().unwrap(), vec![vec!["y"], vec!["z"]]);
}

#[test]
fn aborted_transaction_is_silent() {
    let store = Store::new();
    let (calls, callback) = spy();
    store.global().on(vec![KeyMatcher::Any], callback);

    let mut tx = store.global().open_transaction();
    tx.set(0, "x", 1).unwrap();
    tx.abort();
    assert_eq!(count(&calls), 0);
}

#[test]
fn closed_segment_loses_listeners() {
    let store = Store::new();
    let segment = store.open_segment("a");
    let (calls, callback) = spy();
    segment.on(vec![KeyMatcher::Any], callback);

    segment.close();
    segment.set(0, "x", 1).unwrap();
    store.global().set(0, "x", 1).unwrap();
    assert_eq!(count(&calls), 0);
}

#[test]
fn listener_can_read_the_store() {
    let store = Store::new();
    let reader = store.clone();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    store.global().on(keys(["x"]), move |keys| {
        let global = reader.global();
        let values: Vec<_> = keys.iter().map(|key| global.get(key)).collect();
        sink.lock().unwrap().extend(values);
    });

    store.global().set(0, "x", 42).unwrap();
    store.global().delete(0, &"x").unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![Some(42), None]);
}
