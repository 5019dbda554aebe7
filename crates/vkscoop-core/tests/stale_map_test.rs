//! Cache-correctness tests for the stale-cached map.

use std::sync::Arc;

use vkscoop_core::stale_map;

#[derive(Debug, PartialEq)]
struct Payload {
    generation: u32,
}

stale_map!(PayloadMap, PAYLOAD_CACHE, Payload);
stale_map!(OtherMap, OTHER_CACHE, Payload);

#[test]
fn get_returns_inserted_value() {
    let map = PayloadMap::new();
    map.put(0x10, Payload { generation: 1 });

    match map.get(0x10) {
        Some(value) => assert_eq!(value.generation, 1),
        None => panic!("expected a value for key 0x10"),
    }
    assert_eq!(map.count(0x10), 1);
    assert_eq!(map.count(0x11), 0);
}

#[test]
fn miss_is_not_cached() {
    let map = PayloadMap::new();

    // Prime a potential negative cache entry, then insert.
    assert!(map.get(0x20).is_none());
    map.put(0x20, Payload { generation: 7 });

    match map.get(0x20) {
        Some(value) => assert_eq!(value.generation, 7),
        None => panic!("lookup after insert must not see a cached miss"),
    }
}

#[test]
fn put_refreshes_this_threads_cache() {
    let map = PayloadMap::new();
    map.put(0x30, Payload { generation: 1 });

    // Populate the thread-local cache, then overwrite in place.
    assert_eq!(map.get(0x30).map(|v| v.generation), Some(1));
    map.put(0x30, Payload { generation: 2 });
    assert_eq!(map.get(0x30).map(|v| v.generation), Some(2));
}

#[test]
fn stale_entry_on_another_thread_stays_usable() {
    let map = Arc::new(PayloadMap::new());
    map.put(0x40, Payload { generation: 1 });

    // Warm this thread's cache.
    let before = map.get(0x40).map(|v| v.generation);
    assert_eq!(before, Some(1));

    let worker_map = map.clone();
    let handle = std::thread::spawn(move || {
        worker_map.put(0x40, Payload { generation: 2 });
        worker_map.get(0x40).map(|v| v.generation)
    });
    assert_eq!(handle.join().ok().flatten(), Some(2));

    // This thread may see generation 1 (stale) or 2, but the Arc is
    // always backed by live data.
    match map.get(0x40) {
        Some(value) => assert!(value.generation == 1 || value.generation == 2),
        None => panic!("entry vanished; stale maps never delete"),
    }
}

#[test]
fn distinct_maps_do_not_share_cache_slots() {
    let a = PayloadMap::new();
    let b = OtherMap::new();
    a.put(0x50, Payload { generation: 10 });
    b.put(0x50, Payload { generation: 20 });

    assert_eq!(a.get(0x50).map(|v| v.generation), Some(10));
    assert_eq!(b.get(0x50).map(|v| v.generation), Some(20));
    assert_eq!(a.get(0x50).map(|v| v.generation), Some(10));
}
