//! Integration tests for ShardedMap
//!
//! These tests validate:
//! - Set/get/delete semantics
//! - Deterministic shard routing
//! - Concurrent access from many threads on disjoint and shared keys
//! - Shard independence (a lock held on one shard does not block others)

use prometheus_primitives::{DefaultKeyHasher, KeyHasher, ShardedMap};
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn fnv1a(key: &String) -> u64 {
    key.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Routes keys to a shard chosen by the test.
struct FixedShard(u64);

impl KeyHasher<u64> for FixedShard {
    fn hash_key(&self, key: &u64) -> u64 {
        if *key < 1_000 {
            self.0
        } else {
            self.0 + 1
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_set_then_get_returns_last_value() {
    let map = ShardedMap::new(8, fnv1a).unwrap();

    for i in 0..100 {
        map.set(format!("key-{i}"), i);
    }
    for i in 0..100 {
        map.set(format!("key-{i}"), i * 2);
    }

    for i in 0..100 {
        assert_eq!(map.get(&format!("key-{i}")), Some(i * 2));
    }
    assert_eq!(map.len(), 100);
}

#[test]
fn test_delete_then_get_misses() {
    let map = ShardedMap::new(4, fnv1a).unwrap();
    map.set("a".to_string(), 1);
    map.set("b".to_string(), 2);

    map.delete(&"a".to_string());
    assert_eq!(map.get(&"a".to_string()), None);
    assert_eq!(map.get(&"b".to_string()), Some(2));

    // Deleting an absent key is a no-op.
    assert_eq!(map.delete(&"missing".to_string()), None);
    assert_eq!(map.len(), 1);
}

#[test]
fn test_routing_is_deterministic() {
    let map = ShardedMap::<String, u32, _>::new(16, fnv1a).unwrap();
    for i in 0..500 {
        let key = format!("user:{i}");
        let first = map.shard_index(&key);
        for _ in 0..10 {
            assert_eq!(map.shard_index(&key), first);
        }
        assert!(first < map.num_shards());
    }
}

#[test]
fn test_default_hasher_routing_is_stable() {
    let map = ShardedMap::<u64, u64>::with_default_hasher(32).unwrap();
    let routes: Vec<usize> = (0..1_000).map(|k| map.shard_index(&k)).collect();

    for (k, &route) in (0..1_000).zip(&routes) {
        assert_eq!(map.shard_index(&k), route);
    }

    // A decent hash spreads 1000 keys over more than half of 32 shards.
    let mut used = routes.clone();
    used.sort_unstable();
    used.dedup();
    assert!(used.len() > 16, "only {} shards used", used.len());

    let hasher = DefaultKeyHasher::new();
    assert_eq!(hasher.hash_key(&7u64), hasher.hash_key(&7u64));
}

#[test]
fn test_concurrent_disjoint_keys() {
    const THREADS: u64 = 8;
    const KEYS_PER_THREAD: u64 = 2_000;

    let map = Arc::new(ShardedMap::with_default_hasher(16).unwrap());
    let mut handles = vec![];

    for t in 0..THREADS {
        let map = Arc::clone(&map);
        handles.push(thread::spawn(move || {
            let base = t * KEYS_PER_THREAD;
            for i in 0..KEYS_PER_THREAD {
                map.set(base + i, i);
            }
            for i in 0..KEYS_PER_THREAD {
                assert_eq!(map.get(&(base + i)), Some(i));
            }
            // Delete every other key.
            for i in (0..KEYS_PER_THREAD).step_by(2) {
                assert_eq!(map.delete(&(base + i)), Some(i));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(map.len() as u64, THREADS * KEYS_PER_THREAD / 2);
    for t in 0..THREADS {
        let base = t * KEYS_PER_THREAD;
        assert_eq!(map.get(&base), None);
        assert_eq!(map.get(&(base + 1)), Some(1));
    }
}

#[test]
fn test_concurrent_random_ops_match_per_thread_model() {
    const THREADS: u32 = 6;

    let map = Arc::new(ShardedMap::new(4, |k: &(u32, u32)| u64::from(k.0 ^ k.1)).unwrap());
    let mut handles = vec![];

    for t in 0..THREADS {
        let map = Arc::clone(&map);
        handles.push(thread::spawn(move || {
            let mut rng = rand::rng();
            let mut model = HashMap::new();

            for _ in 0..5_000 {
                // Keys are namespaced by thread, values are this thread's own.
                let key = (t, rng.random_range(0..64u32));
                match rng.random_range(0..3) {
                    0 => {
                        let value = rng.random::<u32>();
                        map.set(key, value);
                        model.insert(key, value);
                    }
                    1 => {
                        assert_eq!(map.delete(&key), model.remove(&key));
                    }
                    _ => {
                        assert_eq!(map.get(&key), model.get(&key).copied());
                    }
                }
            }
            model
        }));
    }

    let mut expected = 0;
    for handle in handles {
        let model = handle.join().unwrap();
        expected += model.len();
        for (key, value) in model {
            assert_eq!(map.get(&key), Some(value));
        }
    }
    assert_eq!(map.len(), expected);
}

#[test]
fn test_single_shard_contention_loses_no_updates() {
    const THREADS: u64 = 8;
    const WRITES: u64 = 2_000;

    // Every key lands in the same shard.
    let map = Arc::new(ShardedMap::<u64, u64, _>::new(4, |_: &u64| 0_u64).unwrap());
    let barrier = Arc::new(Barrier::new(THREADS as usize));
    let mut handles = vec![];

    for t in 0..THREADS {
        let map = Arc::clone(&map);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for value in 0..WRITES {
                map.set(t, value);
                assert_eq!(map.get(&t), Some(value));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(map.len() as u64, THREADS);
    for t in 0..THREADS {
        assert_eq!(map.get(&t), Some(WRITES - 1));
    }
}

#[test]
fn test_other_shards_not_blocked_by_slow_reader() {
    // Keys below 1000 go to shard 0, the rest to shard 1.
    let map = Arc::new(ShardedMap::<u64, String, _>::with_hasher(2, FixedShard(0)).unwrap());
    map.set(1, "held".to_string());
    map.set(5_000, "free".to_string());

    let holding = Arc::new(AtomicBool::new(false));
    let release = Arc::new(AtomicBool::new(false));

    let holder = {
        let map = Arc::clone(&map);
        let holding = Arc::clone(&holding);
        let release = Arc::clone(&release);
        thread::spawn(move || {
            map.get_with(&1, |_| {
                holding.store(true, Ordering::SeqCst);
                while !release.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(1));
                }
            });
        })
    };

    while !holding.load(Ordering::SeqCst) {
        thread::yield_now();
    }

    // Shard 1 is writable while shard 0 is read-locked.
    let start = Instant::now();
    map.set(5_001, "also free".to_string());
    assert_eq!(map.get(&5_000).as_deref(), Some("free"));
    // Readers on shard 0 overlap with the holder.
    assert_eq!(map.get(&1).as_deref(), Some("held"));
    assert!(start.elapsed() < Duration::from_secs(1));

    release.store(true, Ordering::SeqCst);
    holder.join().unwrap();

    map.set(2, "after".to_string());
    assert_eq!(map.len(), 4);
}
