//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check both stores against simple in-memory models.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::cache::{Cache, Clock, Entry, LruStore, ManualClock, Store, UnboundedStore};

// == Strategies ==
/// Small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = u8> {
    0u8..16
}

#[derive(Debug, Clone)]
enum StoreOp {
    Put { key: u8, value: u32 },
    Get { key: u8 },
    Remove { key: u8 },
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        (key_strategy(), any::<u32>()).prop_map(|(key, value)| StoreOp::Put { key, value }),
        key_strategy().prop_map(|key| StoreOp::Get { key }),
        key_strategy().prop_map(|key| StoreOp::Remove { key }),
    ]
}

// == LRU Model ==
/// Reference LRU: keys ordered most recently used first.
struct LruModel {
    capacity: usize,
    order: VecDeque<u8>,
    values: HashMap<u8, u32>,
}

impl LruModel {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            values: HashMap::new(),
        }
    }

    fn touch(&mut self, key: u8) {
        self.order.retain(|k| *k != key);
        self.order.push_front(key);
    }

    fn put(&mut self, key: u8, value: u32) {
        let existed = self.values.insert(key, value).is_some();
        self.touch(key);
        if !existed && self.order.len() > self.capacity {
            if let Some(lru) = self.order.pop_back() {
                self.values.remove(&lru);
            }
        }
    }

    fn get(&mut self, key: u8) -> Option<u32> {
        let value = self.values.get(&key).copied()?;
        self.touch(key);
        Some(value)
    }

    fn remove(&mut self, key: u8) -> Option<u32> {
        self.order.retain(|k| *k != key);
        self.values.remove(&key)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Round-trip: a value put without TTL reads back unchanged
    #[test]
    fn prop_put_then_get_round_trips(key in any::<u64>(), value in any::<u64>()) {
        let unbounded: UnboundedStore<u64, u64> = UnboundedStore::new();
        let lru: LruStore<u64, u64> = LruStore::new(4).unwrap();

        for store in [&unbounded as &dyn Store<u64, u64>, &lru] {
            store.put(key, Entry::new(value, None));
            prop_assert_eq!(store.get(&key).map(Entry::into_value), Some(value));
            prop_assert_eq!(store.count(), 1);
        }
    }

    // Remove makes a key absent, and a second remove is a no-op
    #[test]
    fn prop_remove_makes_absent(keys in prop::collection::hash_set(key_strategy(), 1..8)) {
        let store: UnboundedStore<u8, u8> = UnboundedStore::new();
        for key in &keys {
            store.put(*key, Entry::new(*key, None));
        }

        for key in &keys {
            prop_assert!(store.remove(key).is_some());
            prop_assert!(store.remove(key).is_none());
            prop_assert!(store.get(key).is_none());
        }
        prop_assert_eq!(store.count(), 0);
    }

    // Unbounded store behaves like a HashMap under any operation sequence
    #[test]
    fn prop_unbounded_matches_hashmap(ops in prop::collection::vec(store_op_strategy(), 1..100)) {
        let store: UnboundedStore<u8, u32> = UnboundedStore::new();
        let mut model: HashMap<u8, u32> = HashMap::new();

        for op in ops {
            match op {
                StoreOp::Put { key, value } => {
                    store.put(key, Entry::new(value, None));
                    model.insert(key, value);
                }
                StoreOp::Get { key } => {
                    prop_assert_eq!(store.get(&key).map(Entry::into_value), model.get(&key).copied());
                }
                StoreOp::Remove { key } => {
                    prop_assert_eq!(store.remove(&key).map(Entry::into_value), model.remove(&key));
                }
            }
            prop_assert_eq!(store.count(), model.len());
        }
    }

    // LRU store never exceeds capacity and keeps the model's recency order
    #[test]
    fn prop_lru_matches_model(
        capacity in 1usize..8,
        ops in prop::collection::vec(store_op_strategy(), 1..100),
    ) {
        let store: LruStore<u8, u32> = LruStore::new(capacity).unwrap();
        let mut model = LruModel::new(capacity);

        for op in ops {
            match op {
                StoreOp::Put { key, value } => {
                    store.put(key, Entry::new(value, None));
                    model.put(key, value);
                }
                StoreOp::Get { key } => {
                    prop_assert_eq!(store.get(&key).map(Entry::into_value), model.get(key));
                }
                StoreOp::Remove { key } => {
                    prop_assert_eq!(store.remove(&key).map(Entry::into_value), model.remove(key));
                }
            }

            prop_assert!(store.count() <= capacity);
            prop_assert_eq!(store.count(), model.values.len());
            prop_assert_eq!(store.keys_by_recency(), Vec::from(model.order.clone()));
        }
    }

    // Overwriting a key never changes the count, in either store
    #[test]
    fn prop_overwrite_keeps_count(
        keys in prop::collection::hash_set(key_strategy(), 1..8),
        value in any::<u32>(),
    ) {
        let unbounded: UnboundedStore<u8, u32> = UnboundedStore::new();
        let lru: LruStore<u8, u32> = LruStore::new(8).unwrap();

        for store in [&unbounded as &dyn Store<u8, u32>, &lru] {
            for key in &keys {
                store.put(*key, Entry::new(0, None));
            }
            let before = store.count();
            for key in &keys {
                store.put(*key, Entry::new(value, None));
            }
            prop_assert_eq!(store.count(), before);
            for key in &keys {
                prop_assert_eq!(store.get(key).map(Entry::into_value), Some(value));
            }
        }
    }

    // Reading a key protects it from the next eviction
    #[test]
    fn prop_lru_get_promotes(capacity in 2usize..8) {
        let store: LruStore<usize, usize> = LruStore::new(capacity).unwrap();
        for key in 0..capacity {
            store.put(key, Entry::new(key, None));
        }

        // Key 0 is the least recently used until it is read
        prop_assert!(store.get(&0).is_some());
        store.put(capacity, Entry::new(capacity, None));

        prop_assert!(store.get(&0).is_some());
        prop_assert!(store.get(&1).is_none(), "Key 1 became least recently used");
        prop_assert_eq!(store.count(), capacity);
    }

    // A sweep removes exactly the expired entries
    #[test]
    fn prop_sweep_removes_only_expired(
        ttls in prop::collection::vec(prop::option::of(1u64..100), 1..40),
        elapsed in 0u64..120,
        bounded in any::<bool>(),
    ) {
        let clock = Arc::new(ManualClock::new());
        let store: Box<dyn Store<usize, u64>> = if bounded {
            Box::new(LruStore::<usize, u64>::new(ttls.len()).unwrap().with_clock(clock.clone()))
        } else {
            Box::new(UnboundedStore::<usize, u64>::new().with_clock(clock.clone()))
        };

        for (key, ttl) in ttls.iter().enumerate() {
            store.put(key, Entry::new_at(0, ttl.map(Duration::from_millis), clock.now()));
        }
        clock.advance(Duration::from_millis(elapsed));

        let expired = ttls.iter().filter(|ttl| matches!(ttl, Some(ms) if *ms < elapsed)).count();
        prop_assert_eq!(store.sweep_expired(), expired);
        prop_assert_eq!(store.count(), ttls.len() - expired);
        prop_assert_eq!(store.sweep_expired(), 0);

        let mut live = 0;
        store.iterate(&mut |_, _| {
            live += 1;
            true
        });
        prop_assert_eq!(live, ttls.len() - expired);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Threads writing disjoint key sets see exactly their own writes
    #[test]
    fn prop_concurrent_disjoint_writers(
        threads in 2usize..6,
        per_thread in 1usize..64,
        bounded in any::<bool>(),
    ) {
        let capacity = threads * per_thread;
        let cache: Arc<Cache<(usize, usize), usize>> = Arc::new(
            Cache::builder()
                .capacity(if bounded { capacity } else { 0 })
                .build()
                .unwrap(),
        );

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..per_thread {
                        cache.set((t, i), t * 1000 + i);
                        assert_eq!(cache.get(&(t, i)), Some(t * 1000 + i));
                    }
                    for i in (0..per_thread).step_by(2) {
                        assert!(cache.delete(&(t, i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut expected = HashSet::new();
        for t in 0..threads {
            for i in (1..per_thread).step_by(2) {
                expected.insert((t, i));
            }
        }

        let mut seen = HashSet::new();
        cache.iterate(|key, value| {
            assert_eq!(*value, key.0 * 1000 + key.1);
            seen.insert(*key);
            true
        });
        prop_assert_eq!(seen, expected.clone());
        prop_assert_eq!(cache.count(), expected.len());
    }
}

// == Scenario Tests ==
#[test]
fn test_capacity_two_scenario() {
    let store: LruStore<&str, u32> = LruStore::new(2).unwrap();

    store.put("a", Entry::new(1, None));
    store.put("b", Entry::new(2, None));
    store.put("c", Entry::new(3, None));
    assert!(store.get(&"a").is_none(), "a was least recently used");

    assert_eq!(store.get(&"b").map(Entry::into_value), Some(2));
    store.put("d", Entry::new(4, None));

    assert!(store.get(&"c").is_none(), "c lost its place to the read of b");
    assert_eq!(store.get(&"b").map(Entry::into_value), Some(2));
    assert_eq!(store.get(&"d").map(Entry::into_value), Some(4));
    assert_eq!(store.count(), 2);
}

#[test]
fn test_read_protects_from_eviction() {
    let clock = Arc::new(ManualClock::new());
    let store: LruStore<&str, u32> = LruStore::new(2).unwrap().with_clock(clock.clone());

    store.put("a", Entry::new_at(1, None, clock.now()));
    store.put("b", Entry::new_at(2, None, clock.now()));
    assert!(store.get(&"a").is_some());
    store.put("c", Entry::new_at(3, None, clock.now()));

    assert!(store.get(&"b").is_none(), "b was least recently used");
    assert_eq!(store.keys_by_recency(), vec!["c", "a"]);
    assert_eq!(store.count(), 2);
}
