//! Unbounded Store Module
//!
//! Sharded concurrent map with no capacity limit. Expiration is the only
//! force that removes entries on its own.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry as Slot;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::cache::{Clock, Entry, RemovalCause, RemovalNotifier, Store, SystemClock, Sweep};

// == Generation ==
/// The map and its count, swapped out together by `clear`.
struct Generation<K, V> {
    items: DashMap<K, Entry<V>>,
    count: AtomicUsize,
}

impl<K: Eq + Hash, V> Generation<K, V> {
    fn new() -> Self {
        Self {
            items: DashMap::new(),
            count: AtomicUsize::new(0),
        }
    }
}

// == Unbounded Store ==
/// Concurrent store without a capacity limit.
///
/// Reads and writes go through `DashMap` shard locks. The outer lock guards
/// the pointer to the current generation: writers hold its shared side for
/// the length of their mutation, and `clear` takes it exclusively just long
/// enough to swap in an empty generation. A concurrent iteration sees either
/// the old contents or an empty store, and every entry leaves exactly one
/// generation exactly once.
pub struct UnboundedStore<K, V> {
    current: RwLock<Arc<Generation<K, V>>>,
    clock: Arc<dyn Clock>,
    notifier: RemovalNotifier<K, V>,
}

impl<K, V> UnboundedStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Generation::new())),
            clock: Arc::new(SystemClock),
            notifier: RemovalNotifier::none(),
        }
    }

    /// Uses `clock` to decide expiration in `iterate` and `sweep_expired`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: RemovalNotifier<K, V>) -> Self {
        self.notifier = notifier;
        self
    }

    fn generation(&self) -> Arc<Generation<K, V>> {
        self.current.read().clone()
    }
}

impl<K, V> Default for UnboundedStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Store<K, V> for UnboundedStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<Entry<V>> {
        self.generation()
            .items
            .get(key)
            .map(|entry| entry.value().clone())
    }

    fn put(&self, key: K, entry: Entry<V>) {
        let replaced = {
            let generation = self.current.read();
            let replaced = match generation.items.entry(key) {
                Slot::Occupied(mut occupied) => {
                    let old = occupied.insert(entry);
                    Some((occupied.key().clone(), old))
                }
                Slot::Vacant(vacant) => {
                    // Counted while the shard is still locked
                    generation.count.fetch_add(1, Ordering::AcqRel);
                    vacant.insert(entry);
                    None
                }
            };
            replaced
        };

        if let Some((key, old)) = replaced {
            self.notifier.notify(&key, old.value(), RemovalCause::Replaced);
        }
    }

    fn remove(&self, key: &K) -> Option<Entry<V>> {
        let (key, entry) = {
            let generation = self.current.read();
            let removed = generation.items.remove_if(key, |_, _| {
                generation.count.fetch_sub(1, Ordering::AcqRel);
                true
            });
            removed?
        };

        self.notifier.notify(&key, entry.value(), RemovalCause::Explicit);
        Some(entry)
    }

    fn remove_expired(&self, key: &K) -> Option<Entry<V>> {
        let now = self.clock.now();
        let (key, entry) = {
            let generation = self.current.read();
            let removed = generation
                .items
                .remove_if(key, |_, entry| take_if_expired(&**generation, entry, now));
            removed?
        };

        self.notifier.notify(&key, entry.value(), RemovalCause::Expired);
        Some(entry)
    }

    fn clear(&self) {
        // Writers hold the read side for their whole mutation, so once the
        // swap is done nothing touches the old generation again
        let old = std::mem::replace(&mut *self.current.write(), Arc::new(Generation::new()));

        if self.notifier.is_enabled() {
            let removed: Vec<(K, Entry<V>)> = old
                .items
                .iter()
                .map(|item| (item.key().clone(), item.value().clone()))
                .collect();
            self.notifier.notify_all(removed, RemovalCause::Cleared);
        } else {
            self.notifier
                .record(RemovalCause::Cleared, old.count.load(Ordering::Acquire));
        }
    }

    fn count(&self) -> usize {
        self.generation().count.load(Ordering::Acquire)
    }

    fn iterate(&self, visitor: &mut dyn FnMut(&K, &V) -> bool) {
        let now = self.clock.now();
        let snapshot: Vec<(K, V)> = self
            .generation()
            .items
            .iter()
            .filter(|item| !item.value().is_expired(now))
            .map(|item| (item.key().clone(), item.value().value().clone()))
            .collect();

        for (key, value) in &snapshot {
            if !visitor(key, value) {
                break;
            }
        }
    }
}

impl<K, V> Sweep for UnboundedStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn sweep_expired(&self) -> usize {
        let now = self.clock.now();

        let removed = {
            let generation = self.current.read();

            // Collect first: removing while a shard iterator is alive would deadlock
            let expired_keys: Vec<K> = generation
                .items
                .iter()
                .filter(|item| item.value().is_expired(now))
                .map(|item| item.key().clone())
                .collect();

            let mut removed = Vec::with_capacity(expired_keys.len());
            for key in expired_keys {
                if let Some(pair) = generation
                    .items
                    .remove_if(&key, |_, entry| take_if_expired(&**generation, entry, now))
                {
                    removed.push(pair);
                }
            }
            removed
        };

        let count = removed.len();
        self.notifier.notify_all(removed, RemovalCause::Expired);
        count
    }
}

/// Removal predicate run under the shard lock; keeps `count` in step.
fn take_if_expired<K, V>(generation: &Generation<K, V>, entry: &Entry<V>, now: Instant) -> bool {
    let expired = entry.is_expired(now);
    if expired {
        generation.count.fetch_sub(1, Ordering::AcqRel);
    }
    expired
}

impl<K, V> fmt::Debug for UnboundedStore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnboundedStore")
            .field("count", &self.current.read().count.load(Ordering::Relaxed))
            .finish()
    }
}
