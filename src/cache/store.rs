//! Store Module
//!
//! The storage contract shared by the unbounded and the LRU store, and the
//! removal notifications both of them emit.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::cache::{Counters, Entry};

// == Sweep ==
/// Removal of expired entries, the one operation the reclaimer needs.
pub trait Sweep: Send + Sync {
    /// Removes expired entries and returns how many were removed.
    fn sweep_expired(&self) -> usize;
}

// == Store ==
/// Storage strategy behind a [`Cache`](crate::cache::Cache).
///
/// Every method is safe to call from any number of threads at once. Stores
/// hand out clones of their entries, never access to their internals.
pub trait Store<K, V>: Sweep {
    /// Returns the stored entry whether or not it has expired.
    fn get(&self, key: &K) -> Option<Entry<V>>;

    /// Inserts or overwrites the entry for `key`.
    fn put(&self, key: K, entry: Entry<V>);

    /// Removes `key` if present. Removing an absent key is a no-op.
    fn remove(&self, key: &K) -> Option<Entry<V>>;

    /// Removes `key` only if its current entry has expired.
    ///
    /// Used after a read found an expired entry, so that a fresh value
    /// written in between is left alone.
    fn remove_expired(&self, key: &K) -> Option<Entry<V>>;

    /// Drops every entry.
    fn clear(&self);

    /// Number of keys present, including expired ones not yet swept.
    fn count(&self) -> usize;

    /// Visits unexpired entries until `visitor` returns `false`.
    ///
    /// The visitor runs on a snapshot taken outside the store's locks, so it
    /// may call back into the store.
    fn iterate(&self, visitor: &mut dyn FnMut(&K, &V) -> bool);
}

// == Removal Cause ==
/// Why an entry left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalCause {
    /// The entry's TTL elapsed (found by a sweep or by a read)
    Expired,
    /// The entry was deleted by a caller
    Explicit,
    /// The LRU store was full and this was its least recently used entry
    Capacity,
    /// The whole store was cleared
    Cleared,
    /// A new value was stored under the same key
    Replaced,
}

/// Callback invoked with every removed key and value.
pub type EvictionListener<K, V> = Arc<dyn Fn(&K, &V, RemovalCause) + Send + Sync>;

// == Removal Notifier ==
/// Counts removals and delivers them to an optional listener.
///
/// A panicking listener is contained here: the panic is logged and counted,
/// and the operation that triggered the notification carries on.
pub struct RemovalNotifier<K, V> {
    listener: Option<EvictionListener<K, V>>,
    counters: Arc<Counters>,
}

impl<K, V> RemovalNotifier<K, V> {
    /// A notifier that only counts.
    pub fn none() -> Self {
        Self {
            listener: None,
            counters: Arc::new(Counters::new()),
        }
    }

    pub fn new(listener: EvictionListener<K, V>) -> Self {
        Self {
            listener: Some(listener),
            counters: Arc::new(Counters::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.listener.is_some()
    }

    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }

    /// Number of notifications whose listener panicked.
    pub fn failures(&self) -> u64 {
        self.counters.listener_failures()
    }

    /// Counts removals the listener does not need to see one by one.
    pub fn record(&self, cause: RemovalCause, n: usize) {
        self.counters.record_removals(cause, n as u64);
    }

    pub fn notify(&self, key: &K, value: &V, cause: RemovalCause) {
        self.counters.record_removals(cause, 1);

        let Some(listener) = &self.listener else {
            return;
        };

        if catch_unwind(AssertUnwindSafe(|| listener(key, value, cause))).is_err() {
            self.counters.record_listener_failure();
            warn!(?cause, "Eviction listener panicked; notification dropped");
        }
    }

    pub fn notify_all<I>(&self, removed: I, cause: RemovalCause)
    where
        I: IntoIterator<Item = (K, Entry<V>)>,
    {
        for (key, entry) in removed {
            self.notify(&key, entry.value(), cause);
        }
    }
}

impl<K, V> Clone for RemovalNotifier<K, V> {
    fn clone(&self) -> Self {
        Self {
            listener: self.listener.clone(),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<K, V> Default for RemovalNotifier<K, V> {
    fn default() -> Self {
        Self::none()
    }
}

impl<K, V> fmt::Debug for RemovalNotifier<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemovalNotifier")
            .field("enabled", &self.is_enabled())
            .field("failures", &self.failures())
            .finish()
    }
}
