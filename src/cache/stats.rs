//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and removals.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::cache::RemovalCause;

// == Counters ==
/// Live counters shared by a cache and its store.
///
/// Stores record every removal here as it happens, so removals done by the
/// background reclaimer or by capacity eviction are counted as well.
#[derive(Debug, Default)]
pub struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
    explicit: AtomicU64,
    capacity: AtomicU64,
    cleared: AtomicU64,
    replaced: AtomicU64,
    listener_failures: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `n` removals of the given cause.
    pub fn record_removals(&self, cause: RemovalCause, n: u64) {
        let counter = match cause {
            RemovalCause::Expired => &self.expired,
            RemovalCause::Explicit => &self.explicit,
            RemovalCause::Capacity => &self.capacity,
            RemovalCause::Cleared => &self.cleared,
            RemovalCause::Replaced => &self.replaced,
        };
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_listener_failure(&self) {
        self.listener_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn listener_failures(&self) -> u64 {
        self.listener_failures.load(Ordering::Relaxed)
    }

    /// Copies the counters into a [`CacheStats`].
    pub fn snapshot(&self, total_entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expired.load(Ordering::Relaxed),
            removals: self.explicit.load(Ordering::Relaxed),
            evictions: self.capacity.load(Ordering::Relaxed),
            cleared: self.cleared.load(Ordering::Relaxed),
            replacements: self.replaced.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
            total_entries,
        }
    }
}

// == Cache Stats ==
/// Point-in-time copy of the cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
    /// Entries deleted by callers
    pub removals: u64,
    /// Entries evicted due to LRU policy
    pub evictions: u64,
    /// Entries dropped by `clear`
    pub cleared: u64,
    /// Values overwritten by a later `set` on the same key
    pub replacements: u64,
    /// Removal notifications whose listener panicked
    pub listener_failures: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
