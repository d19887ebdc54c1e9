//! Cache Handle Module
//!
//! The cache callers work with: a store chosen once at construction, the
//! default TTL, statistics and the optional background reclaimer.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{
    CacheStats, Clock, Entry, EvictionListener, LruStore, RemovalCause, RemovalNotifier, Store,
    SystemClock, UnboundedStore,
};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::tasks::{Reclaimer, ReclaimerStats};

// == Store Kind ==
/// Which store a cache was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreKind {
    Unbounded,
    Lru { capacity: usize },
}

// == Cache ==
/// Concurrent key/value cache with TTL expiration and optional LRU eviction.
///
/// Share it behind an `Arc`. Call [`Cache::shutdown`] to stop the background
/// reclaimer deterministically; dropping the cache stops it as well.
pub struct Cache<K, V> {
    store: Arc<dyn Store<K, V>>,
    kind: StoreKind,
    default_ttl: Option<Duration>,
    clock: Arc<dyn Clock>,
    notifier: RemovalNotifier<K, V>,
    reclaimer: Mutex<Option<Reclaimer>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an unbounded cache without default TTL or background sweeps.
    pub fn new() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let notifier = RemovalNotifier::none();
        let store = UnboundedStore::new()
            .with_clock(Arc::clone(&clock))
            .with_notifier(notifier.clone());

        Self {
            store: Arc::new(store),
            kind: StoreKind::Unbounded,
            default_ttl: None,
            clock,
            notifier,
            reclaimer: Mutex::new(None),
        }
    }

    /// Creates a cache from `config`.
    ///
    /// See [`CacheBuilder::build`] for the failure modes.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        CacheBuilder::from_config(config).build()
    }

    pub fn builder() -> CacheBuilder<K, V> {
        CacheBuilder::new()
    }

    // == Set ==
    /// Stores a value using the configured default TTL.
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Stores a value with an explicit TTL; `None` never expires.
    ///
    /// A zero TTL stores an entry that is already expired.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Option<Duration>) {
        self.store.put(key, Entry::new_at(value, ttl, self.clock.now()));
    }

    // == Get ==
    /// Retrieves a live value.
    ///
    /// An expired entry found here is removed and reported as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let counters = self.notifier.counters();
        match self.live_entry(key) {
            Some(entry) => {
                counters.record_hit();
                Some(entry.into_value())
            }
            None => {
                counters.record_miss();
                None
            }
        }
    }

    /// Remaining TTL of a live entry.
    ///
    /// `None` when the key is absent, expired or never expires; use
    /// [`Cache::contains_key`] to tell those apart.
    pub fn ttl(&self, key: &K) -> Option<Duration> {
        let now = self.clock.now();
        self.live_entry(key)
            .and_then(|entry| entry.ttl_remaining(now))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.live_entry(key).is_some()
    }

    fn live_entry(&self, key: &K) -> Option<Entry<V>> {
        let entry = self.store.get(key)?;
        if entry.is_expired(self.clock.now()) {
            self.store.remove_expired(key);
            return None;
        }
        Some(entry)
    }

    // == Delete ==
    /// Removes a key. Returns whether it was present.
    pub fn delete(&self, key: &K) -> bool {
        self.store.remove(key).is_some()
    }

    // == Pass-through Store Operations ==
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Number of stored keys, counting expired ones not yet reclaimed.
    pub fn count(&self) -> usize {
        self.store.count()
    }

    /// Visits live entries until `visitor` returns `false`.
    pub fn iterate<F>(&self, mut visitor: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.store.iterate(&mut visitor);
    }

    /// Removes expired entries now, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.store.sweep_expired()
    }

    // == Introspection ==
    pub fn store_kind(&self) -> StoreKind {
        self.kind
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.notifier.counters().snapshot(self.store.count())
    }

    /// Sweep counters, `None` if no reclaimer is running.
    pub fn reclaimer_stats(&self) -> Option<ReclaimerStats> {
        self.reclaimer.lock().as_ref().map(Reclaimer::stats)
    }

    pub fn has_reclaimer(&self) -> bool {
        self.reclaimer.lock().is_some()
    }

    // == Shutdown ==
    /// Stops the background reclaimer and waits for it to exit.
    ///
    /// The cache stays usable; expired entries are then only removed by
    /// reads and explicit sweeps. Calling this more than once is harmless.
    pub async fn shutdown(&self) {
        let reclaimer = self.reclaimer.lock().take();
        if let Some(reclaimer) = reclaimer {
            reclaimer.shutdown().await;
            info!("Cache reclaimer shut down");
        }
    }

    /// Signals the background reclaimer to stop without waiting.
    pub fn close(&self) {
        if let Some(mut reclaimer) = self.reclaimer.lock().take() {
            reclaimer.stop();
            debug!("Cache reclaimer stop requested");
        }
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("kind", &self.kind)
            .field("count", &self.store.count())
            .field("default_ttl", &self.default_ttl)
            .field("reclaimer", &self.reclaimer.lock().is_some())
            .finish()
    }
}

// == Cache Builder ==
/// Assembles a [`Cache`] from a [`CacheConfig`], a clock and a listener.
pub struct CacheBuilder<K, V> {
    config: CacheConfig,
    listener: Option<EvictionListener<K, V>>,
    clock: Arc<dyn Clock>,
    sweep_limit: Option<usize>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::from_config(CacheConfig::default())
    }

    pub fn from_config(config: CacheConfig) -> Self {
        Self {
            config,
            listener: None,
            clock: Arc::new(SystemClock),
            sweep_limit: None,
        }
    }

    /// Maximum entries; 0 keeps the cache unbounded.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Background sweep interval; zero disables the reclaimer.
    pub fn clean_interval(mut self, interval: Duration) -> Self {
        self.config.clean_interval = interval;
        self
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = Some(ttl);
        self
    }

    /// Called with every entry that leaves the cache and the reason why.
    ///
    /// The listener runs after the store has released its locks, so it may
    /// use the cache. A panic inside it is logged and counted, never
    /// propagated.
    pub fn eviction_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&K, &V, RemovalCause) + Send + Sync + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Caps removals per sweep of an LRU cache.
    pub fn sweep_limit(mut self, limit: usize) -> Self {
        self.sweep_limit = Some(limit);
        self
    }

    // == Build ==
    /// Builds the cache, starting the reclaimer if an interval is set.
    ///
    /// # Errors
    /// [`CacheError::NoRuntime`](crate::CacheError::NoRuntime) if a clean interval is set
    /// outside a tokio runtime.
    pub fn build(self) -> Result<Cache<K, V>> {
        let notifier = match self.listener {
            Some(listener) => RemovalNotifier::new(listener),
            None => RemovalNotifier::none(),
        };

        let (store, kind): (Arc<dyn Store<K, V>>, StoreKind) = if self.config.is_bounded() {
            let mut store = LruStore::new(self.config.capacity)?
                .with_clock(Arc::clone(&self.clock))
                .with_notifier(notifier.clone());
            if let Some(limit) = self.sweep_limit {
                store = store.with_sweep_limit(limit);
            }
            let store: Arc<dyn Store<K, V>> = Arc::new(store);
            (
                store,
                StoreKind::Lru {
                    capacity: self.config.capacity,
                },
            )
        } else {
            let store: Arc<dyn Store<K, V>> = Arc::new(
                UnboundedStore::new()
                    .with_clock(Arc::clone(&self.clock))
                    .with_notifier(notifier.clone()),
            );
            (store, StoreKind::Unbounded)
        };

        let reclaimer = if self.config.clean_interval.is_zero() {
            None
        } else {
            Some(Reclaimer::start(&store, self.config.clean_interval)?)
        };

        debug!(
            ?kind,
            clean_interval = ?self.config.clean_interval,
            default_ttl = ?self.config.default_ttl,
            "Cache built"
        );

        Ok(Cache {
            store,
            kind,
            default_ttl: self.config.default_ttl,
            clock: self.clock,
            notifier,
            reclaimer: Mutex::new(reclaimer),
        })
    }
}

impl<K, V> Default for CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
