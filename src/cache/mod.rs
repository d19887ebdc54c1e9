//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and optional LRU eviction.

mod clock;
mod entry;
mod handle;
mod lru;
mod stats;
mod store;
mod unbounded;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::Entry;
pub use handle::{Cache, CacheBuilder, StoreKind};
pub use lru::{LruStore, MAX_SWEEP_REMOVALS};
pub use stats::{CacheStats, Counters};
pub use store::{EvictionListener, RemovalCause, RemovalNotifier, Store, Sweep};
pub use unbounded::UnboundedStore;
