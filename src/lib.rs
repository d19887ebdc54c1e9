//! Mini Cache - An in-process key/value cache
//!
//! Provides TTL expiration, optional LRU eviction and a background reclaimer
//! that sweeps expired entries.

pub mod cache;
pub mod config;
pub mod error;
pub mod global;
pub mod tasks;

pub use cache::{Cache, CacheBuilder, CacheStats, Entry, RemovalCause, StoreKind};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::Reclaimer;
