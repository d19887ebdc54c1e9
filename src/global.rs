//! Global Cache Module
//!
//! A process-wide cache for code that cannot have one passed in.
//!
//! The global cache is created once. The first call to [`init`] (or, if
//! nothing called `init`, the first use of any other function here) decides
//! its configuration; every later `init` gets the existing cache back and its
//! own configuration is ignored.
//!
//! Values are stored type-erased and checked on the way out: reading a value
//! under a different type than it was stored with is a
//! [`CacheError::TypeMismatch`].

use std::any::{type_name, Any};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tracing::debug;

use crate::cache::Cache;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

/// A type-erased value held by the global cache.
pub type GlobalValue = Arc<dyn Any + Send + Sync>;

static GLOBAL: OnceLock<Cache<String, GlobalValue>> = OnceLock::new();

// == Init ==
/// Creates the global cache from `config` unless it already exists.
///
/// # Errors
/// Whatever building a cache from `config` can fail with; in that case the
/// global cache stays uninitialized.
pub fn init(config: CacheConfig) -> Result<&'static Cache<String, GlobalValue>> {
    if let Some(cache) = GLOBAL.get() {
        debug!("Global cache already initialized; ignoring new configuration");
        return Ok(cache);
    }

    let cache = Cache::with_config(config)?;
    if GLOBAL.set(cache).is_err() {
        // Another thread got there first; our cache is dropped with its reclaimer
        debug!("Lost global cache initialization race; using the existing cache");
    }
    Ok(global())
}

/// Returns the global cache, creating an unbounded one if needed.
pub fn global() -> &'static Cache<String, GlobalValue> {
    GLOBAL.get_or_init(Cache::new)
}

// == Set ==
/// Stores a value under the default TTL.
pub fn set<T: Any + Send + Sync>(key: impl Into<String>, value: T) {
    global().set(key.into(), Arc::new(value));
}

pub fn set_with_ttl<T: Any + Send + Sync>(key: impl Into<String>, value: T, ttl: Option<Duration>) {
    global().set_with_ttl(key.into(), Arc::new(value), ttl);
}

// == Get ==
/// Returns a shared handle to the value stored under `key`.
///
/// # Errors
/// [`CacheError::TypeMismatch`] if the value was stored as another type.
pub fn get_arc<T: Any + Send + Sync>(key: &str) -> Result<Option<Arc<T>>> {
    let Some(value) = global().get(&key.to_string()) else {
        return Ok(None);
    };

    value
        .downcast::<T>()
        .map(Some)
        .map_err(|_| CacheError::TypeMismatch {
            key: key.to_string(),
            expected: type_name::<T>(),
        })
}

/// Returns a copy of the value stored under `key`.
///
/// # Errors
/// [`CacheError::TypeMismatch`] if the value was stored as another type.
pub fn get<T: Any + Send + Sync + Clone>(key: &str) -> Result<Option<T>> {
    Ok(get_arc::<T>(key)?.map(|value| (*value).clone()))
}

// == Delete ==
pub fn delete(key: &str) -> bool {
    global().delete(&key.to_string())
}
