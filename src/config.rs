//! Configuration Module
//!
//! Handles loading and managing cache configuration, from code or from
//! environment variables.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cache construction parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries; 0 means unbounded (no LRU eviction)
    pub capacity: usize,
    /// Interval between background sweeps; zero disables the reclaimer
    pub clean_interval: Duration,
    /// TTL applied by `Cache::set`; `None` stores entries that never expire
    pub default_ttl: Option<Duration>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries, 0 for unbounded (default: 0)
    /// - `CACHE_CLEAN_INTERVAL_MS` - Sweep interval in milliseconds, 0 to disable (default: 0)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds, unset for none (default: unset)
    ///
    /// Values that fail to parse fall back to the default.
    pub fn from_env() -> Self {
        Self {
            capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            clean_interval: env::var("CACHE_CLEAN_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::ZERO),
            default_ttl: env::var("CACHE_DEFAULT_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_clean_interval(mut self, interval: Duration) -> Self {
        self.clean_interval = interval;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// True when the cache should use the LRU store.
    pub fn is_bounded(&self) -> bool {
        self.capacity > 0
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 0,
            clean_interval: Duration::ZERO,
            default_ttl: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, 0);
        assert_eq!(config.clean_interval, Duration::ZERO);
        assert_eq!(config.default_ttl, None);
        assert!(!config.is_bounded());
    }

    #[test]
    fn test_config_builder_methods() {
        let config = CacheConfig::default()
            .with_capacity(16)
            .with_clean_interval(Duration::from_secs(30))
            .with_default_ttl(Duration::from_secs(300));

        assert!(config.is_bounded());
        assert_eq!(config.capacity, 16);
        assert_eq!(config.clean_interval, Duration::from_secs(30));
        assert_eq!(config.default_ttl, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_config_from_env() {
        // Only this test touches these variables
        env::set_var("CACHE_CAPACITY", "128");
        env::set_var("CACHE_CLEAN_INTERVAL_MS", "not-a-number");
        env::set_var("CACHE_DEFAULT_TTL_MS", "1500");

        let config = CacheConfig::from_env();
        assert_eq!(config.capacity, 128);
        assert_eq!(config.clean_interval, Duration::ZERO);
        assert_eq!(config.default_ttl, Some(Duration::from_millis(1500)));

        env::remove_var("CACHE_CAPACITY");
        env::remove_var("CACHE_CLEAN_INTERVAL_MS");
        env::remove_var("CACHE_DEFAULT_TTL_MS");

        assert_eq!(CacheConfig::from_env(), CacheConfig::default());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = CacheConfig::default().with_capacity(4);
        let json = serde_json::to_string(&config).unwrap();
        let back: CacheConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
