//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// A lookup that finds nothing is not an error; it is reported as `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A bounded store was asked to hold zero entries
    #[error("Invalid capacity: an LRU store needs room for at least one entry")]
    InvalidCapacity,

    /// The background reclaimer was given a zero interval
    #[error("Invalid interval: the reclaimer interval must be greater than zero")]
    InvalidInterval,

    /// The background reclaimer was started outside a tokio runtime
    #[error("No tokio runtime available to run the reclaimer")]
    NoRuntime,

    /// A global cache value was read back under a different type
    #[error("Type mismatch for key {key}: stored value is not a {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
    },
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
