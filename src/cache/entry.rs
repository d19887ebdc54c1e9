//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A stored value together with the instant it stops being visible.
///
/// Entries never change after construction. Whether an entry has expired is
/// decided at read or sweep time from `expires_at` and the caller's notion of
/// "now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    // == Constructor ==
    /// Creates a new entry, measuring the TTL from the system clock.
    ///
    /// * `ttl` - `None` keeps the entry forever
    pub fn new(value: V, ttl: Option<Duration>) -> Self {
        Self::new_at(value, ttl, Instant::now())
    }

    /// Creates a new entry whose TTL is measured from `now`.
    ///
    /// A zero TTL yields an entry that is already expired: the very next
    /// check reports it as expired even if the clock has not moved. A TTL so
    /// large that `now + ttl` cannot be represented yields an entry that
    /// never expires.
    pub fn new_at(value: V, ttl: Option<Duration>, now: Instant) -> Self {
        let expires_at = ttl.and_then(|ttl| {
            if ttl.is_zero() {
                Some(now.checked_sub(Duration::from_nanos(1)).unwrap_or(now))
            } else {
                now.checked_add(ttl)
            }
        });

        Self { value, expires_at }
    }

    // == Accessors ==
    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    /// The instant after which the entry is expired, `None` if it never is.
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired only once `now` is strictly
    /// past `expires_at`. At exactly `expires_at` it is still live.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining TTL at `now`.
    ///
    /// # Returns
    /// - `None` if the entry has no TTL (never expires)
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` otherwise
    pub fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }
}
