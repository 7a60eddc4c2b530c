//! Cache Entry Module
//!
//! Defines a forward-map entry: a value plus the instant it stops being live.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single forward-map entry.
///
/// `expires_at` is fixed at construction; re-inserting a key builds a new entry.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    /// The stored value
    pub value: V,
    /// Instant after which the entry is no longer live
    expires_at: Instant,
}

impl<V> Entry<V> {
    // == Constructor ==
    /// Creates an entry expiring `ttl` from now.
    ///
    /// `ttl` is bounded by `CacheConfig::validate`, so the sum cannot overflow.
    pub fn new(value: V, ttl: Duration) -> Self {
        Self::expiring_at(value, Instant::now() + ttl)
    }

    pub(crate) fn expiring_at(value: V, expires_at: Instant) -> Self {
        Self { value, expires_at }
    }

    // == Liveness ==
    /// Readers see the entry while `now <= expires_at`.
    ///
    /// The sweep uses [`is_expired_at`](Self::is_expired_at), which is the
    /// strict complement, so the exact expiry instant is still readable.
    pub fn is_live_at(&self, now: Instant) -> bool {
        now <= self.expires_at
    }

    /// True once `expires_at < now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at < now
    }
}
