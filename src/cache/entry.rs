//! Cache Entry Module
//!
//! Defines the structure for individual L1 entries with an absolute expiry.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A single L1 entry: the serialized value and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Serialized (JSON) payload, shared with readers on hit
    pub value: Arc<str>,
    /// Absolute expiry, computed as `now + ttl` at write time
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry that expires `ttl` from now.
    pub fn new(value: Arc<str>, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its expiry, so a read exactly at `now + ttl` already misses.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Approximate footprint in bytes: key length plus payload length.
    pub fn footprint(&self, key: &str) -> usize {
        key.len() + self.value.len()
    }
}
