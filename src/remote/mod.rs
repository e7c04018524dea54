//! Remote Store Module
//!
//! The L2 tier: a networked key-value service reached through a narrow
//! get / set-with-expiry / delete / list-by-prefix / flush protocol.
//! [`CacheProvider`](crate::cache::CacheProvider) is the only caller.

mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use memory::MemoryRemote;
pub use redis_store::RedisStore;

/// Payload read back from L2 together with its remaining server-side TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub payload: String,
    /// `None` when the backend reports no expiry for the key
    pub ttl: Option<Duration>,
}

/// Operations the provider needs from an L2 backend.
///
/// Implementations must bound every call in time; the provider treats any
/// `Err` as a miss or a no-op for that tier only.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Short backend name used in log fields.
    fn name(&self) -> &'static str;

    /// Reads a payload and its remaining TTL.
    async fn get(&self, key: &str) -> Result<Option<RemoteEntry>>;

    /// Writes a payload that the backend expires after `ttl`.
    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<()>;

    /// Removes a key. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Removes several keys in one round-trip.
    async fn delete_many(&self, keys: &[String]) -> Result<()>;

    /// Lists every key starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Drops everything the backend holds.
    async fn flush(&self) -> Result<()>;
}
