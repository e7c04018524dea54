//! Redis-backed L2 store.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use tracing::{debug, info};

use super::{RemoteEntry, RemoteStore};
use crate::error::{CacheError, Result};

/// L2 store talking to Redis through a multiplexed, auto-reconnecting
/// [`ConnectionManager`].
///
/// The manager is cloned per call, so concurrent callers keep their own
/// requests in flight instead of queueing behind one round-trip.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    timeout: Duration,
}

impl RedisStore {
    /// Connects to `url`, giving up after `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = tokio::time::timeout(timeout, client.get_connection_manager())
            .await
            .map_err(|_| CacheError::Timeout(timeout))??;

        info!("Connected to Redis L2 store");
        Ok(Self { conn, timeout })
    }

    /// Runs one Redis future under the configured timeout.
    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => {
                debug!(op, "Redis call exceeded timeout");
                Err(CacheError::Timeout(self.timeout))
            }
        }
    }
}

/// Escapes glob metacharacters so a prefix is matched literally by `KEYS`.
fn escape_glob(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Pairs a payload with its `PTTL` reply.
///
/// `PTTL` is -1 for a key without expiry and -2 for a missing key. A key
/// that is gone or has no time left reads as a miss.
fn remote_entry(payload: String, pttl: i64) -> Option<RemoteEntry> {
    match pttl {
        -1 => Some(RemoteEntry { payload, ttl: None }),
        ms if ms > 0 => Some(RemoteEntry {
            payload,
            ttl: Some(Duration::from_millis(ms.unsigned_abs())),
        }),
        _ => None,
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<RemoteEntry>> {
        let mut conn = self.conn.clone();
        let (payload, pttl): (Option<String>, i64) = self
            .bounded(
                "get",
                redis::pipe().atomic().get(key).pttl(key).query_async(&mut conn),
            )
            .await?;

        Ok(payload.and_then(|payload| remote_entry(payload, pttl)))
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        self.bounded("set", conn.pset_ex::<_, _, ()>(key, payload, ttl_ms))
            .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        self.bounded("delete", conn.del::<_, ()>(key)).await
    }

    async fn delete_many(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        self.bounded("delete_many", conn.del::<_, ()>(keys.to_vec()))
            .await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", escape_glob(prefix));
        self.bounded("keys", conn.keys::<_, Vec<String>>(pattern))
            .await
    }

    async fn flush(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        self.bounded("flush", redis::cmd("FLUSHDB").query_async::<()>(&mut conn))
            .await
    }
}
