//! Cache Provider Module
//!
//! Unifies the in-process L1 tier and the networked L2 tier behind one
//! get / set / delete / clear / stats contract.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, Counters, LocalStore};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::remote::{RedisStore, RemoteStore};

// == Cache Provider ==
/// Two-tier cache façade.
///
/// Lookups go L1 then L2, and an L2 hit is copied back into L1. Writes go to
/// both tiers. L2 failures are logged and swallowed: they turn into a miss
/// on reads and a no-op on writes, so the cache can slow a caller down but
/// never fail it.
///
/// Construct one per process and share it as `Arc<CacheProvider>`.
pub struct CacheProvider {
    config: CacheConfig,
    local: Option<LocalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    counters: Counters,
    snapshot: RwLock<CacheStats>,
}

impl CacheProvider {
    // == Constructors ==
    /// Builds a provider over an already-constructed L2 store.
    ///
    /// `remote` is ignored when `enable_l2` is off. When `enable_l2` is on but
    /// no store is given, the provider runs L1-only and says so once.
    pub fn new(config: CacheConfig, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        let local = config
            .enable_l1
            .then(|| LocalStore::new(config.max_memory_keys));

        let remote = match (config.enable_l2, remote) {
            (true, Some(remote)) => Some(remote),
            (true, None) => {
                warn!("L2 enabled but no backend available, running with L1 only");
                None
            }
            (false, _) => None,
        };

        info!(
            l1 = local.is_some(),
            l2 = remote.as_ref().map(|r| r.name()).unwrap_or("off"),
            max_memory_keys = config.max_memory_keys,
            default_ttl = config.default_ttl,
            "Cache provider initialized"
        );

        Self {
            config,
            local,
            remote,
            counters: Counters::default(),
            snapshot: RwLock::new(CacheStats::default()),
        }
    }

    /// Builds a provider, connecting to Redis at `backend_address` if L2 is on.
    ///
    /// A missing address or a failed connection degrades to L1-only.
    pub async fn connect(config: CacheConfig) -> Self {
        let remote: Option<Arc<dyn RemoteStore>> = match (&config.backend_address, config.enable_l2) {
            (Some(address), true) => match RedisStore::connect(address, config.l2_timeout()).await {
                Ok(store) => Some(Arc::new(store) as Arc<dyn RemoteStore>),
                Err(e) => {
                    warn!(error = %e, "Could not connect to L2 backend");
                    None
                }
            },
            _ => None,
        };
        Self::new(config, remote)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn l1_enabled(&self) -> bool {
        self.local.is_some()
    }

    pub fn l2_enabled(&self) -> bool {
        self.remote.is_some()
    }

    /// Physical L2 key for a logical key.
    fn remote_key(&self, key: &str) -> String {
        if self.config.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.config.key_prefix, key)
        }
    }

    /// Prefix shared by every physical L2 key this provider writes.
    fn remote_prefix(&self) -> String {
        if self.config.key_prefix.is_empty() {
            String::new()
        } else {
            format!("{}:", self.config.key_prefix)
        }
    }

    /// Writes into L1 and accounts for any eviction it caused.
    fn store_local(&self, key: &str, payload: Arc<str>, ttl: Duration) {
        if let Some(local) = &self.local {
            if let Some(evicted) = local.set(key, payload, ttl) {
                debug!(key = %evicted, "L1 capacity eviction");
                self.counters.record_eviction();
            }
        }
    }

    /// Runs one L2 call under the configured timeout.
    ///
    /// A failure or timeout is counted, logged and comes back as `None`.
    async fn bounded<T, F>(&self, remote: &dyn RemoteStore, op: &'static str, key: &str, call: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = self.config.l2_timeout();
        let result = match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(timeout)),
        };

        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.counters.record_l2_failure();
                warn!(op, key = %key, backend = remote.name(), error = %e, "L2 call failed");
                None
            }
        }
    }

    // == Get ==
    /// Returns the serialized payload for `key`, or `None` on a miss.
    pub async fn get_raw(&self, key: &str) -> Option<Arc<str>> {
        self.counters.record_request();

        if let Some(local) = &self.local {
            if let Some(payload) = local.get(key) {
                debug!(key = %key, "cache hit (L1)");
                self.counters.record_hit();
                return Some(payload);
            }
        }

        if let Some(remote) = &self.remote {
            let remote_key = self.remote_key(key);
            let found = self
                .bounded(remote.as_ref(), "get", key, remote.get(&remote_key))
                .await
                .flatten();
            if let Some(entry) = found {
                debug!(key = %key, "cache hit (L2)");
                self.counters.record_hit();
                let payload: Arc<str> = Arc::from(entry.payload);
                let ttl = entry.ttl.unwrap_or_else(|| self.config.default_ttl());
                self.store_local(key, Arc::clone(&payload), ttl);
                return Some(payload);
            }
        }

        debug!(key = %key, "cache miss");
        self.counters.record_miss();
        None
    }

    /// Returns the value for `key` deserialized as `T`.
    ///
    /// A payload that does not deserialize into `T` is logged and treated as
    /// absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let payload = self.get_raw(key).await?;
        match serde_json::from_str(&payload) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached payload has unexpected shape");
                None
            }
        }
    }

    // == Set ==
    /// Stores a serialized payload in both tiers.
    ///
    /// `ttl` defaults to the configured default TTL. An L2 failure is logged
    /// and does not affect the caller.
    pub async fn set_raw(&self, key: &str, payload: impl Into<Arc<str>>, ttl: Option<Duration>) {
        let payload: Arc<str> = payload.into();
        let ttl = ttl.unwrap_or_else(|| self.config.default_ttl());

        self.store_local(key, Arc::clone(&payload), ttl);

        if let Some(remote) = &self.remote {
            let remote_key = self.remote_key(key);
            self.bounded(remote.as_ref(), "set", key, remote.set(&remote_key, &payload, ttl))
                .await;
        }
    }

    /// Serializes `value` and stores it in both tiers.
    ///
    /// Fails only when `value` cannot be serialized.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let payload = serde_json::to_string(value)?;
        self.set_raw(key, payload, ttl).await;
        Ok(())
    }

    /// Returns the cached value, or computes it with `factory` and caches it.
    ///
    /// Factory errors are returned as-is and nothing is cached.
    pub async fn get_or_set<T, F, Fut>(&self, key: &str, ttl: Option<Duration>, factory: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let value = factory().await?;
        self.set(key, &value, ttl).await?;
        Ok(value)
    }

    // == Delete ==
    /// Removes `key` from both tiers. Deleting a missing key is a no-op.
    pub async fn delete(&self, key: &str) {
        if let Some(local) = &self.local {
            local.delete(key);
        }

        if let Some(remote) = &self.remote {
            let remote_key = self.remote_key(key);
            self.bounded(remote.as_ref(), "delete", key, remote.delete(&remote_key))
                .await;
        }
    }

    // == Clear ==
    /// Flushes both tiers, or with a pattern, removes only the logical keys
    /// matching that regular expression.
    ///
    /// Pattern clears list the whole L2 keyspace under the prefix and filter
    /// it client-side, so they are meant for administrative invalidation, not
    /// request paths. Fails only when `pattern` is not a valid regex.
    pub async fn clear(&self, pattern: Option<&str>) -> Result<()> {
        let Some(pattern) = pattern else {
            if let Some(local) = &self.local {
                local.clear();
            }
            if let Some(remote) = &self.remote {
                self.bounded(remote.as_ref(), "flush", "*", remote.flush()).await;
            }
            info!("Cache cleared");
            return Ok(());
        };

        let regex = Regex::new(pattern)?;

        let local_removed = self
            .local
            .as_ref()
            .map(|local| local.clear_matching(&regex))
            .unwrap_or(0);

        let mut remote_removed = 0;
        if let Some(remote) = &self.remote {
            let prefix = self.remote_prefix();
            let listed = self
                .bounded(remote.as_ref(), "keys", pattern, remote.keys_with_prefix(&prefix))
                .await;
            if let Some(keys) = listed {
                let matching: Vec<String> = keys
                    .into_iter()
                    .filter(|k| k.strip_prefix(&prefix).is_some_and(|logical| regex.is_match(logical)))
                    .collect();
                let deleted = self
                    .bounded(remote.as_ref(), "delete_many", pattern, remote.delete_many(&matching))
                    .await;
                if deleted.is_some() {
                    remote_removed = matching.len();
                }
            }
        }

        info!(pattern, local_removed, remote_removed, "Cache cleared by pattern");
        Ok(())
    }

    // == Stats ==
    /// Recomputes the derived statistics and returns them.
    pub fn stats(&self) -> CacheStats {
        self.refresh_stats()
    }

    /// Recomputes hit/miss rates, key count and memory estimate from the raw
    /// counters and stores the result as the current snapshot.
    pub fn refresh_stats(&self) -> CacheStats {
        let (key_count, memory_usage) = self
            .local
            .as_ref()
            .map(LocalStore::footprint)
            .unwrap_or((0, 0));
        let stats = self.counters.snapshot(key_count, memory_usage);
        *self.snapshot.write() = stats.clone();
        stats
    }

    /// Last computed snapshot, without recomputing it.
    pub fn snapshot(&self) -> CacheStats {
        self.snapshot.read().clone()
    }
}
