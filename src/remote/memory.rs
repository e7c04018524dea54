//! In-process L2 stand-in.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::{RemoteEntry, RemoteStore};
use crate::error::{CacheError, Result};

/// A [`RemoteStore`] kept in process memory.
///
/// Useful for single-instance deployments without Redis and for exercising
/// the two-tier logic in tests: it counts reads and can be told to fail
/// every call, or to stall each one, as an unreachable backend would.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    reads: AtomicU64,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls received, failed ones included.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Makes every subsequent call fail with `Unavailable` (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Makes every subsequent call wait `delay` before doing anything.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Live keys currently stored.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|(_, expires_at)| *expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn stall(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            Err(CacheError::Unavailable("memory remote switched off".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<RemoteEntry>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.stall().await;
        self.check()?;

        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some((payload, expires_at)) if *expires_at > now => Ok(Some(RemoteEntry {
                payload: payload.clone(),
                ttl: Some(*expires_at - now),
            })),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<()> {
        self.stall().await;
        self.check()?;
        self.entries
            .lock()
            .insert(key.to_string(), (payload.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.stall().await;
        self.check()?;
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<()> {
        self.stall().await;
        self.check()?;
        let mut entries = self.entries.lock();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.stall().await;
        self.check()?;
        Ok(self
            .entries
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn flush(&self) -> Result<()> {
        self.stall().await;
        self.check()?;
        self.entries.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_get_with_ttl() {
        let remote = MemoryRemote::new();
        remote.set("k", "1", Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        let entry = remote.get("k").await.unwrap().unwrap();
        assert_eq!(entry.payload, "1");
        assert_eq!(entry.ttl, Some(Duration::from_secs(6)));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(remote.get("k").await.unwrap().is_none());
        assert_eq!(remote.reads(), 2);
    }

    #[tokio::test]
    async fn test_keys_with_prefix_and_delete_many() {
        let remote = MemoryRemote::new();
        let ttl = Duration::from_secs(60);
        remote.set("app:a", "1", ttl).await.unwrap();
        remote.set("app:b", "2", ttl).await.unwrap();
        remote.set("other:a", "3", ttl).await.unwrap();

        let mut keys = remote.keys_with_prefix("app:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["app:a".to_string(), "app:b".to_string()]);

        remote.delete_many(&keys).await.unwrap();
        assert_eq!(remote.len(), 1);

        remote.flush().await.unwrap();
        assert!(remote.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_mode() {
        let remote = MemoryRemote::new();
        remote.set_delay(Some(Duration::from_secs(3)));

        let started = Instant::now();
        remote.set("k", "1", Duration::from_secs(60)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(3));

        remote.set_delay(None);
        assert_eq!(remote.get("k").await.unwrap().unwrap().payload, "1");
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let remote = MemoryRemote::new();
        remote.set_failing(true);

        assert!(matches!(
            remote.get("k").await,
            Err(CacheError::Unavailable(_))
        ));
        assert!(remote.set("k", "1", Duration::from_secs(1)).await.is_err());

        remote.set_failing(false);
        assert!(remote.get("k").await.unwrap().is_none());
    }
}
