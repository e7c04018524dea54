//! Statistics Updater Task
//!
//! Background task that periodically recomputes derived cache statistics so
//! the hot path only bumps counters.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheProvider;

/// Spawns a background task that refreshes the provider's statistics
/// snapshot every `interval_secs` seconds.
///
/// The snapshot is best-effort: the L1 size it reports may change right
/// after it is taken.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let provider = Arc::new(CacheProvider::new(CacheConfig::default(), None));
/// let stats_handle = spawn_stats_task(provider.clone(), 30);
/// // Later, during shutdown:
/// stats_handle.abort();
/// ```
pub fn spawn_stats_task(provider: Arc<CacheProvider>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting statistics task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let stats = provider.refresh_stats();
            debug!(
                requests = stats.total_requests,
                hit_rate = stats.hit_rate,
                keys = stats.key_count,
                memory = stats.memory_usage,
                "Cache statistics refreshed"
            );
        }
    })
}
