//! Cache Statistics Module
//!
//! Raw counters updated on the hot path and the derived snapshot recomputed
//! from them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Counters ==
/// Monotonic counters bumped on every provider call.
#[derive(Debug, Default)]
pub struct Counters {
    requests: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    l2_failures: AtomicU64,
}

impl Counters {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_l2_failure(&self) {
        self.l2_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Builds a snapshot from the current counter values and the given L1 footprint.
    pub fn snapshot(&self, key_count: usize, memory_usage: usize) -> CacheStats {
        let mut stats = CacheStats {
            total_requests: self.requests.load(Ordering::Relaxed),
            total_hits: self.hits.load(Ordering::Relaxed),
            total_misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            l2_failures: self.l2_failures.load(Ordering::Relaxed),
            key_count,
            memory_usage,
            ..CacheStats::default()
        };
        stats.recompute_rates();
        stats
    }
}

// == Cache Stats ==
/// Point-in-time view of cache performance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of `get` calls
    pub total_requests: u64,
    /// `get` calls answered from either tier
    pub total_hits: u64,
    /// `get` calls that missed both tiers
    pub total_misses: u64,
    /// Percentage of requests that hit, 0 to 100
    pub hit_rate: f64,
    /// Percentage of requests that missed, 0 to 100
    pub miss_rate: f64,
    /// Entries resident in L1
    pub key_count: usize,
    /// Estimated L1 size in bytes (keys plus serialized values)
    pub memory_usage: usize,
    /// Entries evicted from L1 by the capacity policy
    pub evictions: u64,
    /// L2 operations that failed and were swallowed
    pub l2_failures: u64,
}

impl CacheStats {
    /// Recomputes `hit_rate` and `miss_rate` from the raw counts.
    pub fn recompute_rates(&mut self) {
        if self.total_requests == 0 {
            self.hit_rate = 0.0;
            self.miss_rate = 0.0;
        } else {
            let total = self.total_requests as f64;
            self.hit_rate = self.total_hits as f64 / total * 100.0;
            self.miss_rate = self.total_misses as f64 / total * 100.0;
        }
    }
}
