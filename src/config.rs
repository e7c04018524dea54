//! Configuration Module
//!
//! Handles loading cache and server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

// == Cache Config ==
/// Tiering and capacity settings for a [`CacheProvider`](crate::cache::CacheProvider).
///
/// Read-only once the provider has been built.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Default TTL in seconds for entries written without an explicit TTL
    pub default_ttl: u64,
    /// Maximum number of entries resident in L1
    pub max_memory_keys: usize,
    /// Whether the in-process tier is used
    pub enable_l1: bool,
    /// Whether the networked tier is used
    pub enable_l2: bool,
    /// Namespace prepended to every L2 key
    pub key_prefix: String,
    /// L2 connection string, e.g. `redis://127.0.0.1:6379`
    pub backend_address: Option<String>,
    /// Upper bound on any single L2 round-trip, in milliseconds
    pub l2_timeout_ms: u64,
}

impl CacheConfig {
    /// Loads the cache settings from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_MAX_MEMORY_KEYS` - L1 capacity (default: 1000)
    /// - `CACHE_ENABLE_L1` / `CACHE_ENABLE_L2` - Tier switches (default: true)
    /// - `CACHE_KEY_PREFIX` - L2 namespace (default: "cache")
    /// - `REDIS_URL` - L2 address (default: unset)
    /// - `CACHE_L2_TIMEOUT_MS` - L2 timeout (default: 2000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env_parse("CACHE_DEFAULT_TTL", defaults.default_ttl),
            max_memory_keys: env_parse("CACHE_MAX_MEMORY_KEYS", defaults.max_memory_keys),
            enable_l1: env_flag("CACHE_ENABLE_L1", defaults.enable_l1),
            enable_l2: env_flag("CACHE_ENABLE_L2", defaults.enable_l2),
            key_prefix: env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            backend_address: env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
            l2_timeout_ms: env_parse("CACHE_L2_TIMEOUT_MS", defaults.l2_timeout_ms),
        }
    }

    /// Default TTL as a `Duration`.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl)
    }

    /// L2 timeout as a `Duration`.
    pub fn l2_timeout(&self) -> Duration {
        Duration::from_millis(self.l2_timeout_ms)
    }

    /// Config with only the in-process tier active.
    pub fn local_only(max_memory_keys: usize, default_ttl: u64) -> Self {
        Self {
            max_memory_keys,
            default_ttl,
            enable_l2: false,
            ..Self::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: 300,
            max_memory_keys: 1000,
            enable_l1: true,
            enable_l2: true,
            key_prefix: "cache".to_string(),
            backend_address: None,
            l2_timeout_ms: 2000,
        }
    }
}

// == Server Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache provider settings
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Statistics recomputation interval in seconds
    pub stats_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `STATS_INTERVAL` - Statistics refresh frequency in seconds (default: 30)
    /// - plus everything read by [`CacheConfig::from_env`]
    pub fn from_env() -> Self {
        Self {
            cache: CacheConfig::from_env(),
            server_port: env_parse("SERVER_PORT", 3000),
            stats_interval: env_parse("STATS_INTERVAL", 30),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
            stats_interval: 30,
        }
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => parse_flag(&v).unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
