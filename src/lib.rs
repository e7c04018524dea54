//! Hybrid Cache - two-tier caching for web services
//!
//! An in-process L1 store in front of a shared Redis L2 store, with key
//! generators, an axum response-caching middleware and a background
//! statistics task.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod keys;
pub mod middleware;
pub mod models;
pub mod remote;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheProvider, CacheStats};
pub use config::{CacheConfig, Config};
pub use error::{CacheError, Result};
pub use middleware::{cache_response, ResponseCache};
pub use tasks::spawn_stats_task;
