//! HTTP middleware
//!
//! Cross-cutting layers that wrap arbitrary handlers. The cache provider
//! itself knows nothing about HTTP.

mod response_cache;

pub use response_cache::{cache_response, CachedResponse, ResponseCache, X_CACHE, X_CACHE_KEY};
