//! Cache Module
//!
//! Two-tier caching: a capacity-bounded in-process L1 store in front of a
//! networked L2 store, unified by [`CacheProvider`].

mod entry;
mod local;
mod provider;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use local::LocalStore;
pub use provider::CacheProvider;
pub use stats::{CacheStats, Counters};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB
