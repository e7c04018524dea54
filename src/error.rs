//! Error types for the cache subsystem
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache subsystem.
///
/// `Remote`, `Timeout` and `Unavailable` are tier-local failures: they are
/// raised by [`RemoteStore`](crate::remote::RemoteStore) implementations and
/// never escape [`CacheProvider`](crate::cache::CacheProvider).
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Clear pattern is not a valid regular expression
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Value could not be serialized (or deserialized)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// L2 backend returned an error
    #[error("Remote store error: {0}")]
    Remote(#[from] redis::RedisError),

    /// L2 backend did not answer in time
    #[error("Remote store timed out after {0:?}")]
    Timeout(Duration),

    /// L2 backend is switched off or unreachable
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_)
            | CacheError::InvalidPattern(_)
            | CacheError::Serialization(_) => StatusCode::BAD_REQUEST,
            CacheError::Remote(_) | CacheError::Timeout(_) | CacheError::Unavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache subsystem.
pub type Result<T> = std::result::Result<T, CacheError>;
