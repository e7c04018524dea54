//! API Handlers
//!
//! HTTP request handlers for the cache admin endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::CacheProvider;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearRequest, ClearResponse, DeleteResponse, GetResponse, HealthResponse, SetRequest,
    SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared two-tier cache
    pub cache: Arc<CacheProvider>,
}

impl AppState {
    /// Creates a new AppState around an existing provider.
    pub fn new(cache: Arc<CacheProvider>) -> Self {
        Self { cache }
    }

    /// Creates a new AppState from configuration, connecting to L2 if configured.
    pub async fn from_config(config: &CacheConfig) -> Self {
        Self::new(Arc::new(CacheProvider::connect(config.clone()).await))
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value in the cache with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state
        .cache
        .set(&req.key, &req.value, req.ttl.map(Duration::from_secs))
        .await?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get::<Value>(&key).await {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Idempotent: deleting a missing key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    state.cache.delete(&key).await;
    Json(DeleteResponse::new(key))
}

/// Handler for POST /clear
pub async fn clear_handler(
    State(state): State<AppState>,
    Json(req): Json<ClearRequest>,
) -> Result<Json<ClearResponse>> {
    state.cache.clear(req.pattern.as_deref()).await?;
    Ok(Json(ClearResponse::new(req.pattern)))
}

/// Handler for GET /stats
///
/// Forces a statistics recomputation.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.cache.stats())
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.cache.l1_enabled(),
        state.cache.l2_enabled(),
    ))
}
