//! # Cache Admin Interface
//!
//! Operational endpoints for the response cache.

use super::{CacheManager, CacheStats, InvalidationManager};
use crate::core::error::AppError;
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Cache admin state
#[derive(Clone)]
pub struct CacheAdminState {
    pub cache_manager: Arc<CacheManager>,
    pub invalidation_manager: Arc<InvalidationManager>,
}

/// Cache admin router
pub struct CacheAdminRouter;

impl CacheAdminRouter {
    /// Create cache admin router
    pub fn create_router(state: CacheAdminState) -> Router {
        Router::new()
            .route("/cache/stats", get(get_cache_stats))
            .route("/cache/invalidate", post(invalidate_cache))
            .with_state(state)
    }
}

/// Cache statistics response
#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub stats: CacheStats,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Manual invalidation request
#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    pub pattern: String,
}

/// Manual invalidation result
#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub pattern: String,
    pub removed: usize,
}

async fn get_cache_stats(State(state): State<CacheAdminState>) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse {
        stats: state.cache_manager.stats(),
        timestamp: chrono::Utc::now(),
    })
}

async fn invalidate_cache(
    State(state): State<CacheAdminState>,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>, AppError> {
    let pattern = request.pattern.trim();
    if pattern.is_empty() {
        return Err(AppError::validation(["Pattern is required"]));
    }

    // Other applications may share the Redis server
    let keys = state.invalidation_manager.keys();
    if !keys.owns_pattern(pattern) {
        return Err(AppError::validation([format!(
            "Pattern must start with \"{}:\"",
            keys.namespace()
        )]));
    }

    let removed = state.invalidation_manager.invalidate(pattern).await;
    info!(pattern = %pattern, removed, "Manual cache invalidation");

    Ok(Json(InvalidateResponse {
        pattern: pattern.to_string(),
        removed,
    }))
}
