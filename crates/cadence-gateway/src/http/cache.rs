use axum::{extract::State, Json};
use cadence_cache::CacheStats;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /cache/stats
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.runtime.cache.stats())
}

/// DELETE /cache
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<Value> {
    let cache = &state.runtime.cache;
    let removed = cache.len();
    cache.clear();
    Json(json!({ "removed": removed }))
}
