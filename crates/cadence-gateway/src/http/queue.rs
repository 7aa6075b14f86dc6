use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /queue: pending tasks with score breakdowns, in-flight tasks, stats.
pub async fn queue_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let queue = &state.runtime.queue;
    Json(json!({
        "stats": queue.stats(),
        "pending": queue.pending(),
        "processing": queue.processing(),
        "adjustments": queue.adjustments(),
    }))
}

/// DELETE /queue: drop pending tasks; their jobs record a failed execution.
pub async fn clear_queue(State(state): State<Arc<AppState>>) -> Json<Value> {
    let cleared = state.runtime.dispatcher.cancel_pending();
    Json(json!({ "cleared": cleared }))
}
