use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let rt = &state.runtime;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git_sha": env!("CADENCE_GIT_SHA"),
        "jobs": rt.scheduler.len(),
        "uptime_secs": (rt.clock.now() - rt.started_at).num_seconds(),
    }))
}

/// GET /status: one view over every component.
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let rt = &state.runtime;
    Json(json!({
        "scheduler": rt.scheduler.stats(),
        "queue": rt.queue.stats(),
        "cache": rt.cache.stats(),
        "learner": rt.learner.get_adaptive_stats(),
        "context": rt.context.snapshot(),
        "dispatch_waiting": rt.dispatcher.waiting(),
    }))
}
