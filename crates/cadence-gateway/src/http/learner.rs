use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::app::AppState;

/// GET /learner: stats, current schedule, activity histograms.
pub async fn learner_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let learner = &state.runtime.learner;
    Json(json!({
        "stats": learner.get_adaptive_stats(),
        "schedule": learner.get_current_schedule(),
        "patterns": learner.get_activity_patterns(),
    }))
}

/// POST /learner/reset: forget learned patterns; intervals return to base.
pub async fn reset_learner(State(state): State<Arc<AppState>>) -> Json<Value> {
    let rt = &state.runtime;
    rt.learner.reset();
    let mut restored = 0;
    for (kind, scale) in rt.learner.current_scales() {
        if let Ok(n) = rt.scheduler.apply_interval_scale(kind, scale) {
            restored += n;
        }
    }
    info!(jobs = restored, "learner reset");
    Json(json!({ "reset": true, "jobs_restored": restored }))
}
