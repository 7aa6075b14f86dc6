use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use super::error::{ApiError, ApiResult};
use crate::app::AppState;
use crate::runtime::ActivitySignal;

/// POST /activity: inbound activity signal, consumed asynchronously.
pub async fn activity_handler(
    State(state): State<Arc<AppState>>,
    Json(signal): Json<ActivitySignal>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if signal.activity.trim().is_empty() {
        return Err(ApiError::bad_request("activity cannot be empty"));
    }
    if !state.runtime.submit_activity(signal) {
        return Err(ApiError::unavailable("activity channel full"));
    }
    Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": true }))))
}
