use axum::{extract::State, Json};
use cadence_core::CadenceConfig;
use std::sync::Arc;

use super::error::ApiResult;
use crate::app::AppState;
use crate::runtime::ConfigUpdate;

/// GET /config
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<CadenceConfig> {
    Json(state.runtime.config())
}

/// PUT /config: replace scheduler/queue/cache/learner sections in place.
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConfigUpdate>,
) -> ApiResult<Json<CadenceConfig>> {
    Ok(Json(state.runtime.apply_config(update)?))
}
