//! Job control routes. `{id}` accepts a job id or a job name.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use cadence_scheduler::{ExecutionRecord, FireOutcome, JobView};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::error::ApiResult;
use crate::app::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// GET /jobs
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobView>> {
    Json(state.runtime.scheduler.list_jobs())
}

/// GET /jobs/{id}
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobView>> {
    Ok(Json(state.runtime.scheduler.job(&id)?))
}

/// GET /jobs/{id}/history?limit=: oldest first.
pub async fn job_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<ExecutionRecord>>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(state.runtime.scheduler.history(Some(&id), limit)?))
}

/// POST /jobs/{id}/enable
pub async fn enable_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobView>> {
    let view = state.runtime.scheduler.enable_job(&id)?;
    info!(job_id = %view.job.id, "job enabled via control surface");
    Ok(Json(view))
}

/// POST /jobs/{id}/disable
pub async fn disable_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobView>> {
    let view = state.runtime.scheduler.disable_job(&id)?;
    info!(job_id = %view.job.id, "job disabled via control surface");
    Ok(Json(view))
}

/// POST /jobs/{id}/trigger: runs the job now and waits for the outcome.
pub async fn trigger_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<FireOutcome>> {
    Ok(Json(state.runtime.scheduler.trigger_now(&id).await?))
}
