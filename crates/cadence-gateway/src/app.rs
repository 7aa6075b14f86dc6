use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::http;
use crate::runtime::Runtime;

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub runtime: Arc<Runtime>,
}

impl AppState {
    pub fn new(runtime: Arc<Runtime>) -> Self {
        Self { runtime }
    }
}

/// Assemble the control-surface router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(http::health::health_handler))
        .route("/status", get(http::health::status_handler))
        .route("/jobs", get(http::jobs::list_jobs))
        .route("/jobs/{id}", get(http::jobs::get_job))
        .route("/jobs/{id}/history", get(http::jobs::job_history))
        .route("/jobs/{id}/enable", post(http::jobs::enable_job))
        .route("/jobs/{id}/disable", post(http::jobs::disable_job))
        .route("/jobs/{id}/trigger", post(http::jobs::trigger_job))
        .route(
            "/queue",
            get(http::queue::queue_handler).delete(http::queue::clear_queue),
        )
        .route("/cache/stats", get(http::cache::cache_stats))
        .route("/cache", axum::routing::delete(http::cache::clear_cache))
        .route("/learner", get(http::learner::learner_handler))
        .route("/learner/reset", post(http::learner::reset_learner))
        .route("/activity", post(http::activity::activity_handler))
        .route(
            "/config",
            put(http::config::update_config).get(http::config::get_config),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
