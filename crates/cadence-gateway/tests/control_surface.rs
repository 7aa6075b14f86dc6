use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use cadence_core::{config::JobConfig, CadenceConfig, ManualClock, MemorySnapshotStore, PriorityLevel};
use cadence_gateway::{app, handlers::builtin_registry, Runtime};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tokio::sync::watch;
use tower::ServiceExt;

fn gateway() -> (Router, Arc<Runtime>, watch::Sender<bool>) {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap());
    let config = CadenceConfig {
        jobs: vec![JobConfig {
            name: "inbox".into(),
            kind: "messages".into(),
            interval_minutes: 15.0,
            priority: PriorityLevel::High,
            allow_concurrent: false,
            handler: "noop".into(),
        }],
        ..CadenceConfig::default()
    };
    let (runtime, channels) = Runtime::build(
        config,
        builtin_registry(),
        Arc::new(MemorySnapshotStore::new()),
        clock,
    )
    .unwrap();
    let (tx, rx) = watch::channel(false);
    runtime.spawn(channels, rx);
    let router = app::build_router(Arc::new(app::AppState::new(Arc::clone(&runtime))));
    (router, runtime, tx)
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let resp = router.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn health_and_job_listing() {
    let (router, _rt, _tx) = gateway();

    let (status, body) = call(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["jobs"], 1);

    let (status, body) = call(&router, "GET", "/jobs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "inbox");
    assert_eq!(body[0]["status"], "idle");
}

#[tokio::test]
async fn unknown_job_is_404_with_code() {
    let (router, _rt, _tx) = gateway();
    let (status, body) = call(&router, "GET", "/jobs/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "JOB_NOT_FOUND");
}

#[tokio::test]
async fn trigger_disable_enable_cycle() {
    let (router, rt, _tx) = gateway();

    let (status, body) = call(&router, "POST", "/jobs/inbox/trigger", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "executed");
    assert_eq!(body["success"], true);

    let (_, history) = call(&router, "GET", "/jobs/inbox/history?limit=5", None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    let (status, body) = call(&router, "POST", "/jobs/inbox/disable", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "disabled");

    let (_, body) = call(&router, "POST", "/jobs/inbox/trigger", None).await;
    assert_eq!(body["outcome"], "skipped");
    assert_eq!(body["reason"], "disabled");

    let (_, body) = call(&router, "POST", "/jobs/inbox/enable", None).await;
    assert_eq!(body["status"], "idle");
    assert_eq!(rt.queue.stats().completed, 1);
}

#[tokio::test]
async fn activity_and_config_routes() {
    let (router, rt, _tx) = gateway();

    let (status, _) = call(
        &router,
        "POST",
        "/activity",
        Some(serde_json::json!({ "activity": "page_view" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = call(
        &router,
        "POST",
        "/activity",
        Some(serde_json::json!({ "activity": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let mut queue = rt.config().queue;
    queue.max_size = 25;
    let (status, body) = call(
        &router,
        "PUT",
        "/config",
        Some(serde_json::json!({ "queue": queue })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queue"]["max_size"], 25);
    assert_eq!(rt.queue.config().max_size, 25);

    let (status, body) = call(&router, "GET", "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["scheduler"]["total_jobs"].is_number());
}

#[tokio::test]
async fn cache_and_queue_clear() {
    let (router, rt, _tx) = gateway();
    rt.cache
        .set(
            "u1",
            "profile",
            &serde_json::json!({ "name": "x" }),
            Default::default(),
        )
        .unwrap();

    let (_, stats) = call(&router, "GET", "/cache/stats", None).await;
    assert_eq!(stats["entries"], 1);

    let (_, body) = call(&router, "DELETE", "/cache", None).await;
    assert_eq!(body["removed"], 1);
    assert!(rt.cache.is_empty());

    let (_, body) = call(&router, "DELETE", "/queue", None).await;
    assert_eq!(body["cleared"], 0);
}
