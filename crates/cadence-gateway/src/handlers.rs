//! Built-in job handlers available to jobs declared in `cadence.toml`.
//!
//! Real collection work lives outside this binary; these cover smoke tests
//! and housekeeping.

use cadence_scheduler::{handler_fn, HandlerRegistry, JobContext};
use serde_json::json;
use tracing::info;

pub fn builtin_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry
        .register(
            "noop",
            handler_fn(|_ctx: JobContext| async { Ok(json!({ "ok": true })) }),
        )
        .register(
            "log",
            handler_fn(|ctx: JobContext| async move {
                info!(
                    job = %ctx.job_name,
                    kind = %ctx.kind,
                    attempt = ctx.attempt,
                    manual = ctx.manual,
                    "job fired"
                );
                Ok(json!({ "logged": ctx.job_name, "fired_at": ctx.fired_at }))
            }),
        );
    registry
}
