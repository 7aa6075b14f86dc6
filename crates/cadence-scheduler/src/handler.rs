use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use cadence_core::WorkKind;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Handler output summary, or the failure detail.
pub type JobOutcome = std::result::Result<serde_json::Value, String>;

/// What a handler receives for one execution.
#[derive(Debug, Clone, Serialize)]
pub struct JobContext {
    pub execution_id: String,
    pub job_id: String,
    pub job_name: String,
    pub kind: WorkKind,
    pub fired_at: DateTime<Utc>,
    /// 1-based execution number for this job.
    pub attempt: u64,
    pub manual: bool,
    /// The `JobFire` hook payload, after any Before hook rewrote it.
    pub payload: serde_json::Value,
}

/// The work behind a job. Opaque to the scheduler.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn execute(&self, ctx: JobContext) -> JobOutcome;
}

/// Adapts an async closure into a [`JobHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> JobHandler for FnHandler<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync,
    Fut: Future<Output = JobOutcome> + Send + 'static,
{
    async fn execute(&self, ctx: JobContext) -> JobOutcome {
        (self.0)(ctx).await
    }
}

pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn JobHandler>
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JobOutcome> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

/// Handlers by name. Job specs refer to handlers by these names.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn JobHandler>) -> &mut Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Wrap every handler with `wrap`, keeping names.
    pub fn map<W>(self, mut wrap: W) -> Self
    where
        W: FnMut(&str, Arc<dyn JobHandler>) -> Arc<dyn JobHandler>,
    {
        let handlers = self
            .handlers
            .into_iter()
            .map(|(name, h)| {
                let wrapped = wrap(&name, h);
                (name, wrapped)
            })
            .collect();
        Self { handlers }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}
