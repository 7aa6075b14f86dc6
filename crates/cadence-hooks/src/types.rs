use std::sync::Arc;

use cadence_core::WorkKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Points in the orchestration core that instrumentation can observe or veto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    /// A job trigger is about to run its handler. Before hooks may block it.
    /// Payload: job_name, manual.
    JobFire,
    /// Payload: execution_id, duration_ms, summary.
    JobCompleted,
    /// Payload: execution_id, duration_ms, error, failure_count.
    JobFailed,
    /// Payload: failure_count, reenable_at.
    JobDisabled,
    JobReenabled,
    /// Payload: task_id, score, level.
    TaskEnqueued,
    /// Payload: task_id, score, waited_ms.
    TaskDequeued,
    /// Payload: key, size, reason.
    CacheEvicted,
}

/// Before hooks run inline and can veto; After hooks only observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookTiming {
    Before,
    After,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum HookAction {
    Allow,
    Block { reason: String },
    Modify { payload: serde_json::Value },
}

/// What every hook invocation receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookContext {
    pub event: HookEvent,
    pub payload: serde_json::Value,
    pub job_id: Option<String>,
    pub kind: Option<WorkKind>,
    pub timestamp: DateTime<Utc>,
}

impl HookContext {
    pub fn new(event: HookEvent, payload: serde_json::Value) -> Self {
        Self {
            event,
            payload,
            job_id: None,
            kind: None,
            timestamp: Utc::now(),
        }
    }

    pub fn for_job(mut self, job_id: impl Into<String>, kind: WorkKind) -> Self {
        self.job_id = Some(job_id.into());
        self.kind = Some(kind);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookResult {
    pub action: HookAction,
    pub duration_ms: u64,
}

impl HookResult {
    pub fn allow() -> Self {
        Self {
            action: HookAction::Allow,
            duration_ms: 0,
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            action: HookAction::Block {
                reason: reason.into(),
            },
            duration_ms: 0,
        }
    }
}

/// Synchronous handler. Keep it cheap: Before hooks run on the caller's task.
pub trait HookHandler: Send + Sync {
    fn handle(&self, ctx: &HookContext) -> HookResult;
}

impl<F> HookHandler for F
where
    F: Fn(&HookContext) -> HookResult + Send + Sync,
{
    fn handle(&self, ctx: &HookContext) -> HookResult {
        self(ctx)
    }
}

pub struct HookDefinition {
    pub name: String,
    pub event: HookEvent,
    pub timing: HookTiming,
    pub handler: Arc<dyn HookHandler>,
    /// Lower runs first; ties keep registration order.
    pub priority: i32,
}

impl HookDefinition {
    pub fn new(
        name: impl Into<String>,
        event: HookEvent,
        timing: HookTiming,
        handler: Arc<dyn HookHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            event,
            timing,
            handler,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}
