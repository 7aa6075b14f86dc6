use cadence_core::{PriorityLevel, WorkKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a caller submits to the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub kind: WorkKind,
    /// Identifier of the thing the task collects; doubles as the cache id
    /// for the freshness lookup.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub urgent: bool,
    /// Critical tasks are exempt from load and health discounts.
    #[serde(default)]
    pub critical: bool,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub user_triggered: bool,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl TaskSpec {
    pub fn new(kind: WorkKind) -> Self {
        Self {
            kind,
            target: None,
            urgent: false,
            critical: false,
            retry_count: 0,
            user_triggered: false,
            deadline: None,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn urgent(mut self) -> Self {
        self.urgent = true;
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    pub fn user_triggered(mut self) -> Self {
        self.user_triggered = true;
        self
    }

    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Every factor that went into a task's score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub urgency: f64,
    pub resource_cost: f64,
    pub deadline: f64,
    pub contextual: f64,
    pub freshness: f64,
    pub success_rate: f64,
    pub system_load: f64,
    /// `base×0.3 + urgency×0.4 + resource_cost×0.2 + deadline×0.1`
    pub weighted: f64,
    /// `weighted × contextual × freshness × success_rate × system_load`
    pub score: f64,
}

/// A task admitted to the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub spec: TaskSpec,
    pub breakdown: ScoreBreakdown,
    /// Score at admission; aging adds to this, never compounds.
    pub base_score: f64,
    pub boost: f64,
    /// `base_score + boost`. The queue orders by this.
    pub score: f64,
    pub level: PriorityLevel,
    pub enqueued_at: DateTime<Utc>,
    pub last_aged_at: DateTime<Utc>,
    /// Admission order, for FIFO among equal scores.
    pub seq: u64,
}

/// Result of admitting a task.
#[derive(Debug, Clone)]
pub struct Admission {
    pub task: Task,
    /// The pending task pushed out to make room, when the queue was full.
    pub dropped: Option<Task>,
}

/// A task handed out by `dequeue` and not yet completed.
#[derive(Debug, Clone, Serialize)]
pub struct InFlightTask {
    pub task: Task,
    pub started_at: DateTime<Utc>,
}

/// What the worker reports back. Success means `error` is absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskResult {
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl TaskResult {
    pub fn ok(output: serde_json::Value) -> Self {
        Self {
            output: Some(output),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            output: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub task_id: String,
    pub kind: WorkKind,
    pub success: bool,
    pub error: Option<String>,
    pub score: f64,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl CompletionRecord {
    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }
}

/// A base-table nudge applied by rebalancing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rebalance {
    pub kind: WorkKind,
    pub success_rate: f64,
    pub samples: usize,
    /// Accumulated adjustment after this pass.
    pub adjustment: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub enqueued: u64,
    pub dequeued: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub dropped: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    pub by_level: std::collections::HashMap<PriorityLevel, usize>,
    pub avg_wait_ms: f64,
}
