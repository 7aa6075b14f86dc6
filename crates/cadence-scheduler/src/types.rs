use cadence_core::{config::JobConfig, PriorityLevel, WorkKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a caller submits to register a recurring job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    /// Work kind as text; parsed during registration.
    pub kind: String,
    /// Nominal minutes between fires, before jitter.
    pub interval_minutes: f64,
    #[serde(default = "default_priority")]
    pub priority: PriorityLevel,
    #[serde(default)]
    pub allow_concurrent: bool,
    /// Name of a handler in the registry.
    pub handler: String,
}

fn default_priority() -> PriorityLevel {
    PriorityLevel::Medium
}

impl JobSpec {
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        interval_minutes: f64,
        handler: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            interval_minutes,
            priority: PriorityLevel::Medium,
            allow_concurrent: false,
            handler: handler.into(),
        }
    }

    pub fn with_priority(mut self, priority: PriorityLevel) -> Self {
        self.priority = priority;
        self
    }

    pub fn concurrent(mut self) -> Self {
        self.allow_concurrent = true;
        self
    }
}

impl From<JobConfig> for JobSpec {
    fn from(c: JobConfig) -> Self {
        Self {
            name: c.name,
            kind: c.kind,
            interval_minutes: c.interval_minutes,
            priority: c.priority,
            allow_concurrent: c.allow_concurrent,
            handler: c.handler,
        }
    }
}

/// Derived execution state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Active and waiting for its next fire.
    Idle,
    /// At least one execution is in flight.
    Running,
    /// Inactive, either by operator or by the failure policy.
    Disabled,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Idle => "idle",
            JobStatus::Running => "running",
            JobStatus::Disabled => "disabled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "idle" => Ok(JobStatus::Idle),
            "running" => Ok(JobStatus::Running),
            "disabled" => Ok(JobStatus::Disabled),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// A registered recurring job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// UUID v4 string.
    pub id: String,
    pub name: String,
    pub kind: WorkKind,
    /// Interval as registered; the learner scales from this.
    pub base_interval_minutes: f64,
    /// Current nominal interval. Each fire re-jitters from this value.
    pub interval_minutes: f64,
    pub priority: PriorityLevel,
    pub allow_concurrent: bool,
    pub handler: String,
    pub active: bool,
    /// Failures since the job was last (re-)enabled.
    pub failure_count: u32,
    pub execution_count: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    /// Set when the failure policy disabled the job; it re-enables at this instant.
    pub disabled_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A job plus its derived status, as reported to callers.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    #[serde(flatten)]
    pub job: Job,
    pub status: JobStatus,
    pub in_flight: usize,
}

/// Immutable log entry for one execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub job_id: String,
    pub job_name: String,
    pub kind: WorkKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub success: bool,
    /// Handler output summary on success.
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    /// Manually triggered rather than timer-driven.
    pub manual: bool,
}

impl ExecutionRecord {
    /// Hour of day (UTC) the execution started in.
    pub fn hour(&self) -> u32 {
        use chrono::Timelike;
        self.started_at.hour()
    }
}

/// Why a fire did not execute. Not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    OutsideWindow,
    /// A non-concurrent job still has an execution in flight.
    AlreadyRunning,
    /// The global cap on concurrent-allowed executions is reached.
    ConcurrencyCap,
    Disabled,
    /// A `JobFire` hook blocked the fire.
    Blocked { detail: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::OutsideWindow => write!(f, "outside active window"),
            SkipReason::AlreadyRunning => write!(f, "already running"),
            SkipReason::ConcurrencyCap => write!(f, "concurrency cap reached"),
            SkipReason::Disabled => write!(f, "job disabled"),
            SkipReason::Blocked { detail } => write!(f, "blocked: {detail}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FireOutcome {
    Executed(ExecutionRecord),
    Skipped(SkipReason),
}

/// Aggregate scheduler statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStats {
    pub total_jobs: usize,
    pub active_jobs: usize,
    pub running: usize,
    pub executions: u64,
    pub successes: u64,
    pub failures: u64,
    pub skipped: u64,
    /// `successes / executions`; 0 before the first execution.
    pub success_rate: f64,
    pub avg_duration_ms: f64,
    pub uptime_secs: i64,
}
