use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use cadence_core::{config::SchedulerConfig, IntervalScale, SharedClock, WorkKind};
use cadence_hooks::{HookAction, HookContext, HookEngine, HookEvent};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    error::{Result, SchedulerError},
    handler::{HandlerRegistry, JobContext, JobHandler, JobOutcome},
    timing::{initial_offset, jittered_interval, ActiveWindow},
    types::{
        ExecutionRecord, FireOutcome, Job, JobSpec, JobStatus, JobView, SchedulerStats, SkipReason,
    },
};

#[derive(Default)]
struct Counters {
    executions: u64,
    successes: u64,
    failures: u64,
    skipped: u64,
    duration_ms_total: i64,
}

#[derive(Default)]
struct SchedulerState {
    jobs: HashMap<String, Job>,
    /// Job ids in registration order.
    order: Vec<String>,
    in_flight: HashMap<String, usize>,
    /// In-flight executions of concurrent-allowed jobs, across all jobs.
    concurrent_in_flight: usize,
    history: VecDeque<ExecutionRecord>,
    /// Learned per-kind scales, applied to each job's own base interval.
    scales: HashMap<WorkKind, IntervalScale>,
    counters: Counters,
}

impl SchedulerState {
    fn scaled(&self, kind: WorkKind, base_minutes: f64) -> f64 {
        self.scales
            .get(&kind)
            .map_or(base_minutes, |scale| scale.apply(base_minutes))
    }

    /// Accepts a job id or a job name.
    fn resolve(&self, key: &str) -> Result<String> {
        if self.jobs.contains_key(key) {
            return Ok(key.to_string());
        }
        self.jobs
            .values()
            .find(|j| j.name == key)
            .map(|j| j.id.clone())
            .ok_or_else(|| SchedulerError::JobNotFound {
                id: key.to_string(),
            })
    }

    fn view(&self, id: &str) -> Option<JobView> {
        let job = self.jobs.get(id)?;
        let in_flight = self.in_flight.get(id).copied().unwrap_or(0);
        let status = if !job.active {
            JobStatus::Disabled
        } else if in_flight > 0 {
            JobStatus::Running
        } else {
            JobStatus::Idle
        };
        Some(JobView {
            job: job.clone(),
            status,
            in_flight,
        })
    }

    fn release(&mut self, job_id: &str, allow_concurrent: bool) {
        if let Some(n) = self.in_flight.get_mut(job_id) {
            *n = n.saturating_sub(1);
            if *n == 0 {
                self.in_flight.remove(job_id);
            }
        }
        if allow_concurrent {
            self.concurrent_in_flight = self.concurrent_in_flight.saturating_sub(1);
        }
    }
}

/// A fire that passed every gate and holds an execution slot.
struct Admission {
    job: Job,
    handler: Option<Arc<dyn JobHandler>>,
    execution_id: String,
    fired_at: DateTime<Utc>,
    manual: bool,
    payload: serde_json::Value,
}

/// What one pass of the timer loop did.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Executions started this pass; each handle resolves to its record.
    pub fired: Vec<(String, JoinHandle<ExecutionRecord>)>,
    pub skipped: Vec<(String, SkipReason)>,
    /// Jobs whose failure cooldown elapsed this pass.
    pub reenabled: Vec<String>,
}

/// Recurring job scheduler.
///
/// Each active job fires when its `next_run` arrives. Every timer fire,
/// executed or skipped, re-arms the job at `now + jitter(nominal interval)`,
/// so a skipped fire is neither deferred nor brought forward. Handlers run on
/// their own Tokio task; the loop never waits on them.
pub struct Scheduler {
    config: RwLock<SchedulerConfig>,
    handlers: HandlerRegistry,
    clock: SharedClock,
    hooks: Arc<HookEngine>,
    /// If set, every execution record is forwarded here.
    records_tx: Option<mpsc::Sender<ExecutionRecord>>,
    state: Mutex<SchedulerState>,
    started_at: DateTime<Utc>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, handlers: HandlerRegistry, clock: SharedClock) -> Self {
        let started_at = clock.now();
        Self {
            config: RwLock::new(config),
            handlers,
            clock,
            hooks: HookEngine::empty(),
            records_tx: None,
            state: Mutex::new(SchedulerState::default()),
            started_at,
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<HookEngine>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Forward a copy of every [`ExecutionRecord`] to `tx`.
    ///
    /// Uses `try_send`, so a full channel drops the copy rather than stalling
    /// the execution path.
    pub fn with_record_sender(mut self, tx: mpsc::Sender<ExecutionRecord>) -> Self {
        self.records_tx = Some(tx);
        self
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config.read().expect("scheduler config poisoned").clone()
    }

    /// Swap tunables in place. Already-armed timers keep their `next_run`.
    pub fn update_config(&self, config: SchedulerConfig) {
        *self.config.write().expect("scheduler config poisoned") = config;
        info!("scheduler config updated");
    }

    /// Register a job and arm its first fire after the priority offset.
    pub fn register_job(&self, spec: JobSpec) -> Result<String> {
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(SchedulerError::Validation("name must not be empty".into()));
        }
        let kind: WorkKind = spec.kind.parse().map_err(SchedulerError::Validation)?;
        validate_interval(spec.interval_minutes)?;
        if spec.handler.trim().is_empty() {
            return Err(SchedulerError::Validation(format!(
                "job '{name}' has no handler"
            )));
        }
        if !self.handlers.contains(&spec.handler) {
            return Err(SchedulerError::Validation(format!(
                "job '{name}' references unknown handler '{}'",
                spec.handler
            )));
        }

        let config = self.config();
        let now = self.clock.now();
        let mut state = self.state.lock().expect("scheduler state poisoned");
        if state.jobs.values().any(|j| j.name == name) {
            return Err(SchedulerError::Validation(format!(
                "job '{name}' is already registered"
            )));
        }

        let id = Uuid::new_v4().to_string();
        let next_run = now + initial_offset(spec.priority, &config);
        let job = Job {
            id: id.clone(),
            name,
            kind,
            base_interval_minutes: spec.interval_minutes,
            interval_minutes: state.scaled(kind, spec.interval_minutes),
            priority: spec.priority,
            allow_concurrent: spec.allow_concurrent,
            handler: spec.handler,
            active: true,
            failure_count: 0,
            execution_count: 0,
            last_run: None,
            next_run: Some(next_run),
            disabled_until: None,
            created_at: now,
        };
        info!(
            job_id = %id,
            name = %job.name,
            kind = %kind,
            interval_minutes = job.interval_minutes,
            priority = %job.priority,
            first_fire = %next_run,
            "job registered"
        );
        state.order.push(id.clone());
        state.jobs.insert(id.clone(), job);
        Ok(id)
    }

    /// Replace a job's base interval and re-arm it from now. Any learned
    /// scale for the job's kind applies to the new base.
    pub fn reschedule_job(&self, key: &str, interval_minutes: f64) -> Result<JobView> {
        validate_interval(interval_minutes)?;
        let config = self.config();
        let now = self.clock.now();
        let mut state = self.state.lock().expect("scheduler state poisoned");
        let id = state.resolve(key)?;
        let kind = state
            .jobs
            .get(&id)
            .map(|j| j.kind)
            .ok_or_else(|| SchedulerError::JobNotFound { id: id.clone() })?;
        let nominal = state.scaled(kind, interval_minutes);
        let job = state.jobs.get_mut(&id).ok_or_else(|| SchedulerError::JobNotFound {
            id: id.clone(),
        })?;
        job.base_interval_minutes = interval_minutes;
        job.interval_minutes = nominal;
        if job.active {
            job.next_run = Some(now + initial_offset(job.priority, &config));
        }
        info!(job_id = %id, interval_minutes, next_run = ?job.next_run, "job rescheduled");
        state.view(&id).ok_or(SchedulerError::JobNotFound { id })
    }

    /// Adopt a learned scale for `kind`. Every job of that kind gets
    /// `scale.apply(base_interval_minutes)` as its nominal interval, as do
    /// jobs registered or rescheduled later. Armed timers are left alone;
    /// the new value applies from the next fire.
    pub fn apply_interval_scale(&self, kind: WorkKind, scale: IntervalScale) -> Result<usize> {
        if !scale.is_valid() {
            return Err(SchedulerError::Validation(format!(
                "interval scale for {kind} must be positive and finite, got {scale:?}"
            )));
        }
        let mut state = self.state.lock().expect("scheduler state poisoned");
        state.scales.insert(kind, scale);
        let mut updated = 0;
        for job in state.jobs.values_mut().filter(|j| j.kind == kind) {
            job.interval_minutes = scale.apply(job.base_interval_minutes);
            updated += 1;
        }
        if updated > 0 {
            debug!(%kind, factor = scale.factor, jobs = updated, "interval scale applied");
        }
        Ok(updated)
    }

    /// Reactivate a job, clearing its failure count and any cooldown.
    pub fn enable_job(&self, key: &str) -> Result<JobView> {
        let config = self.config();
        let now = self.clock.now();
        let (view, was_disabled) = {
            let mut state = self.state.lock().expect("scheduler state poisoned");
            let id = state.resolve(key)?;
            let job = state.jobs.get_mut(&id).ok_or_else(|| SchedulerError::JobNotFound {
                id: id.clone(),
            })?;
            let was_disabled = !job.active;
            reactivate(job, now, &config);
            (
                state.view(&id).ok_or(SchedulerError::JobNotFound { id })?,
                was_disabled,
            )
        };
        if was_disabled {
            info!(job_id = %view.job.id, name = %view.job.name, "job enabled");
            self.notify(HookEvent::JobReenabled, &view.job, serde_json::json!({ "manual": true }));
        }
        Ok(view)
    }

    /// Deactivate a job until explicitly enabled. In-flight executions finish.
    pub fn disable_job(&self, key: &str) -> Result<JobView> {
        let view = {
            let mut state = self.state.lock().expect("scheduler state poisoned");
            let id = state.resolve(key)?;
            let job = state.jobs.get_mut(&id).ok_or_else(|| SchedulerError::JobNotFound {
                id: id.clone(),
            })?;
            job.active = false;
            job.disabled_until = None;
            job.next_run = None;
            state.view(&id).ok_or(SchedulerError::JobNotFound { id })?
        };
        info!(job_id = %view.job.id, name = %view.job.name, "job disabled");
        self.notify(
            HookEvent::JobDisabled,
            &view.job,
            serde_json::json!({ "reason": "operator" }),
        );
        Ok(view)
    }

    /// Fire a job immediately and wait for the execution.
    ///
    /// Ignores the timer and the active window but still honours the
    /// disabled flag, the concurrency rules and `JobFire` hooks.
    pub async fn trigger_now(&self, key: &str) -> Result<FireOutcome> {
        let id = {
            let state = self.state.lock().expect("scheduler state poisoned");
            state.resolve(key)?
        };
        let now = self.clock.now();
        match self.admit(&id, now, true)? {
            Ok(admission) => Ok(FireOutcome::Executed(self.execute(admission).await)),
            Err(reason) => Ok(FireOutcome::Skipped(reason)),
        }
    }

    /// One pass of the timer: re-enable jobs whose cooldown elapsed, then fire
    /// every due job. Must be called inside a Tokio runtime.
    pub fn tick(self: &Arc<Self>) -> TickReport {
        let now = self.clock.now();
        let mut report = TickReport {
            reenabled: self.reenable_cooled_down(now),
            ..TickReport::default()
        };

        let due: Vec<String> = {
            let state = self.state.lock().expect("scheduler state poisoned");
            let mut due: Vec<&Job> = state
                .jobs
                .values()
                .filter(|j| j.active && j.next_run.is_some_and(|t| t <= now))
                .collect();
            // Higher priority first so it wins the concurrency slots.
            due.sort_by(|a, b| {
                b.priority
                    .weight()
                    .total_cmp(&a.priority.weight())
                    .then(a.next_run.cmp(&b.next_run))
            });
            due.into_iter().map(|j| j.id.clone()).collect()
        };

        for id in due {
            match self.admit(&id, now, false) {
                Ok(Ok(admission)) => {
                    let this = Arc::clone(self);
                    let handle = tokio::spawn(async move { this.execute(admission).await });
                    report.fired.push((id, handle));
                }
                Ok(Err(reason)) => report.skipped.push((id, reason)),
                Err(e) => error!(job_id = %id, "fire failed: {e}"),
            }
        }
        report
    }

    /// Main event loop. Ticks every `tick_ms` until `shutdown` broadcasts `true`.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let tick_ms = self.config().tick_ms.max(10);
        info!(tick_ms, jobs = self.len(), "scheduler started");

        let mut interval = tokio::time::interval(std::time::Duration::from_millis(tick_ms));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.tick();
                    if !report.fired.is_empty() || !report.skipped.is_empty() {
                        debug!(
                            fired = report.fired.len(),
                            skipped = report.skipped.len(),
                            reenabled = report.reenabled.len(),
                            "scheduler tick"
                        );
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("scheduler state poisoned").jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All jobs in registration order.
    pub fn list_jobs(&self) -> Vec<JobView> {
        let state = self.state.lock().expect("scheduler state poisoned");
        state.order.iter().filter_map(|id| state.view(id)).collect()
    }

    pub fn job(&self, key: &str) -> Result<JobView> {
        let state = self.state.lock().expect("scheduler state poisoned");
        let id = state.resolve(key)?;
        state.view(&id).ok_or(SchedulerError::JobNotFound { id })
    }

    pub fn job_status(&self, key: &str) -> Result<JobStatus> {
        self.job(key).map(|v| v.status)
    }

    /// Most recent `limit` records, oldest first, optionally for one job.
    pub fn history(&self, key: Option<&str>, limit: usize) -> Result<Vec<ExecutionRecord>> {
        let state = self.state.lock().expect("scheduler state poisoned");
        let id = key.map(|k| state.resolve(k)).transpose()?;
        let mut records: Vec<ExecutionRecord> = state
            .history
            .iter()
            .rev()
            .filter(|r| id.as_deref().map_or(true, |id| r.job_id == id))
            .take(limit)
            .cloned()
            .collect();
        records.reverse();
        Ok(records)
    }

    pub fn stats(&self) -> SchedulerStats {
        let now = self.clock.now();
        let state = self.state.lock().expect("scheduler state poisoned");
        let c = &state.counters;
        SchedulerStats {
            total_jobs: state.jobs.len(),
            active_jobs: state.jobs.values().filter(|j| j.active).count(),
            running: state.in_flight.values().sum(),
            executions: c.executions,
            successes: c.successes,
            failures: c.failures,
            skipped: c.skipped,
            success_rate: if c.executions == 0 {
                0.0
            } else {
                c.successes as f64 / c.executions as f64
            },
            avg_duration_ms: if c.executions == 0 {
                0.0
            } else {
                c.duration_ms_total as f64 / c.executions as f64
            },
            uptime_secs: (now - self.started_at).num_seconds(),
        }
    }

    // --- private helpers ---------------------------------------------------

    fn reenable_cooled_down(&self, now: DateTime<Utc>) -> Vec<String> {
        let config = self.config();
        let reenabled: Vec<Job> = {
            let mut state = self.state.lock().expect("scheduler state poisoned");
            state
                .jobs
                .values_mut()
                .filter(|j| !j.active && j.disabled_until.is_some_and(|t| t <= now))
                .map(|job| {
                    reactivate(job, now, &config);
                    job.clone()
                })
                .collect()
        };
        for job in &reenabled {
            info!(job_id = %job.id, name = %job.name, "cooldown elapsed, job re-enabled");
            self.notify(HookEvent::JobReenabled, job, serde_json::json!({ "manual": false }));
        }
        reenabled.into_iter().map(|j| j.id).collect()
    }

    /// Run every gate for a fire and reserve its execution slot.
    ///
    /// The outer `Result` is for lookups; the inner one is the skip decision.
    fn admit(
        &self,
        id: &str,
        now: DateTime<Utc>,
        manual: bool,
    ) -> Result<std::result::Result<Admission, SkipReason>> {
        let config = self.config();
        let window = ActiveWindow::from_config(&config);

        let job = {
            let mut state = self.state.lock().expect("scheduler state poisoned");
            let concurrent_in_flight = state.concurrent_in_flight;
            let in_flight = state.in_flight.get(id).copied().unwrap_or(0);
            let job = state.jobs.get_mut(id).ok_or_else(|| SchedulerError::JobNotFound {
                id: id.to_string(),
            })?;

            let skip = if !job.active {
                Some(SkipReason::Disabled)
            } else if !manual && !window.allows(now) {
                Some(SkipReason::OutsideWindow)
            } else if !job.allow_concurrent && in_flight > 0 {
                Some(SkipReason::AlreadyRunning)
            } else if job.allow_concurrent && concurrent_in_flight >= config.max_concurrent {
                Some(SkipReason::ConcurrencyCap)
            } else {
                None
            };

            if !manual && job.active {
                let interval =
                    jittered_interval(job.interval_minutes, config.jitter_fraction, &mut rand::rng());
                job.next_run = Some(now + interval);
            }

            if let Some(reason) = skip {
                state.counters.skipped += 1;
                debug!(job_id = %id, manual, %reason, "fire skipped");
                return Ok(Err(reason));
            }

            job.last_run = Some(now);
            let job = job.clone();
            *state.in_flight.entry(id.to_string()).or_insert(0) += 1;
            if job.allow_concurrent {
                state.concurrent_in_flight += 1;
            }
            job
        };

        let mut hook_ctx = HookContext::new(
            HookEvent::JobFire,
            serde_json::json!({
                "job_id": job.id,
                "name": job.name,
                "kind": job.kind,
                "manual": manual,
            }),
        )
        .for_job(&job.id, job.kind)
        .at(now);
        if let HookAction::Block { reason } = self.hooks.emit_before(&mut hook_ctx) {
            let mut state = self.state.lock().expect("scheduler state poisoned");
            state.release(id, job.allow_concurrent);
            state.counters.skipped += 1;
            info!(job_id = %id, %reason, "fire blocked by hook");
            return Ok(Err(SkipReason::Blocked { detail: reason }));
        }

        Ok(Ok(Admission {
            handler: self.handlers.get(&job.handler),
            execution_id: Uuid::new_v4().to_string(),
            fired_at: now,
            manual,
            payload: hook_ctx.payload,
            job,
        }))
    }

    async fn execute(&self, admission: Admission) -> ExecutionRecord {
        let Admission {
            job,
            handler,
            execution_id,
            fired_at,
            manual,
            payload,
        } = admission;
        debug!(job_id = %job.id, name = %job.name, manual, "executing job");

        let outcome: JobOutcome = match handler {
            Some(handler) => {
                let ctx = JobContext {
                    execution_id: execution_id.clone(),
                    job_id: job.id.clone(),
                    job_name: job.name.clone(),
                    kind: job.kind,
                    fired_at,
                    attempt: job.execution_count + 1,
                    manual,
                    payload,
                };
                // Own task so a panicking handler becomes a failure, not a lost slot.
                match tokio::spawn(async move { handler.execute(ctx).await }).await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(format!("handler aborted: {e}")),
                }
            }
            None => Err(format!("handler '{}' is not registered", job.handler)),
        };

        self.finish(job, execution_id, fired_at, manual, outcome)
    }

    fn finish(
        &self,
        job: Job,
        execution_id: String,
        started_at: DateTime<Utc>,
        manual: bool,
        outcome: JobOutcome,
    ) -> ExecutionRecord {
        let config = self.config();
        let finished_at = self.clock.now();
        let success = outcome.is_ok();
        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(e) => (None, Some(e)),
        };
        let record = ExecutionRecord {
            id: execution_id,
            job_id: job.id.clone(),
            job_name: job.name.clone(),
            kind: job.kind,
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0),
            success,
            result,
            error,
            manual,
        };

        let (updated, disabled) = {
            let mut state = self.state.lock().expect("scheduler state poisoned");
            state.release(&job.id, job.allow_concurrent);

            state.counters.executions += 1;
            state.counters.duration_ms_total += record.duration_ms;
            if success {
                state.counters.successes += 1;
            } else {
                state.counters.failures += 1;
            }
            state.history.push_back(record.clone());
            while state.history.len() > config.history_cap {
                state.history.pop_front();
            }

            match state.jobs.get_mut(&job.id) {
                Some(current) => {
                    current.execution_count += 1;
                    let mut disabled = false;
                    if !success {
                        // Only re-enabling resets the count.
                        current.failure_count += 1;
                        if current.active && current.failure_count >= config.max_retries {
                            current.active = false;
                            current.next_run = None;
                            current.disabled_until =
                                Some(finished_at + Duration::minutes(config.cooldown_minutes as i64));
                            disabled = true;
                        }
                    }
                    (current.clone(), disabled)
                }
                None => (job, false),
            }
        };

        if success {
            info!(
                job_id = %record.job_id,
                name = %record.job_name,
                duration_ms = record.duration_ms,
                "job completed"
            );
            self.notify(
                HookEvent::JobCompleted,
                &updated,
                serde_json::json!({ "execution_id": record.id, "duration_ms": record.duration_ms }),
            );
        } else {
            warn!(
                job_id = %record.job_id,
                name = %record.job_name,
                failures = updated.failure_count,
                error = record.error.as_deref().unwrap_or(""),
                "job failed"
            );
            self.notify(
                HookEvent::JobFailed,
                &updated,
                serde_json::json!({
                    "execution_id": record.id,
                    "error": record.error,
                    "failure_count": updated.failure_count,
                }),
            );
        }
        if disabled {
            warn!(
                job_id = %updated.id,
                name = %updated.name,
                failures = updated.failure_count,
                until = ?updated.disabled_until,
                "job disabled after repeated failures"
            );
            self.notify(
                HookEvent::JobDisabled,
                &updated,
                serde_json::json!({
                    "reason": "failures",
                    "disabled_until": updated.disabled_until,
                }),
            );
        }

        if let Some(ref tx) = self.records_tx {
            if tx.try_send(record.clone()).is_err() {
                warn!(job_id = %record.job_id, "record channel full or closed, record dropped");
            }
        }
        record
    }

    fn notify(&self, event: HookEvent, job: &Job, payload: serde_json::Value) {
        if self.hooks.is_empty() {
            return;
        }
        let ctx = HookContext::new(event, payload)
            .for_job(&job.id, job.kind)
            .at(self.clock.now());
        self.hooks.emit_after(ctx);
    }
}

fn validate_interval(minutes: f64) -> Result<()> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(SchedulerError::Validation(format!(
            "interval must be a positive number of minutes, got {minutes}"
        )));
    }
    Ok(())
}

/// Make `job` active again from `now` with a clean failure count.
fn reactivate(job: &mut Job, now: DateTime<Utc>, config: &SchedulerConfig) {
    job.active = true;
    job.failure_count = 0;
    job.disabled_until = None;
    job.next_run = Some(now + initial_offset(job.priority, config));
}
