use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use cadence_cache::ResultCache;
use cadence_core::{config::QueueConfig, Context, PriorityLevel, SharedClock, WorkKind};
use cadence_hooks::{HookContext, HookEngine, HookEvent};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{QueueError, Result};
use crate::scoring::{self, PriorityTables};
use crate::types::{
    Admission, CompletionRecord, InFlightTask, QueueStats, Rebalance, Task, TaskResult, TaskSpec,
};

const MAX_RETRY_COUNT: u32 = 100;

#[derive(Default)]
struct Counters {
    enqueued: u64,
    dequeued: u64,
    completed: u64,
    failed: u64,
    rejected: u64,
    dropped: u64,
    timed_out: u64,
    cancelled: u64,
    waited_ms_total: i64,
}

#[derive(Default)]
struct QueueState {
    /// Sorted by score descending, admission order within equal scores.
    pending: Vec<Task>,
    processing: HashMap<String, InFlightTask>,
    completions: VecDeque<CompletionRecord>,
    counters: Counters,
    next_seq: u64,
    /// Completions ever recorded, and how many of those rebalancing has seen.
    completion_total: u64,
    rebalance_cursor: u64,
}

impl QueueState {
    fn sort(&mut self) {
        self.pending.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.seq.cmp(&b.seq))
        });
    }

    fn push_completion(&mut self, record: CompletionRecord, cap: usize) {
        self.completions.push_back(record);
        self.completion_total += 1;
        while self.completions.len() > cap {
            self.completions.pop_front();
        }
    }
}

/// Score-ordered work queue with anti-starvation aging.
///
/// Scores are computed once at admission from the shared [`Context`] and the
/// cached-result age for the task's target. Aging then only ever adds to
/// that admission score.
pub struct PriorityQueue {
    config: RwLock<QueueConfig>,
    context: Arc<Context>,
    cache: Option<Arc<ResultCache>>,
    clock: SharedClock,
    hooks: Arc<HookEngine>,
    tables: RwLock<PriorityTables>,
    state: Mutex<QueueState>,
}

impl PriorityQueue {
    pub fn new(
        config: QueueConfig,
        context: Arc<Context>,
        cache: Option<Arc<ResultCache>>,
        clock: SharedClock,
    ) -> Self {
        Self::with_hooks(config, context, cache, clock, HookEngine::empty())
    }

    pub fn with_hooks(
        config: QueueConfig,
        context: Arc<Context>,
        cache: Option<Arc<ResultCache>>,
        clock: SharedClock,
        hooks: Arc<HookEngine>,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            context,
            cache,
            clock,
            hooks,
            tables: RwLock::new(PriorityTables::default()),
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn config(&self) -> QueueConfig {
        self.config.read().expect("queue config poisoned").clone()
    }

    pub fn update_config(&self, config: QueueConfig) {
        *self.config.write().expect("queue config poisoned") = config;
    }

    /// Score and admit a task. Equal scores keep first-in-first-out order.
    ///
    /// When the queue is full the lowest task is dropped if the newcomer
    /// outranks it; otherwise the newcomer is rejected. Use
    /// [`admit`](Self::admit) to learn which task was dropped.
    pub fn enqueue(&self, spec: TaskSpec) -> Result<Task> {
        self.admit(spec).map(|admission| admission.task)
    }

    /// [`enqueue`](Self::enqueue), also returning the task dropped to make
    /// room, if any.
    pub fn admit(&self, spec: TaskSpec) -> Result<Admission> {
        validate(&spec)?;
        let config = self.config();
        let now = self.clock.now();

        let cached_age = match (&self.cache, &spec.target) {
            (Some(cache), Some(target)) => cache.age_of(target, spec.kind.as_str()),
            _ => None,
        };
        let breakdown = {
            let tables = self.tables.read().expect("priority tables poisoned");
            scoring::score(
                &spec,
                &tables,
                &self.context,
                cached_age,
                config.uncached_freshness,
                now,
            )
        };

        let mut state = self.state.lock().expect("queue state poisoned");
        let mut dropped = None;
        if state.pending.len() >= config.max_size {
            let lowest = state.pending.last().map(|t| t.score).unwrap_or(f64::MIN);
            if breakdown.score > lowest {
                dropped = state.pending.pop();
                if let Some(task) = &dropped {
                    state.counters.dropped += 1;
                    warn!(task_id = %task.id, score = task.score, "queue full, dropped lowest task");
                }
            } else {
                state.counters.rejected += 1;
                warn!(kind = %spec.kind, score = breakdown.score, "queue full, task rejected");
                return Err(QueueError::CapacityExceeded {
                    max_size: config.max_size,
                    score: breakdown.score,
                    lowest,
                });
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        let task = Task {
            id: Uuid::new_v4().to_string(),
            spec,
            breakdown,
            base_score: breakdown.score,
            boost: 0.0,
            score: breakdown.score,
            level: PriorityLevel::from_score(breakdown.score),
            enqueued_at: now,
            last_aged_at: now,
            seq,
        };

        // After the run of tasks scoring >= the newcomer.
        let position = state.pending.partition_point(|t| t.score >= task.score);
        state.pending.insert(position, task.clone());
        state.counters.enqueued += 1;
        drop(state);

        debug!(
            task_id = %task.id,
            kind = %task.spec.kind,
            score = task.score,
            level = %task.level,
            position,
            "task enqueued"
        );
        self.emit(
            HookEvent::TaskEnqueued,
            &task,
            serde_json::json!({
                "task_id": task.id,
                "score": task.score,
                "level": task.level,
            }),
        );
        Ok(Admission { task, dropped })
    }

    /// Age, re-sort and hand out the highest-scoring task.
    pub fn dequeue(&self) -> Option<Task> {
        self.reap_timed_out();
        let config = self.config();
        let now = self.clock.now();

        let mut state = self.state.lock().expect("queue state poisoned");
        apply_aging(&mut state.pending, &config, now);
        state.sort();
        if state.pending.is_empty() {
            return None;
        }
        let task = state.pending.remove(0);
        let waited_ms = (now - task.enqueued_at).num_milliseconds();
        state.counters.dequeued += 1;
        state.counters.waited_ms_total += waited_ms;
        state.processing.insert(
            task.id.clone(),
            InFlightTask {
                task: task.clone(),
                started_at: now,
            },
        );
        drop(state);

        debug!(task_id = %task.id, score = task.score, waited_ms, "task dequeued");
        self.emit(
            HookEvent::TaskDequeued,
            &task,
            serde_json::json!({
                "task_id": task.id,
                "score": task.score,
                "waited_ms": waited_ms,
            }),
        );
        Some(task)
    }

    /// Finish an in-flight task and record its outcome for the task's kind.
    pub fn complete_task(&self, task_id: &str, result: TaskResult) -> Result<CompletionRecord> {
        let cap = self.config().completion_history_cap;
        let now = self.clock.now();

        let mut state = self.state.lock().expect("queue state poisoned");
        let in_flight = state
            .processing
            .remove(task_id)
            .ok_or_else(|| QueueError::TaskNotFound {
                id: task_id.to_string(),
            })?;
        let success = result.error.is_none();
        let record = CompletionRecord {
            task_id: task_id.to_string(),
            kind: in_flight.task.spec.kind,
            success,
            error: result.error,
            score: in_flight.task.score,
            enqueued_at: in_flight.task.enqueued_at,
            started_at: in_flight.started_at,
            completed_at: now,
        };
        if success {
            state.counters.completed += 1;
        } else {
            state.counters.failed += 1;
        }
        state.push_completion(record.clone(), cap);
        drop(state);

        self.context.record_outcome(record.kind, success);
        debug!(task_id, success, duration_ms = record.duration_ms(), "task completed");
        Ok(record)
    }

    /// Fail every in-flight task that has exceeded the processing limit.
    /// A late `complete_task` for a reaped task reports `TaskNotFound`.
    pub fn reap_timed_out(&self) -> usize {
        let config = self.config();
        let now = self.clock.now();
        let limit = Duration::seconds(config.max_processing_secs as i64);

        let mut state = self.state.lock().expect("queue state poisoned");
        let expired: Vec<String> = state
            .processing
            .values()
            .filter(|f| now - f.started_at > limit)
            .map(|f| f.task.id.clone())
            .collect();

        let mut kinds = Vec::with_capacity(expired.len());
        for id in &expired {
            if let Some(in_flight) = state.processing.remove(id) {
                kinds.push(in_flight.task.spec.kind);
                let record = CompletionRecord {
                    task_id: id.clone(),
                    kind: in_flight.task.spec.kind,
                    success: false,
                    error: Some(format!(
                        "timed out after {}s",
                        config.max_processing_secs
                    )),
                    score: in_flight.task.score,
                    enqueued_at: in_flight.task.enqueued_at,
                    started_at: in_flight.started_at,
                    completed_at: now,
                };
                state.counters.timed_out += 1;
                state.counters.failed += 1;
                state.push_completion(record, config.completion_history_cap);
                warn!(task_id = %id, "in-flight task timed out");
            }
        }
        drop(state);

        for kind in kinds {
            self.context.record_outcome(kind, false);
        }
        expired.len()
    }

    /// Nudge base-table entries by recent per-kind success rate.
    ///
    /// Only completions recorded since the previous pass count. Kinds below the low
    /// threshold move down one step, kinds above the high threshold move up
    /// one step; the accumulated nudge is bounded.
    pub fn rebalance(&self) -> Vec<Rebalance> {
        let config = self.config();

        let grouped = {
            let mut state = self.state.lock().expect("queue state poisoned");
            let fresh = (state.completion_total - state.rebalance_cursor)
                .min(state.completions.len() as u64) as usize;
            state.rebalance_cursor = state.completion_total;
            let mut grouped: HashMap<WorkKind, (usize, usize)> = HashMap::new();
            for record in state.completions.iter().rev().take(fresh) {
                let entry = grouped.entry(record.kind).or_default();
                entry.1 += 1;
                if record.success {
                    entry.0 += 1;
                }
            }
            grouped
        };

        let mut tables = self.tables.write().expect("priority tables poisoned");
        let mut changes = Vec::new();
        for (kind, (ok, total)) in grouped {
            if total < config.rebalance_min_samples {
                continue;
            }
            let rate = ok as f64 / total as f64;
            let delta = if rate < config.rebalance_low_threshold {
                -config.rebalance_step
            } else if rate > config.rebalance_high_threshold {
                config.rebalance_step
            } else {
                continue;
            };
            let adjustment = tables.nudge(kind, delta, config.rebalance_max_adjustment);
            info!(%kind, success_rate = rate, samples = total, adjustment, "rebalanced base priority");
            changes.push(Rebalance {
                kind,
                success_rate: rate,
                samples: total,
                adjustment,
            });
        }
        changes.sort_by_key(|c| c.kind);
        changes
    }

    /// Remove a pending task. In-flight tasks cannot be cancelled.
    pub fn cancel(&self, task_id: &str) -> bool {
        let mut state = self.state.lock().expect("queue state poisoned");
        let before = state.pending.len();
        state.pending.retain(|t| t.id != task_id);
        let removed = state.pending.len() < before;
        if removed {
            state.counters.cancelled += 1;
        }
        removed
    }

    /// Drop every pending task. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock().expect("queue state poisoned");
        let n = state.pending.len();
        state.pending.clear();
        state.counters.cancelled += n as u64;
        n
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("queue state poisoned").pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn peek(&self) -> Option<Task> {
        self.state
            .lock()
            .expect("queue state poisoned")
            .pending
            .first()
            .cloned()
    }

    /// Pending tasks in current order. Does not age.
    pub fn pending(&self) -> Vec<Task> {
        self.state.lock().expect("queue state poisoned").pending.clone()
    }

    pub fn processing(&self) -> Vec<InFlightTask> {
        let state = self.state.lock().expect("queue state poisoned");
        let mut tasks: Vec<InFlightTask> = state.processing.values().cloned().collect();
        tasks.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        tasks
    }

    /// Most recent completions, newest last.
    pub fn completions(&self, limit: usize) -> Vec<CompletionRecord> {
        let state = self.state.lock().expect("queue state poisoned");
        let skip = state.completions.len().saturating_sub(limit);
        state.completions.iter().skip(skip).cloned().collect()
    }

    pub fn adjustments(&self) -> HashMap<WorkKind, f64> {
        self.tables
            .read()
            .expect("priority tables poisoned")
            .adjustments()
            .clone()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock().expect("queue state poisoned");
        let c = &state.counters;
        let mut by_level = HashMap::new();
        for task in &state.pending {
            *by_level.entry(task.level).or_insert(0) += 1;
        }
        QueueStats {
            pending: state.pending.len(),
            processing: state.processing.len(),
            enqueued: c.enqueued,
            dequeued: c.dequeued,
            completed: c.completed,
            failed: c.failed,
            rejected: c.rejected,
            dropped: c.dropped,
            timed_out: c.timed_out,
            cancelled: c.cancelled,
            by_level,
            avg_wait_ms: if c.dequeued == 0 {
                0.0
            } else {
                c.waited_ms_total as f64 / c.dequeued as f64
            },
        }
    }

    fn emit(&self, event: HookEvent, task: &Task, payload: serde_json::Value) {
        if self.hooks.is_empty() {
            return;
        }
        let mut ctx = HookContext::new(event, payload).at(self.clock.now());
        ctx.kind = Some(task.spec.kind);
        self.hooks.emit_after(ctx);
    }
}

fn validate(spec: &TaskSpec) -> Result<()> {
    if let Some(target) = &spec.target {
        if target.trim().is_empty() {
            return Err(QueueError::Validation("target must not be empty".into()));
        }
    }
    if spec.retry_count > MAX_RETRY_COUNT {
        return Err(QueueError::Validation(format!(
            "retry_count {} exceeds {MAX_RETRY_COUNT}",
            spec.retry_count
        )));
    }
    Ok(())
}

/// Give every task whose last aging is at least one interval old a boost
/// proportional to its total wait, capped at `max_aging_bonus`.
fn apply_aging(pending: &mut [Task], config: &QueueConfig, now: DateTime<Utc>) {
    let interval_ms = (config.aging_interval_secs as f64) * 1000.0;
    for task in pending.iter_mut() {
        let since_aged = (now - task.last_aged_at).num_milliseconds() as f64;
        if since_aged < interval_ms {
            continue;
        }
        let waited = (now - task.enqueued_at).num_milliseconds() as f64;
        let boost = ((waited / interval_ms) * config.aging_factor).min(config.max_aging_bonus);
        // Boost is recomputed from total wait, so it never shrinks.
        if boost > task.boost {
            task.boost = boost;
            task.score = task.base_score + boost;
            task.level = PriorityLevel::from_score(task.score);
        }
        task.last_aged_at = now;
    }
}
