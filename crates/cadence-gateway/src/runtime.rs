//! Wiring between the components and the background loops that drive them.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use cadence_cache::{CacheSnapshot, CleanupReport, ResultCache};
use cadence_core::{
    config::{CacheConfig, LearnerConfig, QueueConfig, SchedulerConfig},
    snapshot::CACHE_SNAPSHOT_KEY,
    CadenceConfig, CadenceError, Context, SharedClock, SnapshotStore, SystemLoad, WorkKind,
};
use cadence_hooks::{
    HookContext, HookDefinition, HookEngine, HookEvent, HookResult, HookTiming,
};
use cadence_learner::{ActivityDataPoint, AdaptiveLearner, IntervalChange};
use cadence_queue::{PriorityQueue, Rebalance};
use cadence_scheduler::{ExecutionRecord, HandlerRegistry, JobSpec, Scheduler};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::dispatch::Dispatcher;

const RECORD_CHANNEL_CAP: usize = 256;
const ACTIVITY_CHANNEL_CAP: usize = 1024;

/// An inbound activity signal (navigation, message received, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySignal {
    pub activity: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Defaults to receipt time.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Replacement tunables. Absent sections are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigUpdate {
    pub scheduler: Option<SchedulerConfig>,
    pub queue: Option<QueueConfig>,
    pub cache: Option<CacheConfig>,
    pub learner: Option<LearnerConfig>,
}

/// Receivers handed to [`Runtime::spawn`].
pub struct RuntimeChannels {
    records_rx: mpsc::Receiver<ExecutionRecord>,
    activity_rx: mpsc::Receiver<ActivitySignal>,
}

pub struct Runtime {
    config: RwLock<CadenceConfig>,
    pub clock: SharedClock,
    pub context: Arc<Context>,
    pub cache: Arc<ResultCache>,
    pub queue: Arc<PriorityQueue>,
    pub dispatcher: Arc<Dispatcher>,
    pub scheduler: Arc<Scheduler>,
    pub learner: Arc<AdaptiveLearner>,
    store: Arc<dyn SnapshotStore>,
    activity_tx: mpsc::Sender<ActivitySignal>,
    pub started_at: DateTime<Utc>,
}

impl Runtime {
    /// Construct every component and register the jobs declared in config.
    /// Jobs that fail validation are logged and skipped.
    pub fn build(
        config: CadenceConfig,
        handlers: HandlerRegistry,
        store: Arc<dyn SnapshotStore>,
        clock: SharedClock,
    ) -> Result<(Arc<Self>, RuntimeChannels), CadenceError> {
        let context = Context::new();
        let hooks = build_hooks(&context)
            .map_err(|e| CadenceError::Config(format!("hooks: {e}")))?;

        let cache = Arc::new(ResultCache::with_hooks(
            config.cache.clone(),
            Arc::clone(&clock),
            Arc::clone(&hooks),
        ));
        let queue = Arc::new(PriorityQueue::with_hooks(
            config.queue.clone(),
            Arc::clone(&context),
            Some(Arc::clone(&cache)),
            Arc::clone(&clock),
            Arc::clone(&hooks),
        ));
        let dispatcher = Dispatcher::new(
            Arc::clone(&queue),
            Arc::clone(&cache),
            config.scheduler.max_concurrent,
        );

        let handlers = handlers.map(|_, h| dispatcher.wrap(h));
        let (records_tx, records_rx) = mpsc::channel(RECORD_CHANNEL_CAP);
        let scheduler = Arc::new(
            Scheduler::new(config.scheduler.clone(), handlers, Arc::clone(&clock))
                .with_hooks(hooks)
                .with_record_sender(records_tx),
        );
        let learner = Arc::new(AdaptiveLearner::new(
            config.learner.clone(),
            Arc::clone(&clock),
        ));

        for job in &config.jobs {
            let name = job.name.clone();
            let interval = job.interval_minutes;
            let kind = job.kind.parse::<WorkKind>();
            match scheduler.register_job(JobSpec::from(job.clone())) {
                Ok(id) => {
                    if let Ok(kind) = kind {
                        if let Err(e) = learner.register_base_interval(kind, interval) {
                            warn!(job = %name, "base interval not learned: {e}");
                        }
                    }
                    info!(job_id = %id, job = %name, interval, "job registered");
                }
                Err(e) => error!(job = %name, "job rejected: {e}"),
            }
        }

        let (activity_tx, activity_rx) = mpsc::channel(ACTIVITY_CHANNEL_CAP);
        let started_at = clock.now();
        let runtime = Arc::new(Self {
            config: RwLock::new(config),
            clock,
            context,
            cache,
            queue,
            dispatcher,
            scheduler,
            learner,
            store,
            activity_tx,
            started_at,
        });
        Ok((
            runtime,
            RuntimeChannels {
                records_rx,
                activity_rx,
            },
        ))
    }

    /// Start the scheduler, dispatcher, consumers and maintenance loops.
    pub fn spawn(
        self: &Arc<Self>,
        channels: RuntimeChannels,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        let config = self.config();
        let mut tasks = Vec::new();

        tasks.push(tokio::spawn(
            Arc::clone(&self.scheduler).run(shutdown.clone()),
        ));
        tasks.push(tokio::spawn(
            Arc::clone(&self.dispatcher).run(shutdown.clone()),
        ));

        let this = Arc::clone(self);
        let mut records_rx = channels.records_rx;
        let mut stop = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    record = records_rx.recv() => match record {
                        Some(record) => this.observe(&record),
                        None => break,
                    },
                    _ = stop.changed() => {
                        if *stop.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("execution feedback router stopped");
        }));

        let this = Arc::clone(self);
        let mut activity_rx = channels.activity_rx;
        let mut stop = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    signal = activity_rx.recv() => match signal {
                        Some(signal) => this.ingest(signal),
                        None => break,
                    },
                    _ = stop.changed() => {
                        if *stop.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("activity consumer stopped");
        }));

        let this = Arc::clone(self);
        tasks.push(tokio::spawn(every(
            "learner",
            secs(config.learner.update_interval_secs),
            shutdown.clone(),
            move || {
                this.adapt();
            },
        )));

        let this = Arc::clone(self);
        tasks.push(tokio::spawn(every(
            "cache cleanup",
            secs(config.cache.cleanup_interval_secs),
            shutdown.clone(),
            move || {
                this.cleanup_cache();
            },
        )));

        let this = Arc::clone(self);
        tasks.push(tokio::spawn(every(
            "queue maintenance",
            secs(config.queue.rebalance_interval_secs),
            shutdown.clone(),
            move || {
                this.maintain_queue();
            },
        )));

        let this = Arc::clone(self);
        let period = secs(config.store.snapshot_interval_secs);
        let mut shutdown = shutdown;
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        this.save_snapshots().await;
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        }));

        info!(loops = tasks.len(), "runtime started");
        tasks
    }

    pub fn config(&self) -> CadenceConfig {
        self.config.read().expect("runtime config poisoned").clone()
    }

    /// Validate and apply replacement tunables to the live components.
    pub fn apply_config(&self, update: ConfigUpdate) -> Result<CadenceConfig, CadenceError> {
        let mut next = self.config();
        if let Some(s) = &update.scheduler {
            next.scheduler = s.clone();
        }
        if let Some(q) = &update.queue {
            next.queue = q.clone();
        }
        if let Some(c) = &update.cache {
            next.cache = c.clone();
        }
        if let Some(l) = &update.learner {
            next.learner = l.clone();
        }
        next.validate()?;

        if let Some(s) = update.scheduler {
            self.scheduler.update_config(s);
        }
        if let Some(q) = update.queue {
            self.queue.update_config(q);
        }
        if let Some(c) = update.cache {
            let report = self.cache.update_config(c);
            if report.expired + report.evicted > 0 {
                info!(expired = report.expired, evicted = report.evicted, "cache shrunk to new budgets");
            }
        }
        if let Some(l) = update.learner {
            self.learner.update_config(l);
        }
        *self.config.write().expect("runtime config poisoned") = next.clone();
        Ok(next)
    }

    /// Queue an activity signal for the learner. `false` when the channel is
    /// full and the signal was dropped.
    pub fn submit_activity(&self, signal: ActivitySignal) -> bool {
        match self.activity_tx.try_send(signal) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(signal)) => {
                warn!(activity = %signal.activity, "activity channel full; signal dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn ingest(&self, signal: ActivitySignal) {
        let at = signal.timestamp.unwrap_or_else(|| self.clock.now());
        self.learner
            .record_activity_point(ActivityDataPoint::new(signal.activity, at, signal.payload));
        self.context.set_activity(self.learner.activity_level());
    }

    /// Feed one finished execution back into the learner's hourly outcomes.
    pub fn observe(&self, record: &ExecutionRecord) {
        if let Err(e) =
            self.learner
                .record_extraction_result(record.kind, record.success, Some(record.hour()))
        {
            warn!(job_id = %record.job_id, "outcome not recorded: {e}");
        }
    }

    /// Learner pass: fold patterns, refresh activity, push new per-kind
    /// scales to the scheduler.
    pub fn adapt(&self) -> Vec<IntervalChange> {
        let confidence = self.learner.update_patterns();
        let activity = self.learner.activity_level();
        self.context.set_activity(activity);

        let changes = self.learner.adapt_intervals();
        for change in &changes {
            match self.scheduler.apply_interval_scale(change.kind, change.scale) {
                Ok(jobs) => info!(
                    kind = %change.kind,
                    from = change.previous_factor,
                    to = change.scale.factor,
                    %activity,
                    jobs,
                    "interval adapted"
                ),
                Err(e) => warn!(kind = %change.kind, "interval not applied: {e}"),
            }
        }
        debug!(confidence, %activity, changes = changes.len(), "learner pass");
        changes
    }

    pub fn cleanup_cache(&self) -> CleanupReport {
        let report = self.cache.cleanup();
        if report.expired + report.evicted > 0 {
            debug!(expired = report.expired, evicted = report.evicted, "cache cleanup");
        }
        report
    }

    pub fn maintain_queue(&self) -> Vec<Rebalance> {
        let reaped = self.queue.reap_timed_out();
        if reaped > 0 {
            warn!(reaped, "timed-out tasks reaped");
        }
        let rebalances = self.queue.rebalance();
        for r in &rebalances {
            info!(
                kind = %r.kind,
                success_rate = r.success_rate,
                adjustment = r.adjustment,
                "priority rebalanced"
            );
        }
        rebalances
    }

    /// Load learner and cache state. Failures leave the component empty.
    pub async fn restore_snapshots(&self) {
        match self.learner.load_from(self.store.as_ref()).await {
            Ok(true) => info!("learner state restored"),
            Ok(false) => debug!("no learner snapshot"),
            Err(e) => warn!("learner snapshot not restored: {e}"),
        }

        match self.store.load(CACHE_SNAPSHOT_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<CacheSnapshot>(value) {
                Ok(snapshot) => {
                    let restored = self.cache.restore(snapshot);
                    info!(restored, "cache warm-started");
                }
                Err(e) => warn!("cache snapshot unreadable: {e}"),
            },
            Ok(None) => debug!("no cache snapshot"),
            Err(e) => warn!("cache snapshot not loaded: {e}"),
        }
    }

    /// Persist learner and cache state. Returns `false` if either save failed.
    pub async fn save_snapshots(&self) -> bool {
        let mut ok = true;
        if let Err(e) = self.learner.save_to(self.store.as_ref()).await {
            warn!("learner snapshot not saved: {e}");
            ok = false;
        }
        let saved = match serde_json::to_value(self.cache.snapshot()) {
            Ok(value) => self.store.save(CACHE_SNAPSHOT_KEY, &value).await,
            Err(e) => Err(CadenceError::from(e)),
        };
        if let Err(e) = saved {
            warn!("cache snapshot not saved: {e}");
            ok = false;
        }
        if ok {
            debug!("snapshots saved");
        }
        ok
    }
}

fn build_hooks(context: &Arc<Context>) -> cadence_hooks::Result<Arc<HookEngine>> {
    let ctx = Arc::clone(context);
    let engine = HookEngine::builder()
        .register(HookDefinition::new(
            "shed-bulk-under-load",
            HookEvent::JobFire,
            HookTiming::Before,
            Arc::new(move |hook: &HookContext| match hook.kind {
                Some(kind) if kind.is_bulk() && ctx.system_load() == SystemLoad::Critical => {
                    HookResult::block("system load critical")
                }
                _ => HookResult::allow(),
            }),
        ))?
        .register(HookDefinition::new(
            "log-job-disabled",
            HookEvent::JobDisabled,
            HookTiming::After,
            Arc::new(|hook: &HookContext| {
                warn!(job_id = ?hook.job_id, detail = %hook.payload, "job disabled");
                HookResult::allow()
            }),
        ))?
        .register(HookDefinition::new(
            "log-job-reenabled",
            HookEvent::JobReenabled,
            HookTiming::After,
            Arc::new(|hook: &HookContext| {
                info!(job_id = ?hook.job_id, "job re-enabled");
                HookResult::allow()
            }),
        ))?
        .build();
    Ok(engine)
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n.max(1))
}

/// Run `f` every `period` until shutdown. The first run is one period in.
async fn every<F>(name: &'static str, period: Duration, mut shutdown: watch::Receiver<bool>, mut f: F)
where
    F: FnMut() + Send,
{
    let mut interval = tokio::time::interval(period);
    interval.tick().await;
    debug!(loop_name = name, period_secs = period.as_secs(), "loop started");
    loop {
        tokio::select! {
            _ = interval.tick() => f(),
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    debug!(loop_name = name, "loop stopped");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{config::JobConfig, ManualClock, MemorySnapshotStore, PriorityLevel};
    use cadence_scheduler::{handler_fn, FireOutcome};
    use chrono::TimeZone;

    fn job(name: &str, kind: &str, interval: f64) -> JobConfig {
        JobConfig {
            name: name.into(),
            kind: kind.into(),
            interval_minutes: interval,
            priority: PriorityLevel::Medium,
            allow_concurrent: false,
            handler: "ok".into(),
        }
    }

    fn registry() -> HandlerRegistry {
        let mut r = HandlerRegistry::new();
        r.register(
            "ok",
            handler_fn(|_ctx| async { Ok(serde_json::json!({ "rows": 1 })) }),
        );
        r
    }

    fn runtime(jobs: Vec<JobConfig>) -> (Arc<Runtime>, RuntimeChannels, Arc<ManualClock>) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap());
        let config = CadenceConfig {
            jobs,
            ..CadenceConfig::default()
        };
        let (rt, channels) = Runtime::build(
            config,
            registry(),
            Arc::new(MemorySnapshotStore::new()),
            clock.clone(),
        )
        .unwrap();
        (rt, channels, clock)
    }

    #[tokio::test]
    async fn invalid_config_jobs_are_skipped() {
        let (rt, _channels, _clock) = runtime(vec![
            job("profiles", "profile", 30.0),
            job("broken", "not_a_kind", 30.0),
            job("zero", "listing", 0.0),
        ]);
        assert_eq!(rt.scheduler.len(), 1);
        let schedule = rt.learner.get_current_schedule();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].kind, WorkKind::Profile);
    }

    #[tokio::test]
    async fn trigger_flows_through_queue_cache_and_learner() {
        let (rt, channels, _clock) = runtime(vec![job("profiles", "profile", 30.0)]);
        let (_tx, rx) = watch::channel(false);
        tokio::spawn(Arc::clone(&rt.dispatcher).run(rx));

        let outcome = rt.scheduler.trigger_now("profiles").await.unwrap();
        let record = match outcome {
            FireOutcome::Executed(record) => record,
            FireOutcome::Skipped(reason) => panic!("skipped: {reason}"),
        };
        assert!(record.success);
        assert_eq!(rt.queue.stats().completed, 1);
        assert!(rt.cache.has("profiles", "profile"));
        assert_eq!(rt.context.success_rate(WorkKind::Profile), Some(1.0));

        let mut records_rx = channels.records_rx;
        let forwarded = records_rx.recv().await.unwrap();
        rt.observe(&forwarded);
        assert_eq!(rt.learner.get_adaptive_stats().outcomes_recorded, 1);
    }

    #[tokio::test]
    async fn busy_activity_shortens_scheduled_interval() {
        let (rt, _channels, _clock) = runtime(vec![job("profiles", "profile", 30.0)]);
        for _ in 0..12 {
            rt.ingest(ActivitySignal {
                activity: "page_view".into(),
                payload: serde_json::Value::Null,
                timestamp: None,
            });
        }
        let changes = rt.adapt();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].minutes, 15.0);
        assert_eq!(rt.scheduler.job("profiles").unwrap().job.interval_minutes, 15.0);
        assert_eq!(rt.context.activity(), cadence_core::ActivityLevel::High);
    }

    #[tokio::test]
    async fn config_update_is_validated_before_apply() {
        let (rt, _channels, _clock) = runtime(Vec::new());
        let mut queue = QueueConfig::default();
        queue.max_size = 0;
        let err = rt
            .apply_config(ConfigUpdate {
                queue: Some(queue),
                ..ConfigUpdate::default()
            })
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
        assert_eq!(rt.queue.config().max_size, 1000);

        let mut queue = QueueConfig::default();
        queue.max_size = 10;
        let applied = rt
            .apply_config(ConfigUpdate {
                queue: Some(queue),
                ..ConfigUpdate::default()
            })
            .unwrap();
        assert_eq!(applied.queue.max_size, 10);
        assert_eq!(rt.queue.config().max_size, 10);
    }

    #[tokio::test]
    async fn snapshots_round_trip_through_store() {
        let store: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::new());
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap());
        let build = || {
            Runtime::build(
                CadenceConfig::default(),
                registry(),
                Arc::clone(&store),
                clock.clone(),
            )
            .unwrap()
            .0
        };

        let first = build();
        first
            .cache
            .set(
                "user-1",
                "profile",
                &serde_json::json!({ "name": "a" }),
                Default::default(),
            )
            .unwrap();
        first
            .learner
            .record_extraction_result(WorkKind::Profile, true, Some(9))
            .unwrap();
        assert!(first.save_snapshots().await);

        let second = build();
        second.restore_snapshots().await;
        assert!(second.cache.has("user-1", "profile"));
        assert_eq!(second.learner.get_adaptive_stats().outcomes_recorded, 1);
    }

    #[tokio::test]
    async fn adapted_scale_keeps_per_job_intervals() {
        let (rt, _channels, clock) = runtime(vec![
            job("fast", "profile", 15.0),
            job("slow", "profile", 240.0),
        ]);
        for _ in 0..12 {
            rt.ingest(ActivitySignal {
                activity: "page_view".into(),
                payload: serde_json::Value::Null,
                timestamp: None,
            });
        }
        rt.adapt();
        let interval = |name: &str| rt.scheduler.job(name).unwrap().job.interval_minutes;
        assert_eq!(interval("fast"), 7.5);
        assert_eq!(interval("slow"), 120.0);

        rt.scheduler.reschedule_job("fast", 5.0).unwrap();
        assert_eq!(interval("fast"), 2.5);

        clock.advance(chrono::Duration::hours(2));
        let changes = rt.adapt();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].scale.factor, 3.0);
        assert_eq!(interval("fast"), 15.0);
        assert_eq!(interval("slow"), 720.0);
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl SnapshotStore for BrokenStore {
        async fn load(&self, _key: &str) -> cadence_core::Result<Option<serde_json::Value>> {
            Err(CadenceError::Snapshot("disk unavailable".into()))
        }

        async fn save(&self, _key: &str, _snapshot: &serde_json::Value) -> cadence_core::Result<()> {
            Err(CadenceError::Snapshot("disk unavailable".into()))
        }
    }

    #[tokio::test]
    async fn persistence_failures_are_not_fatal() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap());
        let (rt, _channels) = Runtime::build(
            CadenceConfig {
                jobs: vec![job("profiles", "profile", 30.0)],
                ..CadenceConfig::default()
            },
            registry(),
            Arc::new(BrokenStore),
            clock,
        )
        .unwrap();

        rt.restore_snapshots().await;
        assert!(rt.cache.is_empty());
        assert_eq!(rt.learner.get_adaptive_stats().total_points, 0);
        assert_eq!(rt.scheduler.len(), 1);

        rt.cache
            .set("user-1", "profile", &serde_json::json!(1), Default::default())
            .unwrap();
        assert!(!rt.save_snapshots().await);
        assert!(rt.cache.has("user-1", "profile"));
    }

    #[tokio::test]
    async fn overflowed_job_releases_its_slot() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap());
        let config = CadenceConfig {
            jobs: vec![job("sweep", "cleanup", 60.0), job("inbox", "session", 5.0)],
            queue: QueueConfig {
                max_size: 1,
                ..QueueConfig::default()
            },
            ..CadenceConfig::default()
        };
        let (rt, _channels) = Runtime::build(
            config,
            registry(),
            Arc::new(MemorySnapshotStore::new()),
            clock,
        )
        .unwrap();
        rt.context.set_activity(cadence_core::ActivityLevel::High);

        // No dispatcher yet, so the first execution waits in the queue.
        let scheduler = Arc::clone(&rt.scheduler);
        let sweep = tokio::spawn(async move { scheduler.trigger_now("sweep").await });
        while rt.dispatcher.waiting() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(rt.scheduler.job("sweep").unwrap().in_flight, 1);

        let scheduler = Arc::clone(&rt.scheduler);
        let inbox = tokio::spawn(async move { scheduler.trigger_now("inbox").await });

        let outcome = tokio::time::timeout(Duration::from_secs(2), sweep)
            .await
            .expect("overflowed job never finished")
            .unwrap()
            .unwrap();
        match outcome {
            FireOutcome::Executed(record) => {
                assert!(!record.success);
                assert!(record.error.unwrap_or_default().contains("dropped"));
            }
            FireOutcome::Skipped(reason) => panic!("skipped: {reason}"),
        }
        let view = rt.scheduler.job("sweep").unwrap();
        assert_eq!(view.in_flight, 0);
        assert!(view.job.active);

        let (_tx, rx) = watch::channel(false);
        tokio::spawn(Arc::clone(&rt.dispatcher).run(rx));
        assert!(matches!(
            inbox.await.unwrap().unwrap(),
            FireOutcome::Executed(ref r) if r.success
        ));
        // The slot is free again: a new fire runs instead of being skipped.
        assert!(matches!(
            rt.scheduler.trigger_now("sweep").await.unwrap(),
            FireOutcome::Executed(ref r) if r.success
        ));
    }
}
