use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, RwLock};

use cadence_core::{
    config::LearnerConfig, snapshot::LEARNER_SNAPSHOT_KEY, ActivityLevel, IntervalScale,
    SharedClock, SnapshotStore, WorkKind,
};
use chrono::{DateTime, Duration, Timelike, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use crate::{
    error::{LearnerError, Result},
    patterns::{self, HourlyOutcomes, DAYS, HOURS},
    types::{
        ActivityDataPoint, ActivityPatterns, AdaptiveStats, IntervalChange, LearnerSnapshot,
        OptimalHour, ScheduleEntry,
    },
};

struct LearnerState {
    history: VecDeque<ActivityDataPoint>,
    /// Points per bucket since the last pattern update.
    pending_hourly: [u32; HOURS],
    pending_daily: [u32; DAYS],
    hourly: [f64; HOURS],
    daily: [f64; DAYS],
    /// Reference interval per kind, for reporting.
    base_intervals: HashMap<WorkKind, f64>,
    /// Last scale handed to the scheduler, per kind.
    current_scales: HashMap<WorkKind, IntervalScale>,
    total_points: u64,
    is_learning: bool,
    pattern_confidence: f64,
    last_update: Option<DateTime<Utc>>,
}

impl LearnerState {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            pending_hourly: [0; HOURS],
            pending_daily: [0; DAYS],
            hourly: [0.0; HOURS],
            daily: [0.0; DAYS],
            base_intervals: HashMap::new(),
            current_scales: HashMap::new(),
            total_points: 0,
            is_learning: true,
            pattern_confidence: 0.0,
            last_update: None,
        }
    }
}

/// Learns when activity happens and which hours succeed, and turns that into
/// per-kind [`IntervalScale`]s for the scheduler.
pub struct AdaptiveLearner {
    config: RwLock<LearnerConfig>,
    clock: SharedClock,
    state: Mutex<LearnerState>,
    outcomes: DashMap<WorkKind, HourlyOutcomes>,
}

impl AdaptiveLearner {
    pub fn new(config: LearnerConfig, clock: SharedClock) -> Self {
        Self {
            config: RwLock::new(config),
            clock,
            state: Mutex::new(LearnerState::new()),
            outcomes: DashMap::new(),
        }
    }

    pub fn config(&self) -> LearnerConfig {
        self.config.read().expect("learner config poisoned").clone()
    }

    pub fn update_config(&self, config: LearnerConfig) {
        *self.config.write().expect("learner config poisoned") = config;
    }

    /// Start tracking `kind`, with `minutes` as the reference interval shown
    /// in [`get_current_schedule`](Self::get_current_schedule). Jobs scale
    /// their own base intervals, so this does not pin any job's interval.
    pub fn register_base_interval(&self, kind: WorkKind, minutes: f64) -> Result<()> {
        if !minutes.is_finite() || minutes <= 0.0 {
            return Err(LearnerError::Validation(format!(
                "base interval for {kind} must be positive, got {minutes}"
            )));
        }
        let start = neutral(&self.config());
        let mut state = self.state.lock().expect("learner state poisoned");
        state.base_intervals.entry(kind).or_insert(minutes);
        state.current_scales.entry(kind).or_insert(start);
        Ok(())
    }

    /// Ingest an activity signal.
    pub fn record_activity_point(&self, point: ActivityDataPoint) {
        let cap = self.config().history_cap;
        let mut state = self.state.lock().expect("learner state poisoned");
        state.pending_hourly[point.hour as usize % HOURS] += 1;
        state.pending_daily[point.day as usize % DAYS] += 1;
        state.total_points += 1;
        state.history.push_back(point);
        while state.history.len() > cap {
            state.history.pop_front();
        }
    }

    /// Ingest an activity signal stamped with the current time.
    pub fn record_activity(&self, activity: &str, payload: serde_json::Value) {
        let point = ActivityDataPoint::new(activity, self.clock.now(), payload);
        self.record_activity_point(point);
    }

    /// Record a job outcome for `kind`, in `hour` or the current hour.
    pub fn record_extraction_result(
        &self,
        kind: WorkKind,
        success: bool,
        hour: Option<u32>,
    ) -> Result<()> {
        let hour = match hour {
            Some(h) if h as usize >= HOURS => {
                return Err(LearnerError::Validation(format!("hour {h} out of range")));
            }
            Some(h) => h,
            None => self.clock.now().hour(),
        };
        let cap = self.config().hour_sample_cap;
        self.outcomes
            .entry(kind)
            .or_insert_with(|| HourlyOutcomes::new(cap))
            .record(hour as usize, success);
        Ok(())
    }

    /// Fold new points into the decayed histograms and re-evaluate the
    /// learning phase. Returns the pattern confidence.
    pub fn update_patterns(&self) -> f64 {
        let config = self.config();
        let now = self.clock.now();
        let mut state = self.state.lock().expect("learner state poisoned");

        let pending_hourly = std::mem::replace(&mut state.pending_hourly, [0; HOURS]);
        let pending_daily = std::mem::replace(&mut state.pending_daily, [0; DAYS]);
        patterns::decay_update(
            &mut state.hourly,
            &pending_hourly,
            config.decay_factor,
            config.adaptation_speed,
        );
        patterns::decay_update(
            &mut state.daily,
            &pending_daily,
            config.decay_factor,
            config.adaptation_speed,
        );
        state.pattern_confidence = patterns::pattern_confidence(&state.hourly, &state.daily);
        state.last_update = Some(now);

        let required = points_required(&config);
        if state.is_learning
            && state.total_points >= required
            && state.pattern_confidence >= config.confidence_threshold
        {
            state.is_learning = false;
            info!(
                points = state.total_points,
                confidence = state.pattern_confidence,
                "learning phase complete"
            );
        }
        debug!(
            new_points = pending_hourly.iter().sum::<u32>(),
            confidence = state.pattern_confidence,
            "activity patterns updated"
        );
        state.pattern_confidence
    }

    /// Activity level from the points inside the recent window.
    pub fn activity_level(&self) -> ActivityLevel {
        let config = self.config();
        let now = self.clock.now();
        let state = self.state.lock().expect("learner state poisoned");
        classify_activity(&state.history, &config, now)
    }

    pub fn predict_optimal_hours(&self, kind: WorkKind) -> Vec<OptimalHour> {
        let config = self.config();
        self.outcomes
            .get(&kind)
            .map(|o| {
                o.optimal_hours(
                    config.optimal_hour_ratio,
                    config.full_confidence_samples,
                    config.confidence_threshold,
                )
            })
            .unwrap_or_default()
    }

    /// Fraction the interval for `kind` is cut by confident hourly
    /// predictions: `max_prediction_reduction × mean confidence`.
    fn prediction_reduction(&self, kind: WorkKind, config: &LearnerConfig) -> f64 {
        let hours = self.predict_optimal_hours(kind);
        if hours.is_empty() {
            return 0.0;
        }
        let mean = hours.iter().map(|h| h.confidence).sum::<f64>() / hours.len() as f64;
        if mean < config.confidence_threshold {
            return 0.0;
        }
        (config.max_prediction_reduction * mean).clamp(0.0, config.max_prediction_reduction)
    }

    /// Interval `kind` should use now, clamped to `[1, base × max multiplier]`.
    pub fn target_interval(&self, kind: WorkKind) -> Option<f64> {
        let config = self.config();
        let base = {
            let state = self.state.lock().expect("learner state poisoned");
            *state.base_intervals.get(&kind)?
        };
        let activity = self.activity_level();
        let reduction = self.prediction_reduction(kind, &config);
        Some(adjust(base, activity, reduction, &config))
    }

    /// Compute the scale for every registered kind and return the ones whose
    /// factor moved by more than the change threshold. Those become current.
    pub fn adapt_intervals(&self) -> Vec<IntervalChange> {
        let config = self.config();
        let activity = self.activity_level();
        let bases: Vec<(WorkKind, f64)> = {
            let state = self.state.lock().expect("learner state poisoned");
            let mut bases: Vec<_> = state.base_intervals.iter().map(|(k, v)| (*k, *v)).collect();
            bases.sort_by_key(|(k, _)| *k);
            bases
        };
        let targets: Vec<(WorkKind, f64, f64, IntervalScale)> = bases
            .into_iter()
            .map(|(kind, base)| {
                let reduction = self.prediction_reduction(kind, &config);
                (kind, base, reduction, scale_for(activity, reduction, &config))
            })
            .collect();

        let mut state = self.state.lock().expect("learner state poisoned");
        let mut changes = Vec::new();
        for (kind, base, reduction, scale) in targets {
            let previous = state
                .current_scales
                .get(&kind)
                .copied()
                .unwrap_or_else(|| neutral(&config));
            let relative = (scale.factor - previous.factor).abs() / previous.factor;
            let bound_moved = scale.max_multiplier != previous.max_multiplier;
            if relative <= config.change_threshold && !bound_moved {
                continue;
            }
            state.current_scales.insert(kind, scale);
            info!(
                %kind,
                previous_factor = previous.factor,
                factor = scale.factor,
                activity = %activity,
                "interval scale adapted"
            );
            changes.push(IntervalChange {
                kind,
                previous_factor: previous.factor,
                scale,
                base_minutes: base,
                minutes: scale.apply(base),
                activity,
                prediction_reduction: reduction,
            });
        }
        changes
    }

    /// Scales currently in effect, one per registered kind.
    pub fn current_scales(&self) -> Vec<(WorkKind, IntervalScale)> {
        let state = self.state.lock().expect("learner state poisoned");
        let mut scales: Vec<_> = state.current_scales.iter().map(|(k, v)| (*k, *v)).collect();
        scales.sort_by_key(|(k, _)| *k);
        scales
    }

    pub fn is_learning(&self) -> bool {
        self.state.lock().expect("learner state poisoned").is_learning
    }

    pub fn get_current_schedule(&self) -> Vec<ScheduleEntry> {
        let config = self.config();
        let activity = self.activity_level();
        let rows: Vec<(WorkKind, f64, IntervalScale)> = {
            let state = self.state.lock().expect("learner state poisoned");
            state
                .base_intervals
                .iter()
                .map(|(kind, base)| {
                    let scale = state
                        .current_scales
                        .get(kind)
                        .copied()
                        .unwrap_or_else(|| neutral(&config));
                    (*kind, *base, scale)
                })
                .collect()
        };
        let mut entries: Vec<ScheduleEntry> = rows
            .into_iter()
            .map(|(kind, base, scale)| ScheduleEntry {
                kind,
                base_minutes: base,
                factor: scale.factor,
                current_minutes: scale.apply(base),
                target_minutes: adjust(base, activity, self.prediction_reduction(kind, &config), &config),
            })
            .collect();
        entries.sort_by_key(|e| e.kind);
        entries
    }

    pub fn get_adaptive_stats(&self) -> AdaptiveStats {
        let config = self.config();
        let now = self.clock.now();
        let outcomes_recorded = self.outcomes.iter().map(|o| o.total()).sum();
        let kinds_tracked = self.outcomes.len();
        let state = self.state.lock().expect("learner state poisoned");
        let required = points_required(&config);
        AdaptiveStats {
            is_learning: state.is_learning,
            activity_level: classify_activity(&state.history, &config, now),
            total_points: state.total_points,
            history_len: state.history.len(),
            points_required: required,
            learning_progress: if required == 0 {
                1.0
            } else {
                (state.total_points as f64 / required as f64).min(1.0)
            },
            pattern_confidence: state.pattern_confidence,
            outcomes_recorded,
            kinds_tracked,
            last_update: state.last_update,
        }
    }

    pub fn get_activity_patterns(&self) -> ActivityPatterns {
        let state = self.state.lock().expect("learner state poisoned");
        ActivityPatterns {
            hourly: state.hourly.to_vec(),
            daily: state.daily.to_vec(),
            peak_hours: patterns::peaks(&state.hourly),
            peak_days: patterns::peaks(&state.daily),
            confidence: state.pattern_confidence,
        }
    }

    /// Forget everything learned. Registered kinds are kept and go back to
    /// a factor of 1.
    pub fn reset(&self) {
        let start = neutral(&self.config());
        let mut state = self.state.lock().expect("learner state poisoned");
        let bases = std::mem::take(&mut state.base_intervals);
        *state = LearnerState::new();
        state.current_scales = bases
            .keys()
            .map(|kind| (*kind, start))
            .collect();
        state.base_intervals = bases;
        drop(state);
        self.outcomes.clear();
        info!("learner state reset");
    }

    pub fn snapshot(&self) -> LearnerSnapshot {
        let outcomes = self
            .outcomes
            .iter()
            .map(|e| (*e.key(), e.value().samples()))
            .collect();
        let state = self.state.lock().expect("learner state poisoned");
        LearnerSnapshot {
            hourly: state.hourly.to_vec(),
            daily: state.daily.to_vec(),
            history: state.history.iter().cloned().collect(),
            outcomes,
            base_intervals: state.base_intervals.clone(),
            current_scales: state.current_scales.clone(),
            total_points: state.total_points,
            is_learning: state.is_learning,
            pattern_confidence: state.pattern_confidence,
            saved_at: Some(self.clock.now()),
        }
    }

    /// Replace learned state with `snapshot`. Base intervals registered in
    /// this process win over saved ones.
    pub fn restore(&self, snapshot: LearnerSnapshot) -> Result<()> {
        if snapshot.hourly.len() != HOURS || snapshot.daily.len() != DAYS {
            return Err(LearnerError::Validation(format!(
                "snapshot histograms have {} hourly and {} daily buckets",
                snapshot.hourly.len(),
                snapshot.daily.len()
            )));
        }
        let config = self.config();
        let mut state = self.state.lock().expect("learner state poisoned");
        state.hourly.copy_from_slice(&snapshot.hourly);
        state.daily.copy_from_slice(&snapshot.daily);
        state.history = snapshot.history.into_iter().collect();
        while state.history.len() > config.history_cap {
            state.history.pop_front();
        }
        state.pending_hourly = [0; HOURS];
        state.pending_daily = [0; DAYS];
        for (kind, minutes) in snapshot.base_intervals {
            state.base_intervals.entry(kind).or_insert(minutes);
        }
        state.current_scales = snapshot.current_scales;
        let kinds: Vec<WorkKind> = state.base_intervals.keys().copied().collect();
        for kind in kinds {
            state.current_scales.entry(kind).or_insert(neutral(&config));
        }
        state.total_points = snapshot.total_points;
        state.is_learning = snapshot.is_learning;
        state.pattern_confidence = snapshot.pattern_confidence;
        drop(state);

        self.outcomes.clear();
        for (kind, samples) in snapshot.outcomes {
            self.outcomes
                .insert(kind, HourlyOutcomes::from_samples(samples, config.hour_sample_cap));
        }
        Ok(())
    }

    pub async fn save_to(&self, store: &dyn SnapshotStore) -> Result<()> {
        let value = serde_json::to_value(self.snapshot())?;
        store.save(LEARNER_SNAPSHOT_KEY, &value).await?;
        Ok(())
    }

    /// Restore from `store`. `Ok(false)` when nothing was saved.
    pub async fn load_from(&self, store: &dyn SnapshotStore) -> Result<bool> {
        let Some(value) = store.load(LEARNER_SNAPSHOT_KEY).await? else {
            return Ok(false);
        };
        let snapshot: LearnerSnapshot = serde_json::from_value(value)?;
        self.restore(snapshot)?;
        Ok(true)
    }
}

fn points_required(config: &LearnerConfig) -> u64 {
    (config.min_data_points * config.learning_period_days) as u64
}

fn classify_activity(
    history: &VecDeque<ActivityDataPoint>,
    config: &LearnerConfig,
    now: DateTime<Utc>,
) -> ActivityLevel {
    let window_start = now - Duration::seconds(config.activity_window_secs as i64);
    let recent = history
        .iter()
        .filter(|p| p.timestamp >= window_start && p.timestamp <= now)
        .count();
    if recent >= config.high_activity_points {
        return ActivityLevel::High;
    }
    if recent >= config.medium_activity_points {
        return ActivityLevel::Medium;
    }
    if recent >= 1 {
        return ActivityLevel::Low;
    }
    let idle_limit = Duration::seconds(config.inactivity_threshold_secs as i64);
    match history.iter().map(|p| p.timestamp).max() {
        Some(last) if now - last <= idle_limit => ActivityLevel::Low,
        _ => ActivityLevel::Inactive,
    }
}

fn multiplier(activity: ActivityLevel, config: &LearnerConfig) -> f64 {
    let m = &config.multipliers;
    match activity {
        ActivityLevel::Inactive => m.inactive,
        ActivityLevel::Low => m.low,
        ActivityLevel::Medium => m.medium,
        ActivityLevel::High => m.high,
    }
}

/// Factor 1 under the configured bound.
fn neutral(config: &LearnerConfig) -> IntervalScale {
    IntervalScale::new(1.0, config.max_adjustment_multiplier)
}

/// Scale for `activity multiplier × (1 − reduction)`, bounded by
/// `max_adjustment_multiplier`.
pub fn scale_for(activity: ActivityLevel, reduction: f64, config: &LearnerConfig) -> IntervalScale {
    IntervalScale::new(
        multiplier(activity, config) * (1.0 - reduction),
        config.max_adjustment_multiplier,
    )
}

/// `base × activity multiplier × (1 − reduction)`, clamped to
/// `[1, base × max_adjustment_multiplier]`.
pub fn adjust(base: f64, activity: ActivityLevel, reduction: f64, config: &LearnerConfig) -> f64 {
    scale_for(activity, reduction, config).apply(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::ManualClock;

    fn learner() -> (AdaptiveLearner, std::sync::Arc<ManualClock>) {
        let clock = ManualClock::new(Utc::now());
        (AdaptiveLearner::new(LearnerConfig::default(), clock.clone()), clock)
    }

    #[test]
    fn activity_levels_follow_window_counts() {
        let (l, clock) = learner();
        assert_eq!(l.activity_level(), ActivityLevel::Inactive);
        l.record_activity("navigation", serde_json::Value::Null);
        assert_eq!(l.activity_level(), ActivityLevel::Low);
        for _ in 0..4 {
            l.record_activity("navigation", serde_json::Value::Null);
        }
        assert_eq!(l.activity_level(), ActivityLevel::Medium);
        for _ in 0..5 {
            l.record_activity("navigation", serde_json::Value::Null);
        }
        assert_eq!(l.activity_level(), ActivityLevel::High);

        clock.advance(Duration::minutes(61));
        assert_eq!(l.activity_level(), ActivityLevel::Inactive);
    }

    #[test]
    fn short_window_leaves_low_before_inactive() {
        let clock = ManualClock::new(Utc::now());
        let config = LearnerConfig {
            activity_window_secs: 600,
            ..LearnerConfig::default()
        };
        let l = AdaptiveLearner::new(config, clock.clone());
        l.record_activity("tab", serde_json::Value::Null);
        clock.advance(Duration::minutes(20));
        assert_eq!(l.activity_level(), ActivityLevel::Low);
        clock.advance(Duration::minutes(11));
        assert_eq!(l.activity_level(), ActivityLevel::Inactive);
    }

    #[test]
    fn inactive_stretches_interval() {
        let (l, _) = learner();
        l.register_base_interval(WorkKind::Profile, 20.0).unwrap();
        let changes = l.adapt_intervals();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].minutes, 60.0);
        assert_eq!(changes[0].activity, ActivityLevel::Inactive);
        // Same target again is below the change threshold.
        assert!(l.adapt_intervals().is_empty());
    }

    #[test]
    fn adapt_publishes_a_per_kind_scale() {
        let (l, _) = learner();
        l.register_base_interval(WorkKind::Profile, 15.0).unwrap();
        l.register_base_interval(WorkKind::Profile, 240.0).unwrap();
        let changes = l.adapt_intervals();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].previous_factor, 1.0);
        assert_eq!(changes[0].scale, IntervalScale::new(3.0, 4.0));
        assert_eq!(changes[0].base_minutes, 15.0);
        assert_eq!(l.current_scales(), vec![(WorkKind::Profile, IntervalScale::new(3.0, 4.0))]);

        l.reset();
        assert_eq!(l.current_scales()[0].1.factor, 1.0);
    }

    #[test]
    fn small_changes_are_not_pushed() {
        let clock = ManualClock::new(Utc::now());
        let config = LearnerConfig {
            multipliers: cadence_core::config::ActivityMultipliers {
                inactive: 1.05,
                ..Default::default()
            },
            ..LearnerConfig::default()
        };
        let l = AdaptiveLearner::new(config, clock);
        l.register_base_interval(WorkKind::Search, 30.0).unwrap();
        assert!(l.adapt_intervals().is_empty());
    }

    #[test]
    fn confident_hours_cut_the_interval() {
        let (l, _) = learner();
        l.register_base_interval(WorkKind::Listing, 60.0).unwrap();
        for _ in 0..10 {
            l.record_extraction_result(WorkKind::Listing, true, Some(3)).unwrap();
            l.record_extraction_result(WorkKind::Listing, false, Some(15)).unwrap();
        }
        let hours = l.predict_optimal_hours(WorkKind::Listing);
        assert_eq!(hours.len(), 1);
        assert_eq!(hours[0].hour, 3);
        // Inactive ×3 then a 30% cut.
        let target = l.target_interval(WorkKind::Listing).unwrap();
        assert!((target - 126.0).abs() < 1e-9, "{target}");
    }

    #[test]
    fn rejects_bad_hours_and_intervals() {
        let (l, _) = learner();
        assert!(l.record_extraction_result(WorkKind::Session, true, Some(24)).is_err());
        assert!(l.register_base_interval(WorkKind::Session, 0.0).is_err());
    }

    #[test]
    fn learning_ends_with_enough_even_data() {
        let clock = ManualClock::new(Utc::now());
        let config = LearnerConfig {
            min_data_points: 2,
            learning_period_days: 7,
            confidence_threshold: 0.5,
            ..LearnerConfig::default()
        };
        let l = AdaptiveLearner::new(config, clock.clone());
        // One point per hour for a week covers every hour and day evenly.
        for _ in 0..(24 * 7) {
            l.record_activity("poll", serde_json::Value::Null);
            clock.advance(Duration::hours(1));
        }
        assert!(l.is_learning());
        let confidence = l.update_patterns();
        assert!(confidence > 0.99, "{confidence}");
        assert!(!l.is_learning());

        // One-directional until reset.
        l.update_patterns();
        assert!(!l.is_learning());
        l.reset();
        assert!(l.is_learning());
    }

    #[test]
    fn patterns_report_peaks() {
        let clock = ManualClock::new(
            chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 1, 1, 9, 0, 0).unwrap(),
        );
        let l = AdaptiveLearner::new(LearnerConfig::default(), clock.clone());
        for _ in 0..5 {
            l.record_activity("click", serde_json::Value::Null);
        }
        l.update_patterns();
        let p = l.get_activity_patterns();
        assert_eq!(p.hourly.len(), 24);
        assert!((p.hourly[9] - 0.5).abs() < 1e-9);
        assert_eq!(p.peak_hours, vec![9]);
        assert_eq!(p.peak_days, vec![0]);
    }

    #[test]
    fn reset_keeps_bases() {
        let (l, _) = learner();
        l.register_base_interval(WorkKind::Messages, 10.0).unwrap();
        l.adapt_intervals();
        l.record_extraction_result(WorkKind::Messages, true, None).unwrap();
        l.reset();
        let schedule = l.get_current_schedule();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].current_minutes, 10.0);
        assert_eq!(l.get_adaptive_stats().outcomes_recorded, 0);
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_store() {
        let store = cadence_core::MemorySnapshotStore::new();
        let (l, _) = learner();
        l.register_base_interval(WorkKind::Profile, 15.0).unwrap();
        l.record_activity("nav", serde_json::json!({"url": "/u/1"}));
        l.record_extraction_result(WorkKind::Profile, false, Some(7)).unwrap();
        l.update_patterns();
        l.save_to(&store).await.unwrap();

        let (fresh, _) = learner();
        assert!(fresh.load_from(&store).await.unwrap());
        let stats = fresh.get_adaptive_stats();
        assert_eq!(stats.total_points, 1);
        assert_eq!(stats.outcomes_recorded, 1);
        assert_eq!(fresh.get_current_schedule()[0].base_minutes, 15.0);

        let empty = cadence_core::MemorySnapshotStore::new();
        assert!(!fresh.load_from(&empty).await.unwrap());
    }
}
