use std::collections::HashMap;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::types::{PriorityLevel, WorkKind};

pub const DEFAULT_PORT: u16 = 18790;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const MB: usize = 1024 * 1024;

/// Top-level config (cadence.toml + CADENCE_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub scheduler: SchedulerConfig,
    pub queue: QueueConfig,
    pub cache: CacheConfig,
    pub learner: LearnerConfig,
    pub store: StoreConfig,
    pub gateway: GatewayConfig,
    /// Declarative recurring jobs registered at startup.
    pub jobs: Vec<JobConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Each fire interval is nominal × (1 ± jitter_fraction).
    pub jitter_fraction: f64,
    /// Consecutive failures before a job is disabled.
    pub max_retries: u32,
    /// How long a disabled job waits before it is re-enabled.
    pub cooldown_minutes: u64,
    /// Global cap on in-flight executions of concurrent-allowed jobs.
    pub max_concurrent: usize,
    /// Execution records kept in memory, oldest dropped first.
    pub history_cap: usize,
    pub tick_ms: u64,
    /// Fires are only allowed when start <= hour < end (UTC). 0..24 = always.
    pub active_hours_start: u8,
    pub active_hours_end: u8,
    /// Allowed weekdays, 0 = Monday … 6 = Sunday.
    pub active_days: Vec<u8>,
    pub initial_offsets: InitialOffsets,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            jitter_fraction: 0.2,
            max_retries: 3,
            cooldown_minutes: 60,
            max_concurrent: 3,
            history_cap: 1000,
            tick_ms: 1000,
            active_hours_start: 0,
            active_hours_end: 24,
            active_days: (0..7).collect(),
            initial_offsets: InitialOffsets::default(),
        }
    }
}

/// Delay before a job's first fire, by priority class (seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialOffsets {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub background: u64,
}

impl Default for InitialOffsets {
    fn default() -> Self {
        Self {
            critical: 10,
            high: 30,
            medium: 60,
            low: 120,
            background: 300,
        }
    }
}

impl InitialOffsets {
    pub fn for_level(&self, level: PriorityLevel) -> u64 {
        match level {
            PriorityLevel::Critical => self.critical,
            PriorityLevel::High => self.high,
            PriorityLevel::Medium => self.medium,
            PriorityLevel::Low => self.low,
            PriorityLevel::Background => self.background,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_size: usize,
    /// Tasks in flight longer than this are reaped as failed.
    pub max_processing_secs: u64,
    pub aging_interval_secs: u64,
    pub aging_factor: f64,
    pub max_aging_bonus: f64,
    pub completion_history_cap: usize,
    pub rebalance_interval_secs: u64,
    /// Kinds whose recent success rate falls below this are nudged down.
    pub rebalance_low_threshold: f64,
    /// Kinds whose recent success rate is above this are nudged up.
    pub rebalance_high_threshold: f64,
    pub rebalance_step: f64,
    /// Bound on the accumulated per-kind nudge, in either direction.
    pub rebalance_max_adjustment: f64,
    /// Completions of a kind needed before it is rebalanced.
    pub rebalance_min_samples: usize,
    /// Freshness factor when nothing is cached for a task's target.
    pub uncached_freshness: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            max_processing_secs: 300,
            aging_interval_secs: 60,
            aging_factor: 0.1,
            max_aging_bonus: 0.5,
            completion_history_cap: 500,
            rebalance_interval_secs: 300,
            rebalance_low_threshold: 0.8,
            rebalance_high_threshold: 0.95,
            rebalance_step: 0.05,
            rebalance_max_adjustment: 0.2,
            rebalance_min_samples: 5,
            uncached_freshness: 1.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub total_budget_bytes: usize,
    /// Per-type budgets; types not listed are bounded only by the total.
    pub type_budgets: HashMap<String, usize>,
    /// Per-type TTLs in seconds.
    pub ttl_secs: HashMap<String, u64>,
    pub default_ttl_secs: u64,
    /// Serialized payloads larger than this are stored zstd-compressed.
    pub compression_threshold_bytes: usize,
    pub compression_level: i32,
    pub cleanup_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let ttl_secs = HashMap::from([
            (WorkKind::Session.to_string(), 24 * 3600),
            (WorkKind::Messages.to_string(), 24 * 3600),
            (WorkKind::Profile.to_string(), 2 * 3600),
            (WorkKind::Listing.to_string(), 3600),
            (WorkKind::Search.to_string(), 3600),
        ]);
        let type_budgets = HashMap::from([
            (WorkKind::Session.to_string(), 10 * MB),
            (WorkKind::Profile.to_string(), 20 * MB),
            (WorkKind::Listing.to_string(), 20 * MB),
        ]);
        Self {
            total_budget_bytes: 50 * MB,
            type_budgets,
            ttl_secs,
            default_ttl_secs: 3600,
            compression_threshold_bytes: 1024,
            compression_level: 3,
            cleanup_interval_secs: 300,
        }
    }
}

impl CacheConfig {
    pub fn ttl_for(&self, kind: &str) -> u64 {
        self.ttl_secs
            .get(kind)
            .copied()
            .unwrap_or(self.default_ttl_secs)
    }

    pub fn budget_for(&self, kind: &str) -> usize {
        self.type_budgets
            .get(kind)
            .copied()
            .unwrap_or(self.total_budget_bytes)
            .min(self.total_budget_bytes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    pub decay_factor: f64,
    pub adaptation_speed: f64,
    pub activity_window_secs: u64,
    pub inactivity_threshold_secs: u64,
    /// Points in the window needed for `high` / `medium` activity.
    pub high_activity_points: usize,
    pub medium_activity_points: usize,
    pub multipliers: ActivityMultipliers,
    /// Largest fractional cut the hourly success predictions may apply.
    pub max_prediction_reduction: f64,
    pub max_adjustment_multiplier: f64,
    /// Relative change below which a new interval is not pushed.
    pub change_threshold: f64,
    pub hour_sample_cap: usize,
    pub confidence_threshold: f64,
    /// Hours above average × this ratio are candidate optimal hours.
    pub optimal_hour_ratio: f64,
    /// Samples needed for full confidence in an hourly prediction.
    pub full_confidence_samples: usize,
    pub min_data_points: usize,
    pub learning_period_days: usize,
    pub history_cap: usize,
    pub update_interval_secs: u64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            decay_factor: 0.95,
            adaptation_speed: 0.1,
            activity_window_secs: 3600,
            inactivity_threshold_secs: 1800,
            high_activity_points: 10,
            medium_activity_points: 5,
            multipliers: ActivityMultipliers::default(),
            max_prediction_reduction: 0.3,
            max_adjustment_multiplier: 4.0,
            change_threshold: 0.1,
            hour_sample_cap: 50,
            confidence_threshold: 0.7,
            optimal_hour_ratio: 1.2,
            full_confidence_samples: 10,
            min_data_points: 50,
            learning_period_days: 7,
            history_cap: 10_000,
            update_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityMultipliers {
    pub inactive: f64,
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for ActivityMultipliers {
    fn default() -> Self {
        Self {
            inactive: 3.0,
            low: 1.5,
            medium: 0.75,
            high: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file for snapshots. Empty string keeps snapshots in memory.
    pub path: String,
    pub snapshot_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            snapshot_interval_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub port: u16,
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// A recurring job declared in config. `handler` names a registered handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub kind: String,
    pub interval_minutes: f64,
    #[serde(default = "default_priority")]
    pub priority: PriorityLevel,
    #[serde(default)]
    pub allow_concurrent: bool,
    pub handler: String,
}

fn default_priority() -> PriorityLevel {
    PriorityLevel::Medium
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cadence/cadence.db", home)
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cadence/cadence.toml", home)
}

impl CadenceConfig {
    /// Load config from a TOML file with CADENCE_* env var overrides.
    ///
    /// Nested keys use a double underscore: `CADENCE_QUEUE__MAX_SIZE=50`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: CadenceConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("CADENCE_").split("__"))
            .extract()
            .map_err(|e| crate::error::CadenceError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break scheduling or scoring arithmetic.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::CadenceError::Config;

        let s = &self.scheduler;
        if !(0.0..1.0).contains(&s.jitter_fraction) {
            return Err(Config("scheduler.jitter_fraction must be in [0, 1)".into()));
        }
        if s.max_retries == 0 {
            return Err(Config("scheduler.max_retries must be at least 1".into()));
        }
        if s.active_hours_start > 23 || s.active_hours_end > 24 {
            return Err(Config("scheduler.active_hours out of range".into()));
        }
        if s.active_days.iter().any(|d| *d > 6) {
            return Err(Config("scheduler.active_days entries must be 0..=6".into()));
        }
        let q = &self.queue;
        if q.aging_interval_secs == 0 {
            return Err(Config("queue.aging_interval_secs must be positive".into()));
        }
        if q.max_size == 0 {
            return Err(Config("queue.max_size must be positive".into()));
        }
        let l = &self.learner;
        if !(0.0..=1.0).contains(&l.decay_factor) {
            return Err(Config("learner.decay_factor must be in [0, 1]".into()));
        }
        if l.max_adjustment_multiplier < 1.0 {
            return Err(Config("learner.max_adjustment_multiplier must be >= 1".into()));
        }
        Ok(())
    }
}
