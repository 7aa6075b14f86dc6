//! Composite priority scoring.
//!
//! ```text
//! score = (base × 0.3 + urgency × 0.4 + resourceCost × 0.2 + deadline × 0.1)
//!         × contextual × freshness × successRate × systemLoad
//! ```
//!
//! Each factor is computed independently from the task spec, the shared
//! [`Context`], and the cached-result age for the task's target.

use std::collections::HashMap;

use cadence_core::{
    ActivityLevel, Context, ContextMode, DependencyHealth, PriorityLevel, SystemLoad, WorkKind,
};
use chrono::{DateTime, Duration, Utc};

use crate::types::{ScoreBreakdown, TaskSpec};

const W_BASE: f64 = 0.3;
const W_URGENCY: f64 = 0.4;
const W_RESOURCE: f64 = 0.2;
const W_DEADLINE: f64 = 0.1;

/// Deadlines closer than this ramp from 0.8 to 1.0.
const DEADLINE_WINDOW_MINS: i64 = 120;

/// Base-priority tables: a default per kind plus per-mode overrides, and the
/// bounded nudges applied by rebalancing.
#[derive(Debug, Clone)]
pub struct PriorityTables {
    defaults: HashMap<WorkKind, PriorityLevel>,
    overrides: HashMap<ContextMode, HashMap<WorkKind, PriorityLevel>>,
    adjustments: HashMap<WorkKind, f64>,
}

impl Default for PriorityTables {
    fn default() -> Self {
        use PriorityLevel::*;
        use WorkKind::*;

        let defaults = HashMap::from([
            (Session, High),
            (Messages, High),
            (Profile, Medium),
            (Listing, Medium),
            (Search, Medium),
            (BulkExtraction, Low),
            (Analytics, Low),
            (Cleanup, Background),
        ]);

        let user_active = HashMap::from([
            (Session, Critical),
            (Messages, Critical),
            (Profile, High),
            (BulkExtraction, Background),
            (Analytics, Background),
            (Cleanup, Background),
        ]);
        let user_inactive = HashMap::from([
            (Session, Medium),
            (BulkExtraction, High),
            (Analytics, Medium),
            (Cleanup, Medium),
        ]);
        let high_load = HashMap::from([
            (Session, High),
            (Profile, Low),
            (Listing, Low),
            (Search, Low),
            (BulkExtraction, Background),
            (Analytics, Background),
            (Cleanup, Background),
        ]);
        let api_failure = HashMap::from([
            (Session, High),
            (Messages, Medium),
            (Profile, Low),
            (Listing, Low),
            (Search, Low),
            (BulkExtraction, Background),
            (Analytics, Low),
            (Cleanup, Low),
        ]);

        let overrides = HashMap::from([
            (ContextMode::UserActive, user_active),
            (ContextMode::UserInactive, user_inactive),
            (ContextMode::HighLoad, high_load),
            (ContextMode::ApiFailure, api_failure),
        ]);

        Self {
            defaults,
            overrides,
            adjustments: HashMap::new(),
        }
    }
}

impl PriorityTables {
    /// Table level for `kind` under `mode`, before adjustment.
    pub fn level(&self, kind: WorkKind, mode: ContextMode) -> PriorityLevel {
        self.overrides
            .get(&mode)
            .and_then(|table| table.get(&kind))
            .or_else(|| self.defaults.get(&kind))
            .copied()
            .unwrap_or(PriorityLevel::Medium)
    }

    /// Base factor: table weight plus the rebalancing nudge.
    pub fn base(&self, kind: WorkKind, mode: ContextMode) -> f64 {
        let weight = self.level(kind, mode).weight() + self.adjustment(kind);
        weight.clamp(0.05, 1.0)
    }

    pub fn adjustment(&self, kind: WorkKind) -> f64 {
        self.adjustments.get(&kind).copied().unwrap_or(0.0)
    }

    /// Add `delta` to the kind's nudge, bounded to `±limit`. Returns the new value.
    pub fn nudge(&mut self, kind: WorkKind, delta: f64, limit: f64) -> f64 {
        let entry = self.adjustments.entry(kind).or_insert(0.0);
        *entry = (*entry + delta).clamp(-limit, limit);
        *entry
    }

    pub fn adjustments(&self) -> &HashMap<WorkKind, f64> {
        &self.adjustments
    }
}

/// Fraction of scraping budget a kind is expected to consume, in [0, 1].
pub fn estimated_cost(kind: WorkKind) -> f64 {
    match kind {
        WorkKind::Session => 0.2,
        WorkKind::Messages => 0.3,
        WorkKind::Profile => 0.4,
        WorkKind::Listing => 0.5,
        WorkKind::Search => 0.5,
        WorkKind::Analytics => 0.6,
        WorkKind::BulkExtraction => 0.9,
        WorkKind::Cleanup => 0.1,
    }
}

pub fn urgency(spec: &TaskSpec) -> f64 {
    if spec.urgent || spec.critical {
        1.0
    } else if spec.retry_count > 0 {
        (0.5 + 0.2 * spec.retry_count as f64).min(1.0)
    } else if spec.user_triggered {
        0.8
    } else {
        0.5
    }
}

pub fn resource_cost(kind: WorkKind) -> f64 {
    1.0 - estimated_cost(kind).clamp(0.0, 1.0)
}

pub fn deadline(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(deadline) = deadline else {
        return 0.5;
    };
    if deadline <= now {
        return 1.0;
    }
    let remaining = deadline - now;
    let window = Duration::minutes(DEADLINE_WINDOW_MINS);
    if remaining <= window {
        let closeness = 1.0 - remaining.num_milliseconds() as f64 / window.num_milliseconds() as f64;
        0.8 + 0.2 * closeness
    } else {
        0.3
    }
}

/// Kind- and context-dependent multiplier.
///
/// Interactive kinds are favoured while the user is active and bulk kinds
/// while inactive; non-critical work is discounted under elevated load or a
/// degraded external dependency.
pub fn contextual(
    kind: WorkKind,
    critical: bool,
    activity: ActivityLevel,
    load: SystemLoad,
    health: DependencyHealth,
) -> f64 {
    let mut m = 1.0;
    match activity {
        ActivityLevel::High | ActivityLevel::Medium => {
            if kind.is_interactive() {
                m *= 1.3;
            } else if kind.is_bulk() {
                m *= 0.7;
            }
        }
        ActivityLevel::Inactive => {
            if kind.is_bulk() {
                m *= 1.3;
            } else if kind.is_interactive() {
                m *= 0.8;
            }
        }
        ActivityLevel::Low => {}
    }
    if !critical {
        if load.is_elevated() {
            m *= 0.8;
        }
        match health {
            DependencyHealth::Healthy => {}
            DependencyHealth::Degraded => m *= 0.85,
            DependencyHealth::Failing => m *= 0.6,
        }
    }
    m
}

/// Factor from the age of the cached result; `uncached` when nothing is cached.
pub fn freshness(age: Option<Duration>, uncached: f64) -> f64 {
    match age {
        None => uncached,
        Some(age) if age < Duration::minutes(30) => 1.0,
        Some(age) if age < Duration::hours(2) => 0.8,
        Some(age) if age < Duration::hours(6) => 0.6,
        Some(_) => 0.4,
    }
}

pub fn success_rate(rate: Option<f64>) -> f64 {
    match rate {
        None => 1.0,
        Some(r) if r >= 0.95 => 1.2,
        Some(r) if r >= 0.8 => 1.0,
        Some(r) if r >= 0.5 => 0.8,
        Some(_) => 0.6,
    }
}

pub fn system_load(load: SystemLoad) -> f64 {
    match load {
        SystemLoad::Low => 1.2,
        SystemLoad::Medium => 1.0,
        SystemLoad::High => 0.8,
        SystemLoad::Critical => 0.6,
    }
}

/// Score `spec` against the current context.
pub fn score(
    spec: &TaskSpec,
    tables: &PriorityTables,
    ctx: &Context,
    cached_age: Option<Duration>,
    uncached_freshness: f64,
    now: DateTime<Utc>,
) -> ScoreBreakdown {
    let mode = ctx.mode();
    let activity = ctx.activity();
    let load = ctx.system_load();
    let health = ctx.dependency_health();

    let critical = spec.critical || tables.level(spec.kind, mode) == PriorityLevel::Critical;

    let base = tables.base(spec.kind, mode);
    let urgency = urgency(spec);
    let resource_cost = resource_cost(spec.kind);
    let deadline = deadline(spec.deadline, now);
    let contextual = contextual(spec.kind, critical, activity, load, health);
    let freshness = freshness(cached_age, uncached_freshness);
    let success_rate = success_rate(ctx.success_rate(spec.kind));
    let system_load = system_load(load);

    let weighted =
        base * W_BASE + urgency * W_URGENCY + resource_cost * W_RESOURCE + deadline * W_DEADLINE;
    let score = weighted * contextual * freshness * success_rate * system_load;

    ScoreBreakdown {
        base,
        urgency,
        resource_cost,
        deadline,
        contextual,
        freshness,
        success_rate,
        system_load,
        weighted,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_ladder() {
        let spec = TaskSpec::new(WorkKind::Profile);
        assert_eq!(urgency(&spec), 0.5);
        assert_eq!(urgency(&spec.clone().user_triggered()), 0.8);
        assert!((urgency(&spec.clone().with_retries(1)) - 0.7).abs() < 1e-9);
        assert_eq!(urgency(&spec.clone().with_retries(5)), 1.0);
        assert_eq!(urgency(&spec.urgent()), 1.0);
    }

    #[test]
    fn deadline_bands() {
        let now = Utc::now();
        assert_eq!(deadline(None, now), 0.5);
        assert_eq!(deadline(Some(now - Duration::minutes(1)), now), 1.0);
        assert_eq!(deadline(Some(now + Duration::hours(5)), now), 0.3);
        let near = deadline(Some(now + Duration::minutes(60)), now);
        assert!((near - 0.9).abs() < 1e-9);
        let edge = deadline(Some(now + Duration::minutes(120)), now);
        assert!((edge - 0.8).abs() < 1e-9);
    }

    #[test]
    fn freshness_bands() {
        assert_eq!(freshness(None, 1.2), 1.2);
        assert_eq!(freshness(Some(Duration::minutes(10)), 1.2), 1.0);
        assert_eq!(freshness(Some(Duration::minutes(90)), 1.2), 0.8);
        assert_eq!(freshness(Some(Duration::hours(3)), 1.2), 0.6);
        assert_eq!(freshness(Some(Duration::hours(7)), 1.2), 0.4);
    }

    #[test]
    fn success_rate_bands() {
        assert_eq!(success_rate(None), 1.0);
        assert_eq!(success_rate(Some(0.97)), 1.2);
        assert_eq!(success_rate(Some(0.85)), 1.0);
        assert_eq!(success_rate(Some(0.6)), 0.8);
        assert_eq!(success_rate(Some(0.2)), 0.6);
    }

    #[test]
    fn critical_work_escapes_load_discount() {
        let discounted = contextual(
            WorkKind::Listing,
            false,
            ActivityLevel::Low,
            SystemLoad::High,
            DependencyHealth::Failing,
        );
        let exempt = contextual(
            WorkKind::Listing,
            true,
            ActivityLevel::Low,
            SystemLoad::High,
            DependencyHealth::Failing,
        );
        assert!((discounted - 0.48).abs() < 1e-9);
        assert_eq!(exempt, 1.0);
    }

    #[test]
    fn overrides_fall_back_to_defaults() {
        let tables = PriorityTables::default();
        assert_eq!(
            tables.level(WorkKind::Session, ContextMode::UserActive),
            PriorityLevel::Critical
        );
        // Listing has no user-active override.
        assert_eq!(
            tables.level(WorkKind::Listing, ContextMode::UserActive),
            PriorityLevel::Medium
        );
        assert_eq!(
            tables.level(WorkKind::BulkExtraction, ContextMode::UserInactive),
            PriorityLevel::High
        );
    }

    #[test]
    fn nudges_are_bounded() {
        let mut tables = PriorityTables::default();
        for _ in 0..10 {
            tables.nudge(WorkKind::Search, -0.05, 0.2);
        }
        assert!((tables.adjustment(WorkKind::Search) + 0.2).abs() < 1e-9);
        assert!((tables.base(WorkKind::Search, ContextMode::Normal) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn session_beats_cleanup_when_user_active() {
        let ctx = Context::new();
        ctx.set_activity(ActivityLevel::High);
        let tables = PriorityTables::default();
        let now = Utc::now();

        let a = score(
            &TaskSpec::new(WorkKind::Session).user_triggered(),
            &tables,
            &ctx,
            None,
            1.2,
            now,
        );
        let b = score(&TaskSpec::new(WorkKind::Cleanup), &tables, &ctx, None, 1.2, now);
        assert!(a.score > b.score, "{} <= {}", a.score, b.score);
        assert_eq!(a.base, 1.0);
        assert_eq!(b.base, 0.1);
    }
}
