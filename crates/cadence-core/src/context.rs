//! Shared scoring context: activity, load, dependency health and rolling
//! per-kind success histories.
//!
//! Written by the learner (activity), the outcome feedback path (successes and
//! failures) and external signals (load, health overrides). The priority queue
//! only reads it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use serde::Serialize;

use crate::types::{ActivityLevel, ContextMode, DependencyHealth, SystemLoad, WorkKind};

/// Outcomes kept per kind for success-rate derivation.
pub const DEFAULT_HISTORY_CAP: usize = 100;
/// Outcomes kept across all kinds for dependency-health derivation.
const HEALTH_WINDOW: usize = 50;

#[derive(Debug, Clone, Copy)]
struct Signals {
    activity: ActivityLevel,
    load: SystemLoad,
    /// Explicit override; when unset health is derived from recent outcomes.
    health_override: Option<DependencyHealth>,
}

/// Point-in-time copy of the context for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct ContextSnapshot {
    pub activity: ActivityLevel,
    pub system_load: SystemLoad,
    pub dependency_health: DependencyHealth,
    pub mode: ContextMode,
    pub success_rates: HashMap<WorkKind, f64>,
}

pub struct Context {
    signals: RwLock<Signals>,
    histories: DashMap<WorkKind, VecDeque<bool>>,
    recent: RwLock<VecDeque<bool>>,
    history_cap: usize,
}

impl Context {
    pub fn new() -> Arc<Self> {
        Self::with_history_cap(DEFAULT_HISTORY_CAP)
    }

    pub fn with_history_cap(history_cap: usize) -> Arc<Self> {
        Arc::new(Self {
            signals: RwLock::new(Signals {
                activity: ActivityLevel::Low,
                load: SystemLoad::Medium,
                health_override: None,
            }),
            histories: DashMap::new(),
            recent: RwLock::new(VecDeque::with_capacity(HEALTH_WINDOW)),
            history_cap: history_cap.max(1),
        })
    }

    pub fn activity(&self) -> ActivityLevel {
        self.signals.read().expect("context poisoned").activity
    }

    pub fn set_activity(&self, level: ActivityLevel) {
        self.signals.write().expect("context poisoned").activity = level;
    }

    pub fn system_load(&self) -> SystemLoad {
        self.signals.read().expect("context poisoned").load
    }

    pub fn set_system_load(&self, load: SystemLoad) {
        self.signals.write().expect("context poisoned").load = load;
    }

    /// Pin dependency health, or pass `None` to go back to deriving it.
    pub fn set_dependency_health(&self, health: Option<DependencyHealth>) {
        self.signals.write().expect("context poisoned").health_override = health;
    }

    pub fn dependency_health(&self) -> DependencyHealth {
        if let Some(h) = self.signals.read().expect("context poisoned").health_override {
            return h;
        }
        let recent = self.recent.read().expect("context poisoned");
        if recent.is_empty() {
            return DependencyHealth::Healthy;
        }
        let ok = recent.iter().filter(|s| **s).count() as f64;
        let rate = ok / recent.len() as f64;
        if rate > 0.8 {
            DependencyHealth::Healthy
        } else if rate >= 0.5 {
            DependencyHealth::Degraded
        } else {
            DependencyHealth::Failing
        }
    }

    /// Append an execution outcome for `kind`, dropping the oldest past the cap.
    pub fn record_outcome(&self, kind: WorkKind, success: bool) {
        let mut history = self.histories.entry(kind).or_default();
        history.push_back(success);
        while history.len() > self.history_cap {
            history.pop_front();
        }
        drop(history);

        let mut recent = self.recent.write().expect("context poisoned");
        recent.push_back(success);
        while recent.len() > HEALTH_WINDOW {
            recent.pop_front();
        }
    }

    /// Historical success ratio for `kind`; `None` when nothing is recorded.
    pub fn success_rate(&self, kind: WorkKind) -> Option<f64> {
        let history = self.histories.get(&kind)?;
        if history.is_empty() {
            return None;
        }
        let ok = history.iter().filter(|s| **s).count() as f64;
        Some(ok / history.len() as f64)
    }

    /// Which override table applies. Failure beats load beats user activity.
    pub fn mode(&self) -> ContextMode {
        let signals = *self.signals.read().expect("context poisoned");
        if self.dependency_health() != DependencyHealth::Healthy {
            return ContextMode::ApiFailure;
        }
        if signals.load.is_elevated() {
            return ContextMode::HighLoad;
        }
        match signals.activity {
            ActivityLevel::High | ActivityLevel::Medium => ContextMode::UserActive,
            ActivityLevel::Inactive => ContextMode::UserInactive,
            ActivityLevel::Low => ContextMode::Normal,
        }
    }

    pub fn clear_histories(&self) {
        self.histories.clear();
        self.recent.write().expect("context poisoned").clear();
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        let success_rates = self
            .histories
            .iter()
            .filter_map(|e| self.success_rate(*e.key()).map(|r| (*e.key(), r)))
            .collect();
        ContextSnapshot {
            activity: self.activity(),
            system_load: self.system_load(),
            dependency_health: self.dependency_health(),
            mode: self.mode(),
            success_rates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_unknown_until_recorded() {
        let ctx = Context::new();
        assert_eq!(ctx.success_rate(WorkKind::Profile), None);
        ctx.record_outcome(WorkKind::Profile, true);
        ctx.record_outcome(WorkKind::Profile, false);
        assert_eq!(ctx.success_rate(WorkKind::Profile), Some(0.5));
    }

    #[test]
    fn history_is_capped() {
        let ctx = Context::with_history_cap(4);
        for _ in 0..4 {
            ctx.record_outcome(WorkKind::Search, false);
        }
        for _ in 0..4 {
            ctx.record_outcome(WorkKind::Search, true);
        }
        assert_eq!(ctx.success_rate(WorkKind::Search), Some(1.0));
    }

    #[test]
    fn failures_flip_mode_to_api_failure() {
        let ctx = Context::new();
        ctx.set_activity(ActivityLevel::High);
        assert_eq!(ctx.mode(), ContextMode::UserActive);
        for _ in 0..10 {
            ctx.record_outcome(WorkKind::Listing, false);
        }
        assert_eq!(ctx.dependency_health(), DependencyHealth::Failing);
        assert_eq!(ctx.mode(), ContextMode::ApiFailure);
    }

    #[test]
    fn health_override_wins() {
        let ctx = Context::new();
        for _ in 0..10 {
            ctx.record_outcome(WorkKind::Listing, false);
        }
        ctx.set_dependency_health(Some(DependencyHealth::Healthy));
        assert_eq!(ctx.dependency_health(), DependencyHealth::Healthy);
        ctx.set_dependency_health(None);
        assert_eq!(ctx.dependency_health(), DependencyHealth::Failing);
    }

    #[test]
    fn load_beats_activity() {
        let ctx = Context::new();
        ctx.set_activity(ActivityLevel::Inactive);
        ctx.set_system_load(SystemLoad::Critical);
        assert_eq!(ctx.mode(), ContextMode::HighLoad);
    }
}
