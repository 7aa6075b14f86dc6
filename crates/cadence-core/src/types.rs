use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The category of work a job or task performs against the target site.
///
/// Priority tables, cost estimates, cache TTLs and learned intervals are all
/// keyed by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkKind {
    /// Session capture / keep-alive. Cheap and latency-sensitive.
    Session,
    /// Individual profile pages.
    Profile,
    /// Listing / feed pages.
    Listing,
    /// Search result pages.
    Search,
    /// Inbox and conversation polling.
    Messages,
    /// Large multi-page crawls.
    BulkExtraction,
    /// Aggregation over already-collected data.
    Analytics,
    /// Housekeeping (dedup, pruning).
    Cleanup,
}

impl WorkKind {
    pub const ALL: [WorkKind; 8] = [
        WorkKind::Session,
        WorkKind::Profile,
        WorkKind::Listing,
        WorkKind::Search,
        WorkKind::Messages,
        WorkKind::BulkExtraction,
        WorkKind::Analytics,
        WorkKind::Cleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkKind::Session => "session",
            WorkKind::Profile => "profile",
            WorkKind::Listing => "listing",
            WorkKind::Search => "search",
            WorkKind::Messages => "messages",
            WorkKind::BulkExtraction => "bulk_extraction",
            WorkKind::Analytics => "analytics",
            WorkKind::Cleanup => "cleanup",
        }
    }

    /// Interactive kinds the user is waiting on.
    pub fn is_interactive(&self) -> bool {
        matches!(self, WorkKind::Session | WorkKind::Messages)
    }

    /// Heavy kinds best run while nobody is watching.
    pub fn is_bulk(&self) -> bool {
        matches!(
            self,
            WorkKind::BulkExtraction | WorkKind::Analytics | WorkKind::Cleanup
        )
    }
}

impl fmt::Display for WorkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "session" => Ok(WorkKind::Session),
            "profile" => Ok(WorkKind::Profile),
            "listing" => Ok(WorkKind::Listing),
            "search" => Ok(WorkKind::Search),
            "messages" => Ok(WorkKind::Messages),
            "bulk_extraction" => Ok(WorkKind::BulkExtraction),
            "analytics" => Ok(WorkKind::Analytics),
            "cleanup" => Ok(WorkKind::Cleanup),
            other => Err(format!("unknown work kind: {other}")),
        }
    }
}

/// Five-band priority scale shared by job classes, base tables and score reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Critical,
    High,
    Medium,
    Low,
    Background,
}

impl PriorityLevel {
    /// Numeric weight used as the `base` scoring factor.
    pub fn weight(&self) -> f64 {
        match self {
            PriorityLevel::Critical => 1.0,
            PriorityLevel::High => 0.8,
            PriorityLevel::Medium => 0.5,
            PriorityLevel::Low => 0.3,
            PriorityLevel::Background => 0.1,
        }
    }

    /// Map a raw score onto a band. Reporting only; ordering uses the raw score.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            PriorityLevel::Critical
        } else if score >= 0.7 {
            PriorityLevel::High
        } else if score >= 0.4 {
            PriorityLevel::Medium
        } else if score >= 0.2 {
            PriorityLevel::Low
        } else {
            PriorityLevel::Background
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::Critical => "critical",
            PriorityLevel::High => "high",
            PriorityLevel::Medium => "medium",
            PriorityLevel::Low => "low",
            PriorityLevel::Background => "background",
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(PriorityLevel::Critical),
            "high" => Ok(PriorityLevel::High),
            "medium" | "normal" => Ok(PriorityLevel::Medium),
            "low" => Ok(PriorityLevel::Low),
            "background" => Ok(PriorityLevel::Background),
            other => Err(format!("unknown priority level: {other}")),
        }
    }
}

/// Coarse classification of recent external activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Inactive,
    Low,
    Medium,
    High,
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActivityLevel::Inactive => "inactive",
            ActivityLevel::Low => "low",
            ActivityLevel::Medium => "medium",
            ActivityLevel::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemLoad {
    Low,
    Medium,
    High,
    Critical,
}

impl SystemLoad {
    pub fn is_elevated(&self) -> bool {
        matches!(self, SystemLoad::High | SystemLoad::Critical)
    }
}

impl fmt::Display for SystemLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SystemLoad::Low => "low",
            SystemLoad::Medium => "medium",
            SystemLoad::High => "high",
            SystemLoad::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Health of the external site as observed from request outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyHealth {
    Healthy,
    Degraded,
    Failing,
}

impl fmt::Display for DependencyHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyHealth::Healthy => "healthy",
            DependencyHealth::Degraded => "degraded",
            DependencyHealth::Failing => "failing",
        };
        f.write_str(s)
    }
}

/// Which base-priority override table applies right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    UserActive,
    UserInactive,
    HighLoad,
    ApiFailure,
    Normal,
}

/// Learned multiplier for every job of one kind.
///
/// Each job applies it to its own base interval, so jobs of the same kind
/// keep their relative cadence and an operator reschedule changes what gets
/// scaled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalScale {
    /// `activity multiplier × (1 − prediction reduction)`, unclamped.
    pub factor: f64,
    /// Upper clamp as a multiple of the base interval.
    pub max_multiplier: f64,
}

impl IntervalScale {
    pub fn new(factor: f64, max_multiplier: f64) -> Self {
        Self {
            factor,
            max_multiplier,
        }
    }

    /// No adjustment: every job runs at its base interval.
    pub fn identity() -> Self {
        Self::new(1.0, 1.0)
    }

    pub fn is_valid(&self) -> bool {
        self.factor.is_finite()
            && self.factor > 0.0
            && self.max_multiplier.is_finite()
            && self.max_multiplier > 0.0
    }

    /// `base × factor`, clamped to `[1, max(1, base × max_multiplier)]` minutes.
    pub fn apply(&self, base_minutes: f64) -> f64 {
        let upper = (base_minutes * self.max_multiplier).max(1.0);
        (base_minutes * self.factor).clamp(1.0, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_kind_parses_loose_spellings() {
        assert_eq!("Bulk-Extraction".parse::<WorkKind>().unwrap(), WorkKind::BulkExtraction);
        assert_eq!(" session ".parse::<WorkKind>().unwrap(), WorkKind::Session);
        assert!("scrape".parse::<WorkKind>().is_err());
    }

    #[test]
    fn work_kind_display_matches_serde() {
        for kind in WorkKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn score_bands() {
        assert_eq!(PriorityLevel::from_score(1.3), PriorityLevel::Critical);
        assert_eq!(PriorityLevel::from_score(0.9), PriorityLevel::Critical);
        assert_eq!(PriorityLevel::from_score(0.75), PriorityLevel::High);
        assert_eq!(PriorityLevel::from_score(0.4), PriorityLevel::Medium);
        assert_eq!(PriorityLevel::from_score(0.2), PriorityLevel::Low);
        assert_eq!(PriorityLevel::from_score(0.19), PriorityLevel::Background);
    }

    #[test]
    fn interval_scale_clamps_per_base() {
        let scale = IntervalScale::new(3.0, 4.0);
        assert_eq!(scale.apply(15.0), 45.0);
        assert_eq!(scale.apply(240.0), 720.0);
        let busy = IntervalScale::new(0.5, 4.0);
        assert_eq!(busy.apply(15.0), 7.5);
        assert_eq!(busy.apply(1.5), 1.0);
        assert_eq!(IntervalScale::new(9.0, 2.0).apply(10.0), 20.0);
        assert!(!IntervalScale::new(f64::NAN, 4.0).is_valid());
        assert!(!IntervalScale::new(0.0, 4.0).is_valid());
    }
}
