use std::collections::HashMap;

use cadence_core::{ActivityLevel, IntervalScale, WorkKind};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// One observed activity signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDataPoint {
    pub timestamp: DateTime<Utc>,
    /// Hour of day, 0..=23 (UTC).
    pub hour: u32,
    /// Day of week, 0 = Monday … 6 = Sunday.
    pub day: u32,
    pub activity: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ActivityDataPoint {
    pub fn new(activity: impl Into<String>, timestamp: DateTime<Utc>, payload: serde_json::Value) -> Self {
        Self {
            timestamp,
            hour: timestamp.hour(),
            day: timestamp.weekday().num_days_from_monday(),
            activity: activity.into(),
            payload,
        }
    }
}

/// An hour whose success rate stands out for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptimalHour {
    pub hour: u32,
    pub success_rate: f64,
    pub samples: usize,
    /// `success_rate × min(1, samples / full_confidence_samples)`
    pub confidence: f64,
}

/// A new scale every job of `kind` should adopt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntervalChange {
    pub kind: WorkKind,
    pub previous_factor: f64,
    pub scale: IntervalScale,
    /// The kind's reference interval and what the new scale makes of it.
    pub base_minutes: f64,
    pub minutes: f64,
    pub activity: ActivityLevel,
    /// Fraction cut by hourly predictions, 0 when none applied.
    pub prediction_reduction: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEntry {
    pub kind: WorkKind,
    pub base_minutes: f64,
    pub factor: f64,
    pub current_minutes: f64,
    /// What the current activity and predictions would set right now.
    pub target_minutes: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdaptiveStats {
    pub is_learning: bool,
    pub activity_level: ActivityLevel,
    pub total_points: u64,
    pub history_len: usize,
    pub points_required: u64,
    /// `min(1, total_points / points_required)`
    pub learning_progress: f64,
    pub pattern_confidence: f64,
    pub outcomes_recorded: usize,
    pub kinds_tracked: usize,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityPatterns {
    pub hourly: Vec<f64>,
    pub daily: Vec<f64>,
    /// Hours whose bucket is above the hourly mean, busiest first.
    pub peak_hours: Vec<u32>,
    pub peak_days: Vec<u32>,
    pub confidence: f64,
}

/// Everything the learner needs to resume after a restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnerSnapshot {
    pub hourly: Vec<f64>,
    pub daily: Vec<f64>,
    pub history: Vec<ActivityDataPoint>,
    /// Per kind, 24 hourly outcome windows.
    pub outcomes: HashMap<WorkKind, Vec<Vec<bool>>>,
    pub base_intervals: HashMap<WorkKind, f64>,
    #[serde(default)]
    pub current_scales: HashMap<WorkKind, IntervalScale>,
    pub total_points: u64,
    pub is_learning: bool,
    pub pattern_confidence: f64,
    pub saved_at: Option<DateTime<Utc>>,
}
