use cadence_core::{config::SchedulerConfig, PriorityLevel};
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use rand::Rng;

/// Shortest interval any fire may use, in minutes.
pub const MIN_INTERVAL_MINUTES: f64 = 1.0;

/// `nominal × (1 ± fraction)`, never below one minute.
pub fn jittered_interval(nominal_minutes: f64, fraction: f64, rng: &mut impl Rng) -> Duration {
    let factor = if fraction > 0.0 {
        1.0 + rng.random_range(-fraction..=fraction)
    } else {
        1.0
    };
    let minutes = (nominal_minutes * factor).max(MIN_INTERVAL_MINUTES);
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

/// Delay before the first fire after (re-)arming; higher priority fires sooner.
pub fn initial_offset(level: PriorityLevel, config: &SchedulerConfig) -> Duration {
    Duration::seconds(config.initial_offsets.for_level(level) as i64)
}

/// Hours-of-day and days-of-week during which fires are allowed.
#[derive(Debug, Clone)]
pub struct ActiveWindow {
    start_hour: u32,
    end_hour: u32,
    days: Vec<u32>,
}

impl ActiveWindow {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            start_hour: config.active_hours_start as u32,
            end_hour: config.active_hours_end as u32,
            days: config.active_days.iter().map(|d| *d as u32).collect(),
        }
    }

    /// `start > end` wraps midnight (22..6 allows 22:00 through 05:59).
    /// `start == end` allows every hour.
    pub fn allows(&self, at: DateTime<Utc>) -> bool {
        let hour = at.hour();
        let in_hours = if self.start_hour < self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else if self.start_hour > self.end_hour {
            hour >= self.start_hour || hour < self.end_hour
        } else {
            true
        };
        in_hours && self.days.contains(&at.weekday().num_days_from_monday())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn jitter_stays_within_fraction() {
        let mut rng = rand::rng();
        for _ in 0..500 {
            let d = jittered_interval(15.0, 0.2, &mut rng);
            let mins = d.num_milliseconds() as f64 / 60_000.0;
            assert!((12.0..=18.0).contains(&mins), "{mins}");
        }
    }

    #[test]
    fn jitter_never_goes_below_one_minute() {
        let mut rng = rand::rng();
        for _ in 0..100 {
            let d = jittered_interval(0.5, 0.2, &mut rng);
            assert!(d >= Duration::minutes(1));
        }
    }

    #[test]
    fn zero_jitter_is_exact() {
        let d = jittered_interval(10.0, 0.0, &mut rand::rng());
        assert_eq!(d, Duration::minutes(10));
    }

    #[test]
    fn offsets_shrink_with_priority() {
        let config = SchedulerConfig::default();
        assert!(
            initial_offset(PriorityLevel::Critical, &config)
                < initial_offset(PriorityLevel::Background, &config)
        );
    }

    #[test]
    fn window_hours_and_days() {
        let config = SchedulerConfig {
            active_hours_start: 8,
            active_hours_end: 20,
            active_days: vec![0, 1, 2, 3, 4],
            ..SchedulerConfig::default()
        };
        let w = ActiveWindow::from_config(&config);
        // 2024-01-01 is a Monday.
        let monday_noon = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let monday_night = Utc.with_ymd_and_hms(2024, 1, 1, 21, 0, 0).unwrap();
        let saturday_noon = Utc.with_ymd_and_hms(2024, 1, 6, 12, 0, 0).unwrap();
        assert!(w.allows(monday_noon));
        assert!(!w.allows(monday_night));
        assert!(!w.allows(saturday_noon));
    }

    #[test]
    fn window_wraps_midnight() {
        let config = SchedulerConfig {
            active_hours_start: 22,
            active_hours_end: 6,
            ..SchedulerConfig::default()
        };
        let w = ActiveWindow::from_config(&config);
        assert!(w.allows(Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap()));
        assert!(w.allows(Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap()));
        assert!(!w.allows(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()));
    }
}
