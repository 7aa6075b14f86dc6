// Adjusted intervals stay inside [1, base × max multiplier] whatever the
// activity level and hourly predictions.

use cadence_core::{config::LearnerConfig, ManualClock, WorkKind};
use cadence_learner::AdaptiveLearner;
use chrono::{Duration, Utc};
use rand::Rng;

#[test]
fn adjusted_interval_stays_in_bounds() {
    let mut rng = rand::rng();
    for _ in 0..50 {
        let clock = ManualClock::new(Utc::now());
        let config = LearnerConfig {
            max_adjustment_multiplier: rng.random_range(1.0..6.0),
            max_prediction_reduction: rng.random_range(0.0..0.9),
            ..LearnerConfig::default()
        };
        let max_mult = config.max_adjustment_multiplier;
        let learner = AdaptiveLearner::new(config, clock.clone());

        let base: f64 = rng.random_range(0.2..240.0);
        learner.register_base_interval(WorkKind::Profile, base).unwrap();

        for _ in 0..rng.random_range(0..30) {
            learner.record_activity("nav", serde_json::Value::Null);
        }
        for _ in 0..rng.random_range(0..200) {
            let hour = rng.random_range(0..24);
            learner
                .record_extraction_result(WorkKind::Profile, rng.random_bool(0.7), Some(hour))
                .unwrap();
        }
        clock.advance(Duration::minutes(rng.random_range(0..90)));

        let target = learner.target_interval(WorkKind::Profile).unwrap();
        let upper = (base * max_mult).max(1.0);
        assert!(target >= 1.0, "{target} below 1");
        assert!(target <= upper + 1e-9, "{target} above {upper}");

        for change in learner.adapt_intervals() {
            assert!(change.minutes >= 1.0 && change.minutes <= upper + 1e-9);
        }
    }
}

#[test]
fn busy_user_shortens_interval() {
    let clock = ManualClock::new(Utc::now());
    let learner = AdaptiveLearner::new(LearnerConfig::default(), clock.clone());
    learner.register_base_interval(WorkKind::Session, 30.0).unwrap();
    for _ in 0..12 {
        learner.record_activity("tab_switch", serde_json::Value::Null);
        clock.advance(Duration::minutes(2));
    }
    let changes = learner.adapt_intervals();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].minutes, 15.0);
}
