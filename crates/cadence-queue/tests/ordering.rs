// Dequeue order: highest aged score first, admission order among ties,
// and cache freshness folded into admission scores.

use std::sync::Arc;

use cadence_cache::{ResultCache, SetOptions};
use cadence_core::{
    config::{CacheConfig, QueueConfig},
    ActivityLevel, Context, ManualClock, WorkKind,
};
use cadence_queue::{PriorityQueue, TaskResult, TaskSpec};
use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::json;

const KINDS: [WorkKind; 8] = [
    WorkKind::Session,
    WorkKind::Profile,
    WorkKind::Listing,
    WorkKind::Search,
    WorkKind::Messages,
    WorkKind::BulkExtraction,
    WorkKind::Analytics,
    WorkKind::Cleanup,
];

fn random_spec(rng: &mut impl Rng) -> TaskSpec {
    let mut spec = TaskSpec::new(KINDS[rng.random_range(0..KINDS.len())]);
    match rng.random_range(0..5) {
        0 => spec = spec.urgent(),
        1 => spec = spec.user_triggered(),
        2 => spec = spec.with_retries(rng.random_range(1..4)),
        _ => {}
    }
    spec
}

#[test]
fn dequeue_always_returns_current_maximum() {
    let clock = ManualClock::new(Utc::now());
    let queue = PriorityQueue::new(QueueConfig::default(), Context::new(), None, clock.clone());
    let mut rng = rand::rng();

    for round in 0..200 {
        for _ in 0..rng.random_range(0..4) {
            queue.enqueue(random_spec(&mut rng)).unwrap();
        }
        clock.advance(Duration::seconds(rng.random_range(0..90)));
        if round % 2 == 0 {
            continue;
        }

        let Some(served) = queue.dequeue() else {
            continue;
        };
        // `dequeue` aged and re-sorted everything; what remains is the order
        // it chose from.
        for rest in queue.pending() {
            assert!(
                served.score > rest.score
                    || (served.score == rest.score && served.seq < rest.seq),
                "served {} (seq {}) while {} (seq {}) was waiting",
                served.score,
                served.seq,
                rest.score,
                rest.seq
            );
        }
    }
}

#[test]
fn ties_resolve_in_admission_order() {
    let clock = ManualClock::new(Utc::now());
    let queue = PriorityQueue::new(QueueConfig::default(), Context::new(), None, clock.clone());

    let ids: Vec<String> = (0..10)
        .map(|_| queue.enqueue(TaskSpec::new(WorkKind::Profile)).unwrap().id)
        .collect();
    // Aging the whole batch together keeps them tied.
    clock.advance(Duration::minutes(3));
    let served: Vec<String> = std::iter::from_fn(|| queue.dequeue().map(|t| t.id)).collect();
    assert_eq!(served, ids);
}

#[test]
fn aged_score_never_decreases_and_is_bounded() {
    let clock = ManualClock::new(Utc::now());
    let config = QueueConfig {
        max_aging_bonus: 0.3,
        ..QueueConfig::default()
    };
    let queue = PriorityQueue::new(config, Context::new(), None, clock.clone());
    let waiting = queue.enqueue(TaskSpec::new(WorkKind::Cleanup)).unwrap();

    let mut previous = waiting.score;
    for _ in 0..30 {
        clock.advance(Duration::seconds(45));
        // Empty dequeues never happen: a fresh critical task always outranks.
        queue
            .enqueue(TaskSpec::new(WorkKind::Session).critical().urgent())
            .unwrap();
        let served = queue.dequeue().unwrap();
        if served.id == waiting.id {
            break;
        }
        queue
            .complete_task(&served.id, TaskResult::ok(json!({})))
            .unwrap();
        let current = queue
            .pending()
            .into_iter()
            .find(|t| t.id == waiting.id)
            .unwrap();
        assert!(current.score >= previous);
        assert!(current.score - waiting.base_score <= 0.3 + 1e-9);
        previous = current.score;
    }
}

#[test]
fn user_active_session_outranks_cleanup() {
    let clock = ManualClock::new(Utc::now());
    let ctx = Context::new();
    ctx.set_activity(ActivityLevel::High);
    let queue = PriorityQueue::new(QueueConfig::default(), ctx, None, clock);

    let b = queue.enqueue(TaskSpec::new(WorkKind::Cleanup)).unwrap();
    let a = queue
        .enqueue(TaskSpec::new(WorkKind::Session).user_triggered())
        .unwrap();
    assert!(a.score > b.score);
    assert_eq!(queue.dequeue().unwrap().id, a.id);
    assert_eq!(queue.dequeue().unwrap().id, b.id);
}

#[test]
fn stale_cache_lowers_admission_score() {
    let clock = ManualClock::new(Utc::now());
    let cache = Arc::new(ResultCache::new(CacheConfig::default(), clock.clone()));
    cache
        .set("u-fresh", "session", &json!({"ok": true}), SetOptions::default())
        .unwrap();
    clock.advance(Duration::hours(3));
    cache
        .set("u-recent", "session", &json!({"ok": true}), SetOptions::default())
        .unwrap();

    let queue = PriorityQueue::new(
        QueueConfig::default(),
        Context::new(),
        Some(cache),
        clock.clone(),
    );
    let uncached = queue
        .enqueue(TaskSpec::new(WorkKind::Session).with_target("u-none"))
        .unwrap();
    let recent = queue
        .enqueue(TaskSpec::new(WorkKind::Session).with_target("u-recent"))
        .unwrap();
    let stale = queue
        .enqueue(TaskSpec::new(WorkKind::Session).with_target("u-fresh"))
        .unwrap();

    assert_eq!(uncached.breakdown.freshness, 1.2);
    assert_eq!(recent.breakdown.freshness, 1.0);
    assert_eq!(stale.breakdown.freshness, 0.6);
    assert!(uncached.score > recent.score && recent.score > stale.score);
}
