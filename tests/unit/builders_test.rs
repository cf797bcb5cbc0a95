//! Tests for builder modules

use payout_scheduler::builders::{build_scheduler, start_scheduler};
use payout_scheduler::config::SchedulerConfig;
use payout_scheduler::core::{Outcome, SchedulerError, Spawn};
use payout_scheduler::runtime::TokioSpawner;
use std::sync::Arc;

#[tokio::test]
async fn test_build_scheduler_is_stopped_until_started() {
    let spawner: Arc<dyn Spawn> = Arc::new(TokioSpawner::current().unwrap());
    let cfg = SchedulerConfig {
        capacity: 5,
        worker_count: Some(2),
    };
    let scheduler = build_scheduler(&cfg, spawner).unwrap();
    assert_eq!(scheduler.limits().capacity, 5);
    assert_eq!(scheduler.limits().worker_count, 2);

    let token = scheduler
        .schedule(|| async { Outcome::Success("queued") })
        .into_result()
        .unwrap();
    scheduler.start();
    assert_eq!(token.await, Outcome::Success("queued"));
}

#[tokio::test]
async fn test_build_scheduler_rejects_zero_capacity() {
    let spawner: Arc<dyn Spawn> = Arc::new(TokioSpawner::current().unwrap());
    let result = build_scheduler(&SchedulerConfig::with_capacity(0), spawner);
    assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
}

#[test]
fn test_start_scheduler_outside_runtime() {
    let result = start_scheduler(&SchedulerConfig::with_capacity(1));
    assert!(matches!(result, Err(SchedulerError::Runtime(_))));
}
