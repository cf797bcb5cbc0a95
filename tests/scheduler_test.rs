//! Integration tests for admission control on the job scheduler.
//!
//! Validates:
//! 1. Submissions past capacity are refused with `Saturated`, never queued
//! 2. The in-flight ceiling holds under concurrent submitters
//! 3. Jobs start in admission order
//! 4. Stop closes admission but lets admitted jobs finish

use payout_scheduler::core::{
    JobStatus, Outcome, RpcScheduler, SaturationReason, SchedulerLimits, Spawn, SubmissionResult,
};
use payout_scheduler::runtime::TokioSpawner;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};

fn scheduler(limits: SchedulerLimits) -> RpcScheduler {
    let spawner: Arc<dyn Spawn> = Arc::new(TokioSpawner::current().unwrap());
    RpcScheduler::new(limits, spawner).unwrap()
}

/// Operation that completes once the gate hands out a permit.
fn gated(gate: &Arc<Semaphore>) -> impl FnOnce() -> futures::future::BoxFuture<'static, Outcome<()>> + Send + 'static {
    let gate = Arc::clone(gate);
    move || {
        Box::pin(async move {
            let _permit = gate.acquire().await;
            Outcome::Success(())
        })
    }
}

#[tokio::test]
async fn test_third_submission_saturated_at_capacity_two() {
    let sched = scheduler(SchedulerLimits::with_capacity(2));
    sched.start();
    let gate = Arc::new(Semaphore::new(0));

    let first = sched.schedule(gated(&gate));
    let second = sched.schedule(gated(&gate));
    let third = sched.schedule(gated(&gate));

    assert!(!first.is_saturated());
    assert!(!second.is_saturated());
    match third {
        SubmissionResult::Saturated(s) => {
            assert_eq!(s.reason, SaturationReason::AtCapacity);
            assert_eq!(s.capacity, 2);
            assert_eq!(s.in_flight, 2);
        }
        SubmissionResult::Token(_) => panic!("third submission must be refused"),
    }

    gate.add_permits(2);
    assert!(first.into_result().unwrap().await.is_success());
    assert!(second.into_result().unwrap().await.is_success());
    assert_eq!(sched.in_flight(), 0);
    assert_eq!(sched.stats().saturated, 1);
}

#[tokio::test]
async fn test_saturation_before_start_counts_queued_jobs() {
    let sched = scheduler(SchedulerLimits::with_capacity(1));
    let queued = sched.schedule(|| async { Outcome::Success(1u8) });
    assert!(sched.schedule(|| async { Outcome::Success(2u8) }).is_saturated());

    sched.start();
    assert_eq!(queued.into_result().unwrap().await, Outcome::Success(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_capacity_plus_one_concurrent_submitters() {
    let capacity = 5;
    let sched = Arc::new(scheduler(SchedulerLimits::with_capacity(capacity)));
    sched.start();
    let gate = Arc::new(Semaphore::new(0));

    let mut submitters = Vec::new();
    for _ in 0..=capacity {
        let sched = Arc::clone(&sched);
        let op = gated(&gate);
        submitters.push(tokio::spawn(async move { sched.schedule(op) }));
    }

    let mut tokens = Vec::new();
    let mut saturated = 0;
    for handle in submitters {
        match handle.await.unwrap() {
            SubmissionResult::Token(token) => tokens.push(token),
            SubmissionResult::Saturated(_) => saturated += 1,
        }
    }
    assert_eq!(saturated, 1);
    assert_eq!(tokens.len(), capacity);

    gate.add_permits(capacity);
    for token in tokens {
        assert!(token.await.is_success());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_flight_never_exceeds_capacity() {
    let capacity = 3;
    let sched = Arc::new(scheduler(SchedulerLimits::with_capacity(capacity)));
    sched.start();
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut tokens = Vec::new();
    let mut submitted = 0;
    while submitted < 40 {
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        let result = sched.schedule(move || async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            running.fetch_sub(1, Ordering::SeqCst);
            Outcome::Success(())
        });
        match result {
            SubmissionResult::Token(token) => {
                tokens.push(token);
                submitted += 1;
                assert!(sched.in_flight() <= capacity);
            }
            SubmissionResult::Saturated(_) => tokio::time::sleep(Duration::from_millis(1)).await,
        }
    }
    for token in tokens {
        assert!(token.await.is_success());
    }
    assert!(peak.load(Ordering::SeqCst) <= capacity);
    assert_eq!(sched.stats().completed, 40);
}

#[tokio::test]
async fn test_jobs_start_in_admission_order() {
    let sched = scheduler(SchedulerLimits {
        capacity: 8,
        worker_count: 1,
    });
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut tokens = Vec::new();
    for i in 0..8u32 {
        let order = Arc::clone(&order);
        let token = sched
            .schedule(move || async move {
                order.lock().await.push(i);
                Outcome::Success(i)
            })
            .into_result()
            .unwrap();
        tokens.push(token);
    }
    sched.start();
    for token in tokens {
        let _ = token.await;
    }
    assert_eq!(*order.lock().await, (0..8).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_stop_lets_admitted_jobs_finish() {
    let sched = scheduler(SchedulerLimits::with_capacity(2));
    sched.start();
    let gate = Arc::new(Semaphore::new(0));

    let token = sched.schedule(gated(&gate)).into_result().unwrap();
    sched.stop();
    assert!(!sched.is_accepting());

    match sched.schedule(|| async { Outcome::Success(()) }) {
        SubmissionResult::Saturated(s) => assert_eq!(s.reason, SaturationReason::Stopped),
        SubmissionResult::Token(_) => panic!("stopped scheduler admitted a job"),
    }

    gate.add_permits(1);
    assert!(token.await.is_success());
    tokio::time::timeout(Duration::from_secs(2), sched.join())
        .await
        .expect("workers exit after the queue drains");
}

#[tokio::test]
async fn test_token_reports_status() {
    let sched = scheduler(SchedulerLimits::with_capacity(1));
    let gate = Arc::new(Semaphore::new(0));
    let token = sched.schedule(gated(&gate)).into_result().unwrap();
    assert_eq!(token.status(), JobStatus::Submitted);

    sched.start();
    for _ in 0..100 {
        if token.status() == JobStatus::Running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(token.status(), JobStatus::Running);

    gate.add_permits(1);
    assert!(token.await.is_success());
}
