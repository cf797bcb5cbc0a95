//! Benchmarks for the payout scheduler.
//!
//! Benchmarks cover:
//! - Admission and completion throughput of `RpcScheduler`
//! - The refusal path when the scheduler is saturated
//! - End-to-end batch distribution against the in-memory chain

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;

use payout_scheduler::chain::{Address, Asset, InMemoryChain};
use payout_scheduler::core::{Outcome, RpcScheduler, SchedulerLimits, Spawn};
use payout_scheduler::distribution::{BatchDistributor, DistributionPlan, RecipientMap};
use payout_scheduler::infra::InMemoryLedgerStore;
use payout_scheduler::runtime::TokioSpawner;

use tokio::runtime::Runtime;
use tokio::sync::Semaphore;

// ============================================================================
// Helper Functions
// ============================================================================

fn started_scheduler(capacity: usize) -> RpcScheduler {
    let spawner: Arc<dyn Spawn> = Arc::new(TokioSpawner::current().unwrap());
    let scheduler = RpcScheduler::new(SchedulerLimits::with_capacity(capacity), spawner).unwrap();
    scheduler.start();
    scheduler
}

fn recipients(count: u64) -> RecipientMap {
    RecipientMap::from_pairs((0..count).map(|i| (format!("holder-{i}").parse::<Address>().unwrap(), i + 1)))
        .unwrap()
}

// ============================================================================
// Scheduler Benchmarks
// ============================================================================

fn bench_schedule_and_await(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedule_and_await");

    for size in [10u64, 100, 1_000] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.to_async(Runtime::new().unwrap()).iter(|| async move {
                let scheduler = started_scheduler(size as usize);
                let mut tokens = Vec::with_capacity(size as usize);
                for i in 0..size {
                    let token = scheduler
                        .schedule(move || async move { Outcome::Success(i) })
                        .into_result()
                        .unwrap();
                    tokens.push(token);
                }
                for token in tokens {
                    black_box(token.await);
                }
            });
        });
    }
    group.finish();
}

fn bench_saturated_refusal(c: &mut Criterion) {
    c.bench_function("saturated_refusal", |b| {
        b.to_async(Runtime::new().unwrap()).iter(|| async {
            let scheduler = started_scheduler(1);
            let gate = Arc::new(Semaphore::new(0));
            let held = Arc::clone(&gate);
            let blocker = scheduler
                .schedule(move || async move {
                    let _permit = held.acquire().await;
                    Outcome::Success(())
                })
                .into_result()
                .unwrap();

            for _ in 0..100 {
                black_box(scheduler.schedule(|| async { Outcome::Success(()) }).is_saturated());
            }
            gate.add_permits(1);
            black_box(blocker.await);
        });
    });
}

// ============================================================================
// Distribution Benchmarks
// ============================================================================

fn bench_distribution_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("distribution_run");

    for size in [10u64, 100, 500] {
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.to_async(Runtime::new().unwrap()).iter(|| async move {
                let scheduler = started_scheduler(8);
                let payer: Address = "payer".parse().unwrap();
                let chain = Arc::new(InMemoryChain::new(0));
                chain.set_balance(&payer, u64::MAX / 2);
                let store = InMemoryLedgerStore::new();

                let plan = DistributionPlan::new("bench", payer, Asset::Native, recipients(size));
                let report = BatchDistributor::new(&scheduler, chain, &store).run(&plan).await;
                black_box(report.sent_amount);
            });
        });
    }
    group.finish();
}

// ============================================================================
// Benchmark Groups
// ============================================================================

criterion_group!(scheduler_benches, bench_schedule_and_await, bench_saturated_refusal);

criterion_group!(distribution_benches, bench_distribution_run);

criterion_main!(scheduler_benches, distribution_benches);
