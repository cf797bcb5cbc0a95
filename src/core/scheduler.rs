//! Admission-controlled job scheduler.
//!
//! [`RpcScheduler`] runs async operations under a hard ceiling on in-flight jobs.
//! Submission never blocks: a job either reserves an in-flight slot and is queued
//! for the worker pool, or the caller gets a [`Saturated`] signal back and the
//! operation is never started.
//!
//! Capacity is tracked with a lock-free `AtomicUsize` reserved through a CAS loop.
//! A slot is held from admission until the job's outcome is produced; it is
//! released by an RAII guard so a panicking or dropped job cannot leak capacity.
//! Workers pull jobs in FIFO order from a single admission channel.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, error, info, warn};

use super::error::SchedulerError;
use super::job::{
    JobFailure, JobId, JobStatus, Outcome, SaturationReason, Saturated, StatusCell,
    SubmissionResult, Token,
};
use super::stats::{SchedulerCounters, SchedulerStats};

/// Abstraction for spawning worker loops on a runtime.
pub trait Spawn: Send + Sync + 'static {
    /// Spawn a detached future.
    fn spawn(&self, fut: BoxFuture<'static, ()>);
}

/// Limits enforced by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerLimits {
    /// Maximum admitted-but-unfinished jobs.
    pub capacity: usize,
    /// Number of workers pulling from the admission queue.
    pub worker_count: usize,
}

impl SchedulerLimits {
    /// Limits with one worker per in-flight slot.
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            worker_count: capacity,
        }
    }
}

/// Type-erased job: invoked by a worker, produces the job's side effects.
type ErasedJob = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

struct QueuedJob {
    id: JobId,
    run: ErasedJob,
}

/// Holds one in-flight slot; releases it on drop.
struct InFlightSlot {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Bounded-concurrency scheduler for async operations.
///
/// Pass it by reference to every consumer; there is no global instance.
pub struct RpcScheduler {
    limits: SchedulerLimits,
    in_flight: Arc<AtomicUsize>,
    counters: Arc<SchedulerCounters>,
    /// Admission sender. `None` once stopped.
    admission_tx: Mutex<Option<mpsc::Sender<QueuedJob>>>,
    /// Shared by all workers; the tokio mutex hands jobs out in FIFO order.
    admission_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<QueuedJob>>>,
    next_id: AtomicU64,
    started: AtomicBool,
    live_workers: Arc<AtomicUsize>,
    workers_exited: Arc<Notify>,
    spawner: Arc<dyn Spawn>,
}

impl RpcScheduler {
    /// Create a scheduler. Workers are not running until [`RpcScheduler::start`].
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidConfig` when capacity or worker count is zero.
    pub fn new(limits: SchedulerLimits, spawner: Arc<dyn Spawn>) -> Result<Self, SchedulerError> {
        if limits.capacity == 0 {
            return Err(SchedulerError::InvalidConfig(
                "capacity must be greater than 0".into(),
            ));
        }
        if limits.worker_count == 0 {
            return Err(SchedulerError::InvalidConfig(
                "worker_count must be greater than 0".into(),
            ));
        }

        // The queue can never hold more than `capacity` jobs: every queued job owns a slot.
        let (tx, rx) = mpsc::channel(limits.capacity);
        Ok(Self {
            limits,
            in_flight: Arc::new(AtomicUsize::new(0)),
            counters: Arc::new(SchedulerCounters::default()),
            admission_tx: Mutex::new(Some(tx)),
            admission_rx: Arc::new(tokio::sync::Mutex::new(rx)),
            next_id: AtomicU64::new(0),
            started: AtomicBool::new(false),
            live_workers: Arc::new(AtomicUsize::new(0)),
            workers_exited: Arc::new(Notify::new()),
            spawner,
        })
    }

    /// Configured limits.
    pub const fn limits(&self) -> SchedulerLimits {
        self.limits
    }

    /// Number of admitted jobs that have not produced an outcome yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// True while the scheduler accepts submissions.
    pub fn is_accepting(&self) -> bool {
        self.admission_tx.lock().is_some()
    }

    /// Utilization snapshot.
    pub fn stats(&self) -> SchedulerStats {
        self.counters.snapshot(self.limits.capacity, &self.in_flight)
    }

    /// Try to reserve an in-flight slot using a CAS loop.
    fn try_reserve_slot(&self) -> Result<InFlightSlot, usize> {
        let mut current = self.in_flight.load(Ordering::Acquire);
        loop {
            if current >= self.limits.capacity {
                return Err(current);
            }
            match self.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Ok(InFlightSlot {
                        in_flight: Arc::clone(&self.in_flight),
                    })
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn saturated(&self, in_flight: usize, reason: SaturationReason) -> Saturated {
        self.counters.saturated.fetch_add(1, Ordering::Relaxed);
        Saturated {
            capacity: self.limits.capacity,
            in_flight,
            reason,
        }
    }

    /// Submit an operation.
    ///
    /// Returns a [`Token`] when an in-flight slot was free, otherwise
    /// [`SubmissionResult::Saturated`] without invoking `operation`.
    pub fn schedule<T, F, Fut>(&self, operation: F) -> SubmissionResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        let guard = self.admission_tx.lock();
        let Some(tx) = guard.as_ref() else {
            debug!("submission refused: scheduler stopped");
            return SubmissionResult::Saturated(self.saturated(self.in_flight(), SaturationReason::Stopped));
        };

        let slot = match self.try_reserve_slot() {
            Ok(slot) => slot,
            Err(in_flight) => {
                warn!(
                    capacity = self.limits.capacity,
                    in_flight = in_flight,
                    "scheduler saturated, submission refused"
                );
                return SubmissionResult::Saturated(
                    self.saturated(in_flight, SaturationReason::AtCapacity),
                );
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let status = Arc::new(StatusCell::new());
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let run = erase_job(id, operation, slot, Arc::clone(&status), outcome_tx, Arc::clone(&self.counters));

        match tx.try_send(QueuedJob { id, run }) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                debug!(job_id = id, "job admitted");
                SubmissionResult::Token(Token::new(id, status, outcome_rx))
            }
            Err(err) => {
                // Dropping the rejected job releases its slot.
                let reason = match err {
                    mpsc::error::TrySendError::Full(_) => SaturationReason::AtCapacity,
                    mpsc::error::TrySendError::Closed(_) => SaturationReason::Stopped,
                };
                drop(err);
                warn!(job_id = id, %reason, "admission queue refused job");
                SubmissionResult::Saturated(self.saturated(self.in_flight(), reason))
            }
        }
    }

    /// Start the worker pool. Calling it again is a no-op.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }
        for worker_id in 0..self.limits.worker_count {
            self.live_workers.fetch_add(1, Ordering::AcqRel);
            self.spawner.spawn(
                worker_loop(
                    worker_id,
                    Arc::clone(&self.admission_rx),
                    Arc::clone(&self.live_workers),
                    Arc::clone(&self.workers_exited),
                )
                .boxed(),
            );
        }
        info!(
            capacity = self.limits.capacity,
            worker_count = self.limits.worker_count,
            "scheduler started"
        );
    }

    /// Stop admitting jobs.
    ///
    /// Jobs already admitted keep running and their tokens still resolve. Workers
    /// exit once the admission queue is drained. If the scheduler was never started,
    /// queued jobs are dropped and their tokens resolve as abandoned failures.
    pub fn stop(&self) {
        let Some(tx) = self.admission_tx.lock().take() else {
            return;
        };
        drop(tx);

        if !self.started.load(Ordering::Acquire) {
            if let Ok(mut rx) = self.admission_rx.try_lock() {
                let mut dropped = 0usize;
                while let Ok(job) = rx.try_recv() {
                    debug!(job_id = job.id, "dropping job queued on a never-started scheduler");
                    drop(job);
                    dropped += 1;
                }
                if dropped > 0 {
                    warn!(dropped = dropped, "scheduler stopped before start; queued jobs abandoned");
                }
            }
        }
        info!(in_flight = self.in_flight(), "scheduler stopped admitting jobs");
    }

    /// Wait until every worker has exited. Returns immediately if none are running.
    pub async fn join(&self) {
        loop {
            let notified = self.workers_exited.notified();
            if self.live_workers.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for RpcScheduler {
    fn drop(&mut self) {
        // Closing the sender lets idle workers exit; in-flight work is not interrupted.
        if self.admission_tx.get_mut().take().is_some() {
            debug!("scheduler dropped without explicit stop");
        }
    }
}

/// Wrap an operation so a worker can run it without knowing its output type.
fn erase_job<T, F, Fut>(
    id: JobId,
    operation: F,
    slot: InFlightSlot,
    status: Arc<StatusCell>,
    outcome_tx: oneshot::Sender<Outcome<T>>,
    counters: Arc<SchedulerCounters>,
) -> ErasedJob
where
    T: Send + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Outcome<T>> + Send + 'static,
{
    Box::new(move || {
        async move {
            status.set(JobStatus::Running);
            counters.running.fetch_add(1, Ordering::Relaxed);

            let outcome = match AssertUnwindSafe(async move { operation().await })
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!(job_id = id, "job panicked");
                    Outcome::Failure(JobFailure::panicked(id))
                }
            };

            counters.running.fetch_sub(1, Ordering::Relaxed);
            if outcome.is_success() {
                counters.completed.fetch_add(1, Ordering::Relaxed);
                status.set(JobStatus::Completed);
            } else {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                status.set(JobStatus::Failed);
            }

            // Free the slot before the submitter can observe the outcome.
            drop(slot);
            if outcome_tx.send(outcome).is_err() {
                debug!(job_id = id, "token dropped before outcome delivery");
            }
        }
        .boxed()
    })
}

async fn worker_loop(
    worker_id: usize,
    admission_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<QueuedJob>>>,
    live_workers: Arc<AtomicUsize>,
    workers_exited: Arc<Notify>,
) {
    debug!(worker_id = worker_id, "worker started");
    loop {
        let next = {
            let mut rx = admission_rx.lock().await;
            rx.recv().await
        };
        let Some(job) = next else {
            debug!(worker_id = worker_id, "admission queue closed, worker exiting");
            break;
        };
        debug!(worker_id = worker_id, job_id = job.id, "worker executing job");
        (job.run)().await;
    }
    live_workers.fetch_sub(1, Ordering::AcqRel);
    workers_exited.notify_waiters();
}
