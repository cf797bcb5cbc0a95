//! Scheduler utilization counters.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Snapshot of scheduler utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SchedulerStats {
    /// Maximum in-flight jobs.
    pub capacity: usize,
    /// Admitted jobs that have not completed (queued or running).
    pub in_flight: usize,
    /// Jobs currently executing on a worker.
    pub running: u64,
    /// Total jobs admitted.
    pub submitted: u64,
    /// Total jobs that finished with a success outcome.
    pub completed: u64,
    /// Total jobs that finished with a failure outcome.
    pub failed: u64,
    /// Total submissions refused with a saturation signal.
    pub saturated: u64,
}

/// Internal counters (lock-free atomics).
#[derive(Debug, Default)]
pub(crate) struct SchedulerCounters {
    pub running: AtomicU64,
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub saturated: AtomicU64,
}

impl SchedulerCounters {
    pub fn snapshot(&self, capacity: usize, in_flight: &AtomicUsize) -> SchedulerStats {
        SchedulerStats {
            capacity,
            in_flight: in_flight.load(Ordering::Acquire),
            running: self.running.load(Ordering::Relaxed),
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            saturated: self.saturated.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_default() {
        let stats = SchedulerStats::default();
        assert_eq!(stats.capacity, 0);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.completed, 0);
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = SchedulerCounters::default();
        counters.submitted.fetch_add(10, Ordering::Relaxed);
        counters.completed.fetch_add(6, Ordering::Relaxed);
        counters.failed.fetch_add(1, Ordering::Relaxed);
        counters.saturated.fetch_add(3, Ordering::Relaxed);
        let in_flight = AtomicUsize::new(3);

        let stats = counters.snapshot(4, &in_flight);
        assert_eq!(stats.capacity, 4);
        assert_eq!(stats.in_flight, 3);
        assert_eq!(stats.submitted, 10);
        assert_eq!(stats.completed, 6);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.saturated, 3);
    }
}
