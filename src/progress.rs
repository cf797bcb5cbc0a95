//! Progress reporting channel.
//!
//! Delivery contract: intermediate reports are best-effort and are dropped while
//! the consumer is more than `backlog_limit` reports behind. The terminal report
//! (sent with [`ProgressSink::finish`]) is always enqueued and never blocks the
//! producer; it is lost only if the receiver itself has been dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One step of a multi-step procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based step number.
    pub number: u32,
    /// What the step does.
    pub description: String,
    /// Completion of this step in `[0, 1]`.
    pub fraction: f32,
}

/// Progress of a named procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Procedure reporting progress.
    pub activity_id: String,
    /// Step count declared up front.
    pub total_steps: u32,
    /// Current step.
    pub step: Step,
}

impl Progress {
    /// Build a report. `total_steps` is at least 1, `number` is clamped into
    /// `1..=total_steps`, and `fraction` into `[0, 1]` (NaN becomes 0).
    pub fn new(
        activity_id: impl Into<String>,
        total_steps: u32,
        number: u32,
        description: impl Into<String>,
        fraction: f32,
    ) -> Self {
        let total_steps = total_steps.max(1);
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        Self {
            activity_id: activity_id.into(),
            total_steps,
            step: Step {
                number: number.clamp(1, total_steps),
                description: description.into(),
                fraction,
            },
        }
    }

    /// Idle placeholder, already complete.
    pub fn idle() -> Self {
        Self::new("idle", 1, 1, "Idling", 1.0)
    }

    /// Completion across all steps in `[0, 1]`.
    #[allow(clippy::cast_precision_loss)]
    pub fn overall(&self) -> f32 {
        let done = (self.step.number - 1) as f32 + self.step.fraction;
        (done / self.total_steps as f32).clamp(0.0, 1.0)
    }

    /// True for the last step at fraction 1.
    pub fn is_terminal(&self) -> bool {
        self.step.number == self.total_steps && self.step.fraction >= 1.0
    }
}

/// Producer side of a progress channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<Progress>,
    backlog: Arc<AtomicUsize>,
    backlog_limit: usize,
}

/// Consumer side of a progress channel.
#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::UnboundedReceiver<Progress>,
    backlog: Arc<AtomicUsize>,
}

/// Create a progress channel that keeps at most `backlog_limit` undelivered
/// intermediate reports.
pub fn progress_channel(backlog_limit: usize) -> (ProgressSink, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let backlog = Arc::new(AtomicUsize::new(0));
    (
        ProgressSink {
            tx,
            backlog: Arc::clone(&backlog),
            backlog_limit: backlog_limit.max(1),
        },
        ProgressReceiver { rx, backlog },
    )
}

impl ProgressSink {
    /// Best-effort intermediate report. Returns whether it was enqueued.
    pub fn report(&self, progress: Progress) -> bool {
        if self.backlog.load(Ordering::Acquire) >= self.backlog_limit {
            tracing::trace!(activity = %progress.activity_id, "progress report dropped");
            return false;
        }
        self.enqueue(progress)
    }

    /// Terminal report; bypasses the backlog limit.
    pub fn finish(&self, progress: Progress) -> bool {
        self.enqueue(progress)
    }

    fn enqueue(&self, progress: Progress) -> bool {
        self.backlog.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(progress).is_ok() {
            true
        } else {
            self.backlog.fetch_sub(1, Ordering::AcqRel);
            false
        }
    }
}

impl ProgressReceiver {
    /// Wait for the next report; `None` once every sink is dropped and the queue is empty.
    pub async fn recv(&mut self) -> Option<Progress> {
        let next = self.rx.recv().await;
        if next.is_some() {
            self.backlog.fetch_sub(1, Ordering::AcqRel);
        }
        next
    }

    /// Take every report already queued.
    pub fn drain(&mut self) -> Vec<Progress> {
        let mut out = Vec::new();
        while let Ok(progress) = self.rx.try_recv() {
            self.backlog.fetch_sub(1, Ordering::AcqRel);
            out.push(progress);
        }
        out
    }
}
