//! Per-run state handed to an activity.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, warn};

use super::{ActivityAbort, FailurePolicy};
use crate::chain::{ChainClient, ClusterSnapshot};
use crate::core::{JobFailure, Outcome, RpcScheduler, SubmissionResult};
use crate::progress::{Progress, ProgressSink};

/// Result of a policy-driven operation that did not abort the activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome<T> {
    /// The operation succeeded.
    Done(T),
    /// The operation failed; the run is marked failed and continues.
    Failed(JobFailure),
}

impl<T> StepOutcome<T> {
    /// Success value, if any.
    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            Self::Failed(_) => None,
        }
    }
}

/// Scheduler access, progress reporting, and failure bookkeeping for one run.
pub struct ActivityContext<'a> {
    activity_id: String,
    date: DateTime<Utc>,
    total_steps: u32,
    policy: FailurePolicy,
    scheduler: &'a RpcScheduler,
    client: Arc<dyn ChainClient>,
    progress: Option<ProgressSink>,
    failures: Vec<JobFailure>,
}

impl<'a> ActivityContext<'a> {
    pub(crate) fn new(
        activity_id: impl Into<String>,
        date: DateTime<Utc>,
        total_steps: u32,
        policy: FailurePolicy,
        scheduler: &'a RpcScheduler,
        client: Arc<dyn ChainClient>,
        progress: Option<ProgressSink>,
    ) -> Self {
        Self {
            activity_id: activity_id.into(),
            date,
            total_steps: total_steps.max(1),
            policy,
            scheduler,
            client,
            progress,
            failures: Vec::new(),
        }
    }

    /// Execution timestamp of the run.
    pub const fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Declared failure policy.
    pub const fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Shared chain client.
    pub fn client(&self) -> Arc<dyn ChainClient> {
        Arc::clone(&self.client)
    }

    /// Job failures absorbed under the batch policy.
    pub fn failures(&self) -> &[JobFailure] {
        &self.failures
    }

    /// True when any absorbed failure marked the run failed.
    pub fn has_failed(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Schedule an operation whose failure always aborts the run.
    ///
    /// # Errors
    ///
    /// `ActivityAbort::Saturated` when the scheduler refuses the job,
    /// `ActivityAbort::Failed` when the job fails.
    pub async fn require<T, F, Fut>(&mut self, what: &str, operation: F) -> Result<T, ActivityAbort>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn ChainClient>) -> Fut + Send + 'static,
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        match self.submit(operation).await? {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(failure) => {
                error!(activity = %self.activity_id, step = what, %failure, "required operation failed");
                Err(ActivityAbort::Failed(failure))
            }
        }
    }

    /// Schedule an operation whose failure is handled by the declared policy.
    ///
    /// Under [`FailurePolicy::SingleOperation`] a failure aborts the run. Under
    /// [`FailurePolicy::BatchOperation`] it is recorded, the run is marked failed,
    /// and `StepOutcome::Failed` is returned.
    ///
    /// # Errors
    ///
    /// `ActivityAbort::Saturated` when the scheduler refuses the job (under either
    /// policy), `ActivityAbort::Failed` for a failure under the single policy.
    pub async fn attempt<T, F, Fut>(&mut self, what: &str, operation: F) -> Result<StepOutcome<T>, ActivityAbort>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn ChainClient>) -> Fut + Send + 'static,
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        match self.submit(operation).await? {
            Outcome::Success(value) => Ok(StepOutcome::Done(value)),
            Outcome::Failure(failure) => match self.policy {
                FailurePolicy::SingleOperation => {
                    error!(activity = %self.activity_id, step = what, %failure, "operation failed");
                    Err(ActivityAbort::Failed(failure))
                }
                FailurePolicy::BatchOperation => {
                    warn!(activity = %self.activity_id, step = what, %failure, "operation failed, continuing");
                    self.failures.push(failure.clone());
                    Ok(StepOutcome::Failed(failure))
                }
            },
        }
    }

    /// Recent blockhash and fee schedule; a prerequisite of every transfer.
    ///
    /// # Errors
    ///
    /// Same as [`ActivityContext::require`].
    pub async fn cluster_snapshot(&mut self) -> Result<ClusterSnapshot, ActivityAbort> {
        self.require("cluster snapshot", |client| async move { client.cluster_snapshot().await })
            .await
    }

    /// Best-effort progress report for `step` (1-based).
    pub fn report(&self, step: u32, description: &str, fraction: f32) {
        if let Some(sink) = &self.progress {
            sink.report(Progress::new(
                self.activity_id.clone(),
                self.total_steps,
                step,
                description,
                fraction,
            ));
        }
    }

    async fn submit<T, F, Fut>(&self, operation: F) -> Result<Outcome<T>, ActivityAbort>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn ChainClient>) -> Fut + Send + 'static,
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        match self.scheduler.schedule(move || operation(client)) {
            SubmissionResult::Token(token) => Ok(token.await),
            SubmissionResult::Saturated(saturated) => {
                error!(activity = %self.activity_id, %saturated, "scheduler saturated, aborting activity");
                Err(ActivityAbort::Saturated(saturated))
            }
        }
    }
}
