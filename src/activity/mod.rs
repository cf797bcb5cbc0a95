//! Named multi-step activities and their executor.
//!
//! An [`Activity`] issues scheduled jobs through an [`ActivityContext`] and returns
//! named outputs. [`execute`] is the only way to run one: it always yields an
//! [`ActivityResult`] and always delivers a terminal progress report, whether the
//! run succeeded, aborted, or panicked.

pub mod airdrop_rewards;
pub mod clear_to_fund;
pub mod context;
pub mod dummy;
pub mod registry;
pub mod result;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use thiserror::Error;
use tracing::{error, info, info_span, Instrument};

use crate::chain::ChainClient;
use crate::core::{JobFailure, RpcScheduler, Saturated};
use crate::progress::{Progress, ProgressSink};

pub use airdrop_rewards::AirdropRewardsActivity;
pub use clear_to_fund::ClearToFundActivity;
pub use context::{ActivityContext, StepOutcome};
pub use dummy::DummyActivity;
pub use registry::ActivityRegistry;
pub use result::{ActivityOutputs, ActivityResult};

/// How job failures affect a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Any failed job aborts the run with an empty failure result.
    SingleOperation,
    /// Failed jobs mark the run failed; the run continues and keeps its outputs.
    BatchOperation,
}

/// Errors building activity outputs or registries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivityError {
    /// An output name was used twice or collides with an envelope key.
    #[error("duplicate activity output `{0}`")]
    DuplicateOutput(String),
    /// An output value could not be encoded as JSON.
    #[error("activity output `{name}` cannot be encoded: {message}")]
    OutputEncoding {
        /// Output name.
        name: String,
        /// Encoder message.
        message: String,
    },
    /// Two activities registered under the same id.
    #[error("activity `{0}` is already registered")]
    DuplicateActivity(String),
}

/// Why a run stopped early. Never escapes [`execute`].
#[derive(Debug, Error)]
pub enum ActivityAbort {
    /// The scheduler refused a job.
    #[error(transparent)]
    Saturated(#[from] Saturated),
    /// A job whose failure is fatal failed.
    #[error("job failed: {0}")]
    Failed(#[from] JobFailure),
    /// Outputs could not be built.
    #[error(transparent)]
    Output(#[from] ActivityError),
    /// The activity's own precondition does not hold.
    #[error("precondition failed: {0}")]
    Precondition(String),
}

/// A named procedure of one or more steps.
#[async_trait]
pub trait Activity: Send + Sync {
    /// Unique identifier.
    fn id(&self) -> &str;

    /// Steps reported through progress; used to normalize fractions.
    fn step_count(&self) -> u32 {
        1
    }

    /// How job failures affect the run.
    fn failure_policy(&self) -> FailurePolicy;

    /// Perform the activity.
    async fn run(&self, ctx: &mut ActivityContext<'_>) -> Result<ActivityOutputs, ActivityAbort>;
}

/// Run `activity` and produce its result.
///
/// Aborts and panics become failure results with empty outputs. Under the batch
/// policy a run that absorbed job failures keeps its outputs and reports
/// `success = false`. The terminal progress report is always sent to `progress`.
pub async fn execute(
    activity: &dyn Activity,
    date: DateTime<Utc>,
    scheduler: &RpcScheduler,
    client: Arc<dyn ChainClient>,
    progress: Option<ProgressSink>,
) -> ActivityResult {
    let id = activity.id().to_string();
    let span = info_span!("activity", id = %id, date = %date);
    async {
        let steps = activity.step_count().max(1);
        let mut ctx = ActivityContext::new(
            id.clone(),
            date,
            steps,
            activity.failure_policy(),
            scheduler,
            client,
            progress.clone(),
        );
        info!(steps, policy = ?activity.failure_policy(), "activity started");

        let result = match AssertUnwindSafe(activity.run(&mut ctx)).catch_unwind().await {
            Ok(Ok(outputs)) => {
                let success = !ctx.has_failed();
                if !success {
                    error!(failed_jobs = ctx.failures().len(), "activity completed with failed jobs");
                }
                ActivityResult::new(id.clone(), date, success, outputs)
            }
            Ok(Err(abort)) => {
                error!(error = %abort, "activity aborted");
                ActivityResult::failure(id.clone(), date)
            }
            Err(_) => {
                error!("activity panicked");
                ActivityResult::failure(id.clone(), date)
            }
        };

        if let Some(sink) = &progress {
            let description = if result.is_success() { "Completed" } else { "Failed" };
            sink.finish(Progress::new(id.clone(), steps, steps, description, 1.0));
        }
        info!(success = result.is_success(), outputs = result.outputs().len(), "activity finished");
        result
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::InMemoryChain;
    use crate::core::{Outcome, SchedulerLimits, Spawn};
    use crate::progress::progress_channel;
    use crate::runtime::TokioSpawner;

    struct Panicking;

    #[async_trait]
    impl Activity for Panicking {
        fn id(&self) -> &str {
            "panicking"
        }

        fn failure_policy(&self) -> FailurePolicy {
            FailurePolicy::SingleOperation
        }

        async fn run(&self, _ctx: &mut ActivityContext<'_>) -> Result<ActivityOutputs, ActivityAbort> {
            panic!("boom");
        }
    }

    struct TwoTransfers {
        policy: FailurePolicy,
    }

    #[async_trait]
    impl Activity for TwoTransfers {
        fn id(&self) -> &str {
            "two_transfers"
        }

        fn step_count(&self) -> u32 {
            2
        }

        fn failure_policy(&self) -> FailurePolicy {
            self.policy
        }

        async fn run(&self, ctx: &mut ActivityContext<'_>) -> Result<ActivityOutputs, ActivityAbort> {
            let mut landed = 0u32;
            for fail in [true, false] {
                let step = ctx
                    .attempt("transfer", move |_client| async move {
                        if fail {
                            Outcome::failure("rejected", Some(-1))
                        } else {
                            Outcome::Success(())
                        }
                    })
                    .await?;
                if step.done().is_some() {
                    landed += 1;
                }
            }
            Ok(ActivityOutputs::new().with("landed", landed)?)
        }
    }

    fn scheduler() -> RpcScheduler {
        let spawner: Arc<dyn Spawn> = Arc::new(TokioSpawner::current().unwrap());
        let sched = RpcScheduler::new(SchedulerLimits::with_capacity(2), spawner).unwrap();
        sched.start();
        sched
    }

    #[tokio::test]
    async fn test_panic_becomes_failure_with_terminal_progress() {
        let sched = scheduler();
        let (sink, mut rx) = progress_channel(8);
        let result = execute(&Panicking, Utc::now(), &sched, Arc::new(InMemoryChain::default()), Some(sink)).await;
        assert!(!result.is_success());
        assert!(result.outputs().is_empty());
        assert!(rx.drain().last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_batch_policy_keeps_outputs() {
        let sched = scheduler();
        let activity = TwoTransfers {
            policy: FailurePolicy::BatchOperation,
        };
        let result = execute(&activity, Utc::now(), &sched, Arc::new(InMemoryChain::default()), None).await;
        assert!(!result.is_success());
        assert_eq!(result.output("landed"), Some(&serde_json::json!(1)));
    }

    #[tokio::test]
    async fn test_single_policy_aborts() {
        let sched = scheduler();
        let activity = TwoTransfers {
            policy: FailurePolicy::SingleOperation,
        };
        let result = execute(&activity, Utc::now(), &sched, Arc::new(InMemoryChain::default()), None).await;
        assert!(!result.is_success());
        assert!(result.outputs().is_empty());
    }
}
