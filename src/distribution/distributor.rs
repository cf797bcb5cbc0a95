//! Sequential batch distributor.
//!
//! Recipients are processed in map order. Each transfer is a scheduled job and is
//! awaited before the next recipient is handled, so concurrency comes from the
//! scheduler's capacity and from running several distributors at once, never
//! from fan-out within a run.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use super::ledger::{FailureLedger, LedgerError, LedgerStore};
use super::recipients::RecipientMap;
use super::report::{DistributionReport, FailureCause, RecipientFailure, SentTransfer};
use crate::chain::{Address, Asset, ChainClient, TransferRequest};
use crate::core::{Outcome, RpcScheduler, SubmissionResult};
use crate::progress::{Progress, ProgressSink};

/// Precondition checked before paying a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipPolicy {
    /// Skip recipients whose current holding of the asset already covers the amount.
    AlreadyHolds,
}

/// What to distribute, to whom, from where.
#[derive(Debug, Clone)]
pub struct DistributionPlan {
    /// Label used for logs, progress, and ledger naming.
    pub label: String,
    /// Paying account.
    pub payer: Address,
    /// Asset transferred.
    pub asset: Asset,
    /// Recipients and amounts.
    pub recipients: RecipientMap,
    /// Optional skip precondition.
    pub skip: Option<SkipPolicy>,
    /// Blockhash shared by every transfer of the run.
    pub recent_blockhash: Option<String>,
}

impl DistributionPlan {
    /// Plan without skip precondition or pinned blockhash.
    pub fn new(label: impl Into<String>, payer: Address, asset: Asset, recipients: RecipientMap) -> Self {
        Self {
            label: label.into(),
            payer,
            asset,
            recipients,
            skip: None,
            recent_blockhash: None,
        }
    }

    /// Set the skip precondition.
    #[must_use]
    pub fn with_skip(mut self, skip: SkipPolicy) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Pin the blockhash.
    #[must_use]
    pub fn with_blockhash(mut self, blockhash: impl Into<String>) -> Self {
        self.recent_blockhash = Some(blockhash.into());
        self
    }
}

/// Result of handling one recipient.
enum RecipientOutcome {
    Skipped,
    Sent(SentTransfer),
    Failed(FailureCause),
}

/// Applies one scheduled transfer per recipient and records failures for retry.
///
/// Each run builds its own ledger; several distributors may share one scheduler.
pub struct BatchDistributor<'a> {
    scheduler: &'a RpcScheduler,
    client: Arc<dyn ChainClient>,
    store: &'a dyn LedgerStore,
    progress: Option<ProgressSink>,
}

impl<'a> BatchDistributor<'a> {
    /// Distributor submitting through `scheduler` and persisting failures to `store`.
    pub fn new(
        scheduler: &'a RpcScheduler,
        client: Arc<dyn ChainClient>,
        store: &'a dyn LedgerStore,
    ) -> Self {
        Self {
            scheduler,
            client,
            store,
            progress: None,
        }
    }

    /// Report progress to `sink`.
    #[must_use]
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Run the plan to the end. Never fails: unpaid recipients land in the
    /// report's ledger, which is persisted when non-empty and cleared otherwise.
    pub async fn run(&self, plan: &DistributionPlan) -> DistributionReport {
        let span = info_span!(
            "distribution",
            label = %plan.label,
            recipients = plan.recipients.len(),
        );
        self.run_inner(plan).instrument(span).await
    }

    async fn run_inner(&self, plan: &DistributionPlan) -> DistributionReport {
        let total = plan.recipients.len();
        let mut report = DistributionReport {
            label: plan.label.clone(),
            total_recipients: total,
            total_amount: plan.recipients.total(),
            ..DistributionReport::default()
        };
        info!(amount = report.total_amount, "distribution started");

        for (processed, (recipient, amount)) in plan.recipients.iter().enumerate() {
            match self.handle_recipient(plan, recipient, amount).await {
                RecipientOutcome::Skipped => {
                    debug!(%recipient, amount, "recipient already holds amount, skipped");
                    report.skipped.push(recipient.clone());
                    report.skipped_amount += amount;
                }
                RecipientOutcome::Sent(sent) => {
                    debug!(%recipient, amount, signature = %sent.signature.0, "transfer landed");
                    report.sent_amount += amount;
                    report.sent.push(sent);
                }
                RecipientOutcome::Failed(cause) => {
                    warn!(%recipient, amount, %cause, "recipient recorded to failure ledger");
                    report.ledger.record(recipient.clone(), amount);
                    report.failures.push(RecipientFailure {
                        recipient: recipient.clone(),
                        amount,
                        cause,
                    });
                }
            }
            self.report_progress(plan, processed + 1, total);
        }

        self.persist(&mut report);
        if let Some(sink) = &self.progress {
            sink.finish(Progress::new(plan.label.clone(), 1, 1, "Distribution finished", 1.0));
        }
        info!(
            sent = report.sent.len(),
            skipped = report.skipped.len(),
            failed = report.ledger.len(),
            "distribution finished"
        );
        report
    }

    async fn handle_recipient(
        &self,
        plan: &DistributionPlan,
        recipient: &Address,
        amount: u64,
    ) -> RecipientOutcome {
        if plan.skip == Some(SkipPolicy::AlreadyHolds) {
            match self.holding(recipient, &plan.asset).await {
                Ok(holding) if holding >= amount => return RecipientOutcome::Skipped,
                Ok(_) => {}
                Err(cause) => return RecipientOutcome::Failed(cause),
            }
        }

        let request = TransferRequest {
            from: plan.payer.clone(),
            to: recipient.clone(),
            amount,
            asset: plan.asset.clone(),
            recent_blockhash: plan.recent_blockhash.clone(),
        };
        let client = Arc::clone(&self.client);
        let token = match self
            .scheduler
            .schedule(move || async move { client.transfer(&request).await })
        {
            SubmissionResult::Token(token) => token,
            SubmissionResult::Saturated(saturated) => {
                return RecipientOutcome::Failed(FailureCause::Saturated(saturated))
            }
        };
        match token.await {
            Outcome::Success(signature) => RecipientOutcome::Sent(SentTransfer {
                recipient: recipient.clone(),
                amount,
                signature,
            }),
            Outcome::Failure(failure) => RecipientOutcome::Failed(FailureCause::Rejected(failure)),
        }
    }

    async fn holding(&self, owner: &Address, asset: &Asset) -> Result<u64, FailureCause> {
        let client = Arc::clone(&self.client);
        let owner = owner.clone();
        let asset = asset.clone();
        match self
            .scheduler
            .schedule(move || async move { client.holding(&owner, &asset).await })
        {
            SubmissionResult::Token(token) => token.await.into_result().map_err(FailureCause::LookupFailed),
            SubmissionResult::Saturated(saturated) => Err(FailureCause::Saturated(saturated)),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn report_progress(&self, plan: &DistributionPlan, processed: usize, total: usize) {
        if let Some(sink) = &self.progress {
            let fraction = processed as f32 / total.max(1) as f32;
            sink.report(Progress::new(
                plan.label.clone(),
                1,
                1,
                format!("Processed {processed}/{total} recipients"),
                fraction,
            ));
        }
    }

    fn persist(&self, report: &mut DistributionReport) {
        let result = if report.ledger.is_empty() {
            self.store.clear().map(|()| None)
        } else {
            self.store.save(&report.ledger)
        };
        match result {
            Ok(location) => report.ledger_location = location,
            Err(e) => {
                warn!(error = %e, failed = report.ledger.len(), "failure ledger could not be persisted");
                report.persist_error = Some(e.to_string());
            }
        }
    }
}

/// Convenience wrapper: retry the ledger stored in `store`, if any.
///
/// Returns `None` when the store holds no ledger.
///
/// # Errors
///
/// Returns the store's error when the stored ledger cannot be read, or
/// `LedgerError::Malformed` when it cannot form a recipient map. Nothing is
/// scheduled and the stored ledger is left in place in both cases.
pub async fn retry_stored(
    distributor: &BatchDistributor<'_>,
    plan_template: &DistributionPlan,
) -> Result<Option<DistributionReport>, LedgerError> {
    let Some(ledger) = distributor.store.load()? else {
        return Ok(None);
    };
    let plan = retry_plan(plan_template, ledger)?;
    Ok(Some(distributor.run(&plan).await))
}

/// Plan that pays exactly the recipients recorded in `ledger`.
///
/// # Errors
///
/// Returns `LedgerError::Malformed` when the ledger cannot form a recipient map.
pub fn retry_plan(template: &DistributionPlan, ledger: FailureLedger) -> Result<DistributionPlan, LedgerError> {
    Ok(DistributionPlan {
        recipients: ledger.into_recipients()?,
        ..template.clone()
    })
}
