//! Token distribution to holders.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use tracing::{info, warn};

use super::OpsEnv;
use crate::chain::{Address, Asset, Mint};
use crate::core::{AppResult, OpsError};
use crate::distribution::{
    retry_stored, BatchDistributor, DistributionPlan, DistributionReport, RecipientMap,
    RecipientSchema, SkipPolicy,
};
use crate::infra::JsonFileLedgerStore;
use crate::progress::ProgressSink;

/// A token distribution request.
#[derive(Debug, Clone)]
pub struct TokenDistribution {
    /// Token sent.
    pub mint: Mint,
    /// Recipient file.
    pub recipients_path: PathBuf,
    /// Shape of the recipient file.
    pub schema: RecipientSchema,
    /// Skip recipients already holding their amount.
    pub skip_holders: bool,
}

impl TokenDistribution {
    fn label(&self) -> String {
        format!("tokens-{}", self.mint)
    }
}

fn token_plan(payer: &Address, mint: &Mint, label: String, recipients: RecipientMap, skip: bool) -> DistributionPlan {
    let plan = DistributionPlan::new(
        label,
        payer.clone(),
        Asset::Token { mint: mint.clone() },
        recipients,
    );
    if skip {
        plan.with_skip(SkipPolicy::AlreadyHolds)
    } else {
        plan
    }
}

fn log_outcome(report: &DistributionReport) {
    info!(summary = %report, "token distribution finished");
    if let Some(err) = report.partial_failure() {
        warn!(error = %err, "retry with the failure ledger to pay the remaining recipients");
    }
}

/// Send `request.mint` from `payer` to every recipient in the request's file.
///
/// The recipient file is parsed before anything is scheduled. Unpaid recipients
/// are written to `<ledger_dir>/tokens-<mint>.failed.json`. With
/// `inhibit_transactions` set, the plan is validated and summarized but nothing
/// is sent.
///
/// # Errors
///
/// Fails when the recipient file cannot be read or parsed. Transfer failures are
/// reported in the returned [`DistributionReport`], not as errors.
pub async fn distribute_tokens(
    env: &OpsEnv<'_>,
    payer: &Address,
    request: &TokenDistribution,
    progress: Option<ProgressSink>,
) -> AppResult<DistributionReport> {
    let raw = fs::read_to_string(&request.recipients_path)
        .map_err(OpsError::from)
        .with_context(|| format!("reading recipients {}", request.recipients_path.display()))?;
    let recipients = RecipientMap::from_json(&raw, request.schema)?;
    let label = request.label();
    info!(
        mint = %request.mint,
        recipients = recipients.len(),
        amount = recipients.total(),
        "token distribution planned"
    );

    if env.config.debug.inhibit_transactions {
        info!("transactions inhibited, nothing sent");
        return Ok(DistributionReport {
            label,
            total_recipients: recipients.len(),
            total_amount: recipients.total(),
            ..DistributionReport::default()
        });
    }

    let plan = token_plan(payer, &request.mint, label.clone(), recipients, request.skip_holders);
    let store = JsonFileLedgerStore::in_dir(&env.config.paths.ledger_dir, &label);
    let mut distributor = BatchDistributor::new(env.scheduler, env.client.clone(), &store);
    if let Some(sink) = progress {
        distributor = distributor.with_progress(sink);
    }
    let report = distributor.run(&plan).await;
    log_outcome(&report);
    Ok(report)
}

/// Retry the recipients recorded in the failure ledger of a previous
/// [`distribute_tokens`] run for `mint`. Returns `None` when no ledger exists.
///
/// # Errors
///
/// Fails when the stored ledger cannot be read or parsed.
pub async fn retry_failed_tokens(
    env: &OpsEnv<'_>,
    payer: &Address,
    mint: &Mint,
    progress: Option<ProgressSink>,
) -> AppResult<Option<DistributionReport>> {
    let label = format!("tokens-{mint}");
    let store = JsonFileLedgerStore::in_dir(&env.config.paths.ledger_dir, &label);
    let mut distributor = BatchDistributor::new(env.scheduler, env.client.clone(), &store);
    if let Some(sink) = progress {
        distributor = distributor.with_progress(sink);
    }
    let template = token_plan(payer, mint, label, RecipientMap::default(), false);
    let report = retry_stored(&distributor, &template)
        .await
        .map_err(OpsError::from)
        .with_context(|| format!("loading failure ledger {}", store.path().display()))?;
    match &report {
        Some(report) => log_outcome(report),
        None => info!(mint = %mint, "no failure ledger to retry"),
    }
    Ok(report)
}
