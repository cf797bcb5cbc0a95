//! Shareholder dividends paid from the fund account.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::notifier::Notifier;
use super::OpsEnv;
use crate::chain::{Address, Asset};
use crate::core::{AppResult, OpsError};
use crate::distribution::{
    retry_stored, BatchDistributor, DistributionPlan, DistributionReport, RecipientMap,
};
use crate::infra::JsonFileLedgerStore;
use crate::progress::ProgressSink;

/// Label of dividend runs; also names their failure ledger.
const DIVIDENDS_LABEL: &str = "dividends";

/// A shareholder entitled to a percentage of the fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareHolder {
    /// First name.
    pub name: String,
    /// Last name.
    pub surname: String,
    /// Contact address for notices.
    pub email: String,
    /// Payout address.
    pub address: Address,
    /// Share of the fund, in percent.
    pub shares: f64,
}

impl fmt::Display for ShareHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} <{}> {} ({}%)",
            self.name, self.surname, self.email, self.address, self.shares
        )
    }
}

#[derive(Deserialize)]
struct DividendsFile {
    holders: Vec<ShareHolder>,
}

/// How the fund balance splits among shareholders.
#[derive(Debug, Clone, PartialEq)]
pub struct DividendSplit {
    /// Fund balance observed.
    pub balance: u64,
    /// One signature fee per shareholder.
    pub total_fees: u64,
    /// Lamports paid per percent of shares: `(balance - total_fees) / 100`.
    pub per_share: u64,
    /// Shareholders with a non-zero dividend, in file order.
    pub payouts: Vec<(ShareHolder, u64)>,
}

impl DividendSplit {
    /// Payouts as a recipient map.
    ///
    /// # Errors
    ///
    /// `OpsError::Parse` when two shareholders share an address.
    pub fn recipients(&self) -> Result<RecipientMap, OpsError> {
        RecipientMap::from_pairs(
            self.payouts
                .iter()
                .map(|(holder, amount)| (holder.address.clone(), *amount)),
        )
    }
}

/// Read shareholders from a `{"holders": [...]}` file.
///
/// # Errors
///
/// `OpsError::Io` or `OpsError::Parse`.
pub fn load_shareholders(path: &Path) -> Result<Vec<ShareHolder>, OpsError> {
    let raw = fs::read_to_string(path)?;
    let file: DividendsFile = serde_json::from_str(&raw)
        .map_err(|e| OpsError::parse(format!("shareholders {}", path.display()), e))?;
    Ok(file.holders)
}

/// Check a shareholder list: shares within `[0, 100]`, summing to at most 100,
/// and no address listed twice.
///
/// # Errors
///
/// `OpsError::Parse` naming the first offending holder.
pub fn validate_shareholders(holders: &[ShareHolder]) -> Result<(), OpsError> {
    let mut total_shares = 0.0;
    let mut seen = BTreeSet::new();
    for holder in holders {
        if !holder.shares.is_finite() || !(0.0..=100.0).contains(&holder.shares) {
            return Err(OpsError::parse(
                "shareholders",
                format!("shares of {} out of range: {}", holder.address, holder.shares),
            ));
        }
        if !seen.insert(&holder.address) {
            return Err(OpsError::parse(
                "shareholders",
                format!("duplicate address {}", holder.address),
            ));
        }
        total_shares += holder.shares;
    }
    if total_shares > 100.0 + f64::EPSILON {
        return Err(OpsError::parse(
            "shareholders",
            format!("shares sum to {total_shares}%"),
        ));
    }
    Ok(())
}

/// Split `balance` among `holders` after reserving one fee per holder.
///
/// Shareholders whose dividend rounds to zero are left out of the payouts.
///
/// # Errors
///
/// `OpsError::Parse` when [`validate_shareholders`] rejects the list,
/// `OpsError::InsufficientFunds` when the balance does not cover the fees.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn compute_dividends(
    balance: u64,
    lamports_per_signature: u64,
    holders: Vec<ShareHolder>,
) -> Result<DividendSplit, OpsError> {
    validate_shareholders(&holders)?;

    let total_fees = lamports_per_signature.saturating_mul(holders.len() as u64);
    let distributable = balance
        .checked_sub(total_fees)
        .ok_or(OpsError::InsufficientFunds {
            balance,
            required: total_fees,
        })?;
    let per_share = distributable / 100;

    let mut payouts = Vec::with_capacity(holders.len());
    for holder in holders {
        let dividend = (holder.shares * per_share as f64) as u64;
        if dividend == 0 {
            warn!(address = %holder.address, "dividend rounds to zero, holder skipped");
            continue;
        }
        payouts.push((holder, dividend));
    }
    Ok(DividendSplit {
        balance,
        total_fees,
        per_share,
        payouts,
    })
}

/// Outcome of a dividend run.
#[derive(Debug, Clone)]
pub struct DividendReport {
    /// Computed split.
    pub split: DividendSplit,
    /// Transfer results; `None` when transactions were inhibited.
    pub distribution: Option<DistributionReport>,
    /// Notices delivered.
    pub notified: usize,
    /// Notices that failed.
    pub notify_failures: usize,
}

/// Pay every shareholder in `holders_path` their percentage of the fund balance.
///
/// Paid holders are notified through `notifier`. With `inhibit_transactions` set
/// nothing is sent, and holders are only notified when `force_notify` is also set.
///
/// # Errors
///
/// Fails when the fund account is not configured, the shareholder file is
/// invalid, the balance or fee lookup fails, or the fund cannot cover the fees.
pub async fn distribute_dividends(
    env: &OpsEnv<'_>,
    holders_path: &Path,
    notifier: &dyn Notifier,
    progress: Option<ProgressSink>,
) -> AppResult<DividendReport> {
    let fund = env
        .config
        .fund_account()
        .map_err(OpsError::Config)?
        .clone();
    let holders = load_shareholders(holders_path)?;
    validate_shareholders(&holders)?;

    let balance_of = fund.clone();
    let balance = env
        .call(move |client| async move { client.balance(&balance_of).await })
        .await
        .context("retrieving fund balance")?;
    let snapshot = env
        .call(|client| async move { client.cluster_snapshot().await })
        .await
        .context("retrieving cluster snapshot")?;

    let split = compute_dividends(balance, snapshot.lamports_per_signature, holders)?;
    let recipients = split.recipients()?;
    info!(
        balance = split.balance,
        total_fees = split.total_fees,
        per_share = split.per_share,
        holders = split.payouts.len(),
        "dividends computed"
    );

    let debug = env.config.debug;
    if debug.inhibit_transactions {
        info!("transactions inhibited, nothing sent");
        let (notified, notify_failures) = if debug.force_notify {
            notify_all(notifier, split.payouts.iter().map(|(h, a)| (h, *a))).await
        } else {
            (0, 0)
        };
        return Ok(DividendReport {
            split,
            distribution: None,
            notified,
            notify_failures,
        });
    }

    let plan = DistributionPlan::new(DIVIDENDS_LABEL, fund, Asset::Native, recipients)
        .with_blockhash(snapshot.recent_blockhash);
    let store = JsonFileLedgerStore::in_dir(&env.config.paths.ledger_dir, DIVIDENDS_LABEL);
    let mut distributor = BatchDistributor::new(env.scheduler, env.client.clone(), &store);
    if let Some(sink) = progress {
        distributor = distributor.with_progress(sink);
    }
    let report = distributor.run(&plan).await;

    let paid = split.payouts.iter().filter_map(|(holder, amount)| {
        report
            .sent
            .iter()
            .any(|sent| sent.recipient == holder.address)
            .then_some((holder, *amount))
    });
    let (notified, notify_failures) = notify_all(notifier, paid).await;

    info!(
        summary = %report,
        notified,
        "dividends distribution completed with {} failures",
        report.failed_count()
    );
    if let Some(err) = report.partial_failure() {
        warn!(error = %err, "some dividends were not paid");
    }
    Ok(DividendReport {
        split,
        distribution: Some(report),
        notified,
        notify_failures,
    })
}

/// Outcome of a dividend retry.
#[derive(Debug, Clone)]
pub struct DividendRetry {
    /// Transfer results for the ledger entries.
    pub distribution: DistributionReport,
    /// Notices delivered.
    pub notified: usize,
    /// Notices that failed.
    pub notify_failures: usize,
}

/// Retry the shareholders left in the dividends failure ledger.
///
/// Amounts come from the ledger, not from a fresh split. Only holders paid by
/// this retry are notified; `holders_path` supplies their contact details.
/// Returns `None` when no ledger exists.
///
/// # Errors
///
/// Fails when the fund account is not configured, the shareholder file is
/// invalid, the cluster snapshot fails, or the stored ledger cannot be read.
pub async fn retry_failed_dividends(
    env: &OpsEnv<'_>,
    holders_path: &Path,
    notifier: &dyn Notifier,
    progress: Option<ProgressSink>,
) -> AppResult<Option<DividendRetry>> {
    let fund = env
        .config
        .fund_account()
        .map_err(OpsError::Config)?
        .clone();
    let holders = load_shareholders(holders_path)?;
    validate_shareholders(&holders)?;

    let store = JsonFileLedgerStore::in_dir(&env.config.paths.ledger_dir, DIVIDENDS_LABEL);
    if !store.path().exists() {
        info!("no dividends failure ledger to retry");
        return Ok(None);
    }
    let snapshot = env
        .call(|client| async move { client.cluster_snapshot().await })
        .await
        .context("retrieving cluster snapshot")?;

    let mut distributor = BatchDistributor::new(env.scheduler, env.client.clone(), &store);
    if let Some(sink) = progress {
        distributor = distributor.with_progress(sink);
    }
    let template = DistributionPlan::new(DIVIDENDS_LABEL, fund, Asset::Native, RecipientMap::default())
        .with_blockhash(snapshot.recent_blockhash);
    let Some(report) = retry_stored(&distributor, &template)
        .await
        .map_err(OpsError::from)
        .with_context(|| format!("loading failure ledger {}", store.path().display()))?
    else {
        return Ok(None);
    };

    let paid = report.sent.iter().filter_map(|sent| {
        let holder = holders.iter().find(|h| h.address == sent.recipient);
        if holder.is_none() {
            warn!(address = %sent.recipient, "paid address not in shareholder file, no notice sent");
        }
        holder.map(|h| (h, sent.amount))
    });
    let (notified, notify_failures) = notify_all(notifier, paid).await;

    info!(summary = %report, notified, "dividends retry completed");
    if let Some(err) = report.partial_failure() {
        warn!(error = %err, "some dividends are still unpaid");
    }
    Ok(Some(DividendRetry {
        distribution: report,
        notified,
        notify_failures,
    }))
}

async fn notify_all<'h>(
    notifier: &dyn Notifier,
    paid: impl Iterator<Item = (&'h ShareHolder, u64)>,
) -> (usize, usize) {
    let mut delivered = 0;
    let mut failed = 0;
    for (holder, amount) in paid {
        match notifier.notify_dividend(holder, amount).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                warn!(error = %e, "dividend notice not delivered");
                failed += 1;
            }
        }
    }
    (delivered, failed)
}
