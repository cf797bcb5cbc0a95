//! Sweep an account's balance, minus the transfer fee, into the fund account.

use async_trait::async_trait;
use tracing::info;

use super::{Activity, ActivityAbort, ActivityContext, ActivityOutputs, FailurePolicy};
use crate::chain::{Address, Asset, TransferRequest};

/// Moves everything but the fee from `account` to `fund`.
///
/// Outputs: `amount` (lamports moved, or that would move in a dry run).
#[derive(Debug, Clone)]
pub struct ClearToFundActivity {
    account: Address,
    fund: Address,
    inhibit_transactions: bool,
}

impl ClearToFundActivity {
    /// Registry id.
    pub const ID: &'static str = "clear_to_fund_activity";

    /// Sweep `account` into `fund`.
    pub const fn new(account: Address, fund: Address) -> Self {
        Self {
            account,
            fund,
            inhibit_transactions: false,
        }
    }

    /// Compute the amount without sending anything.
    #[must_use]
    pub const fn inhibit_transactions(mut self, inhibit: bool) -> Self {
        self.inhibit_transactions = inhibit;
        self
    }
}

#[async_trait]
impl Activity for ClearToFundActivity {
    fn id(&self) -> &str {
        Self::ID
    }

    fn step_count(&self) -> u32 {
        2
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::SingleOperation
    }

    async fn run(&self, ctx: &mut ActivityContext<'_>) -> Result<ActivityOutputs, ActivityAbort> {
        let snapshot = ctx.cluster_snapshot().await?;

        ctx.report(1, "Retrieving account balance", 1.0);
        let account = self.account.clone();
        let balance = ctx
            .require("account balance", move |client| async move { client.balance(&account).await })
            .await?;
        let amount = balance
            .checked_sub(snapshot.lamports_per_signature)
            .filter(|amount| *amount > 0)
            .ok_or_else(|| {
                ActivityAbort::Precondition(format!(
                    "balance {balance} does not cover fee {}",
                    snapshot.lamports_per_signature
                ))
            })?;

        if self.inhibit_transactions {
            info!(amount, fund = %self.fund, "dry run: balance would be sent to fund");
            return Ok(ActivityOutputs::new().with("amount", amount)?);
        }

        ctx.report(2, "Sending balance to fund account", 1.0);
        let request = TransferRequest {
            from: self.account.clone(),
            to: self.fund.clone(),
            amount,
            asset: Asset::Native,
            recent_blockhash: Some(snapshot.recent_blockhash),
        };
        let signature = ctx
            .attempt("fund transfer", move |client| async move { client.transfer(&request).await })
            .await?
            .done();
        if let Some(signature) = &signature {
            info!(amount, fund = %self.fund, signature = %signature.0, "balance sent to fund");
        }

        Ok(ActivityOutputs::new().with("amount", amount)?)
    }
}
