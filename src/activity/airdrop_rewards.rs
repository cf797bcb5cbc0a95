//! Split the creator account's balance among collection holders, per mint held.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Activity, ActivityAbort, ActivityContext, ActivityOutputs, FailurePolicy, StepOutcome};
use crate::chain::{Address, Asset, Mint, TransferRequest};

/// Pays every holder `lamports_per_mint * mints held`, where
/// `lamports_per_mint = (balance - fees) / mints` and fees cover one signature
/// per holder.
///
/// Individual transfer failures do not stop the airdrop; they mark the run failed.
/// Outputs: `rewards`, `lamports_per_mint`, `owners_number`, `total_fees`,
/// `paid_owners`, `failed_transfers`.
#[derive(Debug, Clone)]
pub struct AirdropRewardsActivity {
    creator: Address,
    mints: Vec<Mint>,
    inhibit_transactions: bool,
}

impl AirdropRewardsActivity {
    /// Registry id.
    pub const ID: &'static str = "airdrop_rewards_activity";

    /// Airdrop from `creator` to the holders of `mints`.
    pub const fn new(creator: Address, mints: Vec<Mint>) -> Self {
        Self {
            creator,
            mints,
            inhibit_transactions: false,
        }
    }

    /// Compute the split without sending anything.
    #[must_use]
    pub const fn inhibit_transactions(mut self, inhibit: bool) -> Self {
        self.inhibit_transactions = inhibit;
        self
    }
}

fn summary(
    rewards: u64,
    lamports_per_mint: u64,
    owners: usize,
    total_fees: u64,
    paid: usize,
    failed: usize,
) -> Result<ActivityOutputs, ActivityAbort> {
    Ok(ActivityOutputs::new()
        .with("rewards", rewards)?
        .with("lamports_per_mint", lamports_per_mint)?
        .with("owners_number", owners)?
        .with("total_fees", total_fees)?
        .with("paid_owners", paid)?
        .with("failed_transfers", failed)?)
}

#[async_trait]
impl Activity for AirdropRewardsActivity {
    fn id(&self) -> &str {
        Self::ID
    }

    fn step_count(&self) -> u32 {
        3
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::BatchOperation
    }

    #[allow(clippy::cast_precision_loss)]
    async fn run(&self, ctx: &mut ActivityContext<'_>) -> Result<ActivityOutputs, ActivityAbort> {
        let snapshot = ctx.cluster_snapshot().await?;
        if self.mints.is_empty() {
            return summary(0, 0, 0, 0, 0, 0);
        }

        ctx.report(1, "Building owners snapshot", 0.0);
        let mints = self.mints.clone();
        let owners = ctx
            .require("owners snapshot", move |client| async move {
                client.owners_by_mints(&mints).await
            })
            .await?;
        ctx.report(1, "Building owners snapshot", 1.0);

        ctx.report(2, "Computing rewards", 0.0);
        let total_fees = snapshot
            .lamports_per_signature
            .saturating_mul(owners.len() as u64);
        let creator = self.creator.clone();
        let balance = ctx
            .require("creator balance", move |client| async move {
                client.balance(&creator).await
            })
            .await?;
        let rewards = balance.checked_sub(total_fees).ok_or_else(|| {
            ActivityAbort::Precondition(format!("balance {balance} does not cover fees {total_fees}"))
        })?;
        let lamports_per_mint = rewards / self.mints.len() as u64;
        info!(rewards, lamports_per_mint, owners = owners.len(), total_fees, "rewards computed");

        if self.inhibit_transactions {
            return summary(rewards, lamports_per_mint, owners.len(), total_fees, 0, 0);
        }

        ctx.report(3, "Executing rewards transactions", 0.0);
        let mut paid: BTreeMap<Address, u64> = BTreeMap::new();
        let mut failed = 0usize;
        for (done, (owner, held)) in owners.iter().enumerate() {
            let amount = lamports_per_mint.saturating_mul(held.len() as u64);
            if amount > 0 {
                let request = TransferRequest {
                    from: self.creator.clone(),
                    to: owner.clone(),
                    amount,
                    asset: Asset::Native,
                    recent_blockhash: Some(snapshot.recent_blockhash.clone()),
                };
                match ctx
                    .attempt("reward transfer", move |client| async move {
                        client.transfer(&request).await
                    })
                    .await?
                {
                    StepOutcome::Done(_) => {
                        paid.insert(owner.clone(), amount);
                    }
                    StepOutcome::Failed(_) => failed += 1,
                }
            } else {
                debug!(%owner, "reward rounds to zero, skipped");
            }
            ctx.report(
                3,
                "Executing rewards transactions",
                (done + 1) as f32 / owners.len() as f32,
            );
        }

        summary(rewards, lamports_per_mint, owners.len(), total_fees, paid.len(), failed)
    }
}
