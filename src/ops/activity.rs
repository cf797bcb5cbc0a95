//! Activity dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::Utc;
use tracing::info;

use super::OpsEnv;
use crate::activity::{
    execute, ActivityRegistry, ActivityResult, AirdropRewardsActivity, ClearToFundActivity,
    DummyActivity,
};
use crate::chain::Mint;
use crate::config::OperatorConfig;
use crate::core::AppResult;
use crate::progress::ProgressSink;
use crate::util::write_json_atomic;

/// Registry with the built-in activities.
///
/// The dummy activity is always present. Fund clearing needs both the creator and
/// fund accounts; the reward airdrop needs the creator account and pays the
/// holders of `mints`.
///
/// # Errors
///
/// Fails only if two built-in activities share an id.
pub fn default_registry(config: &OperatorConfig, mints: Vec<Mint>) -> AppResult<ActivityRegistry> {
    let inhibit = config.debug.inhibit_transactions;
    let mut registry = ActivityRegistry::new();
    registry.register(Arc::new(DummyActivity::default()))?;
    if let (Some(creator), Some(fund)) = (&config.accounts.creator, &config.accounts.fund) {
        registry.register(Arc::new(
            ClearToFundActivity::new(creator.clone(), fund.clone()).inhibit_transactions(inhibit),
        ))?;
    }
    if let Some(creator) = &config.accounts.creator {
        registry.register(Arc::new(
            AirdropRewardsActivity::new(creator.clone(), mints).inhibit_transactions(inhibit),
        ))?;
    }
    Ok(registry)
}

/// Run the activity registered as `id` and write its result to
/// `<reports_dir>/<id>-<timestamp>.json`.
///
/// # Errors
///
/// Fails when no activity has that id or the result cannot be written. A failed
/// activity run is not an error: check [`ActivityResult::is_success`].
pub async fn run_activity(
    env: &OpsEnv<'_>,
    registry: &ActivityRegistry,
    id: &str,
    progress: Option<ProgressSink>,
) -> AppResult<(ActivityResult, PathBuf)> {
    let activity = registry.get(id).ok_or_else(|| {
        anyhow!(
            "unknown activity `{id}`; registered: {}",
            registry.ids().collect::<Vec<_>>().join(", ")
        )
    })?;
    let date = Utc::now();
    let result = execute(activity.as_ref(), date, env.scheduler, env.client.clone(), progress).await;

    let path = env
        .config
        .paths
        .reports_dir
        .join(format!("{id}-{}.json", date.format("%Y%m%dT%H%M%S")));
    write_json_atomic(&path, &result.to_json())
        .with_context(|| format!("writing activity result {}", path.display()))?;
    info!(activity = id, success = result.is_success(), path = %path.display(), "activity result written");
    Ok((result, path))
}
