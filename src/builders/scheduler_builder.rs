//! Build a scheduler from configuration.

use std::sync::Arc;

use tracing::info;

use crate::config::SchedulerConfig;
use crate::core::{RpcScheduler, SchedulerError, Spawn};

/// Validate `cfg` and build a scheduler whose workers run on `spawner`.
///
/// The scheduler is returned stopped; call [`RpcScheduler::start`] before awaiting tokens.
///
/// # Errors
///
/// Returns `SchedulerError::InvalidConfig` when the configuration is invalid.
pub fn build_scheduler(cfg: &SchedulerConfig, spawner: Arc<dyn Spawn>) -> Result<RpcScheduler, SchedulerError> {
    cfg.validate()
        .map_err(|e| SchedulerError::InvalidConfig(format!("config invalid: {e}")))?;
    let limits = cfg.limits();
    info!(
        capacity = limits.capacity,
        worker_count = limits.worker_count,
        "building scheduler"
    );
    RpcScheduler::new(limits, spawner)
}

/// Build and start a scheduler on the current tokio runtime.
///
/// # Errors
///
/// Returns an error for invalid configuration or when called outside a runtime.
pub fn start_scheduler(cfg: &SchedulerConfig) -> Result<RpcScheduler, SchedulerError> {
    let spawner: Arc<dyn Spawn> = Arc::new(crate::runtime::TokioSpawner::current()?);
    let scheduler = build_scheduler(cfg, spawner)?;
    scheduler.start();
    Ok(scheduler)
}
