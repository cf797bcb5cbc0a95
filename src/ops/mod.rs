//! Operator commands.
//!
//! Each function is one command an external dispatcher (CLI, service) can call.
//! They share an [`OpsEnv`]: configuration, the process-wide scheduler, and the
//! chain client. Inputs are parsed and validated before any job is scheduled.

pub mod activity;
pub mod dividends;
pub mod holders;
pub mod notifier;
pub mod scrape;
pub mod tokens;

use std::sync::Arc;

use crate::chain::ChainClient;
use crate::config::OperatorConfig;
use crate::core::{OpsError, Outcome, RpcScheduler, SubmissionResult};

pub use activity::{default_registry, run_activity};
pub use dividends::{
    compute_dividends, distribute_dividends, retry_failed_dividends, validate_shareholders, DividendReport,
    DividendRetry, DividendSplit, ShareHolder,
};
pub use holders::{load_mint_list, snapshot_holders, HolderSnapshot};
pub use notifier::{Notifier, NotifyError, TracingNotifier};
pub use scrape::{scrape_collection, CollectionData};
pub use tokens::{distribute_tokens, retry_failed_tokens, TokenDistribution};

/// Shared handles for operator commands.
#[derive(Clone)]
pub struct OpsEnv<'a> {
    /// Operator configuration.
    pub config: &'a OperatorConfig,
    /// Scheduler every remote call goes through.
    pub scheduler: &'a RpcScheduler,
    /// Chain client.
    pub client: Arc<dyn ChainClient>,
}

impl<'a> OpsEnv<'a> {
    /// Bundle the handles.
    pub fn new(config: &'a OperatorConfig, scheduler: &'a RpcScheduler, client: Arc<dyn ChainClient>) -> Self {
        Self {
            config,
            scheduler,
            client,
        }
    }

    /// Schedule one remote call and wait for it.
    ///
    /// # Errors
    ///
    /// `OpsError::Saturated` when the scheduler refuses the call,
    /// `OpsError::RemoteRejected` when the call fails.
    pub async fn call<T, F, Fut>(&self, operation: F) -> Result<T, OpsError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn ChainClient>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Outcome<T>> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        match self.scheduler.schedule(move || operation(client)) {
            SubmissionResult::Token(token) => token.await.into_result().map_err(OpsError::from),
            SubmissionResult::Saturated(saturated) => Err(saturated.into()),
        }
    }
}
