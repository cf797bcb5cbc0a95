//! Batch distribution of transfers with resumable failure tracking.
//!
//! A [`DistributionPlan`] names a payer, an asset, and a [`RecipientMap`].
//! [`BatchDistributor::run`] pays each recipient through the scheduler and
//! returns a [`DistributionReport`] whose [`FailureLedger`] lists everyone left
//! unpaid. Feeding that ledger back as the recipient map retries only those.

pub mod distributor;
pub mod ledger;
pub mod recipients;
pub mod report;

pub use distributor::{retry_plan, retry_stored, BatchDistributor, DistributionPlan, SkipPolicy};
pub use ledger::{FailureLedger, LedgerError, LedgerStore};
pub use recipients::{RecipientMap, RecipientSchema};
pub use report::{DistributionReport, FailureCause, RecipientFailure, SentTransfer};
