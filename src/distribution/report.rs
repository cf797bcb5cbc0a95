//! Summary of one distribution run.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::ledger::FailureLedger;
use crate::chain::{Address, Signature};
use crate::core::{JobFailure, OpsError, Saturated};

/// A transfer that landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentTransfer {
    /// Recipient.
    pub recipient: Address,
    /// Amount sent.
    pub amount: u64,
    /// Transaction signature.
    pub signature: Signature,
}

/// Why a recipient ended up in the failure ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The scheduler refused the transfer or the holding lookup.
    Saturated(Saturated),
    /// The transfer job failed.
    Rejected(JobFailure),
    /// The holding lookup used by the skip check failed.
    LookupFailed(JobFailure),
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saturated(s) => write!(f, "{s}"),
            Self::Rejected(failure) => write!(f, "transfer failed: {failure}"),
            Self::LookupFailed(failure) => write!(f, "holding lookup failed: {failure}"),
        }
    }
}

/// A recipient that was not paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientFailure {
    /// Recipient.
    pub recipient: Address,
    /// Unpaid amount.
    pub amount: u64,
    /// Cause.
    pub cause: FailureCause,
}

/// Outcome of a distribution run. Produced even when every transfer failed.
#[derive(Debug, Clone, Default)]
pub struct DistributionReport {
    /// Run label.
    pub label: String,
    /// Recipients in the input map.
    pub total_recipients: usize,
    /// Sum of input amounts.
    pub total_amount: u64,
    /// Recipients skipped by the precondition.
    pub skipped: Vec<Address>,
    /// Sum of skipped amounts.
    pub skipped_amount: u64,
    /// Transfers that landed, in processing order.
    pub sent: Vec<SentTransfer>,
    /// Sum of sent amounts.
    pub sent_amount: u64,
    /// Unpaid recipients, in processing order.
    pub failures: Vec<RecipientFailure>,
    /// Unpaid recipients and amounts; the input of a retry run.
    pub ledger: FailureLedger,
    /// Where the ledger was persisted.
    pub ledger_location: Option<PathBuf>,
    /// Set when persisting or clearing the ledger failed.
    pub persist_error: Option<String>,
}

impl DistributionReport {
    /// True when every non-skipped recipient was paid.
    pub fn is_complete(&self) -> bool {
        self.ledger.is_empty()
    }

    /// Number of unpaid recipients.
    pub fn failed_count(&self) -> usize {
        self.ledger.len()
    }

    /// `OpsError::PartialBatchFailure` when some recipients were not paid.
    pub fn partial_failure(&self) -> Option<OpsError> {
        (!self.is_complete()).then(|| OpsError::PartialBatchFailure {
            failed: self.ledger.len(),
            ledger: self.ledger_location.clone(),
        })
    }
}

impl fmt::Display for DistributionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} recipients, {} sent ({}), {} skipped ({}), {} failed ({})",
            self.label,
            self.total_recipients,
            self.sent.len(),
            self.sent_amount,
            self.skipped.len(),
            self.skipped_amount,
            self.ledger.len(),
            self.ledger.total(),
        )?;
        if let Some(path) = &self.ledger_location {
            write!(f, ", ledger at {}", path.display())?;
        }
        Ok(())
    }
}
