//! Error types for scheduler and payout operations.

use std::path::PathBuf;

use thiserror::Error;

use super::job::{JobFailure, Saturated};

/// Errors produced while building or configuring the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Limits or configuration rejected.
    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(String),
    /// No async runtime available to host the workers.
    #[error("runtime unavailable: {0}")]
    Runtime(String),
}

/// Failure taxonomy surfaced by distribution runs and operator commands.
#[derive(Debug, Error)]
pub enum OpsError {
    /// The scheduler refused a job; nothing was started.
    #[error(transparent)]
    Saturated(#[from] Saturated),
    /// The endpoint explicitly rejected an operation.
    #[error("remote rejected operation: {reason} (code {code:?})")]
    RemoteRejected {
        /// Reason reported by the endpoint.
        reason: String,
        /// Error code reported by the endpoint.
        code: Option<i64>,
    },
    /// Malformed input map, ledger, or report file.
    #[error("failed to parse {what}: {message}")]
    Parse {
        /// What was being parsed.
        what: String,
        /// Parser message.
        message: String,
    },
    /// The batch finished but some recipients were not paid.
    #[error("{failed} transfers failed; failure ledger at {}", display_ledger(.ledger))]
    PartialBatchFailure {
        /// Number of recipients in the failure ledger.
        failed: usize,
        /// Where the ledger was persisted.
        ledger: Option<PathBuf>,
    },
    /// The paying account cannot cover fees.
    #[error("insufficient funds: balance {balance} does not cover {required}")]
    InsufficientFunds {
        /// Balance observed.
        balance: u64,
        /// Amount required.
        required: u64,
    },
    /// Configuration rejected.
    #[error("configuration error: {0}")]
    Config(String),
    /// Ledger persistence failed.
    #[error(transparent)]
    Ledger(#[from] crate::infra::ledger::LedgerError),
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl OpsError {
    /// Build a parse error for `what`.
    pub fn parse(what: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }
}

impl From<JobFailure> for OpsError {
    fn from(failure: JobFailure) -> Self {
        Self::RemoteRejected {
            reason: failure.reason,
            code: failure.code,
        }
    }
}

fn display_ledger(ledger: &Option<PathBuf>) -> String {
    ledger
        .as_ref()
        .map_or_else(|| "<not persisted>".to_string(), |p| p.display().to_string())
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::job::SaturationReason;

    #[test]
    fn test_remote_rejected_from_job_failure() {
        let err: OpsError = JobFailure::remote("account in use", -32_005).into();
        assert_eq!(
            format!("{err}"),
            "remote rejected operation: account in use (code Some(-32005))"
        );
    }

    #[test]
    fn test_saturated_is_transparent() {
        let err: OpsError = Saturated {
            capacity: 1,
            in_flight: 1,
            reason: SaturationReason::Stopped,
        }
        .into();
        assert_eq!(
            format!("{err}"),
            "scheduler saturated (stopped): 1/1 jobs in flight"
        );
    }

    #[test]
    fn test_partial_failure_display() {
        let err = OpsError::PartialBatchFailure {
            failed: 2,
            ledger: Some(PathBuf::from("/tmp/ledger.json")),
        };
        assert_eq!(
            format!("{err}"),
            "2 transfers failed; failure ledger at /tmp/ledger.json"
        );
    }
}
