//! Tests for error types

use payout_scheduler::core::{JobFailure, OpsError, SaturationReason, Saturated, SchedulerError};
use std::path::PathBuf;

#[test]
fn test_invalid_config_error() {
    let err = SchedulerError::InvalidConfig("capacity must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid scheduler configuration: capacity must be greater than 0"
    );
}

#[test]
fn test_saturated_error() {
    let err = OpsError::from(Saturated {
        capacity: 4,
        in_flight: 4,
        reason: SaturationReason::AtCapacity,
    });
    assert_eq!(
        format!("{}", err),
        "scheduler saturated (at capacity): 4/4 jobs in flight"
    );
}

#[test]
fn test_remote_rejected_error() {
    let err = OpsError::from(JobFailure::remote("blockhash not found", -32_002));
    assert!(matches!(err, OpsError::RemoteRejected { code: Some(-32_002), .. }));
    assert!(err.to_string().contains("blockhash not found"));
}

#[test]
fn test_partial_batch_failure_error() {
    let err = OpsError::PartialBatchFailure {
        failed: 3,
        ledger: Some(PathBuf::from("ledgers/airdrop.failed.json")),
    };
    assert_eq!(
        format!("{}", err),
        "3 transfers failed; failure ledger at ledgers/airdrop.failed.json"
    );
    let unsaved = OpsError::PartialBatchFailure { failed: 1, ledger: None };
    assert!(unsaved.to_string().ends_with("<not persisted>"));
}

#[test]
fn test_job_failure_display() {
    assert_eq!(JobFailure::remote("rejected", 7).to_string(), "error[7]: rejected");
    assert_eq!(JobFailure::local("timed out").to_string(), "timed out");
}
