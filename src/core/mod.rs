//! Core scheduling abstractions and capacity accounting.

pub mod error;
pub mod job;
pub mod scheduler;
pub mod stats;

pub use error::{AppResult, OpsError, SchedulerError};
pub use job::{
    JobFailure, JobId, JobStatus, Outcome, SaturationReason, Saturated, SubmissionResult, Token,
};
pub use scheduler::{RpcScheduler, SchedulerLimits, Spawn};
pub use stats::SchedulerStats;
