//! Jobs, tokens, and the tagged outcomes they resolve to.
//!
//! A submission is answered synchronously with a [`SubmissionResult`]: either a
//! [`Token`] for an admitted job or an explicit [`Saturated`] rejection. An admitted
//! job always resolves its token to exactly one [`Outcome`], even when the operation
//! panics or the scheduler drops it.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Admission-order identifier assigned to every admitted job.
pub type JobId = u64;

/// Reason and optional remote error code attached to a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    /// Human readable reason.
    pub reason: String,
    /// Error code reported by the remote endpoint, or one of the local codes below.
    pub code: Option<i64>,
}

impl JobFailure {
    /// Local code: the operation panicked while running.
    pub const PANICKED: i64 = -32_900;
    /// Local code: the job was dropped before producing an outcome.
    pub const ABANDONED: i64 = -32_901;

    /// Failure reported by the remote endpoint with its error code.
    pub fn remote(reason: impl Into<String>, code: i64) -> Self {
        Self {
            reason: reason.into(),
            code: Some(code),
        }
    }

    /// Failure without a remote error code.
    pub fn local(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            code: None,
        }
    }

    pub(crate) fn panicked(id: JobId) -> Self {
        Self::remote(format!("job {id} panicked"), Self::PANICKED)
    }

    pub(crate) fn abandoned(id: JobId) -> Self {
        Self::remote(format!("job {id} was dropped before completing"), Self::ABANDONED)
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "error[{code}]: {}", self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

impl std::error::Error for JobFailure {}

/// Result of a scheduled operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    /// The operation produced a value.
    Success(T),
    /// The operation failed, either locally or because the endpoint rejected it.
    Failure(JobFailure),
}

impl<T> Outcome<T> {
    /// Shorthand for a failure outcome.
    pub fn failure(reason: impl Into<String>, code: Option<i64>) -> Self {
        Self::Failure(JobFailure {
            reason: reason.into(),
            code,
        })
    }

    /// True for [`Outcome::Success`].
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Convert into a standard `Result`.
    ///
    /// # Errors
    ///
    /// Returns the [`JobFailure`] of a failed outcome.
    pub fn into_result(self) -> Result<T, JobFailure> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(failure) => Err(failure),
        }
    }

    /// Map the success value, leaving failures untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Failure(failure) => Outcome::Failure(failure),
        }
    }
}

impl<T> From<Result<T, JobFailure>> for Outcome<T> {
    fn from(result: Result<T, JobFailure>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(failure) => Self::Failure(failure),
        }
    }
}

/// Lifecycle of an admitted job. Rejected submissions never enter it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Admitted and waiting for a worker.
    Submitted,
    /// Picked up by a worker.
    Running,
    /// Finished with [`Outcome::Success`].
    Completed,
    /// Finished with [`Outcome::Failure`].
    Failed,
}

impl JobStatus {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Submitted => 0,
            Self::Running => 1,
            Self::Completed => 2,
            Self::Failed => 3,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Submitted,
            1 => Self::Running,
            2 => Self::Completed,
            _ => Self::Failed,
        }
    }
}

/// Shared, lock-free status cell written by the worker and read through the token.
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(JobStatus::Submitted.as_u8()))
    }

    pub(crate) fn set(&self, status: JobStatus) {
        self.0.store(status.as_u8(), Ordering::Release);
    }

    pub(crate) fn get(&self) -> JobStatus {
        JobStatus::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Handle to an admitted job. Await it to obtain the job's [`Outcome`].
#[must_use = "a token does nothing unless awaited"]
pub struct Token<T> {
    id: JobId,
    status: Arc<StatusCell>,
    rx: oneshot::Receiver<Outcome<T>>,
}

impl<T> Token<T> {
    pub(crate) const fn new(
        id: JobId,
        status: Arc<StatusCell>,
        rx: oneshot::Receiver<Outcome<T>>,
    ) -> Self {
        Self { id, status, rx }
    }

    /// Admission-order id of the job.
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Current lifecycle state of the job.
    pub fn status(&self) -> JobStatus {
        self.status.get()
    }
}

impl<T> fmt::Debug for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("id", &self.id)
            .field("status", &self.status())
            .finish()
    }
}

impl<T> Future for Token<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // Sender dropped without a value: the job never ran to completion.
            Poll::Ready(Err(_)) => Poll::Ready(Outcome::Failure(JobFailure::abandoned(this.id))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Why a submission was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationReason {
    /// Every in-flight slot is taken.
    AtCapacity,
    /// The scheduler has been stopped and admits nothing.
    Stopped,
}

impl fmt::Display for SaturationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtCapacity => write!(f, "at capacity"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Backpressure signal: the operation was not started. Resubmit later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("scheduler saturated ({reason}): {in_flight}/{capacity} jobs in flight")]
pub struct Saturated {
    /// Configured concurrency ceiling.
    pub capacity: usize,
    /// In-flight count observed when the submission was refused.
    pub in_flight: usize,
    /// Why the submission was refused.
    pub reason: SaturationReason,
}

/// Synchronous answer to a submission.
#[must_use]
#[derive(Debug)]
pub enum SubmissionResult<T> {
    /// The job was admitted; await the token for its outcome.
    Token(Token<T>),
    /// The job was refused and never started.
    Saturated(Saturated),
}

impl<T> SubmissionResult<T> {
    /// True when the submission was refused.
    pub const fn is_saturated(&self) -> bool {
        matches!(self, Self::Saturated(_))
    }

    /// Convert into a standard `Result`.
    ///
    /// # Errors
    ///
    /// Returns the [`Saturated`] signal of a refused submission.
    pub fn into_result(self) -> Result<Token<T>, Saturated> {
        match self {
            Self::Token(token) => Ok(token),
            Self::Saturated(saturated) => Err(saturated),
        }
    }
}
