//! # Payout Scheduler
//!
//! Bounded-concurrency job scheduling and batch payouts against a remote chain
//! endpoint.
//!
//! Operations that talk to the endpoint (balance queries, transfers, collection
//! scrapes) are submitted to a single [`RpcScheduler`](core::RpcScheduler) with a
//! hard ceiling on in-flight jobs. Submission never blocks: the caller gets a
//! [`Token`](core::Token) to await, or an explicit
//! [`Saturated`](core::Saturated) signal and retries later.
//!
//! ## Key Features
//!
//! - **Admission control**: lock-free slot reservation, FIFO start order, no hidden retries
//! - **Exactly one outcome per job**: panics and dropped jobs resolve as failures
//! - **Activities**: multi-step procedures with a declared failure policy and guaranteed terminal progress
//! - **Batch distribution**: one transfer per recipient, failures collected in a resumable ledger
//! - **Atomic persistence**: ledgers and reports are written to a temp file and renamed
//!
//! ## Scheduling a job
//!
//! ```rust,ignore
//! use payout_scheduler::builders::start_scheduler;
//! use payout_scheduler::config::SchedulerConfig;
//! use payout_scheduler::core::{Outcome, SubmissionResult};
//!
//! let scheduler = start_scheduler(&SchedulerConfig::with_capacity(8))?;
//! match scheduler.schedule(|| async { Outcome::Success(42u64) }) {
//!     SubmissionResult::Token(token) => println!("{:?}", token.await),
//!     SubmissionResult::Saturated(s) => eprintln!("try later: {s}"),
//! }
//! ```
//!
//! ## Distributing a batch
//!
//! ```rust,ignore
//! use payout_scheduler::distribution::{BatchDistributor, DistributionPlan, RecipientMap, RecipientSchema};
//! use payout_scheduler::infra::JsonFileLedgerStore;
//!
//! let recipients = RecipientMap::from_json(r#"{"addrA": 100, "addrB": 50}"#, RecipientSchema::Amounts)?;
//! let plan = DistributionPlan::new("airdrop", payer, Asset::Native, recipients);
//! let store = JsonFileLedgerStore::in_dir("ledgers", "airdrop");
//! let report = BatchDistributor::new(&scheduler, client, &store).run(&plan).await;
//! if let Some(err) = report.partial_failure() {
//!     // retry later with report.ledger.into_recipients()?
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions and capacity accounting.
pub mod core;
/// Configuration models for the scheduler, endpoint, and operator commands.
pub mod config;
/// Builders to construct scheduler components from configuration.
pub mod builders;
/// Narrow interface to the chain endpoint.
pub mod chain;
/// Progress reporting channel.
pub mod progress;
/// Batch distribution and failure ledgers.
pub mod distribution;
/// Multi-step activities and their executor.
pub mod activity;
/// Storage adapters for failure ledgers.
pub mod infra;
/// Operator commands.
pub mod ops;
/// Runtime adapters hosting scheduler workers.
pub mod runtime;
/// Shared utilities.
pub mod util;
