//! Failure ledger stores.

pub mod json_file;
pub mod memory;

pub use crate::distribution::ledger::{FailureLedger, LedgerError, LedgerStore};
pub use json_file::JsonFileLedgerStore;
pub use memory::InMemoryLedgerStore;
