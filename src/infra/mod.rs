//! Storage adapters.

pub mod ledger;

pub use ledger::{InMemoryLedgerStore, JsonFileLedgerStore};
