//! In-memory ledger store.

use std::path::PathBuf;

use parking_lot::Mutex;

use super::{FailureLedger, LedgerError, LedgerStore};

/// Keeps the last saved ledger in memory, for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    stored: Mutex<Option<FailureLedger>>,
    saves: Mutex<usize>,
}

impl InMemoryLedgerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently stored ledger.
    pub fn stored(&self) -> Option<FailureLedger> {
        self.stored.lock().clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn save(&self, ledger: &FailureLedger) -> Result<Option<PathBuf>, LedgerError> {
        *self.stored.lock() = Some(ledger.clone());
        *self.saves.lock() += 1;
        Ok(None)
    }

    fn load(&self) -> Result<Option<FailureLedger>, LedgerError> {
        Ok(self.stored.lock().clone())
    }

    fn clear(&self) -> Result<(), LedgerError> {
        self.stored.lock().take();
        Ok(())
    }
}
