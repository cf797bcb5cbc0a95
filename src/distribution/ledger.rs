//! Failure ledger: recipients whose transfer did not complete.
//!
//! A ledger is built incrementally during one run and persisted once at the end.
//! Feeding it back through [`FailureLedger::into_recipients`] retries exactly the
//! recipients that failed.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::recipients::{RecipientMap, UniqueEntries};
use crate::chain::Address;

/// Errors raised by ledger stores.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Reading, writing, or renaming the ledger file failed.
    #[error("ledger io error at {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The stored ledger is not a valid `address -> amount` object.
    #[error("malformed ledger at {location}: {message}")]
    Malformed {
        /// Where the ledger was read from.
        location: String,
        /// Parser message.
        message: String,
    },
}

/// Recipient to unpaid amount. Persisted as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FailureLedger(BTreeMap<Address, u64>);

impl FailureLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an unpaid amount for `recipient`, adding to any amount already recorded.
    pub fn record(&mut self, recipient: Address, amount: u64) {
        let entry = self.0.entry(recipient).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Number of failed recipients.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when nothing failed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total unpaid amount.
    pub fn total(&self) -> u64 {
        self.0.values().fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    /// Unpaid amount for `recipient`.
    pub fn get(&self, recipient: &Address) -> Option<u64> {
        self.0.get(recipient).copied()
    }

    /// Iterate in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, u64)> {
        self.0.iter().map(|(a, v)| (a, *v))
    }

    /// Use the ledger as the input of a retry run.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Malformed` when the ledger cannot form a recipient map
    /// (zero amounts, or a total that overflows `u64`).
    pub fn into_recipients(self) -> Result<RecipientMap, LedgerError> {
        RecipientMap::from_pairs(self.0).map_err(|e| LedgerError::Malformed {
            location: "failure ledger".to_string(),
            message: e.to_string(),
        })
    }

    /// Build from persisted entries, enforcing the rules every loaded ledger obeys:
    /// unique addresses, non-zero amounts, and a total that fits in `u64`.
    fn from_entries(entries: Vec<(Address, u64)>) -> Result<Self, String> {
        let mut ledger = Self::new();
        let mut total: u64 = 0;
        for (address, amount) in entries {
            if amount == 0 {
                return Err(format!("amount for {address} is zero"));
            }
            total = total
                .checked_add(amount)
                .ok_or_else(|| format!("total amount overflows u64 at {address}"))?;
            if ledger.0.insert(address.clone(), amount).is_some() {
                return Err(format!("duplicate address {address}"));
            }
        }
        Ok(ledger)
    }

    /// Parse the persisted form.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Malformed` for invalid JSON, duplicate addresses, zero
    /// amounts, or a total that overflows `u64`.
    pub fn from_json(input: &str, location: &str) -> Result<Self, LedgerError> {
        let malformed = |message: String| LedgerError::Malformed {
            location: location.to_string(),
            message,
        };
        let entries: UniqueEntries<u64> =
            serde_json::from_str(input).map_err(|e| malformed(e.to_string()))?;
        Self::from_entries(entries.0).map_err(malformed)
    }
}

impl<'de> Deserialize<'de> for FailureLedger {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = UniqueEntries::<u64>::deserialize(deserializer)?;
        Self::from_entries(entries.0).map_err(serde::de::Error::custom)
    }
}

impl FromIterator<(Address, u64)> for FailureLedger {
    fn from_iter<I: IntoIterator<Item = (Address, u64)>>(iter: I) -> Self {
        let mut ledger = Self::new();
        for (address, amount) in iter {
            ledger.record(address, amount);
        }
        ledger
    }
}

/// Durable storage for a failure ledger.
pub trait LedgerStore: Send + Sync {
    /// Persist `ledger`, replacing any previous one. Returns where it was stored.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` when the ledger could not be stored.
    fn save(&self, ledger: &FailureLedger) -> Result<Option<PathBuf>, LedgerError>;

    /// Load the stored ledger, if any.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` when the stored ledger cannot be read or parsed.
    fn load(&self) -> Result<Option<FailureLedger>, LedgerError>;

    /// Remove the stored ledger. Removing a missing ledger succeeds.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` when an existing ledger could not be removed.
    fn clear(&self) -> Result<(), LedgerError>;
}
