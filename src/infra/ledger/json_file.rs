//! JSON file ledger store with atomic replacement.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{FailureLedger, LedgerError, LedgerStore};
use crate::util::fs::write_atomic;

/// Stores the ledger as a JSON object at a fixed path.
///
/// Saves write `<path>.<uuid>.tmp` and rename it over `path`, so a reader never
/// sees a partially written ledger.
#[derive(Debug, Clone)]
pub struct JsonFileLedgerStore {
    path: PathBuf,
}

impl JsonFileLedgerStore {
    /// Store at `path`. Nothing is touched until the first save.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store for `label` inside `dir`: `<dir>/<label>.failed.json`.
    pub fn in_dir(dir: impl AsRef<Path>, label: &str) -> Self {
        Self::new(dir.as_ref().join(format!("{label}.failed.json")))
    }

    /// Ledger file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl LedgerStore for JsonFileLedgerStore {
    fn save(&self, ledger: &FailureLedger) -> Result<Option<PathBuf>, LedgerError> {
        let bytes = serde_json::to_vec_pretty(ledger).map_err(|e| LedgerError::Malformed {
            location: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        write_atomic(&self.path, &bytes).map_err(|e| self.io_error(e))?;
        info!(
            path = %self.path.display(),
            entries = ledger.len(),
            amount = ledger.total(),
            "failure ledger saved"
        );
        Ok(Some(self.path.clone()))
    }

    fn load(&self) -> Result<Option<FailureLedger>, LedgerError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        FailureLedger::from_json(&raw, &self.path.display().to_string()).map(Some)
    }

    fn clear(&self) -> Result<(), LedgerError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "failure ledger cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
