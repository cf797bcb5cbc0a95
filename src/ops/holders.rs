//! Holder snapshots.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use super::scrape::CollectionData;
use super::OpsEnv;
use crate::chain::{HolderMap, Mint};
use crate::core::{AppResult, OpsError};
use crate::util::write_json_atomic;

/// Owners of a set of mints, as written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderSnapshot {
    /// Holder to mints held.
    pub holders: HolderMap,
    /// Where the snapshot was written.
    pub path: PathBuf,
}

impl HolderSnapshot {
    /// Number of mints across all holders.
    pub fn mint_count(&self) -> usize {
        self.holders.values().map(Vec::len).sum()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MintListFile {
    Plain(Vec<Mint>),
    Collection(CollectionData),
}

/// Read a mint list: either a JSON array of mints or a scraped [`CollectionData`] report.
///
/// # Errors
///
/// `OpsError::Io` when the file cannot be read, `OpsError::Parse` when it has
/// neither shape or lists no mints.
pub fn load_mint_list(path: &Path) -> Result<Vec<Mint>, OpsError> {
    let raw = fs::read_to_string(path)?;
    let mints = match serde_json::from_str::<MintListFile>(&raw)
        .map_err(|e| OpsError::parse(format!("mint list {}", path.display()), e))?
    {
        MintListFile::Plain(mints) => mints,
        MintListFile::Collection(data) => data.mints,
    };
    if mints.is_empty() {
        return Err(OpsError::parse(
            format!("mint list {}", path.display()),
            "no mints listed",
        ));
    }
    Ok(mints)
}

/// Resolve the current owner of every mint and write the holder map to `out`.
///
/// # Errors
///
/// Fails for an empty mint list, saturation, endpoint failure, or write failure.
pub async fn snapshot_holders(env: &OpsEnv<'_>, mints: Vec<Mint>, out: &Path) -> AppResult<HolderSnapshot> {
    if mints.is_empty() {
        return Err(OpsError::parse("mint list", "no mints listed").into());
    }
    let requested = mints.len();
    let holders = env
        .call(move |client| async move { client.owners_by_mints(&mints).await })
        .await
        .context("resolving mint owners")?;
    write_json_atomic(out, &holders)
        .with_context(|| format!("writing holder snapshot {}", out.display()))?;

    let snapshot = HolderSnapshot {
        holders,
        path: out.to_path_buf(),
    };
    info!(
        holders = snapshot.holders.len(),
        mints = requested,
        path = %out.display(),
        "holder snapshot written"
    );
    Ok(snapshot)
}
