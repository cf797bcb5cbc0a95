//! Collection scraping.

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::OpsEnv;
use crate::chain::{Address, CollectionFilter, Mint};
use crate::core::AppResult;
use crate::util::write_json_atomic;

/// Mints of a collection and the filter that found them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionData {
    /// Collection name filter.
    #[serde(default)]
    pub name: Option<String>,
    /// Collection symbol filter.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Update authority filter.
    #[serde(default)]
    pub update_authority: Option<Address>,
    /// Mints found.
    pub mints: Vec<Mint>,
}

/// Scrape the mints matching `filter` and write them to `<reports_dir>/<report_name>.json`.
///
/// # Errors
///
/// Fails when the scheduler is saturated, the endpoint rejects the query, or the
/// report cannot be written.
pub async fn scrape_collection(
    env: &OpsEnv<'_>,
    filter: CollectionFilter,
    report_name: &str,
) -> AppResult<(CollectionData, PathBuf)> {
    info!(
        cluster = env.config.connection.cluster.endpoint(),
        name = ?filter.name,
        symbol = ?filter.symbol,
        update_authority = ?filter.update_authority,
        "scraping collection"
    );
    let query = filter.clone();
    let mints = env
        .call(move |client| async move { client.collection_mints(&query).await })
        .await
        .context("scraping collection mints")?;

    let data = CollectionData {
        name: filter.name,
        symbol: filter.symbol,
        update_authority: filter.update_authority,
        mints,
    };
    let path = env.config.paths.reports_dir.join(format!("{report_name}.json"));
    write_json_atomic(&path, &data)
        .with_context(|| format!("writing collection report {}", path.display()))?;
    info!(mints = data.mints.len(), path = %path.display(), "collection scraped");
    Ok((data, path))
}
