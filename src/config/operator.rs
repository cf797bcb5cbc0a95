//! Root operator configuration: endpoint, accounts, paths, and debug switches.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::SchedulerConfig;
use crate::chain::Address;

const DEVNET_URL: &str = "https://api.devnet.solana.com";
const MAINNET_URL: &str = "https://api.mainnet-beta.solana.com";

/// Environment variable overriding the scheduler capacity.
pub const ENV_CAPACITY: &str = "PAYOUT_CAPACITY";
/// Environment variable overriding the cluster (`devnet`, `mainnet`, or a URL).
pub const ENV_CLUSTER: &str = "PAYOUT_CLUSTER";

/// Cluster the chain client connects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Cluster {
    /// Public development cluster.
    #[default]
    Devnet,
    /// Public main cluster.
    Mainnet,
    /// Any other RPC endpoint.
    Custom(String),
}

impl Cluster {
    /// RPC endpoint URL.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Devnet => DEVNET_URL,
            Self::Mainnet => MAINNET_URL,
            Self::Custom(url) => url,
        }
    }

    /// Parse a short name (`devnet`/`d`, `mainnet`/`m`) or an http(s) URL.
    ///
    /// # Errors
    ///
    /// Returns a message when the value is neither a known name nor a URL.
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "devnet" | "d" => Ok(Self::Devnet),
            "mainnet" | "mainnet-beta" | "m" => Ok(Self::Mainnet),
            other if other.starts_with("http://") || other.starts_with("https://") => {
                Ok(Self::Custom(value.trim().to_string()))
            }
            other => Err(format!("unknown cluster `{other}`")),
        }
    }
}

/// Connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Target cluster.
    #[serde(default)]
    pub cluster: Cluster,
}

/// Accounts the operator pays from. Keys are loaded by the chain client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Account holding shareholder dividends and receiving cleared funds.
    #[serde(default)]
    pub fund: Option<Address>,
    /// Account paying holder rewards and airdrops.
    #[serde(default)]
    pub creator: Option<Address>,
}

/// Debug switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Verbose logging.
    #[serde(default)]
    pub verbose: bool,
    /// Compute everything but send no transfers.
    #[serde(default)]
    pub inhibit_transactions: bool,
    /// Send holder notifications even when transfers are inhibited.
    #[serde(default)]
    pub force_notify: bool,
}

/// Output locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for scrape and holder reports.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
    /// Directory for failure ledgers.
    #[serde(default = "default_ledger_dir")]
    pub ledger_dir: PathBuf,
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_ledger_dir() -> PathBuf {
    PathBuf::from("ledgers")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            ledger_dir: default_ledger_dir(),
        }
    }
}

/// Root configuration for operator commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Scheduler limits.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Endpoint selection.
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Paying accounts.
    #[serde(default)]
    pub accounts: AccountsConfig,
    /// Debug switches.
    #[serde(default)]
    pub debug: DebugConfig,
    /// Output locations.
    #[serde(default)]
    pub paths: PathsConfig,
}

impl OperatorConfig {
    /// Validate all sections.
    ///
    /// # Errors
    ///
    /// Returns a message naming the invalid section.
    pub fn validate(&self) -> Result<(), String> {
        self.scheduler
            .validate()
            .map_err(|e| format!("scheduler invalid: {e}"))?;
        if let Cluster::Custom(url) = &self.connection.cluster {
            if url.trim().is_empty() {
                return Err("connection invalid: custom cluster url is empty".into());
            }
        }
        Ok(())
    }

    /// Parse operator configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message for malformed JSON or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `PAYOUT_CAPACITY` / `PAYOUT_CLUSTER` overrides, loading `.env` first.
    ///
    /// # Errors
    ///
    /// Returns a message when an override is malformed or the result is invalid.
    pub fn with_env_overrides(mut self) -> Result<Self, String> {
        // A missing .env file is fine.
        let _ = dotenvy::dotenv();
        if let Ok(raw) = std::env::var(ENV_CAPACITY) {
            self.scheduler.capacity = raw
                .parse()
                .map_err(|e| format!("{ENV_CAPACITY}={raw}: {e}"))?;
        }
        if let Ok(raw) = std::env::var(ENV_CLUSTER) {
            self.connection.cluster =
                Cluster::parse(&raw).map_err(|e| format!("{ENV_CLUSTER}: {e}"))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Fund account, required by dividend distribution and fund clearing.
    ///
    /// # Errors
    ///
    /// Returns a message when the account is not configured.
    pub fn fund_account(&self) -> Result<&Address, String> {
        self.accounts
            .fund
            .as_ref()
            .ok_or_else(|| "accounts.fund is not configured".to_string())
    }

    /// Creator account, required by reward airdrops and token distribution.
    ///
    /// # Errors
    ///
    /// Returns a message when the account is not configured.
    pub fn creator_account(&self) -> Result<&Address, String> {
        self.accounts
            .creator
            .as_ref()
            .ok_or_else(|| "accounts.creator is not configured".to_string())
    }
}
