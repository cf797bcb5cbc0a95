//! Narrow interface to the remote chain endpoint.
//!
//! Transaction construction, signing, and wire encoding live behind
//! [`ChainClient`]; the scheduler and the payout engine only see request/response
//! calls returning [`Outcome`]s. Every call is stateless, so one client is shared
//! read-only by all scheduled jobs.

pub mod memory;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::Outcome;

pub use memory::{InMemoryChain, MintRecord};

/// Account address on the chain (base58 text form).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

/// Identifier of a token type.
pub type Mint = Address;

impl Address {
    /// Parse an address, rejecting empty or whitespace-bearing text.
    ///
    /// # Errors
    ///
    /// Returns a message describing why the text is not an address.
    pub fn new(raw: impl Into<String>) -> Result<Self, String> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err("address is empty".into());
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(format!("address `{raw}` contains whitespace"));
        }
        Ok(Self(raw))
    }

    /// Text form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Address {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transaction signature returned for a submitted transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(pub String);

/// What a transfer moves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Asset {
    /// Native currency, amounts in lamports.
    Native,
    /// Fungible or non-fungible token of a mint. The client creates the
    /// recipient's associated account when it does not exist.
    Token {
        /// Token type.
        mint: Mint,
    },
}

/// A single value transfer. Signed and encoded by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Paying account.
    pub from: Address,
    /// Receiving account (owner, for tokens).
    pub to: Address,
    /// Amount in the asset's smallest unit.
    pub amount: u64,
    /// Asset moved.
    pub asset: Asset,
    /// Blockhash to build against; the client fetches one when absent.
    pub recent_blockhash: Option<String>,
}

/// Cluster state needed to build and price transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// Recent blockhash.
    pub recent_blockhash: String,
    /// Fee charged per signature.
    pub lamports_per_signature: u64,
}

/// Filter used to scrape a collection's mints. Absent fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFilter {
    /// Collection name.
    pub name: Option<String>,
    /// Collection symbol.
    pub symbol: Option<String>,
    /// Update authority.
    pub update_authority: Option<Address>,
}

/// Owners of a collection: holder address to the mints it owns.
pub type HolderMap = BTreeMap<Address, Vec<Mint>>;

/// Remote endpoint operations used by the payout engine.
#[async_trait]
pub trait ChainClient: Send + Sync + 'static {
    /// Recent blockhash and fee schedule.
    async fn cluster_snapshot(&self) -> Outcome<ClusterSnapshot>;

    /// Native balance in lamports.
    async fn balance(&self, address: &Address) -> Outcome<u64>;

    /// Token balance of `owner` for `mint`; zero when the associated account does not exist.
    async fn token_balance(&self, owner: &Address, mint: &Mint) -> Outcome<u64>;

    /// Submit a transfer.
    async fn transfer(&self, request: &TransferRequest) -> Outcome<Signature>;

    /// Mints belonging to a collection.
    async fn collection_mints(&self, filter: &CollectionFilter) -> Outcome<Vec<Mint>>;

    /// Current owners of the given mints.
    async fn owners_by_mints(&self, mints: &[Mint]) -> Outcome<HolderMap>;

    /// Holding of `owner` in `asset`.
    async fn holding(&self, owner: &Address, asset: &Asset) -> Outcome<u64> {
        match asset {
            Asset::Native => self.balance(owner).await,
            Asset::Token { mint } => self.token_balance(owner, mint).await,
        }
    }
}
