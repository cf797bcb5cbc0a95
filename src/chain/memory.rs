//! In-memory chain for development, dry runs, and tests.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    Address, Asset, ChainClient, ClusterSnapshot, CollectionFilter, HolderMap, Mint, Signature,
    TransferRequest,
};
use crate::core::{JobFailure, Outcome};

/// Error code used when the paying account cannot cover a transfer.
pub const INSUFFICIENT_FUNDS: i64 = -32_003;

/// On-chain metadata of a collection mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRecord {
    /// Token identifier.
    pub mint: Mint,
    /// Collection name.
    pub name: String,
    /// Collection symbol.
    pub symbol: String,
    /// Update authority.
    pub update_authority: Address,
    /// Current owner.
    pub owner: Address,
}

#[derive(Default)]
struct ChainState {
    balances: HashMap<Address, u64>,
    token_balances: HashMap<(Address, Mint), u64>,
    mints: Vec<MintRecord>,
    rejected: HashMap<Address, JobFailure>,
    transfers: Vec<TransferRequest>,
    balance_queries: usize,
    next_signature: u64,
}

/// Deterministic in-memory chain.
///
/// Balances move on successful transfers; native transfers additionally pay the
/// per-signature fee. Transfers to a recipient registered with
/// [`InMemoryChain::reject_transfers_to`] fail with the given failure.
pub struct InMemoryChain {
    lamports_per_signature: u64,
    latency: Option<Duration>,
    state: Mutex<ChainState>,
}

impl InMemoryChain {
    /// Empty chain with the given fee.
    pub fn new(lamports_per_signature: u64) -> Self {
        Self {
            lamports_per_signature,
            latency: None,
            state: Mutex::new(ChainState::default()),
        }
    }

    /// Delay every call, to keep jobs in flight.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Set a native balance.
    pub fn set_balance(&self, address: &Address, lamports: u64) {
        self.state.lock().balances.insert(address.clone(), lamports);
    }

    /// Set a token balance.
    pub fn set_token_balance(&self, owner: &Address, mint: &Mint, amount: u64) {
        self.state
            .lock()
            .token_balances
            .insert((owner.clone(), mint.clone()), amount);
    }

    /// Register a collection mint.
    pub fn add_mint(&self, record: MintRecord) {
        self.state.lock().mints.push(record);
    }

    /// Make every transfer to `recipient` fail with `failure`.
    pub fn reject_transfers_to(&self, recipient: &Address, failure: JobFailure) {
        self.state.lock().rejected.insert(recipient.clone(), failure);
    }

    /// Stop rejecting transfers to `recipient`.
    pub fn accept_transfers_to(&self, recipient: &Address) {
        self.state.lock().rejected.remove(recipient);
    }

    /// Successful transfers in submission order.
    pub fn transfers(&self) -> Vec<TransferRequest> {
        self.state.lock().transfers.clone()
    }

    /// Number of balance lookups served.
    pub fn balance_queries(&self) -> usize {
        self.state.lock().balance_queries
    }

    /// Native balance, zero when unknown.
    pub fn balance_of(&self, address: &Address) -> u64 {
        self.state.lock().balances.get(address).copied().unwrap_or(0)
    }

    /// Token balance, zero when unknown.
    pub fn token_balance_of(&self, owner: &Address, mint: &Mint) -> u64 {
        self.state
            .lock()
            .token_balances
            .get(&(owner.clone(), mint.clone()))
            .copied()
            .unwrap_or(0)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn apply_transfer(&self, request: &TransferRequest) -> Outcome<Signature> {
        let mut state = self.state.lock();
        if let Some(failure) = state.rejected.get(&request.to) {
            return Outcome::Failure(failure.clone());
        }

        let fee = self.lamports_per_signature;
        let payer_balance = state.balances.get(&request.from).copied().unwrap_or(0);
        match &request.asset {
            Asset::Native => {
                let required = request.amount.saturating_add(fee);
                if payer_balance < required {
                    return Outcome::failure(
                        format!("balance {payer_balance} below {required}"),
                        Some(INSUFFICIENT_FUNDS),
                    );
                }
                state
                    .balances
                    .insert(request.from.clone(), payer_balance - required);
                *state.balances.entry(request.to.clone()).or_insert(0) += request.amount;
            }
            Asset::Token { mint } => {
                let source_key = (request.from.clone(), mint.clone());
                let source = state.token_balances.get(&source_key).copied().unwrap_or(0);
                if source < request.amount || payer_balance < fee {
                    return Outcome::failure(
                        format!("token balance {source} below {}", request.amount),
                        Some(INSUFFICIENT_FUNDS),
                    );
                }
                state.token_balances.insert(source_key, source - request.amount);
                *state
                    .token_balances
                    .entry((request.to.clone(), mint.clone()))
                    .or_insert(0) += request.amount;
                state.balances.insert(request.from.clone(), payer_balance - fee);
            }
        }

        state.next_signature += 1;
        let signature = Signature(format!("sig-{}", state.next_signature));
        state.transfers.push(request.clone());
        Outcome::Success(signature)
    }
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new(5_000)
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    async fn cluster_snapshot(&self) -> Outcome<ClusterSnapshot> {
        self.simulate_latency().await;
        let counter = self.state.lock().next_signature;
        Outcome::Success(ClusterSnapshot {
            recent_blockhash: format!("blockhash-{counter}"),
            lamports_per_signature: self.lamports_per_signature,
        })
    }

    async fn balance(&self, address: &Address) -> Outcome<u64> {
        self.simulate_latency().await;
        let mut state = self.state.lock();
        state.balance_queries += 1;
        Outcome::Success(state.balances.get(address).copied().unwrap_or(0))
    }

    async fn token_balance(&self, owner: &Address, mint: &Mint) -> Outcome<u64> {
        self.simulate_latency().await;
        let mut state = self.state.lock();
        state.balance_queries += 1;
        Outcome::Success(
            state
                .token_balances
                .get(&(owner.clone(), mint.clone()))
                .copied()
                .unwrap_or(0),
        )
    }

    async fn transfer(&self, request: &TransferRequest) -> Outcome<Signature> {
        self.simulate_latency().await;
        self.apply_transfer(request)
    }

    async fn collection_mints(&self, filter: &CollectionFilter) -> Outcome<Vec<Mint>> {
        self.simulate_latency().await;
        let state = self.state.lock();
        let mints = state
            .mints
            .iter()
            .filter(|r| filter.name.as_ref().is_none_or(|n| *n == r.name))
            .filter(|r| filter.symbol.as_ref().is_none_or(|s| *s == r.symbol))
            .filter(|r| {
                filter
                    .update_authority
                    .as_ref()
                    .is_none_or(|a| *a == r.update_authority)
            })
            .map(|r| r.mint.clone())
            .collect();
        Outcome::Success(mints)
    }

    async fn owners_by_mints(&self, mints: &[Mint]) -> Outcome<HolderMap> {
        self.simulate_latency().await;
        let state = self.state.lock();
        let mut owners: HolderMap = BTreeMap::new();
        for mint in mints {
            let Some(record) = state.mints.iter().find(|r| &r.mint == mint) else {
                return Outcome::failure(format!("mint {mint} not found"), None);
            };
            owners
                .entry(record.owner.clone())
                .or_default()
                .push(mint.clone());
        }
        Outcome::Success(owners)
    }
}
