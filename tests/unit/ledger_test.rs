//! Tests for failure ledger parsing and stores

use payout_scheduler::chain::{Address, Asset, InMemoryChain};
use payout_scheduler::core::{RpcScheduler, SchedulerLimits, Spawn};
use payout_scheduler::distribution::{
    retry_stored, BatchDistributor, DistributionPlan, FailureLedger, LedgerError, LedgerStore,
    RecipientMap,
};
use payout_scheduler::infra::{InMemoryLedgerStore, JsonFileLedgerStore};
use payout_scheduler::runtime::TokioSpawner;
use std::sync::Arc;

fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

#[test]
fn test_ledger_accumulates_per_recipient() {
    let mut ledger = FailureLedger::new();
    ledger.record(addr("a"), 10);
    ledger.record(addr("a"), 5);
    ledger.record(addr("b"), 1);
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.get(&addr("a")), Some(15));
    assert_eq!(ledger.total(), 16);
}

#[test]
fn test_ledger_from_json_rejects_bad_input() {
    assert!(FailureLedger::from_json(r#"{"a": 1, "a": 2}"#, "dup.json").is_err());
    assert!(FailureLedger::from_json(r#"{"a": 0}"#, "zero.json").is_err());
    assert!(matches!(
        FailureLedger::from_json("[1, 2]", "list.json"),
        Err(LedgerError::Malformed { .. })
    ));
    let ledger = FailureLedger::from_json(r#"{"a": 3, "b": 4}"#, "ok.json").unwrap();
    assert_eq!(ledger.into_recipients().unwrap().total(), 7);
}

#[test]
fn test_json_store_round_trip_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileLedgerStore::in_dir(dir.path(), "dividends");
    assert!(store.path().ends_with("dividends.failed.json"));
    assert!(store.load().unwrap().is_none());

    let ledger: FailureLedger = [(addr("a"), 3)].into_iter().collect();
    let saved = store.save(&ledger).unwrap();
    assert_eq!(saved.as_deref(), Some(store.path()));
    assert_eq!(store.load().unwrap(), Some(ledger));

    store.clear().unwrap();
    assert!(!store.path().exists());
    store.clear().unwrap();
}

#[test]
fn test_json_store_reports_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileLedgerStore::in_dir(dir.path(), "broken");
    std::fs::write(store.path(), "not json").unwrap();
    assert!(matches!(store.load(), Err(LedgerError::Malformed { .. })));
}

#[test]
fn test_memory_store_counts_saves() {
    let store = InMemoryLedgerStore::new();
    let ledger: FailureLedger = [(addr("a"), 3)].into_iter().collect();
    assert!(store.save(&ledger).unwrap().is_none());
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.stored(), Some(ledger));
    store.clear().unwrap();
    assert!(store.stored().is_none());
}

#[test]
fn test_ledger_total_overflow_is_malformed() {
    let input = r#"{"a": 18446744073709551615, "b": 1}"#;
    assert!(matches!(
        FailureLedger::from_json(input, "overflow.json"),
        Err(LedgerError::Malformed { .. })
    ));
    assert!(serde_json::from_str::<FailureLedger>(input).is_err());
}

#[test]
fn test_serde_and_from_json_accept_the_same_ledgers() {
    for input in [r#"{"a": 0}"#, r#"{"a": 1, "a": 2}"#, r#"{"a": 18446744073709551615, "b": 1}"#] {
        assert!(FailureLedger::from_json(input, "mem").is_err(), "{input}");
        assert!(serde_json::from_str::<FailureLedger>(input).is_err(), "{input}");
    }
    let valid = r#"{"a": 3, "b": 4}"#;
    assert_eq!(
        FailureLedger::from_json(valid, "mem").unwrap(),
        serde_json::from_str::<FailureLedger>(valid).unwrap()
    );
}

#[tokio::test]
async fn test_overflowing_stored_ledger_aborts_retry_and_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileLedgerStore::in_dir(dir.path(), "airdrop");
    std::fs::write(store.path(), r#"{"a": 18446744073709551615, "b": 1}"#).unwrap();

    let spawner: Arc<dyn Spawn> = Arc::new(TokioSpawner::current().unwrap());
    let scheduler = RpcScheduler::new(SchedulerLimits::with_capacity(2), spawner).unwrap();
    scheduler.start();
    let chain = Arc::new(InMemoryChain::new(0));
    let distributor = BatchDistributor::new(&scheduler, chain.clone(), &store);
    let template = DistributionPlan::new("airdrop", addr("payer"), Asset::Native, RecipientMap::default());

    let result = retry_stored(&distributor, &template).await;
    assert!(matches!(result, Err(LedgerError::Malformed { .. })));
    assert!(store.path().exists());
    assert_eq!(scheduler.stats().submitted, 0);
    assert!(chain.transfers().is_empty());
}
