//! Tests for utility functions

use payout_scheduler::util::fs::temp_path_for;
use payout_scheduler::util::{init_tracing, write_atomic, write_json_atomic};
use serde_json::json;

#[test]
fn test_write_atomic_creates_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("out.txt");
    write_atomic(&path, b"hello").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
}

#[test]
fn test_write_json_atomic_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    write_json_atomic(&path, &json!({"a": 1})).unwrap();
    write_json_atomic(&path, &json!({"b": 2})).unwrap();

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value, json!({"b": 2}));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_temp_paths_are_unique() {
    let path = std::path::Path::new("ledgers/airdrop.failed.json");
    assert_ne!(temp_path_for(path), temp_path_for(path));
}

#[test]
fn test_init_tracing_twice() {
    init_tracing();
    init_tracing();
    tracing::info!(component = "util_test", "tracing initialized");
}
