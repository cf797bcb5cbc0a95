//! Tests for configuration parsing and validation

use parking_lot::{Mutex, MutexGuard};
use payout_scheduler::config::operator::{ENV_CAPACITY, ENV_CLUSTER};
use payout_scheduler::config::{Cluster, OperatorConfig, SchedulerConfig};

#[test]
fn test_scheduler_config_validation() {
    assert!(SchedulerConfig::with_capacity(8).validate().is_ok());
    assert!(SchedulerConfig::with_capacity(0).validate().is_err());

    let zero_workers = SchedulerConfig {
        capacity: 4,
        worker_count: Some(0),
    };
    assert!(zero_workers.validate().is_err());
}

#[test]
fn test_scheduler_limits_from_config() {
    let cfg = SchedulerConfig {
        capacity: 10,
        worker_count: Some(2),
    };
    let limits = cfg.limits();
    assert_eq!(limits.capacity, 10);
    assert_eq!(limits.worker_count, 2);
    assert_eq!(SchedulerConfig::with_capacity(6).limits().worker_count, 6);
}

#[test]
fn test_scheduler_config_from_json() {
    let cfg = SchedulerConfig::from_json_str(r#"{"capacity": 12}"#).unwrap();
    assert_eq!(cfg.capacity, 12);
    assert_eq!(cfg.worker_count, None);

    assert!(SchedulerConfig::from_json_str(r#"{"capacity": 0}"#).is_err());
    assert!(SchedulerConfig::from_json_str("{capacity").is_err());
}

#[test]
fn test_operator_config_from_json() {
    let json = r#"{
        "scheduler": {"capacity": 3},
        "connection": {"cluster": "mainnet"},
        "accounts": {"fund": "FundAccount111", "creator": "Creator111"},
        "debug": {"inhibit_transactions": true},
        "paths": {"reports_dir": "out/reports", "ledger_dir": "out/ledgers"}
    }"#;
    let cfg = OperatorConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.scheduler.capacity, 3);
    assert_eq!(cfg.connection.cluster, Cluster::Mainnet);
    assert_eq!(cfg.fund_account().unwrap().as_str(), "FundAccount111");
    assert!(cfg.debug.inhibit_transactions);
    assert!(!cfg.debug.force_notify);
    assert_eq!(cfg.paths.ledger_dir, std::path::PathBuf::from("out/ledgers"));
}

#[test]
fn test_operator_config_defaults() {
    let cfg = OperatorConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg.connection.cluster, Cluster::Devnet);
    assert!(cfg.scheduler.capacity > 0);
    assert!(cfg.fund_account().is_err());
    assert!(cfg.creator_account().is_err());
}

#[test]
fn test_operator_config_rejects_bad_values() {
    assert!(OperatorConfig::from_json_str(r#"{"scheduler": {"capacity": 0}}"#).is_err());
    assert!(OperatorConfig::from_json_str(r#"{"accounts": {"fund": "has space"}}"#).is_err());
    assert!(OperatorConfig::from_json_str(r#"{"connection": {"cluster": {"custom": "  "}}}"#).is_err());
}

#[test]
fn test_cluster_endpoints() {
    assert!(Cluster::Devnet.endpoint().contains("devnet"));
    assert_eq!(
        Cluster::parse("https://rpc.example.org").unwrap().endpoint(),
        "https://rpc.example.org"
    );
    assert!(Cluster::parse("testnet").is_err());
}

// Environment variables are process-wide; tests touching them hold this lock.
static ENV_LOCK: Mutex<()> = Mutex::new(());

struct EnvOverrides {
    _lock: MutexGuard<'static, ()>,
}

impl EnvOverrides {
    fn set(capacity: Option<&str>, cluster: Option<&str>) -> Self {
        let lock = ENV_LOCK.lock();
        for (key, value) in [(ENV_CAPACITY, capacity), (ENV_CLUSTER, cluster)] {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
        Self { _lock: lock }
    }
}

impl Drop for EnvOverrides {
    fn drop(&mut self) {
        std::env::remove_var(ENV_CAPACITY);
        std::env::remove_var(ENV_CLUSTER);
    }
}

#[test]
fn test_env_overrides_applied() {
    let _env = EnvOverrides::set(Some("7"), Some("mainnet"));
    let cfg = OperatorConfig::default().with_env_overrides().unwrap();
    assert_eq!(cfg.scheduler.capacity, 7);
    assert_eq!(cfg.connection.cluster, Cluster::Mainnet);
}

#[test]
fn test_env_overrides_absent_keep_config() {
    let _env = EnvOverrides::set(None, None);
    let mut base = OperatorConfig::default();
    base.scheduler.capacity = 3;
    let cfg = base.clone().with_env_overrides().unwrap();
    assert_eq!(cfg, base);
}

#[test]
fn test_env_override_custom_cluster_url() {
    let _env = EnvOverrides::set(None, Some("https://rpc.example.org"));
    let cfg = OperatorConfig::default().with_env_overrides().unwrap();
    assert_eq!(cfg.connection.cluster, Cluster::Custom("https://rpc.example.org".into()));
}

#[test]
fn test_env_override_malformed_capacity_rejected() {
    let _env = EnvOverrides::set(Some("abc"), None);
    let err = OperatorConfig::default().with_env_overrides().unwrap_err();
    assert!(err.contains(ENV_CAPACITY), "{err}");
}

#[test]
fn test_env_override_zero_capacity_rejected() {
    let _env = EnvOverrides::set(Some("0"), None);
    let err = OperatorConfig::default().with_env_overrides().unwrap_err();
    assert!(err.contains("scheduler invalid"), "{err}");
}

#[test]
fn test_env_override_unknown_cluster_rejected() {
    let _env = EnvOverrides::set(None, Some("testnet"));
    let err = OperatorConfig::default().with_env_overrides().unwrap_err();
    assert!(err.contains(ENV_CLUSTER), "{err}");
}
