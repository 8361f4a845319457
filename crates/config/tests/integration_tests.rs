//! Integration tests for the config crate

use czrpay_config::{
    validate_config, AppConfig, ConfigLoader, Environment, NetworkConfig, SettlementConfig,
    StoreBackend, StoreConfig,
};
use std::io::Write;
use std::path::{Path, PathBuf};

fn sample(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../config")
        .join(name)
}

#[test]
fn test_load_testnet_config() {
    let config =
        ConfigLoader::from_file(&sample("testnet.toml")).expect("Failed to load testnet config");

    assert_eq!(config.network.environment, Environment::Testnet);
    assert_eq!(config.network.log_level, "debug");
    assert!(config.network.json_logs);
    assert!(!config.settlement.auto_settle);
    assert_eq!(config.store.backend, StoreBackend::Sqlite);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_load_local_config() {
    let config =
        ConfigLoader::from_file(&sample("local.toml")).expect("Failed to load local config");

    assert_eq!(config.network.environment, Environment::Local);
    assert_eq!(config.network.log_level, "trace");
    assert_eq!(config.settlement.wait_blocks, 2);
    assert!(config.settlement.auto_settle);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_config_validation_invalid_settlement() {
    let config = AppConfig {
        settlement: SettlementConfig {
            wait_blocks: 0,
            tick_interval_secs: 0,
            ..Default::default()
        },
        ..Default::default()
    };

    let err = validate_config(&config).unwrap_err().to_string();
    assert!(err.contains("settlement.wait_blocks"));
    assert!(err.contains("settlement.tick_interval_secs"));
}

#[test]
fn test_validation_error_lists_violations() {
    let config = AppConfig {
        network: NetworkConfig {
            log_level: "loud".to_string(),
            ..Default::default()
        },
        store: StoreConfig {
            backend: StoreBackend::Sqlite,
            sqlite_path: None,
        },
        ..Default::default()
    };

    let err = validate_config(&config).unwrap_err();
    let fields: Vec<_> = err.violations().iter().map(|v| v.field.as_str()).collect();
    assert_eq!(fields, vec!["network.log_level", "store.sqlite_path"]);
}

#[test]
fn test_env_overrides_file_values() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        "[settlement]\nwait_blocks = 4\nauto_settle = false\n\n[network]\nlog_level = \"warn\""
    )
    .unwrap();

    // A prefix unique to this test keeps parallel tests apart
    std::env::set_var("CZRPAYTEST_SETTLEMENT__AUTO_SETTLE", "true");
    std::env::set_var("CZRPAYTEST_SETTLEMENT__MINIMUM_RESERVE", "9000");

    let config = ConfigLoader::from_file_with_env(file.path(), "CZRPAYTEST").unwrap();

    std::env::remove_var("CZRPAYTEST_SETTLEMENT__AUTO_SETTLE");
    std::env::remove_var("CZRPAYTEST_SETTLEMENT__MINIMUM_RESERVE");

    assert!(config.settlement.auto_settle);
    assert_eq!(config.settlement.minimum_reserve, 9000);
    assert_eq!(config.settlement.wait_blocks, 4);
    assert_eq!(config.network.log_level, "warn");
}

#[test]
fn test_env_only_config() {
    std::env::set_var("CZRPAYENV_NETWORK__ENVIRONMENT", "testnet");
    let config = ConfigLoader::from_env_with_prefix("CZRPAYENV").unwrap();
    std::env::remove_var("CZRPAYENV_NETWORK__ENVIRONMENT");

    assert_eq!(config.network.environment, Environment::Testnet);
    assert_eq!(config.settlement, SettlementConfig::default());
}

#[test]
fn test_yaml_format() {
    let yaml = r#"
network:
  environment: mainnet
  log_level: info

settlement:
  wait_blocks: 6
  auto_settle: true

store:
  backend: sqlite
  sqlite_path: /tmp/czrpay.db
"#;

    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let config = ConfigLoader::from_file(file.path()).unwrap();
    assert_eq!(config.network.environment, Environment::Mainnet);
    assert!(config.settlement.auto_settle);
    assert_eq!(
        config.store.sqlite_path.as_deref(),
        Some(Path::new("/tmp/czrpay.db"))
    );
}

#[test]
fn test_json_format() {
    let json = r#"{"settlement": {"settlement_asset": "XCZR", "minimum_reserve": 0}}"#;

    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let config = ConfigLoader::from_file(file.path()).unwrap();
    assert_eq!(config.settlement.settlement_asset, "XCZR");
    assert_eq!(config.settlement.minimum_reserve, 0);
}

#[test]
fn test_default_values() {
    let config = AppConfig::default();

    assert_eq!(config.network.environment, Environment::Local);
    assert_eq!(config.network.log_level, "info");
    assert!(config.network.metrics_enabled);
    assert_eq!(config.settlement.settlement_asset, "CZR");
    assert_eq!(config.settlement.wait_blocks, 6);
    assert_eq!(config.settlement.expire_margin_blocks, 6);
    assert_eq!(config.settlement.manual_min_age_blocks, 6);
    assert_eq!(config.settlement.minimum_reserve, 5430);
    assert_eq!(config.settlement.tick_interval_secs, 60);
    assert_eq!(config.settlement.approx_seconds_per_block, 600);
    assert_eq!(config.store.backend, StoreBackend::Memory);
}
