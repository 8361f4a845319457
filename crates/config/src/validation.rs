//! Configuration validation

use crate::{AppConfig, ConfigError, Result, SettlementConfig, StoreBackend};

/// Validation error details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate the entire application configuration, reporting every violation
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let mut errors = Vec::new();

    // Validate network config
    if let Err(e) = validate_log_level(&config.network.log_level) {
        errors.push(e);
    }

    // Validate settlement config
    errors.extend(validate_settlement_config(&config.settlement));

    // Validate store config
    if config.store.backend == StoreBackend::Sqlite {
        let missing = config
            .store
            .sqlite_path
            .as_ref()
            .map_or(true, |p| p.as_os_str().is_empty());
        if missing {
            errors.push(ValidationError::new(
                "store.sqlite_path",
                "sqlite backend requires a database path",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(errors))
    }
}

/// Validate the settlement section
pub fn validate_settlement_config(settlement: &SettlementConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if settlement.settlement_asset.trim().is_empty() {
        errors.push(ValidationError::new(
            "settlement.settlement_asset",
            "settlement asset is required",
        ));
    }

    if settlement.wait_blocks == 0 {
        errors.push(ValidationError::new(
            "settlement.wait_blocks",
            "must be greater than 0",
        ));
    }

    if settlement.tick_interval_secs == 0 {
        errors.push(ValidationError::new(
            "settlement.tick_interval_secs",
            "must be greater than 0",
        ));
    }

    if settlement.approx_seconds_per_block == 0 {
        errors.push(ValidationError::new(
            "settlement.approx_seconds_per_block",
            "must be greater than 0",
        ));
    }

    errors
}

/// Validate log level
fn validate_log_level(level: &str) -> std::result::Result<(), ValidationError> {
    match level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ValidationError::new(
            "network.log_level",
            format!(
                "invalid log level '{level}', must be one of: trace, debug, info, warn, error"
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppConfig, Environment, NetworkConfig, SettlementConfig, StoreConfig};
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_valid_sqlite_config() {
        let config = AppConfig {
            network: NetworkConfig {
                environment: Environment::Testnet,
                log_level: "debug".to_string(),
                json_logs: true,
                metrics_enabled: true,
            },
            settlement: SettlementConfig {
                auto_settle: true,
                ..Default::default()
            },
            store: StoreConfig {
                backend: StoreBackend::Sqlite,
                sqlite_path: Some(PathBuf::from("settlements.db")),
            },
        };

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = AppConfig {
            network: NetworkConfig {
                log_level: "verbose".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_sqlite_requires_path() {
        let config = AppConfig {
            store: StoreConfig {
                backend: StoreBackend::Sqlite,
                sqlite_path: None,
            },
            ..Default::default()
        };

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("store.sqlite_path"));
    }

    #[test]
    fn test_validate_collects_every_violation() {
        let settlement = SettlementConfig {
            settlement_asset: " ".to_string(),
            wait_blocks: 0,
            tick_interval_secs: 0,
            approx_seconds_per_block: 0,
            ..Default::default()
        };

        let errors = validate_settlement_config(&settlement);
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "settlement.settlement_asset",
                "settlement.wait_blocks",
                "settlement.tick_interval_secs",
                "settlement.approx_seconds_per_block",
            ]
        );
    }

    #[test]
    fn test_zero_margin_is_allowed() {
        let settlement = SettlementConfig {
            expire_margin_blocks: 0,
            manual_min_age_blocks: 0,
            ..Default::default()
        };
        assert!(validate_settlement_config(&settlement).is_empty());
    }
}
