//! Configuration loading from multiple sources

use crate::{AppConfig, ConfigError, Result};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "CZRPAY";

/// Configuration loader with support for multiple formats and sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    ///
    /// Supports TOML, YAML, and JSON formats based on file extension
    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        let content = std::fs::read_to_string(path)?;

        match extension {
            "toml" => Self::from_toml(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            other => Err(ConfigError::UnsupportedFormat(format!(".{other}"))),
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<AppConfig> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(content: &str) -> Result<AppConfig> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from JSON string
    pub fn from_json(content: &str) -> Result<AppConfig> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration from environment variables
    ///
    /// Uses default prefix "CZRPAY"
    pub fn from_env() -> Result<AppConfig> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Load configuration from environment variables with custom prefix
    ///
    /// Environment variables should be in the format: PREFIX_SECTION__KEY
    /// For example: CZRPAY_SETTLEMENT__AUTO_SETTLE=true
    pub fn from_env_with_prefix(prefix: &str) -> Result<AppConfig> {
        let config = Config::builder()
            .add_source(env_source(prefix))
            .build()?;

        config.try_deserialize().map_err(ConfigError::from)
    }

    /// Merge two configurations, with overlay sections taking precedence
    pub fn merge(base: AppConfig, overlay: AppConfig) -> AppConfig {
        let defaults = AppConfig::default();
        AppConfig {
            network: if overlay.network != defaults.network {
                overlay.network
            } else {
                base.network
            },
            settlement: if overlay.settlement != defaults.settlement {
                overlay.settlement
            } else {
                base.settlement
            },
            store: if overlay.store != defaults.store {
                overlay.store
            } else {
                base.store
            },
        }
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Individual keys set in the environment replace the file's values;
    /// everything else comes from the file.
    pub fn from_file_with_env(path: &Path, env_prefix: &str) -> Result<AppConfig> {
        Self::builder()
            .add_file(path, true)
            .add_env(env_prefix)
            .build()
    }

    /// Build configuration using the config crate's builder pattern
    ///
    /// This allows for more complex configuration scenarios with multiple sources
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder {
            builder: Config::builder(),
        }
    }
}

fn env_source(prefix: &str) -> Environment {
    Environment::with_prefix(prefix)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Builder for complex configuration loading scenarios
pub struct ConfigLoaderBuilder {
    builder: ConfigBuilder<config::builder::DefaultState>,
}

impl ConfigLoaderBuilder {
    /// Add a configuration file source
    pub fn add_file(mut self, path: &Path, required: bool) -> Self {
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        };

        self.builder = self
            .builder
            .add_source(File::from(path).format(format).required(required));
        self
    }

    /// Add environment variable source with prefix
    pub fn add_env(mut self, prefix: &str) -> Self {
        self.builder = self.builder.add_source(env_source(prefix));
        self
    }

    /// Set a default value for a key
    pub fn set_default(mut self, key: &str, value: &str) -> Result<Self> {
        self.builder = self.builder.set_default(key, value)?;
        Ok(self)
    }

    /// Build the final configuration
    pub fn build(self) -> Result<AppConfig> {
        let config = self.builder.build()?;
        config.try_deserialize().map_err(ConfigError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_toml() {
        let toml = r#"
            [network]
            environment = "testnet"
            log_level = "debug"
            json_logs = true

            [settlement]
            settlement_asset = "CZR"
            wait_blocks = 3
            auto_settle = true

            [store]
            backend = "sqlite"
            sqlite_path = "/var/lib/czrpay/settlements.db"
        "#;

        let config = ConfigLoader::from_toml(toml).unwrap();
        assert_eq!(config.network.log_level, "debug");
        assert!(config.network.json_logs);
        assert_eq!(config.settlement.wait_blocks, 3);
        assert_eq!(config.settlement.expire_margin_blocks, 6);
        assert!(config.settlement.auto_settle);
        assert_eq!(config.store.backend, crate::StoreBackend::Sqlite);
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
network:
  environment: testnet
  log_level: debug

settlement:
  minimum_reserve: 10000
  tick_interval_secs: 30
        "#;

        let config = ConfigLoader::from_yaml(yaml).unwrap();
        assert_eq!(config.network.environment, crate::Environment::Testnet);
        assert_eq!(config.settlement.minimum_reserve, 10000);
        assert_eq!(config.settlement.tick_interval_secs, 30);
        assert_eq!(config.store.backend, crate::StoreBackend::Memory);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"
{
  "network": {
    "environment": "mainnet",
    "log_level": "warn"
  },
  "settlement": {
    "manual_min_age_blocks": 2
  }
}
        "#;

        let config = ConfigLoader::from_json(json).unwrap();
        assert_eq!(config.network.log_level, "warn");
        assert_eq!(config.settlement.manual_min_age_blocks, 2);
        assert_eq!(config.settlement.wait_blocks, 6);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = ConfigLoader::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.settlement.settlement_asset, "CZR");
        assert_eq!(config.settlement.minimum_reserve, 5430);
        assert!(!config.settlement.auto_settle);
    }

    #[test]
    fn test_load_from_file() {
        let toml = r#"
[network]
environment = "testnet"
log_level = "debug"
        "#;

        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let config = ConfigLoader::from_file(file.path()).unwrap();
        assert_eq!(config.network.log_level, "debug");
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let result = ConfigLoader::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_merge_configs() {
        let base = AppConfig {
            network: crate::NetworkConfig {
                environment: crate::Environment::Local,
                log_level: "trace".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let overlay = AppConfig {
            settlement: crate::SettlementConfig {
                auto_settle: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = ConfigLoader::merge(base, overlay);
        assert_eq!(merged.network.log_level, "trace");
        assert!(merged.settlement.auto_settle);
    }

    #[test]
    fn test_builder_defaults_and_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(b"[settlement]\nwait_blocks = 4\n").unwrap();

        let config = ConfigLoader::builder()
            .set_default("network.log_level", "warn")
            .unwrap()
            .add_file(file.path(), true)
            .build()
            .unwrap();

        assert_eq!(config.network.log_level, "warn");
        assert_eq!(config.settlement.wait_blocks, 4);
    }
}
