//! Core configuration structures for the CZRpay settlement engine

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Network and logging configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Settlement lifecycle parameters
    #[serde(default)]
    pub settlement: SettlementConfig,

    /// Persistence backend
    #[serde(default)]
    pub store: StoreConfig,
}

/// Network environment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Environment type (mainnet, testnet, local)
    #[serde(default = "default_environment")]
    pub environment: Environment,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,

    /// Enable metrics collection
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

/// Environment types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Mainnet,
    Testnet,
    Local,
}

/// Settlement lifecycle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Asset the local wallet pays when its orders match
    #[serde(default = "default_settlement_asset")]
    pub settlement_asset: String,

    /// Blocks to wait after a match before paying
    #[serde(default = "default_wait_blocks")]
    pub wait_blocks: u64,

    /// Refuse to pay when this few blocks (or fewer) remain before expiry
    #[serde(default = "default_wait_blocks")]
    pub expire_margin_blocks: u64,

    /// Minimum match age for a manual payment
    #[serde(default = "default_wait_blocks")]
    pub manual_min_age_blocks: u64,

    /// Subunits kept back on top of the owed amount for fees
    #[serde(default = "default_minimum_reserve")]
    pub minimum_reserve: u64,

    /// Pay automatically once an obligation becomes active
    #[serde(default)]
    pub auto_settle: bool,

    /// Seconds between queue ticks
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,

    /// Average block time, for display estimates
    #[serde(default = "default_approx_seconds_per_block")]
    pub approx_seconds_per_block: u64,
}

/// Persistence configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,

    /// Database file, required by the sqlite backend
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
}

/// Store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

// Default value functions
fn default_environment() -> Environment {
    Environment::Local
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_settlement_asset() -> String {
    "CZR".to_string()
}

fn default_wait_blocks() -> u64 {
    6
}

fn default_minimum_reserve() -> u64 {
    5430
}

fn default_tick_interval_secs() -> u64 {
    60
}

fn default_approx_seconds_per_block() -> u64 {
    600 // 10 minutes
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Memory
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
            json_logs: false,
            metrics_enabled: default_true(),
        }
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            settlement_asset: default_settlement_asset(),
            wait_blocks: default_wait_blocks(),
            expire_margin_blocks: default_wait_blocks(),
            manual_min_age_blocks: default_wait_blocks(),
            minimum_reserve: default_minimum_reserve(),
            auto_settle: false,
            tick_interval_secs: default_tick_interval_secs(),
            approx_seconds_per_block: default_approx_seconds_per_block(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            sqlite_path: None,
        }
    }
}
