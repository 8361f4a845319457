//! Configuration management for the CZRpay settlement engine
//!
//! This crate provides centralized configuration management with support for:
//! - Multiple config formats (TOML, YAML, JSON)
//! - Environment variable overrides (`CZRPAY_SECTION__KEY`)
//! - Config validation
//! - Hot-reload support

mod config;
mod error;
mod loader;
mod validation;
mod watcher;

pub use config::*;
pub use error::*;
pub use loader::*;
pub use validation::*;
pub use watcher::*;
