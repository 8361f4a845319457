use crate::ValidationError;

/// Errors raised while loading, validating or watching configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid configuration: {}", join_violations(.0))]
    Invalid(Vec<ValidationError>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config source error: {0}")]
    Source(#[from] ::config::ConfigError),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl ConfigError {
    /// Violations behind an `Invalid` error; empty for every other kind
    pub fn violations(&self) -> &[ValidationError] {
        match self {
            ConfigError::Invalid(v) => v,
            _ => &[],
        }
    }
}

fn join_violations(violations: &[ValidationError]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, ConfigError>;
