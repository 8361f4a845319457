use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::collector::MetricsCollector;

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingOptions {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    pub json: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingOptions {
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Initialize the global tracing subscriber
pub fn init_tracing(options: &LoggingOptions) -> Result<(), TracingError> {
    let json_layer = options
        .json
        .then(|| fmt::layer().with_target(true).json());
    let text_layer = (!options.json).then(|| fmt::layer().with_target(true));

    tracing_subscriber::registry()
        .with(options.env_filter())
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| TracingError::InitError(e.to_string()))?;

    Ok(())
}

/// Initialize tracing with a layer counting error events into `collector`
pub fn init_tracing_with_metrics(
    options: &LoggingOptions,
    collector: Arc<MetricsCollector>,
) -> Result<(), TracingError> {
    let json_layer = options
        .json
        .then(|| fmt::layer().with_target(true).with_thread_ids(true).json());
    let text_layer = (!options.json).then(|| fmt::layer().with_target(true));

    tracing_subscriber::registry()
        .with(options.env_filter())
        .with(json_layer)
        .with(text_layer)
        .with(MetricsLayer::new(collector))
        .try_init()
        .map_err(|e| TracingError::InitError(e.to_string()))?;

    Ok(())
}

/// Tracing layer that counts error events per target
pub struct MetricsLayer {
    collector: Arc<MetricsCollector>,
}

impl MetricsLayer {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }
}

impl<S> Layer<S> for MetricsLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() == Level::ERROR {
            self.collector.record_error_event(metadata.target());
        }
    }
}

/// Correlation ID tying together the log lines of one settlement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(uuid::Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Span context for one settlement attempt
#[derive(Debug, Clone)]
pub struct SettlementSpan {
    pub correlation_id: CorrelationId,
    pub match_id: String,
}

impl SettlementSpan {
    pub fn new(match_id: impl Into<String>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            match_id: match_id.into(),
        }
    }

    /// Build the tracing span, for use with `Instrument` across awaits
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "settlement",
            correlation_id = %self.correlation_id,
            match_id = %self.match_id,
        )
    }

    /// Enter a tracing span for this settlement
    pub fn enter(&self) -> tracing::span::EnteredSpan {
        self.span().entered()
    }
}

/// Tracing error types
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("tracing initialization error: {0}")]
    InitError(String),
}
