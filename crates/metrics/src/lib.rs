//! Metrics and logging for the CZRpay settlement engine
//!
//! Prometheus counters and gauges cover the obligation lifecycle (derivation,
//! queueing, commits, broadcasts, refusals). Tracing helpers install the
//! global subscriber and tag each settlement attempt with a correlation id.
//!
//! # Example
//!
//! ```no_run
//! use czrpay_metrics::{init_tracing_with_metrics, LoggingOptions, MetricsCollector};
//! use std::sync::Arc;
//!
//! let collector = Arc::new(MetricsCollector::new());
//! init_tracing_with_metrics(&LoggingOptions::default(), collector.clone()).unwrap();
//!
//! collector.record_obligation_derived();
//! println!("{}", collector.encode().unwrap());
//! ```

pub mod collector;
pub mod metrics;
pub mod tracing;

pub use collector::{MetricsCollector, MetricsError};
pub use tracing::{
    init_tracing, init_tracing_with_metrics, CorrelationId, LoggingOptions, MetricsLayer,
    SettlementSpan, TracingError,
};
