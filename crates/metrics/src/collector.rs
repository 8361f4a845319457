use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use crate::metrics::*;

/// Metrics collector for the settlement lifecycle
#[derive(Debug, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OBLIGATION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record an obligation derived from a match record
    pub fn record_obligation_derived(&self) {
        OBLIGATIONS_DERIVED.inc();
    }

    /// Set the number of obligations currently held by `queue`
    pub fn set_pending(&self, queue: &str, count: usize) {
        OBLIGATIONS_PENDING
            .with_label_values(&[queue])
            .set(count as i64);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SETTLEMENT METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_commit(&self) {
        SETTLEMENTS_COMMITTED.inc();
    }

    /// Record a successful broadcast and its duration
    pub fn record_broadcast(&self, duration: Duration) {
        SETTLEMENTS_BROADCAST.inc();
        BROADCAST_DURATION.observe(duration.as_millis() as f64);
    }

    /// Record a failed broadcast and its duration
    pub fn record_broadcast_failure(&self, duration: Duration) {
        BROADCAST_FAILURES.inc();
        BROADCAST_DURATION.observe(duration.as_millis() as f64);
    }

    /// Record a settlement attempt refused before broadcast
    pub fn record_refusal(&self, reason: &str) {
        SETTLEMENT_REFUSALS.with_label_values(&[reason]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SYSTEM METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn record_error_event(&self, target: &str) {
        ERROR_EVENTS.with_label_values(&[target]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPORT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Encode all registered metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::EncodingError(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::EncodingError(e.to_string()))
    }
}

/// Metrics error types
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("encoding error: {0}")]
    EncodingError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_empty_collector() {
        let collector = MetricsCollector::new();
        assert!(collector.encode().is_ok());
    }

    #[test]
    fn test_record_obligation_metrics() {
        let collector = MetricsCollector::new();

        collector.record_obligation_derived();
        collector.set_pending("upcoming", 3);
        collector.set_pending("waiting", 1);

        let metrics = collector.encode().unwrap();
        assert!(metrics.contains("czrpay_obligations_derived_total"));
        assert!(metrics.contains("czrpay_obligations_pending{queue=\"upcoming\"} 3"));
        assert!(metrics.contains("czrpay_obligations_pending{queue=\"waiting\"} 1"));
    }

    #[test]
    fn test_record_settlement_metrics() {
        let collector = MetricsCollector::new();

        collector.record_commit();
        collector.record_broadcast(Duration::from_millis(120));
        collector.record_broadcast_failure(Duration::from_millis(40));
        collector.record_refusal("expired");

        let metrics = collector.encode().unwrap();
        assert!(metrics.contains("czrpay_settlements_committed_total"));
        assert!(metrics.contains("czrpay_settlements_broadcast_total"));
        assert!(metrics.contains("czrpay_broadcast_failures_total"));
        assert!(metrics.contains("czrpay_broadcast_duration_ms"));
        assert!(metrics.contains("czrpay_settlement_refusals_total{reason=\"expired\"}"));
    }

    #[test]
    fn test_record_error_events() {
        let collector = MetricsCollector::new();
        collector.record_error_event("czrpay_engine::engine");

        let metrics = collector.encode().unwrap();
        assert!(metrics.contains("czrpay_error_events_total{target=\"czrpay_engine::engine\"}"));
    }
}
