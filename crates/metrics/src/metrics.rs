use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge_vec,
    Histogram, IntCounter, IntCounterVec, IntGaugeVec,
};

lazy_static! {
    // ═══════════════════════════════════════════════════════════════════════════
    // OBLIGATION METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Obligations derived from the match feed
    pub static ref OBLIGATIONS_DERIVED: IntCounter = register_int_counter!(
        "czrpay_obligations_derived_total",
        "Total number of settlement obligations derived from matches"
    )
    .unwrap();

    /// Obligations currently queued, by queue
    pub static ref OBLIGATIONS_PENDING: IntGaugeVec = register_int_gauge_vec!(
        "czrpay_obligations_pending",
        "Settlement obligations currently queued",
        &["queue"]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // SETTLEMENT METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Ledger commits (first settlement attempt per obligation)
    pub static ref SETTLEMENTS_COMMITTED: IntCounter = register_int_counter!(
        "czrpay_settlements_committed_total",
        "Total number of settlement commits recorded in the ledger"
    )
    .unwrap();

    /// Successful payment broadcasts
    pub static ref SETTLEMENTS_BROADCAST: IntCounter = register_int_counter!(
        "czrpay_settlements_broadcast_total",
        "Total number of settlement payments broadcast"
    )
    .unwrap();

    /// Failed payment broadcasts
    pub static ref BROADCAST_FAILURES: IntCounter = register_int_counter!(
        "czrpay_broadcast_failures_total",
        "Total number of failed settlement broadcasts"
    )
    .unwrap();

    /// Settlement attempts refused before broadcast, by reason
    pub static ref SETTLEMENT_REFUSALS: IntCounterVec = register_int_counter_vec!(
        "czrpay_settlement_refusals_total",
        "Settlement attempts refused before broadcast",
        &["reason"]
    )
    .unwrap();

    /// Broadcast round-trip (in milliseconds)
    pub static ref BROADCAST_DURATION: Histogram = register_histogram!(
        "czrpay_broadcast_duration_ms",
        "Settlement broadcast duration in milliseconds",
        vec![10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 30000.0]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // SYSTEM METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// ERROR level log events, by target
    pub static ref ERROR_EVENTS: IntCounterVec = register_int_counter_vec!(
        "czrpay_error_events_total",
        "Error level log events by target",
        &["target"]
    )
    .unwrap();
}
