//! CZRpay deferred settlement engine
//!
//! When a local sell order matches, the wallet owes the counterparty a
//! payment in the settlement asset. This workspace tracks each such
//! obligation from detection until it is paid, waiting out chain
//! reorganisations first and never paying twice.
//!
//! - [`types`]: match records, obligations and pending actions
//! - [`settlement`]: obligation factory, eligibility window, commit ledger,
//!   queues and settlement stores
//! - [`engine`]: the settlement executor and its collaborator traits
//! - [`config`]: layered configuration with hot reload
//! - [`metrics`]: Prometheus metrics and tracing setup

pub use czrpay_config as config;
pub use czrpay_engine as engine;
pub use czrpay_metrics as metrics;
pub use czrpay_settlement as settlement;
pub use czrpay_types as types;
