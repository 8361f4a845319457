//! Settlement executor for the CZRpay deferred settlement engine
//!
//! [`SettlementEngine`] owns the commit ledger and the Upcoming/Waiting
//! queues and drives each obligation from match detection to a broadcast
//! payment. The wallet, the match feed and the pending-action feed are
//! reached through the traits in [`collaborators`].

pub mod collaborators;
pub mod engine;
pub mod recovery;
pub mod ticker;


pub use collaborators::*;
pub use engine::*;
pub use recovery::*;
pub use ticker::*;
