pub mod action;
pub mod asset;
pub mod error;
pub mod match_record;
pub mod obligation;

pub use action::*;
pub use asset::*;
pub use error::*;
pub use match_record::*;
pub use obligation::*;

/// Chain height, in blocks
pub type BlockHeight = u64;

/// Transaction hash returned by the wallet after a broadcast
pub type TxHash = String;
