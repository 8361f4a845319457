use czrpay_types::MatchId;
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("obligation already queued: {0}")]
    DuplicateObligation(MatchId),

    #[error("settlement already committed: {0}")]
    AlreadyCommitted(MatchId),

    #[error(
        "obligation {match_id} too close to expiry: {blocks_until_expiry} blocks left, margin {margin}"
    )]
    ExpiredObligation {
        match_id: MatchId,
        blocks_until_expiry: i64,
        margin: u64,
    },

    #[error("obligation {match_id} not yet active: {blocks_remaining} blocks remaining")]
    NotYetActive {
        match_id: MatchId,
        blocks_remaining: u64,
    },

    #[error("insufficient balance at {address}: need {needed}, have {available}")]
    InsufficientBalance {
        address: String,
        needed: u128,
        available: u128,
    },

    #[error("broadcast failed for {match_id}: {reason}")]
    BroadcastFailure { match_id: MatchId, reason: String },

    #[error("obligation not found: {0}")]
    NotFound(String),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("feed error: {0}")]
    Feed(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SettlementError {
    /// Short label used for refusal metrics
    pub fn reason(&self) -> &'static str {
        match self {
            SettlementError::DuplicateObligation(_) => "duplicate",
            SettlementError::AlreadyCommitted(_) => "already_committed",
            SettlementError::ExpiredObligation { .. } => "expired",
            SettlementError::NotYetActive { .. } => "not_yet_active",
            SettlementError::InsufficientBalance { .. } => "insufficient_balance",
            SettlementError::BroadcastFailure { .. } => "broadcast_failure",
            SettlementError::NotFound(_) => "not_found",
            SettlementError::Wallet(_) => "wallet",
            SettlementError::Feed(_) => "feed",
            SettlementError::Store(_) => "store",
        }
    }
}
