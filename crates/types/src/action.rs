use serde::{Deserialize, Serialize};

use crate::MatchId;

/// Category of a wallet-side action that has been broadcast but not yet
/// seen on chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    SettlementPayment,
    Order,
    Send,
    Cancel,
    #[serde(other)]
    Other,
}

/// An in-flight broadcast known to the wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub category: ActionCategory,
    #[serde(default)]
    pub match_id: Option<MatchId>,
    #[serde(default)]
    pub tx_hash: Option<String>,
}

impl PendingAction {
    pub fn settlement(match_id: MatchId) -> Self {
        Self {
            category: ActionCategory::SettlementPayment,
            match_id: Some(match_id),
            tx_hash: None,
        }
    }

    /// True if this action is a settlement payment for `match_id`
    pub fn is_settlement_for(&self, match_id: &MatchId) -> bool {
        self.category == ActionCategory::SettlementPayment
            && self.match_id.as_ref() == Some(match_id)
    }
}
