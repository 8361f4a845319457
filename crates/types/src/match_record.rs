use serde::{Deserialize, Serialize};

use crate::{AssetAmount, BlockHeight, MatchId};

/// Status of an order match as reported by the match feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Completed,
    Expired,
    #[serde(other)]
    Unknown,
}

/// Raw order-match record as delivered by the match feed.
///
/// The first leg (`tx0_*`) gives `forward_asset`, the second leg (`tx1_*`)
/// gives `backward_asset`. Nothing downstream of the obligation factory reads
/// this type directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub tx0_address: String,
    pub tx1_address: String,

    pub tx0_hash: String,
    pub tx1_hash: String,

    pub tx0_index: u64,
    pub tx1_index: u64,

    pub tx0_block_index: BlockHeight,
    pub tx1_block_index: BlockHeight,

    pub forward_asset: String,
    pub backward_asset: String,

    #[serde(alias = "_forward_asset_divisible", default = "default_divisible")]
    pub forward_asset_divisible: bool,
    #[serde(alias = "_backward_asset_divisible", default = "default_divisible")]
    pub backward_asset_divisible: bool,

    /// Raw quantity given by the first leg
    pub forward_quantity: u64,
    /// Raw quantity given by the second leg
    pub backward_quantity: u64,

    /// Height beyond which the match is void
    pub match_expire_index: BlockHeight,

    pub status: MatchStatus,
}

fn default_divisible() -> bool {
    true
}

/// Which side of a match a leg sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegSide {
    First,
    Second,
}

/// One side of an order match, viewed from the party that placed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLeg<'a> {
    pub side: LegSide,
    pub address: &'a str,
    pub tx_hash: &'a str,
    pub tx_index: u64,
    /// What this leg owes its counterparty
    pub gives: AssetAmount,
}

impl MatchRecord {
    pub fn match_id(&self) -> MatchId {
        MatchId::from_legs(&self.tx0_hash, &self.tx1_hash)
    }

    pub fn is_pending(&self) -> bool {
        self.status == MatchStatus::Pending
    }

    /// Height at which the match was made (the later of the two legs)
    pub fn match_height(&self) -> BlockHeight {
        self.tx1_block_index
    }

    pub fn leg(&self, side: LegSide) -> MatchLeg<'_> {
        match side {
            LegSide::First => MatchLeg {
                side,
                address: &self.tx0_address,
                tx_hash: &self.tx0_hash,
                tx_index: self.tx0_index,
                gives: AssetAmount::new(
                    self.forward_asset.clone(),
                    self.forward_quantity,
                    self.forward_asset_divisible,
                ),
            },
            LegSide::Second => MatchLeg {
                side,
                address: &self.tx1_address,
                tx_hash: &self.tx1_hash,
                tx_index: self.tx1_index,
                gives: AssetAmount::new(
                    self.backward_asset.clone(),
                    self.backward_quantity,
                    self.backward_asset_divisible,
                ),
            },
        }
    }

    /// The leg on the other side of `side`
    pub fn counter_leg(&self, side: LegSide) -> MatchLeg<'_> {
        match side {
            LegSide::First => self.leg(LegSide::Second),
            LegSide::Second => self.leg(LegSide::First),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED_JSON: &str = r#"{
        "tx0_address": "1Alice",
        "tx1_address": "1Bob",
        "tx0_hash": "aa",
        "tx1_hash": "bb",
        "tx0_index": 10,
        "tx1_index": 11,
        "tx0_block_index": 98,
        "tx1_block_index": 100,
        "forward_asset": "CZR",
        "backward_asset": "XCP",
        "_forward_asset_divisible": true,
        "_backward_asset_divisible": false,
        "forward_quantity": 50000000,
        "backward_quantity": 7,
        "match_expire_index": 120,
        "status": "pending"
    }"#;

    #[test]
    fn test_deserialize_feed_record() {
        let record: MatchRecord = serde_json::from_str(FEED_JSON).unwrap();
        assert!(record.is_pending());
        assert!(!record.backward_asset_divisible);
        assert_eq!(record.match_height(), 100);
        assert_eq!(record.match_id().as_str(), "aabb");
    }

    #[test]
    fn test_unknown_status() {
        let json = FEED_JSON.replace("\"pending\"", "\"invalid: tx1 expired\"");
        let record: MatchRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.status, MatchStatus::Unknown);
        assert!(!record.is_pending());
    }

    #[test]
    fn test_legs() {
        let record: MatchRecord = serde_json::from_str(FEED_JSON).unwrap();

        let first = record.leg(LegSide::First);
        assert_eq!(first.address, "1Alice");
        assert!(first.gives.is_asset("CZR"));

        let counter = record.counter_leg(LegSide::First);
        assert_eq!(counter.side, LegSide::Second);
        assert_eq!(counter.address, "1Bob");
        assert_eq!(counter.gives.raw, 7);
    }
}
