use czrpay_types::{LegSide, MatchRecord, SettlementObligation, DEFAULT_SETTLEMENT_ASSET};
use tracing::debug;

/// Turns raw match records into settlement obligations owed by the local wallet
#[derive(Debug, Clone)]
pub struct ObligationFactory {
    settlement_asset: String,
}

impl Default for ObligationFactory {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLEMENT_ASSET)
    }
}

impl ObligationFactory {
    pub fn new(settlement_asset: impl Into<String>) -> Self {
        Self {
            settlement_asset: settlement_asset.into(),
        }
    }

    pub fn settlement_asset(&self) -> &str {
        &self.settlement_asset
    }

    /// The leg the local wallet placed that gives the settlement asset, if
    /// any. The first leg wins when both qualify.
    pub fn owing_side<S: AsRef<str>>(
        &self,
        record: &MatchRecord,
        wallet_addresses: &[S],
    ) -> Option<LegSide> {
        let ours = |address: &str| wallet_addresses.iter().any(|a| a.as_ref() == address);

        [LegSide::First, LegSide::Second].into_iter().find(|side| {
            let leg = record.leg(*side);
            ours(leg.address) && leg.gives.is_asset(&self.settlement_asset)
        })
    }

    /// Derive the obligation, or `None` when the counterparty is the one
    /// who owes
    pub fn derive<S: AsRef<str>>(
        &self,
        record: &MatchRecord,
        wallet_addresses: &[S],
    ) -> Option<SettlementObligation> {
        let Some(side) = self.owing_side(record, wallet_addresses) else {
            debug!(
                match_id = %record.match_id(),
                "No local leg owes the settlement asset"
            );
            return None;
        };

        let ours = record.leg(side);
        let theirs = record.counter_leg(side);

        Some(SettlementObligation {
            match_id: record.match_id(),
            payer_address: ours.address.to_string(),
            payee_address: theirs.address.to_string(),
            asset: self.settlement_asset.clone(),
            amount: ours.gives.normalized(),
            amount_raw: ours.gives.raw,
            match_block_height: record.match_height(),
            match_expire_height: record.match_expire_index,
            other_asset: theirs.gives.asset.clone(),
            other_amount: theirs.gives.normalized(),
            other_amount_raw: theirs.gives.raw,
            payer_order_tx_hash: ours.tx_hash.to_string(),
            payer_order_tx_index: ours.tx_index,
            counter_order_tx_index: theirs.tx_index,
        })
    }
}
