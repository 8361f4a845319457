use czrpay_types::{BlockHeight, SettlementObligation};
use serde::{Deserialize, Serialize};

/// Process-wide eligibility parameters, in blocks.
///
/// Every derived value is a pure function of an obligation and the current
/// chain height; nothing here is cached on the obligation itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityWindow {
    /// Confirmations required after the match before paying is safe
    pub wait_blocks: u64,

    /// Settlement is refused once this few blocks (or fewer) remain before expiry
    pub expire_margin_blocks: u64,

    /// Minimum match age for a manual settlement from the waiting queue
    pub manual_min_age_blocks: u64,

    /// Used only for display estimates and urgency bands
    pub approx_seconds_per_block: u64,
}

impl Default for EligibilityWindow {
    fn default() -> Self {
        Self {
            wait_blocks: 6,
            expire_margin_blocks: 6,
            manual_min_age_blocks: 6,
            approx_seconds_per_block: 600,
        }
    }
}

/// Where an obligation sits relative to the current chain height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Too recent to act on
    Upcoming { blocks_remaining: u64 },
    /// Safe to settle
    Active,
    /// Inside the expiry margin or past expiry; never settled
    Expired,
}

/// Informational urgency tiers derived from time left before expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UrgencyBand {
    /// More than two hours left
    Relaxed,
    /// More than one hour left
    Soon,
    /// More than thirty minutes left
    Urgent,
    /// Thirty minutes or less, including already expired
    Critical,
}

impl UrgencyBand {
    pub fn from_seconds(seconds_left: i64) -> Self {
        if seconds_left > 2 * 3600 {
            UrgencyBand::Relaxed
        } else if seconds_left > 3600 {
            UrgencyBand::Soon
        } else if seconds_left > 1800 {
            UrgencyBand::Urgent
        } else {
            UrgencyBand::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyBand::Relaxed => "relaxed",
            UrgencyBand::Soon => "soon",
            UrgencyBand::Urgent => "urgent",
            UrgencyBand::Critical => "critical",
        }
    }
}

impl EligibilityWindow {
    fn remaining(required: u64, obligation: &SettlementObligation, height: BlockHeight) -> u64 {
        match height.checked_sub(obligation.match_block_height) {
            Some(age) => required.saturating_sub(age),
            // Height behind the match: reorg or stale feed
            None => required,
        }
    }

    /// Blocks left before the obligation may be settled; zero means now
    pub fn blocks_until_active(&self, obligation: &SettlementObligation, height: BlockHeight) -> u64 {
        Self::remaining(self.wait_blocks, obligation, height)
    }

    /// Same as [`blocks_until_active`](Self::blocks_until_active) but against
    /// the manual settlement age
    pub fn manual_blocks_remaining(
        &self,
        obligation: &SettlementObligation,
        height: BlockHeight,
    ) -> u64 {
        Self::remaining(self.manual_min_age_blocks, obligation, height)
    }

    /// Signed blocks left before the match expires; negative once expired
    pub fn blocks_until_expiry(&self, obligation: &SettlementObligation, height: BlockHeight) -> i64 {
        obligation.match_expire_height as i64 - height as i64
    }

    /// True when the expiry gate forbids settling at this height
    pub fn is_past_expiry_gate(&self, obligation: &SettlementObligation, height: BlockHeight) -> bool {
        self.blocks_until_expiry(obligation, height) <= self.expire_margin_blocks as i64
    }

    pub fn phase(&self, obligation: &SettlementObligation, height: BlockHeight) -> Phase {
        if self.is_past_expiry_gate(obligation, height) {
            return Phase::Expired;
        }
        match self.blocks_until_active(obligation, height) {
            0 => Phase::Active,
            blocks_remaining => Phase::Upcoming { blocks_remaining },
        }
    }

    pub fn seconds_until_expiry(&self, obligation: &SettlementObligation, height: BlockHeight) -> i64 {
        self.blocks_until_expiry(obligation, height)
            .saturating_mul(self.approx_seconds_per_block as i64)
    }

    pub fn seconds_until_active(&self, obligation: &SettlementObligation, height: BlockHeight) -> u64 {
        self.blocks_until_active(obligation, height)
            .saturating_mul(self.approx_seconds_per_block)
    }

    pub fn urgency(&self, obligation: &SettlementObligation, height: BlockHeight) -> UrgencyBand {
        UrgencyBand::from_seconds(self.seconds_until_expiry(obligation, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use czrpay_types::MatchId;
    use rust_decimal::Decimal;

    fn obligation(match_height: u64, expire_height: u64) -> SettlementObligation {
        SettlementObligation {
            match_id: MatchId::from_legs("aa", "bb"),
            payer_address: "1Payer".to_string(),
            payee_address: "1Payee".to_string(),
            asset: "CZR".to_string(),
            amount: Decimal::ONE,
            amount_raw: 100_000_000,
            match_block_height: match_height,
            match_expire_height: expire_height,
            other_asset: "XCP".to_string(),
            other_amount: Decimal::TEN,
            other_amount_raw: 10,
            payer_order_tx_hash: "aa".to_string(),
            payer_order_tx_index: 1,
            counter_order_tx_index: 2,
        }
    }

    #[test]
    fn test_blocks_until_active() {
        let window = EligibilityWindow::default();
        let o = obligation(100, 200);

        assert_eq!(window.blocks_until_active(&o, 100), 6);
        assert_eq!(window.blocks_until_active(&o, 105), 1);
        assert_eq!(window.blocks_until_active(&o, 106), 0);
        assert_eq!(window.blocks_until_active(&o, 500), 0);
    }

    #[test]
    fn test_height_behind_match_waits_full_window() {
        let window = EligibilityWindow::default();
        let o = obligation(100, 200);
        assert_eq!(window.blocks_until_active(&o, 90), 6);
    }

    #[test]
    fn test_manual_age_is_separate() {
        let window = EligibilityWindow {
            manual_min_age_blocks: 2,
            ..Default::default()
        };
        let o = obligation(100, 200);
        assert_eq!(window.blocks_until_active(&o, 101), 5);
        assert_eq!(window.manual_blocks_remaining(&o, 101), 1);
    }

    #[test]
    fn test_expiry_gate_is_inclusive() {
        let window = EligibilityWindow::default();
        let o = obligation(100, 120);

        assert_eq!(window.blocks_until_expiry(&o, 113), 7);
        assert!(!window.is_past_expiry_gate(&o, 113));

        assert_eq!(window.blocks_until_expiry(&o, 114), 6);
        assert!(window.is_past_expiry_gate(&o, 114));

        assert_eq!(window.blocks_until_expiry(&o, 125), -5);
        assert!(window.is_past_expiry_gate(&o, 125));
    }

    #[test]
    fn test_phase() {
        let window = EligibilityWindow::default();
        let o = obligation(100, 120);

        assert_eq!(window.phase(&o, 102), Phase::Upcoming { blocks_remaining: 4 });
        assert_eq!(window.phase(&o, 106), Phase::Active);
        assert_eq!(window.phase(&o, 114), Phase::Expired);
    }

    #[test]
    fn test_urgency_bands() {
        assert_eq!(UrgencyBand::from_seconds(7201), UrgencyBand::Relaxed);
        assert_eq!(UrgencyBand::from_seconds(7200), UrgencyBand::Soon);
        assert_eq!(UrgencyBand::from_seconds(3601), UrgencyBand::Soon);
        assert_eq!(UrgencyBand::from_seconds(3600), UrgencyBand::Urgent);
        assert_eq!(UrgencyBand::from_seconds(1801), UrgencyBand::Urgent);
        assert_eq!(UrgencyBand::from_seconds(1800), UrgencyBand::Critical);
        assert_eq!(UrgencyBand::from_seconds(-600), UrgencyBand::Critical);
    }

    #[test]
    fn test_urgency_from_blocks() {
        let window = EligibilityWindow::default();
        let o = obligation(100, 120);

        // 20 blocks * 600s
        assert_eq!(window.urgency(&o, 100), UrgencyBand::Relaxed);
        // 5 blocks * 600s = 50 min
        assert_eq!(window.urgency(&o, 115), UrgencyBand::Urgent);
    }
}
