use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{BlockHeight, TypeError};

/// Length of a single order transaction hash inside a match id
pub const LEG_HASH_LEN: usize = 64;

/// Identity of an order match: first-leg hash followed by second-leg hash.
///
/// Lookups accept either the full id or one of the two leg hashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    pub fn from_legs(first: &str, second: &str) -> Self {
        let mut id = String::with_capacity(first.len() + second.len());
        id.push_str(first);
        id.push_str(second);
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into (first leg hash, second leg hash). `None` unless the id is
    /// longer than one leg hash.
    pub fn legs(&self) -> Option<(&str, &str)> {
        if self.0.len() <= LEG_HASH_LEN {
            return None;
        }
        let first = self.0.get(..LEG_HASH_LEN)?;
        let second = self.0.get(LEG_HASH_LEN..)?;
        Some((first, second))
    }

    /// True when `key` is the full id or either leg hash
    pub fn matches(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        if self.0 == key {
            return true;
        }
        self.legs()
            .is_some_and(|(first, second)| first == key || second == key)
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MatchId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(TypeError::EmptyMatchId);
        }
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for MatchId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A payment the local wallet owes a counterparty because one of its orders
/// matched. Built once by the obligation factory and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementObligation {
    pub match_id: MatchId,

    /// Local address that must pay
    pub payer_address: String,
    /// Counterparty address receiving the payment
    pub payee_address: String,

    /// Settlement asset symbol
    pub asset: String,
    /// Amount owed, normalized
    pub amount: Decimal,
    /// Amount owed, in subunits
    pub amount_raw: u64,

    /// Height at which the match became final
    pub match_block_height: BlockHeight,
    /// Height beyond which the match is void
    pub match_expire_height: BlockHeight,

    /// What the counterparty gives in return
    pub other_asset: String,
    pub other_amount: Decimal,
    pub other_amount_raw: u64,

    pub payer_order_tx_hash: String,
    pub payer_order_tx_index: u64,
    pub counter_order_tx_index: u64,
}

impl SettlementObligation {
    /// Balance the payer address must hold before paying, keeping `reserve`
    /// subunits behind for fees
    pub fn required_balance(&self, reserve: u64) -> u64 {
        self.amount_raw.saturating_add(reserve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(c: char) -> String {
        std::iter::repeat(c).take(LEG_HASH_LEN).collect()
    }

    #[test]
    fn test_match_id_concatenation_order() {
        let a = hash('a');
        let b = hash('b');
        let ab = MatchId::from_legs(&a, &b);
        let ba = MatchId::from_legs(&b, &a);

        assert_ne!(ab, ba);
        assert_eq!(ab.as_str().len(), 2 * LEG_HASH_LEN);
        assert_eq!(ab.legs(), Some((a.as_str(), b.as_str())));
    }

    #[test]
    fn test_match_id_matches_full_and_halves() {
        let a = hash('a');
        let b = hash('b');
        let id = MatchId::from_legs(&a, &b);

        assert!(id.matches(id.as_str()));
        assert!(id.matches(&a));
        assert!(id.matches(&b));
        assert!(!id.matches(&hash('c')));
        assert!(!id.matches(""));
    }

    #[test]
    fn test_short_match_id_has_no_legs() {
        let id = MatchId::from_legs("ab", "cd");
        assert_eq!(id.legs(), None);
        assert!(id.matches("abcd"));
        assert!(!id.matches("ab"));
    }

    #[test]
    fn test_match_id_from_str() {
        assert_eq!("".parse::<MatchId>(), Err(TypeError::EmptyMatchId));
        let id: MatchId = "abcd".parse().unwrap();
        assert_eq!(id.to_string(), "abcd");
    }

    #[test]
    fn test_required_balance_saturates() {
        let obligation = SettlementObligation {
            match_id: MatchId::from_legs("a", "b"),
            payer_address: "1Payer".to_string(),
            payee_address: "1Payee".to_string(),
            asset: "CZR".to_string(),
            amount: Decimal::ONE,
            amount_raw: u64::MAX - 1,
            match_block_height: 1,
            match_expire_height: 20,
            other_asset: "XCP".to_string(),
            other_amount: Decimal::ONE,
            other_amount_raw: 1,
            payer_order_tx_hash: "a".to_string(),
            payer_order_tx_index: 1,
            counter_order_tx_index: 2,
        };

        assert_eq!(obligation.required_balance(10), u64::MAX);
    }
}
