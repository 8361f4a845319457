use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Subunits in one whole unit of a divisible asset
pub const UNIT: u64 = 100_000_000;

/// Asset owed by the local wallet when one of its sell orders matches
pub const DEFAULT_SETTLEMENT_ASSET: &str = "CZR";

/// Convert a raw integer quantity to its display value.
///
/// Divisible assets carry eight decimal places; indivisible assets are
/// counted in whole units and pass through unchanged.
pub fn normalize_quantity(raw: u64, divisible: bool) -> Decimal {
    if divisible {
        Decimal::from(raw) / Decimal::from(UNIT)
    } else {
        Decimal::from(raw)
    }
}

/// Quantity of a named asset, kept in both raw and normalized form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    /// Asset symbol (e.g., "CZR")
    pub asset: String,

    /// Amount in integer subunits
    pub raw: u64,

    /// Whether the asset is divisible
    pub divisible: bool,
}

impl AssetAmount {
    pub fn new(asset: impl Into<String>, raw: u64, divisible: bool) -> Self {
        Self {
            asset: asset.into(),
            raw,
            divisible,
        }
    }

    pub fn normalized(&self) -> Decimal {
        normalize_quantity(self.raw, self.divisible)
    }

    pub fn is_asset(&self, symbol: &str) -> bool {
        self.asset == symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_normalize_divisible() {
        assert_eq!(
            normalize_quantity(150_000_000, true),
            Decimal::from_str("1.5").unwrap()
        );
        assert_eq!(
            normalize_quantity(1, true),
            Decimal::from_str("0.00000001").unwrap()
        );
    }

    #[test]
    fn test_normalize_indivisible() {
        assert_eq!(normalize_quantity(42, false), Decimal::from(42));
    }

    #[test]
    fn test_asset_amount() {
        let amount = AssetAmount::new("CZR", 250_000_000, true);
        assert!(amount.is_asset("CZR"));
        assert!(!amount.is_asset("XCP"));
        assert_eq!(amount.normalized(), Decimal::from(5) / Decimal::from(2));
    }
}
