//! Assets and trading pairs handled by the reserve.

use std::fmt;

use alloy_primitives::{Address, U256};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::AssetId;

/// A token (or ether) held by the reserve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub symbol: String,
    /// Decimal precision of the on-chain representation.
    pub decimals: u32,
    /// Token contract address. Ether uses the zero address.
    pub address: Address,
}

impl Asset {
    pub fn new(
        id: impl Into<AssetId>,
        symbol: impl Into<String>,
        decimals: u32,
        address: Address,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            decimals,
            address,
        }
    }

    /// Ether is moved with a plain value transfer rather than a token transfer.
    #[must_use]
    pub fn is_ether(&self) -> bool {
        self.address == Address::ZERO
    }

    /// Scale a human-unit quantity into base units, truncating any remainder.
    ///
    /// Returns `None` for negative quantities or values that overflow `u128`.
    #[must_use]
    pub fn to_base_units(&self, quantity: Decimal) -> Option<U256> {
        if quantity.is_sign_negative() {
            return None;
        }
        let scale = Decimal::try_from_i128_with_scale(10_i128.checked_pow(self.decimals)?, 0).ok()?;
        let scaled = quantity.checked_mul(scale)?.trunc();
        scaled.to_u128().map(U256::from)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tradable base/quote pair on an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingPair {
    pub base: AssetId,
    pub quote: AssetId,
    /// Minimum `rate * amount` accepted by the exchange. Zero disables the check.
    #[serde(default)]
    pub min_notional: Decimal,
}

impl TradingPair {
    pub fn new(base: impl Into<AssetId>, quote: impl Into<AssetId>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
            min_notional: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn with_min_notional(mut self, min_notional: Decimal) -> Self {
        self.min_notional = min_notional;
        self
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use rust_decimal_macros::dec;

    fn knc() -> Asset {
        Asset::new(
            "KNC",
            "KNC",
            18,
            address!("0xdd974d5c2e2928dea5f71b9825b8b646686bd200"),
        )
    }

    #[test]
    fn zero_address_is_ether() {
        assert!(Asset::new("ETH", "ETH", 18, Address::ZERO).is_ether());
        assert!(!knc().is_ether());
    }

    #[test]
    fn to_base_units_scales_by_decimals() {
        let usdc = Asset::new("USDC", "USDC", 6, Address::repeat_byte(1));
        assert_eq!(usdc.to_base_units(dec!(1.5)), Some(U256::from(1_500_000u64)));
        assert_eq!(
            knc().to_base_units(dec!(0.01)),
            Some(U256::from(10_000_000_000_000_000u128))
        );
    }

    #[test]
    fn to_base_units_truncates_and_rejects_negative() {
        let usdc = Asset::new("USDC", "USDC", 6, Address::repeat_byte(1));
        assert_eq!(usdc.to_base_units(dec!(0.0000019)), Some(U256::from(1u64)));
        assert_eq!(usdc.to_base_units(dec!(-1)), None);
    }

    #[test]
    fn pair_display() {
        assert_eq!(TradingPair::new("KNC", "ETH").to_string(), "KNC-ETH");
    }
}
