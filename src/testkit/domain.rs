//! Builders for domain primitives used across tests.
//!
//! Provides concise factory functions for assets, pairs, hashes and
//! addresses so tests focus on assertions rather than construction
//! boilerplate.

use alloy_primitives::{Address, TxHash, U256};
use rust_decimal::Decimal;

use crate::domain::{Asset, ExchangeId, TradingPair};

/// One token in base units for 18-decimal assets.
pub const WEI: u64 = 1_000_000_000_000_000_000;

/// Ether, held at the zero address.
pub fn eth() -> Asset {
    Asset::new("ETH", "ETH", 18, Address::ZERO)
}

/// An 18-decimal ERC-20 token.
pub fn knc() -> Asset {
    Asset::new("KNC", "KNC", 18, address(0xdd))
}

/// A 6-decimal ERC-20 token.
pub fn usdt() -> Asset {
    Asset::new("USDT", "USDT", 6, address(0xd7))
}

/// `KNC-ETH` with the given minimum notional (zero for none).
pub fn knc_eth(min_notional: Decimal) -> TradingPair {
    TradingPair::new("KNC", "ETH").with_min_notional(min_notional)
}

/// Create an [`ExchangeId`] from a string.
pub fn exchange_id(id: &str) -> ExchangeId {
    ExchangeId::from(id)
}

/// Deterministic address whose last byte is `n`.
pub fn address(n: u8) -> Address {
    Address::with_last_byte(n)
}

/// Deterministic transaction hash encoding `n`.
pub fn tx_hash(n: u64) -> TxHash {
    TxHash::left_padding_from(&n.to_be_bytes())
}

/// `n` whole tokens of an 18-decimal asset, in base units.
pub fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::from(WEI)
}
