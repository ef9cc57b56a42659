//! Exchange port for trading, withdrawals and deposit tracking.
//!
//! Exchange-specific REST parsing and symbol mapping live behind this trait;
//! the orchestrator and deposit relay only see these capabilities.

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Asset, ExchangeId, OrderId, TradeSide, TradingPair};
use crate::error::Result;

/// Echo of an order placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeOutcome {
    /// The order ID returned by the exchange.
    pub order_id: OrderId,
    /// Amount filled immediately.
    pub done: Decimal,
    /// Amount still open on the book.
    pub remaining: Decimal,
    /// Whether the order is fully filled.
    pub finished: bool,
}

/// Exchange-reported progress of an incoming deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositState {
    /// Seen but not yet credited.
    Pending,
    /// Credited and final.
    Confirmed,
    /// Rejected by the exchange.
    Failed,
}

impl DepositState {
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// One entry of an exchange's deposit history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositRecord {
    pub tx_hash: TxHash,
    pub symbol: String,
    pub state: DepositState,
}

/// A centralized exchange account used by the reserve.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - Network failures are reported as [`Error::ExternalCall`](crate::error::Error::ExternalCall)
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Exchange name, used as the activity destination.
    fn id(&self) -> &ExchangeId;

    /// Deposit address for `asset`, or `None` when the asset is not supported.
    fn address(&self, asset: &Asset) -> Option<Address>;

    /// Exchange-specific symbol for `asset`.
    fn symbol(&self, asset: &Asset) -> String {
        asset.symbol.clone()
    }

    /// Place an order.
    async fn trade(
        &self,
        side: TradeSide,
        pair: &TradingPair,
        rate: Decimal,
        amount: Decimal,
    ) -> Result<TradeOutcome>;

    /// Withdraw `amount` base units of `asset` to `to`. Returns the exchange's withdrawal id.
    async fn withdraw(&self, asset: &Asset, amount: U256, to: Address) -> Result<String>;

    /// Cancel an open order.
    async fn cancel_order(&self, order_id: &OrderId, pair: &TradingPair) -> Result<()>;

    /// Query the exchange for the current deposit address of `symbol`.
    async fn live_deposit_address(&self, symbol: &str) -> Result<Address>;

    /// Recent deposits credited (or pending) on the exchange.
    async fn deposit_history(&self) -> Result<Vec<DepositRecord>>;
}
