//! Mock [`Exchange`] for testing.
//!
//! Each call pops the next scripted result from its queue and falls back to a
//! benign default once the queue is exhausted. Every call is logged so tests
//! can assert what reached the exchange.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::{Asset, AssetId, ExchangeId, OrderId, TradeSide, TradingPair};
use crate::error::{Error, Result};
use crate::port::{DepositRecord, DepositState, Exchange, TradeOutcome};

/// A call received by a [`ScriptedExchange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeCall {
    Trade {
        side: TradeSide,
        pair: TradingPair,
        rate: Decimal,
        amount: Decimal,
    },
    Withdraw {
        asset: AssetId,
        amount: U256,
        to: Address,
    },
    CancelOrder {
        order_id: OrderId,
        pair: TradingPair,
    },
    LiveDepositAddress(String),
    DepositHistory,
}

/// An exchange with scripted responses.
///
/// Defaults once the queues are empty:
/// - `trade` fills the order completely under id `order-<n>`
/// - `withdraw` succeeds with id `withdrawal-<n>`
/// - `cancel_order` succeeds
/// - `live_deposit_address` returns the address set with
///   [`with_live_address`](Self::with_live_address), or fails
pub struct ScriptedExchange {
    id: ExchangeId,
    addresses: HashMap<AssetId, Address>,
    live_addresses: Mutex<HashMap<String, Address>>,
    trade_results: Mutex<VecDeque<Result<TradeOutcome>>>,
    withdraw_results: Mutex<VecDeque<Result<String>>>,
    cancel_results: Mutex<VecDeque<Result<()>>>,
    history: Mutex<Vec<DepositRecord>>,
    history_failing: AtomicBool,
    calls: Mutex<Vec<ExchangeCall>>,
    sequence: AtomicU64,
}

impl ScriptedExchange {
    pub fn new(id: &str) -> Self {
        Self {
            id: ExchangeId::from(id),
            addresses: HashMap::new(),
            live_addresses: Mutex::new(HashMap::new()),
            trade_results: Mutex::new(VecDeque::new()),
            withdraw_results: Mutex::new(VecDeque::new()),
            cancel_results: Mutex::new(VecDeque::new()),
            history: Mutex::new(Vec::new()),
            history_failing: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Support deposits and withdrawals of `asset` at `address`.
    pub fn with_asset(mut self, asset: &Asset, address: Address) -> Self {
        self.addresses.insert(asset.id.clone(), address);
        self
    }

    /// Answer live deposit address lookups for `symbol`.
    pub fn with_live_address(self, symbol: &str, address: Address) -> Self {
        self.live_addresses.lock().insert(symbol.to_string(), address);
        self
    }

    pub fn with_trade_results(self, results: Vec<Result<TradeOutcome>>) -> Self {
        *self.trade_results.lock() = results.into();
        self
    }

    pub fn with_withdraw_results(self, results: Vec<Result<String>>) -> Self {
        *self.withdraw_results.lock() = results.into();
        self
    }

    pub fn with_cancel_results(self, results: Vec<Result<()>>) -> Self {
        *self.cancel_results.lock() = results.into();
        self
    }

    /// Make live deposit address lookups for `symbol` fail from now on.
    pub fn drop_live_address(&self, symbol: &str) {
        self.live_addresses.lock().remove(symbol);
    }

    /// Add an entry to the deposit history.
    pub fn credit(&self, tx_hash: TxHash, symbol: &str, state: DepositState) {
        self.history.lock().push(DepositRecord {
            tx_hash,
            symbol: symbol.to_string(),
            state,
        });
    }

    pub fn set_history_failing(&self, failing: bool) {
        self.history_failing.store(failing, Ordering::SeqCst);
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<ExchangeCall> {
        self.calls.lock().clone()
    }

    /// Number of `trade` calls received.
    pub fn trade_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, ExchangeCall::Trade { .. }))
            .count()
    }

    fn next(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl Exchange for ScriptedExchange {
    fn id(&self) -> &ExchangeId {
        &self.id
    }

    fn address(&self, asset: &Asset) -> Option<Address> {
        self.addresses.get(&asset.id).copied()
    }

    async fn trade(
        &self,
        side: TradeSide,
        pair: &TradingPair,
        rate: Decimal,
        amount: Decimal,
    ) -> Result<TradeOutcome> {
        self.calls.lock().push(ExchangeCall::Trade {
            side,
            pair: pair.clone(),
            rate,
            amount,
        });
        let scripted = self.trade_results.lock().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(TradeOutcome {
                order_id: OrderId::new(format!("order-{}", self.next())),
                done: amount,
                remaining: Decimal::ZERO,
                finished: true,
            })
        })
    }

    async fn withdraw(&self, asset: &Asset, amount: U256, to: Address) -> Result<String> {
        self.calls.lock().push(ExchangeCall::Withdraw {
            asset: asset.id.clone(),
            amount,
            to,
        });
        let scripted = self.withdraw_results.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(format!("withdrawal-{}", self.next())))
    }

    async fn cancel_order(&self, order_id: &OrderId, pair: &TradingPair) -> Result<()> {
        self.calls.lock().push(ExchangeCall::CancelOrder {
            order_id: order_id.clone(),
            pair: pair.clone(),
        });
        let scripted = self.cancel_results.lock().pop_front();
        scripted.unwrap_or(Ok(()))
    }

    async fn live_deposit_address(&self, symbol: &str) -> Result<Address> {
        self.calls
            .lock()
            .push(ExchangeCall::LiveDepositAddress(symbol.to_string()));
        let address = self.live_addresses.lock().get(symbol).copied();
        address.ok_or_else(|| {
            Error::external(self.id.as_str(), format!("no deposit address for {symbol}"))
        })
    }

    async fn deposit_history(&self) -> Result<Vec<DepositRecord>> {
        self.calls.lock().push(ExchangeCall::DepositHistory);
        if self.history_failing.load(Ordering::SeqCst) {
            return Err(Error::external(self.id.as_str(), "deposit history unavailable"));
        }
        Ok(self.history.lock().clone())
    }
}
