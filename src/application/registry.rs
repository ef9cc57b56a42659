//! Exchange registry built once at startup.
//!
//! Each entry pairs an exchange handle with its withdraw fee schedule and its
//! deposit route. Relay-style deposits are a per-exchange capability chosen at
//! construction, not a branch on the exchange name.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{Address, TxHash, U256};
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::relay::DepositRelay;
use crate::domain::{ActivityId, Asset, AssetId, ExchangeId, ExchangeStatus};
use crate::error::{ConfigError, Error, Result};
use crate::port::{DepositState, Exchange};

/// How deposits reach an exchange.
#[derive(Clone)]
pub enum DepositRoute {
    /// Straight to the exchange's per-asset deposit address.
    Direct,
    /// Through the shared intermediary, relayed by the given [`DepositRelay`].
    Relayed(Arc<DepositRelay>),
}

/// A registered exchange.
pub struct ExchangeEntry {
    exchange: Arc<dyn Exchange>,
    withdraw_fees: HashMap<AssetId, Decimal>,
    route: DepositRoute,
}

impl ExchangeEntry {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        withdraw_fees: HashMap<AssetId, Decimal>,
        route: DepositRoute,
    ) -> Self {
        Self {
            exchange,
            withdraw_fees,
            route,
        }
    }

    #[must_use]
    pub fn id(&self) -> &ExchangeId {
        self.exchange.id()
    }

    #[must_use]
    pub fn exchange(&self) -> &Arc<dyn Exchange> {
        &self.exchange
    }

    #[must_use]
    pub fn route(&self) -> &DepositRoute {
        &self.route
    }

    /// Configured withdraw fee for `asset`; zero when none is configured.
    #[must_use]
    pub fn withdraw_fee(&self, asset: &AssetId) -> Decimal {
        self.withdraw_fees
            .get(asset)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Where a deposit of `asset` must be sent, or `None` if unsupported.
    #[must_use]
    pub fn deposit_target(&self, asset: &Asset) -> Option<Address> {
        let address = self.exchange.address(asset)?;
        match &self.route {
            DepositRoute::Direct => Some(address),
            DepositRoute::Relayed(relay) => Some(relay.intermediary_address()),
        }
    }

    /// Exchange-side status of a deposit whose on-chain leg is `tx_hash`.
    ///
    /// Relayed exchanges advance the relay state machine; direct exchanges are
    /// looked up in the exchange's deposit history. `Unset` means still in flight.
    ///
    /// # Errors
    ///
    /// Relay ledger failures and, for direct routes, deposit history failures.
    pub async fn deposit_status(
        &self,
        id: &ActivityId,
        tx_hash: TxHash,
        asset: &Asset,
        amount: U256,
    ) -> Result<ExchangeStatus> {
        match &self.route {
            DepositRoute::Relayed(relay) => relay.deposit_status(id, tx_hash, asset, amount).await,
            DepositRoute::Direct => {
                let history = self.exchange.deposit_history().await?;
                let status = history
                    .iter()
                    .find(|deposit| deposit.tx_hash == tx_hash)
                    .map_or(ExchangeStatus::Unset, |deposit| match deposit.state {
                        DepositState::Confirmed => ExchangeStatus::Done,
                        DepositState::Failed => ExchangeStatus::Failed,
                        DepositState::Pending => ExchangeStatus::Pending,
                    });
                Ok(status)
            }
        }
    }
}

/// All exchanges the reserve operates on.
#[derive(Default)]
pub struct ExchangeRegistry {
    entries: HashMap<ExchangeId, ExchangeEntry>,
}

impl ExchangeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exchange.
    ///
    /// # Errors
    ///
    /// Returns an error if an exchange with the same id is already registered.
    pub fn register(&mut self, entry: ExchangeEntry) -> Result<()> {
        let id = entry.id().clone();
        if self.entries.contains_key(&id) {
            warn!(exchange = %id, "Duplicate exchange registration");
            return Err(ConfigError::InvalidValue {
                field: "exchanges",
                reason: format!("exchange '{id}' registered twice"),
            }
            .into());
        }
        let relayed = matches!(entry.route, DepositRoute::Relayed(_));
        info!(exchange = %id, relayed, "Registered exchange");
        self.entries.insert(id, entry);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &ExchangeId) -> Option<&ExchangeEntry> {
        self.entries.get(id)
    }

    /// Look up an exchange, failing with `UnsupportedOperation` when unknown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedOperation`] for unregistered ids.
    pub fn require(&self, id: &ExchangeId) -> Result<&ExchangeEntry> {
        self.get(id).ok_or_else(|| {
            Error::UnsupportedOperation(format!("exchange '{id}' is not configured"))
        })
    }

    /// Registered exchange ids, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<ExchangeId> {
        let mut ids: Vec<_> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
