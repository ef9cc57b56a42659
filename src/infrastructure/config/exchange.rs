//! Per-exchange configuration.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::registry::{DepositRoute, ExchangeEntry};
use crate::application::relay::{DepositRelay, RelayPolicy, RelayPorts};
use crate::domain::{AssetId, ExchangeId};
use crate::error::{ConfigError, Result};
use crate::port::Exchange;

/// How deposits reach an exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "route", rename_all = "lowercase")]
pub enum DepositConfig {
    /// The exchange publishes a deposit address per asset.
    #[default]
    Direct,
    /// Deposits go through the shared intermediary account.
    Relayed {
        /// Must match the intermediary signer's address.
        intermediary_address: Address,
        /// Last known deposit address per asset, used when the live lookup fails.
        #[serde(default)]
        fallback_addresses: HashMap<AssetId, Address>,
    },
}

/// One `[[exchanges]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExchangeProfile {
    pub id: ExchangeId,
    /// Withdraw fee per asset, in human units.
    #[serde(default)]
    pub withdraw_fees: HashMap<AssetId, Decimal>,
    #[serde(default)]
    pub deposit: DepositConfig,
}

impl ExchangeProfile {
    /// Combine this profile with its exchange handle into a registry entry.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the handle belongs to another exchange, or
    /// if the profile is relayed and no matching intermediary signer is given.
    #[allow(clippy::result_large_err)]
    pub fn into_entry(
        self,
        exchange: Arc<dyn Exchange>,
        relay: Option<&RelayPorts>,
        policy: RelayPolicy,
    ) -> Result<ExchangeEntry> {
        if exchange.id() != &self.id {
            return Err(ConfigError::InvalidValue {
                field: "exchanges.id",
                reason: format!("profile '{}' paired with exchange '{}'", self.id, exchange.id()),
            }
            .into());
        }

        let route = match self.deposit {
            DepositConfig::Direct => DepositRoute::Direct,
            DepositConfig::Relayed {
                intermediary_address,
                fallback_addresses,
            } => {
                let ports = relay.ok_or(ConfigError::MissingField {
                    field: "intermediary signer",
                })?;
                let signer_address = ports.signer.address();
                if signer_address != intermediary_address {
                    return Err(ConfigError::InvalidValue {
                        field: "exchanges.deposit.intermediary_address",
                        reason: format!(
                            "'{}' expects {intermediary_address}, signer is {signer_address}",
                            self.id
                        ),
                    }
                    .into());
                }
                let relay = DepositRelay::new(
                    Arc::clone(&exchange),
                    ports.clone(),
                    fallback_addresses,
                    policy,
                );
                DepositRoute::Relayed(Arc::new(relay))
            }
        };

        Ok(ExchangeEntry::new(exchange, self.withdraw_fees, route))
    }
}
