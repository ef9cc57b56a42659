//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all reserve settings.
//!
//! # Example
//!
//! ```no_run
//! use reservekeeper::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::exchange::{DepositConfig, ExchangeProfile};
use super::logging::LoggingConfig;
use super::policy::{GasConfig, RelayConfig};
use crate::domain::{Asset, AssetId};
use crate::error::{ConfigError, Result};

/// Largest asset precision whose scale factor still fits a `Decimal`.
const MAX_ASSET_DECIMALS: u32 = 28;

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Set-rates gas price bounds.
    #[serde(default)]
    pub gas: GasConfig,

    /// Two-hop deposit relay settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Reserve contract address that exchange withdrawals are sent to.
    pub reserve_address: Option<Address>,

    /// Assets held by the reserve.
    #[serde(default)]
    pub assets: Vec<Asset>,

    /// Exchanges the reserve trades on.
    #[serde(default)]
    pub exchanges: Vec<ExchangeProfile>,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML content is malformed
    /// - Validation fails (e.g., a withdraw fee for an unknown asset)
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidValue {
                field: "logging.format",
                reason: "must be \"json\" or \"pretty\"".to_string(),
            }
            .into());
        }

        self.reserve_address()?;

        let gas = &self.gas;
        if !gas.floor_gwei.is_finite() || gas.floor_gwei <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "gas.floor_gwei",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if !gas.high_bound_gwei.is_finite() || gas.high_bound_gwei < gas.floor_gwei {
            return Err(ConfigError::InvalidValue {
                field: "gas.high_bound_gwei",
                reason: "must be >= floor_gwei".to_string(),
            }
            .into());
        }

        if self.relay.lost_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "relay.lost_timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.relay.failure_alert_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "relay.failure_alert_threshold",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        let mut asset_ids = HashSet::new();
        for asset in &self.assets {
            if !asset_ids.insert(&asset.id) {
                return Err(ConfigError::InvalidValue {
                    field: "assets.id",
                    reason: format!("asset '{}' listed twice", asset.id),
                }
                .into());
            }
            if asset.decimals > MAX_ASSET_DECIMALS {
                return Err(ConfigError::InvalidValue {
                    field: "assets.decimals",
                    reason: format!("'{}' has more than {MAX_ASSET_DECIMALS} decimals", asset.id),
                }
                .into());
            }
        }

        let mut exchange_ids = HashSet::new();
        for profile in &self.exchanges {
            if !exchange_ids.insert(&profile.id) {
                return Err(ConfigError::InvalidValue {
                    field: "exchanges.id",
                    reason: format!("exchange '{}' listed twice", profile.id),
                }
                .into());
            }
            for (asset, fee) in &profile.withdraw_fees {
                if !asset_ids.contains(asset) {
                    return Err(unknown_asset("exchanges.withdraw_fees", asset));
                }
                if *fee < Decimal::ZERO {
                    return Err(ConfigError::InvalidValue {
                        field: "exchanges.withdraw_fees",
                        reason: format!("fee for '{asset}' on '{}' is negative", profile.id),
                    }
                    .into());
                }
            }
            if let DepositConfig::Relayed {
                intermediary_address,
                fallback_addresses,
            } = &profile.deposit
            {
                if intermediary_address.is_zero() {
                    return Err(ConfigError::InvalidValue {
                        field: "exchanges.deposit.intermediary_address",
                        reason: format!("'{}' has a zero intermediary address", profile.id),
                    }
                    .into());
                }
                if let Some(asset) = fallback_addresses.keys().find(|a| !asset_ids.contains(a)) {
                    return Err(unknown_asset("exchanges.deposit.fallback_addresses", asset));
                }
            }
        }
        Ok(())
    }

    /// The configured reserve contract address.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the address is missing or zero.
    #[allow(clippy::result_large_err)]
    pub fn reserve_address(&self) -> Result<Address> {
        match self.reserve_address {
            None => Err(ConfigError::MissingField {
                field: "reserve_address",
            }
            .into()),
            Some(address) if address.is_zero() => Err(ConfigError::InvalidValue {
                field: "reserve_address",
                reason: "must not be the zero address".to_string(),
            }
            .into()),
            Some(address) => Ok(address),
        }
    }

    /// Look up a configured asset.
    #[must_use]
    pub fn asset(&self, id: &AssetId) -> Option<&Asset> {
        self.assets.iter().find(|asset| &asset.id == id)
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

fn unknown_asset(field: &'static str, asset: &AssetId) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: format!("unknown asset '{asset}'"),
    }
    .into()
}
