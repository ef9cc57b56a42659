//! Gas escalation and deposit relay tuning.

use std::time::Duration;

use serde::Deserialize;

use crate::application::relay::{RelayPolicy, DEFAULT_FAILURE_ALERT_THRESHOLD};
use crate::domain::gas::{GasPolicy, DEFAULT_FLOOR_GWEI, DEFAULT_HIGH_BOUND_GWEI};

/// Gas price bounds for set-rates transactions.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GasConfig {
    /// Ceiling of the exponential replace-by-fee ramp, in gwei.
    #[serde(default = "default_high_bound_gwei")]
    pub high_bound_gwei: f64,
    /// Price used when the node recommendation is unusable, in gwei.
    #[serde(default = "default_floor_gwei")]
    pub floor_gwei: f64,
}

const fn default_high_bound_gwei() -> f64 {
    DEFAULT_HIGH_BOUND_GWEI
}

const fn default_floor_gwei() -> f64 {
    DEFAULT_FLOOR_GWEI
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            high_bound_gwei: default_high_bound_gwei(),
            floor_gwei: default_floor_gwei(),
        }
    }
}

impl From<GasConfig> for GasPolicy {
    fn from(config: GasConfig) -> Self {
        Self {
            high_bound_gwei: config.high_bound_gwei,
            floor_gwei: config.floor_gwei,
        }
    }
}

/// Two-hop deposit relay configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RelayConfig {
    /// Seconds before an unconfirmed relay transaction is declared lost (default: 900).
    #[serde(default = "default_lost_timeout_secs")]
    pub lost_timeout_secs: u64,
    /// Consecutive TX2 submission failures before an alert is logged (default: 5).
    #[serde(default = "default_failure_alert_threshold")]
    pub failure_alert_threshold: u32,
}

const fn default_lost_timeout_secs() -> u64 {
    15 * 60
}

const fn default_failure_alert_threshold() -> u32 {
    DEFAULT_FAILURE_ALERT_THRESHOLD
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            lost_timeout_secs: default_lost_timeout_secs(),
            failure_alert_threshold: default_failure_alert_threshold(),
        }
    }
}

impl From<RelayConfig> for RelayPolicy {
    fn from(config: RelayConfig) -> Self {
        Self {
            lost_timeout: Duration::from_secs(config.lost_timeout_secs),
            failure_alert_threshold: config.failure_alert_threshold,
        }
    }
}
