//! Recorded reserve activities and their lifecycle statuses.
//!
//! An [`ActivityRecord`] is written exactly once per orchestrator call. There is
//! no stored "pending" flag: [`ActivityRecord::is_pending`] derives it from the
//! status pair according to the action kind.

use std::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::{ActivityId, AssetId, ExchangeId};

/// Destination recorded for activities executed on chain.
pub const BLOCKCHAIN_DESTINATION: &str = "blockchain";

/// Opaque key/value payload stored with an activity.
pub type Fields = Map<String, Value>;

/// Kind of reserve action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Trade,
    Deposit,
    Withdraw,
    SetRates,
    CancelSetRates,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trade => "trade",
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::SetRates => "set_rates",
            Self::CancelSetRates => "cancel_set_rates",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exchange-side lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeStatus {
    #[default]
    #[serde(rename = "")]
    Unset,
    Submitted,
    Pending,
    Done,
    Failed,
    Cancelled,
    Lost,
}

impl ExchangeStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Submitted => "submitted",
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Lost => "lost",
        }
    }
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chain-side lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiningStatus {
    #[default]
    #[serde(rename = "")]
    Unset,
    Submitted,
    Mined,
    Failed,
    Lost,
    Pending,
}

impl MiningStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Submitted => "submitted",
            Self::Mined => "mined",
            Self::Failed => "failed",
            Self::Lost => "lost",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for MiningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded attempt at a reserve action, with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub action: Action,
    pub id: ActivityId,
    /// Exchange name, or [`BLOCKCHAIN_DESTINATION`].
    pub destination: String,
    pub params: Fields,
    pub result: Fields,
    pub exchange_status: ExchangeStatus,
    pub mining_status: MiningStatus,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl ActivityRecord {
    /// Whether the activity is still in flight on either side.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        use ExchangeStatus as E;
        use MiningStatus as M;

        match self.action {
            Action::Trade => matches!(self.exchange_status, E::Unset | E::Submitted),
            Action::Deposit => {
                matches!(self.exchange_status, E::Unset | E::Pending)
                    && self.mining_status != M::Failed
            }
            Action::Withdraw => {
                matches!(self.exchange_status, E::Unset | E::Submitted)
                    && self.mining_status != M::Failed
            }
            Action::SetRates | Action::CancelSetRates => {
                matches!(self.mining_status, M::Unset | M::Submitted | M::Pending)
            }
        }
    }

    /// String parameter by key.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// Whether this deposit targets the given asset on the given exchange.
    #[must_use]
    pub fn is_deposit_of(&self, asset: &AssetId, exchange: &ExchangeId) -> bool {
        self.action == Action::Deposit
            && self.param_str("asset") == Some(asset.as_str())
            && self.param_str("exchange") == Some(exchange.as_str())
    }

    /// Nonce of the submitted transaction, if one was recorded.
    #[must_use]
    pub fn nonce(&self) -> Option<u64> {
        match self.result.get("nonce")? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Gas price (wei) of the submitted transaction, if one was recorded.
    #[must_use]
    pub fn gas_price(&self) -> Option<U256> {
        self.result
            .get("gas_price")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(action: Action, exchange: ExchangeStatus, mining: MiningStatus) -> ActivityRecord {
        ActivityRecord {
            action,
            id: ActivityId::new(1, "x"),
            destination: BLOCKCHAIN_DESTINATION.into(),
            params: Fields::new(),
            result: Fields::new(),
            exchange_status: exchange,
            mining_status: mining,
            timestamp: 0,
        }
    }

    fn pending(action: Action, exchange: ExchangeStatus, mining: MiningStatus) -> bool {
        record(action, exchange, mining).is_pending()
    }

    #[test]
    fn trade_pending_until_exchange_finishes() {
        use ExchangeStatus::*;
        assert!(record(Action::Trade, Submitted, MiningStatus::Unset).is_pending());
        assert!(record(Action::Trade, Unset, MiningStatus::Unset).is_pending());
        assert!(!record(Action::Trade, Done, MiningStatus::Unset).is_pending());
        assert!(!record(Action::Trade, Failed, MiningStatus::Unset).is_pending());
    }

    #[test]
    fn deposit_stops_pending_on_mining_failure() {
        assert!(pending(Action::Deposit, ExchangeStatus::Unset, MiningStatus::Submitted));
        assert!(pending(Action::Deposit, ExchangeStatus::Pending, MiningStatus::Mined));
        assert!(!pending(Action::Deposit, ExchangeStatus::Unset, MiningStatus::Failed));
        assert!(!pending(Action::Deposit, ExchangeStatus::Done, MiningStatus::Mined));
    }

    #[test]
    fn withdraw_pending_while_submitted() {
        assert!(pending(Action::Withdraw, ExchangeStatus::Submitted, MiningStatus::Unset));
        assert!(!pending(Action::Withdraw, ExchangeStatus::Done, MiningStatus::Mined));
        assert!(!pending(Action::Withdraw, ExchangeStatus::Failed, MiningStatus::Unset));
    }

    #[test]
    fn set_rates_pending_until_mined() {
        assert!(pending(Action::SetRates, ExchangeStatus::Unset, MiningStatus::Submitted));
        assert!(!pending(Action::SetRates, ExchangeStatus::Unset, MiningStatus::Mined));
        assert!(!pending(Action::SetRates, ExchangeStatus::Unset, MiningStatus::Failed));
    }

    #[test]
    fn statuses_serialize_as_lowercase_strings() {
        assert_eq!(serde_json::to_value(ExchangeStatus::Unset).unwrap(), json!(""));
        assert_eq!(serde_json::to_value(ExchangeStatus::Done).unwrap(), json!("done"));
        assert_eq!(serde_json::to_value(MiningStatus::Lost).unwrap(), json!("lost"));
        assert_eq!(serde_json::to_value(Action::SetRates).unwrap(), json!("set_rates"));
    }

    #[test]
    fn nonce_and_gas_price_read_from_result() {
        let mut rec = record(Action::SetRates, ExchangeStatus::Unset, MiningStatus::Submitted);
        rec.result.insert("nonce".into(), json!(7));
        rec.result.insert("gas_price".into(), json!("20000000000"));
        assert_eq!(rec.nonce(), Some(7));
        assert_eq!(rec.gas_price(), Some(U256::from(20_000_000_000u64)));
    }

    #[test]
    fn deposit_match_uses_asset_and_exchange_params() {
        let mut rec = record(Action::Deposit, ExchangeStatus::Unset, MiningStatus::Submitted);
        rec.params.insert("asset".into(), json!("KNC"));
        rec.params.insert("exchange".into(), json!("binance"));
        assert!(rec.is_deposit_of(&"KNC".into(), &"binance".into()));
        assert!(!rec.is_deposit_of(&"OMG".into(), &"binance".into()));
        assert!(!rec.is_deposit_of(&"KNC".into(), &"huobi".into()));
    }
}
