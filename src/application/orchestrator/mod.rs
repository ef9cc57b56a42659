//! Action orchestrator.
//!
//! Turns a business intent (trade, deposit, withdraw, set rates) into exactly
//! one durable [`ActivityRecord`]. Every call writes its record before returning,
//! whether the intent succeeded or not; a failed ledger write is combined with,
//! never substituted for, the domain outcome.
//!
//! Each call follows the same two-step id protocol: an [`AttemptToken`] is
//! reserved and logged before the external call, and the durable [`ActivityId`]
//! is built from the exchange or chain result after it returns.
//!
//! # Modules
//!
//! - `trade`: order placement and cancellation
//! - `funding`: deposits, withdrawals and deposit reconciliation
//! - `rates`: set-rates submission with replace-by-fee, and its cancellation

mod funding;
mod rates;
mod trade;

use std::sync::Arc;

use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{error, info, warn};

pub use rates::SetRatesRequest;

use super::registry::ExchangeRegistry;
use crate::domain::{
    Action, ActivityId, ActivityRecord, AttemptToken, ExchangeStatus, Fields, GasPolicy,
    MiningStatus, SubmittedTx,
};
use crate::error::{combine, ActionError, Error};
use crate::port::{ActivityLedger, Blockchain};

/// Result of a recorded trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeReceipt {
    pub id: ActivityId,
    pub done: Decimal,
    pub remaining: Decimal,
    pub finished: bool,
}

/// Dispatches reserve actions and records each one.
pub struct ActionOrchestrator {
    registry: Arc<ExchangeRegistry>,
    blockchain: Arc<dyn Blockchain>,
    ledger: Arc<dyn ActivityLedger>,
    /// Reserve contract address that withdrawals are sent to.
    reserve_address: Address,
    gas: GasPolicy,
}

impl ActionOrchestrator {
    pub fn new(
        registry: Arc<ExchangeRegistry>,
        blockchain: Arc<dyn Blockchain>,
        ledger: Arc<dyn ActivityLedger>,
        reserve_address: Address,
        gas: GasPolicy,
    ) -> Self {
        Self {
            registry,
            blockchain,
            ledger,
            reserve_address,
            gas,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ExchangeRegistry {
        &self.registry
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn ActivityLedger> {
        &self.ledger
    }

    /// Write the attempt's single record and fold the ledger outcome into the result.
    async fn conclude(
        &self,
        attempt: Attempt,
        outcome: Outcome,
    ) -> Result<ActivityId, ActionError> {
        let Attempt {
            action,
            destination,
            params,
            timestamp,
            ..
        } = attempt;
        let Outcome {
            id,
            mut result,
            exchange_status,
            mining_status,
            error,
        } = outcome;

        result.insert(
            "error".into(),
            json!(error.as_ref().map(ToString::to_string).unwrap_or_default()),
        );
        let record = ActivityRecord {
            action,
            id: id.clone(),
            destination,
            params,
            result,
            exchange_status,
            mining_status,
            timestamp,
        };

        let storage = match self.ledger.record(record).await {
            Ok(()) => None,
            Err(e) => {
                error!(activity = %id, action = %action, error = %e, "Failed to record activity");
                Some(e)
            }
        };

        match combine(error, storage) {
            None => {
                info!(
                    activity = %id,
                    action = %action,
                    exchange_status = %exchange_status,
                    mining_status = %mining_status,
                    "Activity recorded"
                );
                Ok(id)
            }
            Some(error) => {
                warn!(activity = %id, action = %action, error = %error, "Activity failed");
                Err(ActionError::new(id, error))
            }
        }
    }
}

/// An action about to be dispatched.
struct Attempt {
    action: Action,
    token: AttemptToken,
    destination: String,
    params: Fields,
    /// Milliseconds since the Unix epoch.
    timestamp: u64,
}

impl Attempt {
    fn new(action: Action, destination: impl Into<String>, params: Value, timestamp: u64) -> Self {
        let token = AttemptToken::reserve();
        let mut params = match params {
            Value::Object(map) => map,
            _ => Fields::new(),
        };
        params.insert("attempt".into(), json!(token.to_string()));
        Self {
            action,
            token,
            destination: destination.into(),
            params,
            timestamp,
        }
    }

    /// Durable id for an attempt that produced no external token.
    fn unanswered(&self) -> ActivityId {
        self.token.finalize(self.token.to_string())
    }
}

/// What the external call produced.
struct Outcome {
    id: ActivityId,
    result: Fields,
    exchange_status: ExchangeStatus,
    mining_status: MiningStatus,
    error: Option<Error>,
}

impl Outcome {
    fn ok(
        id: ActivityId,
        result: Fields,
        exchange_status: ExchangeStatus,
        mining_status: MiningStatus,
    ) -> Self {
        Self {
            id,
            result,
            exchange_status,
            mining_status,
            error: None,
        }
    }

    fn failed(
        id: ActivityId,
        exchange_status: ExchangeStatus,
        mining_status: MiningStatus,
        error: Error,
    ) -> Self {
        Self {
            id,
            result: Fields::new(),
            exchange_status,
            mining_status,
            error: Some(error),
        }
    }
}

/// Result fields describing a submitted transaction.
fn tx_fields(tx: &SubmittedTx) -> Fields {
    let mut fields = Fields::new();
    fields.insert("tx".into(), json!(tx.hash.to_string()));
    fields.insert("nonce".into(), json!(tx.nonce));
    fields.insert("gas_price".into(), json!(tx.gas_price.to_string()));
    fields
}
