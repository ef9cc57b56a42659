//! Deposits to and withdrawals from exchanges.

use alloy_primitives::{TxHash, U256};
use serde_json::json;
use tracing::info;

use super::{tx_fields, ActionOrchestrator, Attempt, Outcome};
use crate::application::DepositRoute;
use crate::domain::sanity::check_withdraw_floor;
use crate::domain::time::now_millis;
use crate::domain::{
    Action, ActivityId, Asset, ExchangeId, ExchangeStatus, Fields, MiningStatus, SubmittedTx,
    BLOCKCHAIN_DESTINATION,
};
use crate::error::{ActionError, Error, Result, ValidationError};

impl ActionOrchestrator {
    /// Send `amount` base units of `asset` from the reserve to an exchange.
    ///
    /// Only one unresolved deposit per asset and exchange is allowed. The
    /// activity id is built from the transaction hash; when nothing was sent it
    /// uses the zero hash together with the asset symbol and amount.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] when the exchange does not take the asset, a
    /// deposit is already pending, the amount is below the withdraw fee floor,
    /// the transfer fails, or the ledger write fails.
    pub async fn deposit(
        &self,
        exchange_id: &ExchangeId,
        asset: &Asset,
        amount: U256,
        timepoint: u64,
    ) -> std::result::Result<ActivityId, ActionError> {
        let attempt = Attempt::new(
            Action::Deposit,
            BLOCKCHAIN_DESTINATION,
            json!({
                "exchange": exchange_id,
                "asset": asset.id,
                "amount": amount.to_string(),
                "timepoint": timepoint,
            }),
            timepoint,
        );
        info!(
            attempt = %attempt.token,
            exchange = %exchange_id,
            asset = %asset,
            amount = %amount,
            "Dispatching deposit"
        );

        let outcome = match self.send_deposit(exchange_id, asset, amount).await {
            Ok(tx) => Outcome::ok(
                attempt.token.finalize(tx.hash.to_string()),
                tx_fields(&tx),
                ExchangeStatus::Unset,
                MiningStatus::Submitted,
            ),
            Err(e) => Outcome::failed(
                attempt
                    .token
                    .finalize(format!("{}|{}|{}", TxHash::ZERO, asset.symbol, amount)),
                ExchangeStatus::Unset,
                MiningStatus::Failed,
                e,
            ),
        };
        self.conclude(attempt, outcome).await
    }

    async fn send_deposit(
        &self,
        exchange_id: &ExchangeId,
        asset: &Asset,
        amount: U256,
    ) -> Result<SubmittedTx> {
        let entry = self.registry.require(exchange_id)?;
        let target = entry.deposit_target(asset).ok_or_else(|| {
            Error::UnsupportedOperation(format!("{exchange_id} does not accept {asset} deposits"))
        })?;
        if self.ledger.has_pending_deposit(&asset.id, exchange_id).await? {
            return Err(Error::Conflict(format!(
                "a {asset} deposit to {exchange_id} is still pending"
            )));
        }
        check_withdraw_floor(entry.withdraw_fee(&asset.id), asset, amount)?;
        self.blockchain.send(asset, amount, target).await
    }

    /// Ask an exchange to send `amount` base units of `asset` back to the reserve.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] when the exchange does not support the asset,
    /// the amount is below the withdraw fee floor, the exchange rejects the
    /// request, or the ledger write fails.
    pub async fn withdraw(
        &self,
        exchange_id: &ExchangeId,
        asset: &Asset,
        amount: U256,
    ) -> std::result::Result<ActivityId, ActionError> {
        let timepoint = now_millis();
        let attempt = Attempt::new(
            Action::Withdraw,
            exchange_id.as_str(),
            json!({
                "exchange": exchange_id,
                "asset": asset.id,
                "amount": amount.to_string(),
                "timepoint": timepoint,
            }),
            timepoint,
        );
        info!(
            attempt = %attempt.token,
            exchange = %exchange_id,
            asset = %asset,
            amount = %amount,
            "Dispatching withdrawal"
        );

        let outcome = match self.request_withdrawal(exchange_id, asset, amount).await {
            Ok(withdrawal_id) => {
                let mut result = Fields::new();
                result.insert("withdrawal_id".into(), json!(withdrawal_id));
                Outcome::ok(
                    attempt.token.finalize(withdrawal_id),
                    result,
                    ExchangeStatus::Submitted,
                    MiningStatus::Unset,
                )
            }
            Err(e) => Outcome::failed(
                attempt.unanswered(),
                ExchangeStatus::Failed,
                MiningStatus::Unset,
                e,
            ),
        };
        self.conclude(attempt, outcome).await
    }

    async fn request_withdrawal(
        &self,
        exchange_id: &ExchangeId,
        asset: &Asset,
        amount: U256,
    ) -> Result<String> {
        let entry = self.registry.require(exchange_id)?;
        if entry.exchange().address(asset).is_none() {
            return Err(Error::UnsupportedOperation(format!(
                "{exchange_id} does not support {asset}"
            )));
        }
        check_withdraw_floor(entry.withdraw_fee(&asset.id), asset, amount)?;
        entry
            .exchange()
            .withdraw(asset, amount, self.reserve_address)
            .await
    }

    /// Poll the exchange side of a recorded deposit and persist a terminal outcome.
    ///
    /// Relayed exchanges advance their relay state machine on every call, so
    /// this is what a deposit poller drives. Deposits that are no longer pending
    /// return their recorded status untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the activity is unknown or not a deposit of `asset`,
    /// if the exchange side cannot be queried, or if the update cannot be stored.
    pub async fn reconcile_deposit(
        &self,
        id: &ActivityId,
        asset: &Asset,
    ) -> Result<ExchangeStatus> {
        let mut record = self.ledger.activity(id).await?;
        if record.action != Action::Deposit {
            return Err(ValidationError::WrongAction {
                id: id.to_string(),
                action: record.action.to_string(),
                expected: Action::Deposit.as_str(),
            }
            .into());
        }
        if !record.is_pending() {
            return Ok(record.exchange_status);
        }

        let missing = |param: &'static str| ValidationError::MissingParam {
            id: id.to_string(),
            param,
        };
        let recorded_asset = record.param_str("asset").ok_or_else(|| missing("asset"))?;
        if recorded_asset != asset.id.as_str() {
            return Err(ValidationError::AssetMismatch {
                id: id.to_string(),
                recorded: recorded_asset.to_string(),
                given: asset.id.to_string(),
            }
            .into());
        }
        let exchange_id = record
            .param_str("exchange")
            .map(ExchangeId::from)
            .ok_or_else(|| missing("exchange"))?;
        let amount: U256 = record
            .param_str("amount")
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| missing("amount"))?;
        let tx_hash: TxHash = record
            .result
            .get("tx")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| missing("tx"))?;

        let entry = self.registry.require(&exchange_id)?;
        let status = entry.deposit_status(id, tx_hash, asset, amount).await?;
        match status {
            ExchangeStatus::Done => {
                record.exchange_status = ExchangeStatus::Done;
                record.mining_status = MiningStatus::Mined;
            }
            ExchangeStatus::Failed => {
                record.exchange_status = ExchangeStatus::Failed;
                if let DepositRoute::Relayed(relay) = entry.route() {
                    if let Some(mining) = relay.settled_mining_status(id).await? {
                        record.mining_status = mining;
                    }
                }
            }
            ExchangeStatus::Pending if record.exchange_status != ExchangeStatus::Pending => {
                record.exchange_status = ExchangeStatus::Pending;
            }
            _ => return Ok(status),
        }

        self.ledger.update_completed_activity(id, record).await?;
        info!(activity = %id, exchange = %exchange_id, status = %status, "Deposit reconciled");
        Ok(status)
    }
}
