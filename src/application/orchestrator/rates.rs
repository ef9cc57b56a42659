//! Set-rates submission with replace-by-fee.
//!
//! A set-rates transaction that has not been mined is never queued behind a new
//! one. The next submission reuses its nonce at a higher gas price, so exactly
//! one of them can be included.

use std::cmp::Ordering;

use alloy_primitives::{TxHash, U256};
use serde_json::json;
use tracing::info;

use super::{tx_fields, ActionOrchestrator, Attempt, Outcome};
use crate::domain::sanity::check_set_rates;
use crate::domain::time::now_millis;
use crate::domain::{
    Action, ActivityId, Asset, AssetId, ExchangeStatus, MiningStatus, SubmittedTx,
    BLOCKCHAIN_DESTINATION,
};
use crate::error::{ActionError, Result, ValidationError};
use crate::port::{PendingActivity, SetRatesCall};

/// New conversion rates for the reserve contract, one entry per asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetRatesRequest {
    pub assets: Vec<Asset>,
    /// Buy rates in wei per token unit.
    pub buys: Vec<U256>,
    /// Sell rates in wei per token unit.
    pub sells: Vec<U256>,
    /// Block the rates were computed at.
    pub block: u64,
    /// Reference mid prices the buy rates are checked against.
    pub afp_mids: Vec<U256>,
    /// Free-form notes stored with the activity.
    pub additional_msgs: Vec<String>,
}

impl ActionOrchestrator {
    /// Push a new rate batch to the reserve contract.
    ///
    /// If an earlier set-rates transaction is still unmined, the batch replaces
    /// it at the same nonce with an escalated gas price. Otherwise it is
    /// submitted at the next free nonce with the policy's initial price.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] when the batch fails validation, the chain
    /// cannot be reached, or the ledger write fails. A batch rejected before
    /// submission is recorded under the zero hash.
    pub async fn set_rates(
        &self,
        request: &SetRatesRequest,
    ) -> std::result::Result<ActivityId, ActionError> {
        let asset_ids: Vec<&AssetId> = request.assets.iter().map(|a| &a.id).collect();
        let attempt = Attempt::new(
            Action::SetRates,
            BLOCKCHAIN_DESTINATION,
            json!({
                "assets": asset_ids,
                "buys": to_strings(&request.buys),
                "sells": to_strings(&request.sells),
                "afp_mids": to_strings(&request.afp_mids),
                "block": request.block,
                "msgs": request.additional_msgs,
            }),
            now_millis(),
        );
        info!(
            attempt = %attempt.token,
            assets = request.assets.len(),
            block = request.block,
            "Dispatching set rates"
        );

        let outcome = match self.submit_rates(request).await {
            Ok(tx) => Outcome::ok(
                attempt.token.finalize(tx.hash.to_string()),
                tx_fields(&tx),
                ExchangeStatus::Unset,
                MiningStatus::Submitted,
            ),
            Err(e) => Outcome::failed(
                attempt.token.finalize(TxHash::ZERO.to_string()),
                ExchangeStatus::Unset,
                MiningStatus::Failed,
                e,
            ),
        };
        self.conclude(attempt, outcome).await
    }

    async fn submit_rates(&self, request: &SetRatesRequest) -> Result<SubmittedTx> {
        if request.assets.len() != request.buys.len() {
            return Err(ValidationError::LengthMismatch.into());
        }
        check_set_rates(&request.buys, &request.afp_mids, &request.sells)?;

        let mined_nonce = self.blockchain.set_rate_mined_nonce().await?;
        let (nonce, gas_price) = match self.latest_pending_rates(mined_nonce).await? {
            Some(pending) => {
                let (nonce, gas_price) = self.replacement_slot(&pending, mined_nonce);
                info!(
                    replaces = %pending.record.id,
                    nonce,
                    retry_count = pending.retry_count,
                    gas_price = %gas_price,
                    "Replacing unmined set rates"
                );
                (nonce, gas_price)
            }
            None => {
                let recommended = self.blockchain.standard_gas_price().await;
                (mined_nonce, self.gas.initial_price(recommended))
            }
        };

        let call = SetRatesCall {
            tokens: request.assets.iter().map(|a| a.address).collect(),
            buys: request.buys.clone(),
            sells: request.sells.clone(),
            block: request.block,
            nonce,
            gas_price,
        };
        self.blockchain.set_rates(&call).await
    }

    /// Replace whatever set-rates transaction is still unmined with an empty one.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] with [`ValidationError::NothingToCancel`] when no
    /// set-rates transaction is pending, and the chain or ledger error otherwise.
    pub async fn cancel_set_rates(&self) -> std::result::Result<ActivityId, ActionError> {
        let attempt = Attempt::new(
            Action::CancelSetRates,
            BLOCKCHAIN_DESTINATION,
            json!({}),
            now_millis(),
        );
        info!(attempt = %attempt.token, "Dispatching set rates cancellation");

        let outcome = match self.submit_cancellation().await {
            Ok((tx, replaced)) => {
                let mut result = tx_fields(&tx);
                result.insert("replaces".into(), json!(replaced.to_string()));
                Outcome::ok(
                    attempt.token.finalize(tx.hash.to_string()),
                    result,
                    ExchangeStatus::Unset,
                    MiningStatus::Submitted,
                )
            }
            Err(e) => Outcome::failed(
                attempt.token.finalize(TxHash::ZERO.to_string()),
                ExchangeStatus::Unset,
                MiningStatus::Failed,
                e,
            ),
        };
        self.conclude(attempt, outcome).await
    }

    async fn submit_cancellation(&self) -> Result<(SubmittedTx, ActivityId)> {
        let mined_nonce = self.blockchain.set_rate_mined_nonce().await?;
        let pending = self
            .latest_pending_rates(mined_nonce)
            .await?
            .ok_or(ValidationError::NothingToCancel { nonce: mined_nonce })?;
        let (nonce, gas_price) = self.replacement_slot(&pending, mined_nonce);
        let tx = self.blockchain.cancel_nonce(nonce, gas_price).await?;
        Ok((tx, pending.record.id))
    }

    /// Nonce and escalated gas price for replacing `pending`.
    fn replacement_slot(&self, pending: &PendingActivity, mined_nonce: u64) -> (u64, U256) {
        let nonce = pending.record.nonce().unwrap_or(mined_nonce);
        let recorded = pending
            .record
            .gas_price()
            .unwrap_or_else(|| self.gas.initial_price(0.0));
        let gas_price = self.gas.replacement_price(recorded, pending.retry_count);
        (nonce, gas_price)
    }

    /// Latest unmined set-rates or cancellation at or above `mined_nonce`.
    ///
    /// Both occupy the same nonce sequence, so a pending cancellation has to be
    /// outbid just like a pending batch.
    async fn latest_pending_rates(&self, mined_nonce: u64) -> Result<Option<PendingActivity>> {
        let rates = self
            .ledger
            .pending_activity_for_action(mined_nonce, Action::SetRates)
            .await?;
        let cancels = self
            .ledger
            .pending_activity_for_action(mined_nonce, Action::CancelSetRates)
            .await?;
        Ok(match (rates, cancels) {
            (Some(rates), Some(cancels)) => Some(latest_of(rates, cancels)),
            (rates, cancels) => rates.or(cancels),
        })
    }
}

fn latest_of(a: PendingActivity, b: PendingActivity) -> PendingActivity {
    match a.record.nonce().cmp(&b.record.nonce()) {
        Ordering::Greater => a,
        Ordering::Less => b,
        Ordering::Equal => {
            let retry_count = a.retry_count + b.retry_count;
            let record = if b.record.gas_price() > a.record.gas_price() {
                b.record
            } else {
                a.record
            };
            PendingActivity {
                record,
                retry_count,
            }
        }
    }
}

fn to_strings(values: &[U256]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}
