//! Order placement and cancellation.

use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, warn};

use super::{ActionOrchestrator, Attempt, Outcome, TradeReceipt};
use crate::domain::sanity::check_trade_notional;
use crate::domain::time::now_millis;
use crate::domain::{
    Action, ExchangeId, ExchangeStatus, Fields, MiningStatus, OrderId, TradeSide, TradingPair,
};
use crate::error::{ActionError, Result, ValidationError};
use crate::port::TradeOutcome;

impl ActionOrchestrator {
    /// Place an order and record it.
    ///
    /// The activity id is built from the exchange order id. A filled order is
    /// recorded `done`, a resting one `submitted`, and any failure `failed`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] carrying the recorded id when the notional is too
    /// small, the exchange is unknown, the exchange call fails, or the ledger
    /// write fails.
    pub async fn trade(
        &self,
        exchange_id: &ExchangeId,
        side: TradeSide,
        pair: &TradingPair,
        rate: Decimal,
        amount: Decimal,
    ) -> std::result::Result<TradeReceipt, ActionError> {
        let timepoint = now_millis();
        let attempt = Attempt::new(
            Action::Trade,
            exchange_id.as_str(),
            json!({
                "exchange": exchange_id,
                "side": side,
                "base": pair.base,
                "quote": pair.quote,
                "rate": rate.to_string(),
                "amount": amount.to_string(),
                "timepoint": timepoint,
            }),
            timepoint,
        );
        info!(
            attempt = %attempt.token,
            exchange = %exchange_id,
            pair = %pair,
            side = %side,
            rate = %rate,
            amount = %amount,
            "Dispatching trade"
        );

        let placed = self.place_order(exchange_id, side, pair, rate, amount).await;
        let (outcome, filled) = match placed {
            Ok(trade) => {
                let status = if trade.finished {
                    ExchangeStatus::Done
                } else {
                    ExchangeStatus::Submitted
                };
                let id = attempt.token.finalize(trade.order_id.as_str());
                let outcome = Outcome::ok(id, trade_fields(&trade), status, MiningStatus::Unset);
                (outcome, Some(trade))
            }
            Err(e) => {
                let outcome = Outcome::failed(
                    attempt.unanswered(),
                    ExchangeStatus::Failed,
                    MiningStatus::Unset,
                    e,
                );
                (outcome, None)
            }
        };

        let id = self.conclude(attempt, outcome).await?;
        let (done, remaining, finished) = filled.map_or((Decimal::ZERO, Decimal::ZERO, false), |t| {
            (t.done, t.remaining, t.finished)
        });
        Ok(TradeReceipt {
            id,
            done,
            remaining,
            finished,
        })
    }

    async fn place_order(
        &self,
        exchange_id: &ExchangeId,
        side: TradeSide,
        pair: &TradingPair,
        rate: Decimal,
        amount: Decimal,
    ) -> Result<TradeOutcome> {
        check_trade_notional(pair, rate, amount)?;
        let entry = self.registry.require(exchange_id)?;
        entry.exchange().trade(side, pair, rate, amount).await
    }

    /// Cancel an open order placed through [`trade`](Self::trade).
    ///
    /// The trading pair is recovered from the recorded trade activity. No new
    /// activity is written.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown orders, a validation error when the
    /// recorded activity is not a usable trade, and the exchange's error when
    /// the cancellation is rejected.
    pub async fn cancel_order(&self, order_id: &OrderId, exchange_id: &ExchangeId) -> Result<()> {
        let record = self.ledger.activity_by_order_id(order_id).await?;
        if record.action != Action::Trade {
            return Err(ValidationError::WrongAction {
                id: record.id.to_string(),
                action: record.action.to_string(),
                expected: Action::Trade.as_str(),
            }
            .into());
        }

        let param = |name: &'static str| {
            record.param_str(name).ok_or_else(|| ValidationError::MissingParam {
                id: record.id.to_string(),
                param: name,
            })
        };
        let pair = TradingPair::new(param("base")?, param("quote")?);

        let entry = self.registry.require(exchange_id)?;
        if let Err(e) = entry.exchange().cancel_order(order_id, &pair).await {
            warn!(
                order = %order_id,
                exchange = %exchange_id,
                error = %e,
                "Order cancellation rejected"
            );
            return Err(e);
        }

        info!(order = %order_id, exchange = %exchange_id, pair = %pair, "Order cancelled");
        Ok(())
    }
}

fn trade_fields(trade: &TradeOutcome) -> Fields {
    let mut fields = Fields::new();
    fields.insert("order_id".into(), json!(trade.order_id.as_str()));
    fields.insert("done".into(), json!(trade.done.to_string()));
    fields.insert("remaining".into(), json!(trade.remaining.to_string()));
    fields.insert("finished".into(), json!(trade.finished));
    fields
}
