//! Pre-flight validation of trade, withdraw/deposit and set-rates inputs.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use tracing::warn;

use super::asset::{Asset, TradingPair};
use crate::error::ValidationError;

const WEI_PER_ETH: f64 = 1e18;

/// Reject trades whose notional is below the pair's configured minimum.
///
/// A zero `min_notional` means the pair has no minimum.
pub fn check_trade_notional(
    pair: &TradingPair,
    rate: Decimal,
    amount: Decimal,
) -> Result<(), ValidationError> {
    if pair.min_notional <= Decimal::ZERO {
        return Ok(());
    }
    let notional = rate * amount;
    if notional < pair.min_notional {
        return Err(ValidationError::NotionalTooSmall {
            notional,
            min_notional: pair.min_notional,
        });
    }
    Ok(())
}

/// Reject amounts that the exchange's withdraw fee would swallow entirely.
///
/// `fee` is in human units and is scaled by the asset's decimals before the
/// comparison against `amount` (base units).
pub fn check_withdraw_floor(
    fee: Decimal,
    asset: &Asset,
    amount: U256,
) -> Result<(), ValidationError> {
    let floor = asset.to_base_units(fee).unwrap_or(U256::MAX);
    if amount < floor {
        return Err(ValidationError::BelowWithdrawFloor {
            asset: asset.symbol.clone(),
            amount: amount.to_string(),
            floor: floor.to_string(),
        });
    }
    Ok(())
}

fn eth_ratio(value: U256) -> f64 {
    u128::try_from(value).map_or(f64::MAX, |v| v as f64 / WEI_PER_ETH)
}

/// Validate a set-rates batch index by index.
///
/// - A `(0, 0)` buy/sell pair accepts the whole batch immediately; later
///   indices are not inspected.
/// - With both rates set, the ETH-relative buy rate must exceed both the sell
///   rate and the AFP mid.
/// - A zero buy rate is rejected. A zero sell rate alone is accepted with a
///   warning: selling may be disabled per token, buying may not.
pub fn check_set_rates(
    buys: &[U256],
    afp_mids: &[U256],
    sells: &[U256],
) -> Result<(), ValidationError> {
    if buys.len() != sells.len() || buys.len() != afp_mids.len() {
        return Err(ValidationError::LengthMismatch);
    }

    for (index, ((&buy, &sell), &afp_mid)) in buys.iter().zip(sells).zip(afp_mids).enumerate() {
        if buy.is_zero() && sell.is_zero() {
            return Ok(());
        }

        if !buy.is_zero() && !sell.is_zero() {
            let sell_rate = eth_ratio(sell);
            let buy_rate = 1.0 / eth_ratio(buy);
            let afp_rate = eth_ratio(afp_mid);
            if !(buy_rate > sell_rate && buy_rate > afp_rate) {
                return Err(ValidationError::InconsistentRates {
                    index,
                    buy: buy_rate,
                    sell: sell_rate,
                    afp_mid: afp_rate,
                });
            }
            continue;
        }

        if buy.is_zero() {
            return Err(ValidationError::ZeroBuyRate { index });
        }
        warn!(index, "sell rate is zero, selling disabled for this token");
    }

    Ok(())
}
