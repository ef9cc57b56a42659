//! Gas price escalation for replacing stuck set-rates transactions.
//!
//! A transaction stuck in the mempool is replaced by resubmitting at the same
//! nonce with a higher price. Prices ramp exponentially from the recorded price
//! to the ceiling over [`RAMP_STEPS`] retries, then grow by 1 gwei per retry so a
//! node always sees a strictly higher replacement.

use alloy_primitives::U256;

/// Ceiling reached by the exponential ramp, in gwei.
pub const DEFAULT_HIGH_BOUND_GWEI: f64 = 100.1;

/// Price used for fresh submissions when the recommendation is unusable, in gwei.
pub const DEFAULT_FLOOR_GWEI: f64 = 10.0;

/// Retries needed for the ramp to reach the ceiling.
pub const RAMP_STEPS: u64 = 4;

const WEI_PER_GWEI: f64 = 1e9;

/// Replacement price in gwei for the `retry_count`-th resubmission.
///
/// `retry_count == 0` returns `init_price_gwei` unchanged and
/// `retry_count == RAMP_STEPS` returns `high_bound_gwei`. Past the ramp the
/// price is `high_bound_gwei + (retry_count - RAMP_STEPS)`.
#[must_use]
pub fn next_price(init_price_gwei: f64, retry_count: u64, high_bound_gwei: f64) -> f64 {
    if retry_count > RAMP_STEPS {
        return high_bound_gwei + (retry_count - RAMP_STEPS) as f64;
    }
    if init_price_gwei <= 0.0 || !init_price_gwei.is_finite() {
        return high_bound_gwei;
    }
    // Never ramp downwards from a price already above the ceiling.
    let ratio = (high_bound_gwei / init_price_gwei).max(1.0);
    init_price_gwei * ratio.powf(retry_count as f64 / RAMP_STEPS as f64)
}

/// Convert gwei to wei, rounding to the nearest wei. Negative or NaN input is zero.
#[must_use]
pub fn gwei_to_wei(gwei: f64) -> U256 {
    let wei = (gwei * WEI_PER_GWEI).round();
    if wei.is_nan() || wei <= 0.0 {
        return U256::ZERO;
    }
    U256::from(wei as u128)
}

/// Convert wei to gwei. Values beyond `u128` saturate.
#[must_use]
pub fn wei_to_gwei(wei: U256) -> f64 {
    u128::try_from(wei).map_or(f64::MAX, |w| w as f64 / WEI_PER_GWEI)
}

/// Gas pricing bounds for set-rates submissions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasPolicy {
    pub high_bound_gwei: f64,
    pub floor_gwei: f64,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            high_bound_gwei: DEFAULT_HIGH_BOUND_GWEI,
            floor_gwei: DEFAULT_FLOOR_GWEI,
        }
    }
}

impl GasPolicy {
    /// Price for a fresh submission given the chain's recommendation.
    ///
    /// A zero recommendation or one above the ceiling falls back to the floor;
    /// anything else is clamped into `[floor, ceiling]`.
    #[must_use]
    pub fn initial_price(&self, recommended_gwei: f64) -> U256 {
        let gwei = if recommended_gwei <= 0.0
            || !recommended_gwei.is_finite()
            || recommended_gwei > self.high_bound_gwei
        {
            self.floor_gwei
        } else {
            recommended_gwei.max(self.floor_gwei)
        };
        gwei_to_wei(gwei)
    }

    /// Price for replacing a transaction last submitted at `recorded_price` wei.
    #[must_use]
    pub fn replacement_price(&self, recorded_price: U256, retry_count: u64) -> U256 {
        gwei_to_wei(next_price(
            wei_to_gwei(recorded_price),
            retry_count,
            self.high_bound_gwei,
        ))
    }
}
