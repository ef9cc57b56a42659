//! On-chain transactions tracked by the reserve.

use alloy_primitives::{TxHash, U256};
use serde::{Deserialize, Serialize};

use super::activity::{ExchangeStatus, MiningStatus};
use super::id::{AssetId, ExchangeId};

/// A transaction accepted by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedTx {
    pub hash: TxHash,
    pub nonce: u64,
    /// Gas price in wei.
    pub gas_price: U256,
}

/// The relay hop (TX2) of a two-hop deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEntry {
    pub hash: TxHash,
    pub exchange: ExchangeId,
    pub asset: AssetId,
    pub mining_status: MiningStatus,
    pub exchange_status: ExchangeStatus,
    /// Base units relayed.
    pub amount: U256,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl TxEntry {
    /// Copy of this entry with a new status pair.
    #[must_use]
    pub fn with_status(&self, mining: MiningStatus, exchange: ExchangeStatus) -> Self {
        Self {
            mining_status: mining,
            exchange_status: exchange,
            ..self.clone()
        }
    }
}

/// Storage tier of a [`TxEntry`].
///
/// An entry moves from `Pending` to `Permanent` at most once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxTier {
    /// Not yet confirmed by the exchange.
    Pending,
    /// Terminal: confirmed or definitively failed.
    Permanent,
}
