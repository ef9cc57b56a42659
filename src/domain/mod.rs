//! Exchange- and chain-agnostic reserve domain.

pub mod activity;
pub mod asset;
pub mod gas;
pub mod id;
pub mod sanity;
pub mod time;
pub mod tx;

pub use activity::{
    Action, ActivityRecord, ExchangeStatus, Fields, MiningStatus, BLOCKCHAIN_DESTINATION,
};
pub use asset::{Asset, TradeSide, TradingPair};
pub use gas::GasPolicy;
pub use id::{ActivityId, AssetId, AttemptToken, ExchangeId, OrderId};
pub use tx::{SubmittedTx, TxEntry, TxTier};
