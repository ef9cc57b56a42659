//! Activity ledger ports.
//!
//! The ledger owns every [`ActivityRecord`] and relay [`TxEntry`]. Callers append
//! and read; records change only through the explicit overwrite operations.

use async_trait::async_trait;

use crate::domain::{
    Action, ActivityId, ActivityRecord, AssetId, ExchangeId, OrderId, TxEntry, TxTier,
};
use crate::error::{Result, StorageError};

/// The most recent unmined activity at or above a nonce, with its attempt count.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingActivity {
    pub record: ActivityRecord,
    /// Number of pending attempts sharing the record's nonce.
    pub retry_count: u64,
}

/// Durable, queryable record of every attempted action.
///
/// # Implementation Notes
///
/// - Must support concurrent appends and per-key reads
/// - `has_pending_deposit` is advisory; it is not a lock
#[async_trait]
pub trait ActivityLedger: Send + Sync {
    /// Append a record.
    async fn record(&self, record: ActivityRecord) -> std::result::Result<(), StorageError>;

    /// Look up an activity by id. Fails with `NotFound`.
    async fn activity(&self, id: &ActivityId) -> Result<ActivityRecord>;

    /// Look up a trade activity by the exchange order id. Fails with `NotFound`.
    async fn activity_by_order_id(&self, order_id: &OrderId) -> Result<ActivityRecord>;

    /// Whether an unresolved deposit of `asset` to `exchange` exists.
    async fn has_pending_deposit(&self, asset: &AssetId, exchange: &ExchangeId) -> Result<bool>;

    /// Latest unmined `action` activity with a nonce at or above `mined_nonce`.
    async fn pending_activity_for_action(
        &self,
        mined_nonce: u64,
        action: Action,
    ) -> Result<Option<PendingActivity>>;

    /// Overwrite a recorded activity after late reconciliation.
    async fn update_completed_activity(
        &self,
        id: &ActivityId,
        record: ActivityRecord,
    ) -> std::result::Result<(), StorageError>;

    /// All activities still in flight.
    async fn pending_activities(&self) -> Result<Vec<ActivityRecord>>;
}

/// Two-tier storage of relay transactions.
#[async_trait]
pub trait RelayStore: Send + Sync {
    /// Entry for `id`, looking in the permanent tier first.
    async fn intermediate_tx(
        &self,
        id: &ActivityId,
    ) -> std::result::Result<Option<(TxTier, TxEntry)>, StorageError>;

    /// Insert or overwrite the pending entry. Fails once `id` is permanent.
    async fn store_pending_intermediate_tx(
        &self,
        id: &ActivityId,
        entry: TxEntry,
    ) -> std::result::Result<(), StorageError>;

    /// Write the terminal entry and drop any pending one.
    async fn store_intermediate_tx(
        &self,
        id: &ActivityId,
        entry: TxEntry,
    ) -> std::result::Result<(), StorageError>;
}
