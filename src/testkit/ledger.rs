//! Ledger wrapper with switchable storage failures.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::adapter::outbound::memory::MemoryLedger;
use crate::domain::{
    Action, ActivityId, ActivityRecord, AssetId, ExchangeId, OrderId, TxEntry, TxTier,
};
use crate::error::{Result, StorageError};
use crate::port::{ActivityLedger, PendingActivity, RelayStore};

/// A [`MemoryLedger`] whose writes and reads can be made to fail.
///
/// Failed writes leave the inner ledger untouched.
#[derive(Default)]
pub struct FlakyLedger {
    inner: MemoryLedger,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl FlakyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    /// The wrapped ledger, for assertions.
    pub fn inner(&self) -> &MemoryLedger {
        &self.inner
    }

    fn check_write(&self) -> std::result::Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write("disk full".into()));
        }
        Ok(())
    }

    fn check_read(&self) -> std::result::Result<(), StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Read("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ActivityLedger for FlakyLedger {
    async fn record(&self, record: ActivityRecord) -> std::result::Result<(), StorageError> {
        self.check_write()?;
        self.inner.record(record).await
    }

    async fn activity(&self, id: &ActivityId) -> Result<ActivityRecord> {
        self.check_read()?;
        self.inner.activity(id).await
    }

    async fn activity_by_order_id(&self, order_id: &OrderId) -> Result<ActivityRecord> {
        self.check_read()?;
        self.inner.activity_by_order_id(order_id).await
    }

    async fn has_pending_deposit(&self, asset: &AssetId, exchange: &ExchangeId) -> Result<bool> {
        self.check_read()?;
        self.inner.has_pending_deposit(asset, exchange).await
    }

    async fn pending_activity_for_action(
        &self,
        mined_nonce: u64,
        action: Action,
    ) -> Result<Option<PendingActivity>> {
        self.check_read()?;
        self.inner.pending_activity_for_action(mined_nonce, action).await
    }

    async fn update_completed_activity(
        &self,
        id: &ActivityId,
        record: ActivityRecord,
    ) -> std::result::Result<(), StorageError> {
        self.check_write()?;
        self.inner.update_completed_activity(id, record).await
    }

    async fn pending_activities(&self) -> Result<Vec<ActivityRecord>> {
        self.check_read()?;
        self.inner.pending_activities().await
    }
}

#[async_trait]
impl RelayStore for FlakyLedger {
    async fn intermediate_tx(
        &self,
        id: &ActivityId,
    ) -> std::result::Result<Option<(TxTier, TxEntry)>, StorageError> {
        self.check_read()?;
        self.inner.intermediate_tx(id).await
    }

    async fn store_pending_intermediate_tx(
        &self,
        id: &ActivityId,
        entry: TxEntry,
    ) -> std::result::Result<(), StorageError> {
        self.check_write()?;
        self.inner.store_pending_intermediate_tx(id, entry).await
    }

    async fn store_intermediate_tx(
        &self,
        id: &ActivityId,
        entry: TxEntry,
    ) -> std::result::Result<(), StorageError> {
        self.check_write()?;
        self.inner.store_intermediate_tx(id, entry).await
    }
}
