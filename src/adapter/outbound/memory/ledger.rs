//! In-process activity ledger.
//!
//! Implements [`ActivityLedger`] and [`RelayStore`] on top of `parking_lot`
//! locks. Suitable for tests, dry runs and single-process deployments that
//! replay state from elsewhere on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::domain::{
    Action, ActivityId, ActivityRecord, AssetId, ExchangeId, OrderId, TxEntry, TxTier,
};
use crate::error::{Error, Result, StorageError};
use crate::port::{ActivityLedger, PendingActivity, RelayStore};

#[derive(Default)]
struct Activities {
    by_id: HashMap<ActivityId, ActivityRecord>,
    /// Trade activities keyed by exchange order id.
    by_order: HashMap<String, ActivityId>,
}

#[derive(Default)]
struct RelayTiers {
    pending: HashMap<ActivityId, TxEntry>,
    permanent: HashMap<ActivityId, TxEntry>,
}

/// Memory-backed ledger.
#[derive(Default)]
pub struct MemoryLedger {
    activities: RwLock<Activities>,
    relay: RwLock<RelayTiers>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded activities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.activities.read().by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every record, ordered by id.
    #[must_use]
    pub fn records(&self) -> Vec<ActivityRecord> {
        let mut records: Vec<_> = self.activities.read().by_id.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }
}

#[async_trait]
impl ActivityLedger for MemoryLedger {
    async fn record(&self, record: ActivityRecord) -> std::result::Result<(), StorageError> {
        let mut activities = self.activities.write();
        if activities.by_id.contains_key(&record.id) {
            return Err(StorageError::Write(format!(
                "activity {} already recorded",
                record.id
            )));
        }
        if record.action == Action::Trade && !record.id.eid().is_empty() {
            activities
                .by_order
                .insert(record.id.eid().to_string(), record.id.clone());
        }
        debug!(id = %record.id, action = %record.action, "Recorded activity");
        activities.by_id.insert(record.id.clone(), record);
        Ok(())
    }

    async fn activity(&self, id: &ActivityId) -> Result<ActivityRecord> {
        self.activities
            .read()
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("activity {id}")))
    }

    async fn activity_by_order_id(&self, order_id: &OrderId) -> Result<ActivityRecord> {
        let activities = self.activities.read();
        activities
            .by_order
            .get(order_id.as_str())
            .and_then(|id| activities.by_id.get(id))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("order {order_id}")))
    }

    async fn has_pending_deposit(&self, asset: &AssetId, exchange: &ExchangeId) -> Result<bool> {
        Ok(self
            .activities
            .read()
            .by_id
            .values()
            .any(|r| r.is_deposit_of(asset, exchange) && r.is_pending()))
    }

    async fn pending_activity_for_action(
        &self,
        mined_nonce: u64,
        action: Action,
    ) -> Result<Option<PendingActivity>> {
        let activities = self.activities.read();
        let mut latest: Option<(&ActivityRecord, u64)> = None;
        let mut retry_count = 0;

        for record in activities.by_id.values() {
            if record.action != action || !record.is_pending() {
                continue;
            }
            let Some(nonce) = record.nonce() else {
                continue;
            };
            if nonce < mined_nonce {
                continue;
            }
            match latest {
                Some((current, current_nonce)) if nonce == current_nonce => {
                    retry_count += 1;
                    if record.gas_price() > current.gas_price() {
                        latest = Some((record, nonce));
                    }
                }
                Some((_, current_nonce)) if nonce < current_nonce => {}
                _ => {
                    latest = Some((record, nonce));
                    retry_count = 1;
                }
            }
        }

        Ok(latest.map(|(record, _)| PendingActivity {
            record: record.clone(),
            retry_count,
        }))
    }

    async fn update_completed_activity(
        &self,
        id: &ActivityId,
        record: ActivityRecord,
    ) -> std::result::Result<(), StorageError> {
        let mut activities = self.activities.write();
        match activities.by_id.get_mut(id) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(StorageError::Write(format!("activity {id} was never recorded"))),
        }
    }

    async fn pending_activities(&self) -> Result<Vec<ActivityRecord>> {
        let mut pending: Vec<_> = self
            .activities
            .read()
            .by_id
            .values()
            .filter(|r| r.is_pending())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(pending)
    }
}

#[async_trait]
impl RelayStore for MemoryLedger {
    async fn intermediate_tx(
        &self,
        id: &ActivityId,
    ) -> std::result::Result<Option<(TxTier, TxEntry)>, StorageError> {
        let relay = self.relay.read();
        if let Some(entry) = relay.permanent.get(id) {
            return Ok(Some((TxTier::Permanent, entry.clone())));
        }
        Ok(relay
            .pending
            .get(id)
            .map(|entry| (TxTier::Pending, entry.clone())))
    }

    async fn store_pending_intermediate_tx(
        &self,
        id: &ActivityId,
        entry: TxEntry,
    ) -> std::result::Result<(), StorageError> {
        let mut relay = self.relay.write();
        if relay.permanent.contains_key(id) {
            return Err(StorageError::Write(format!(
                "relay tx for {id} is already terminal"
            )));
        }
        relay.pending.insert(id.clone(), entry);
        Ok(())
    }

    async fn store_intermediate_tx(
        &self,
        id: &ActivityId,
        entry: TxEntry,
    ) -> std::result::Result<(), StorageError> {
        let mut relay = self.relay.write();
        relay.pending.remove(id);
        relay.permanent.insert(id.clone(), entry);
        Ok(())
    }
}
