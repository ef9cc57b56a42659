//! Two-hop deposit relay.
//!
//! Some exchanges cannot receive a direct on-chain deposit per asset. Funds are
//! first sent to a shared intermediary address (TX1, submitted by the regular
//! deposit path), then relayed from the intermediary to the exchange's real
//! deposit address (TX2), and finally confirmed through the exchange's deposit
//! history.
//!
//! # States
//!
//! ```text
//! AwaitingTx1Mined ─▶ Tx2Submitted ─▶ Tx2Mined ─▶ ExchangeConfirmed
//!                          │              │
//!                          ├──────────────┴────▶ Tx2Failed
//!                          └───────────────────▶ Tx2Lost (after timeout)
//! ```
//!
//! [`DepositRelay::deposit_status`] is idempotent and driven by an external
//! poller. Transient failures are no-ops: abandoning the loop could strand funds
//! already sitting at the intermediary. Only a chain-level transaction failure
//! and the lost-transaction timeout are terminal.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, TxHash, U256};
use dashmap::DashMap;
use tracing::{error, info, warn};

use crate::domain::time::now_millis;
use crate::domain::{ActivityId, Asset, AssetId, ExchangeStatus, MiningStatus, TxEntry, TxTier};
use crate::error::{Error, Result};
use crate::port::{Blockchain, Exchange, IntermediarySigner, RelayStore};

/// Default grace period before an unconfirmed relay transaction is declared lost.
pub const DEFAULT_LOST_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Default number of consecutive TX2 submission failures before alerting.
pub const DEFAULT_FAILURE_ALERT_THRESHOLD: u32 = 5;

/// Timing and alerting knobs of the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayPolicy {
    pub lost_timeout: Duration,
    pub failure_alert_threshold: u32,
}

impl Default for RelayPolicy {
    fn default() -> Self {
        Self {
            lost_timeout: DEFAULT_LOST_TIMEOUT,
            failure_alert_threshold: DEFAULT_FAILURE_ALERT_THRESHOLD,
        }
    }
}

/// Chain-side collaborators of a [`DepositRelay`].
#[derive(Clone)]
pub struct RelayPorts {
    pub blockchain: Arc<dyn Blockchain>,
    pub signer: Arc<dyn IntermediarySigner>,
    pub store: Arc<dyn RelayStore>,
}

/// Reconciles two-hop deposits for one exchange.
pub struct DepositRelay {
    exchange: Arc<dyn Exchange>,
    blockchain: Arc<dyn Blockchain>,
    signer: Arc<dyn IntermediarySigner>,
    store: Arc<dyn RelayStore>,
    /// Last known deposit addresses, used when the live lookup fails.
    fallback_addresses: HashMap<AssetId, Address>,
    policy: RelayPolicy,
    /// Consecutive TX2 submission failures per deposit.
    submission_failures: DashMap<ActivityId, u32>,
    /// Broadcast TX2s whose pending entry could not be stored yet.
    unsaved_tx2: DashMap<ActivityId, TxEntry>,
}

impl DepositRelay {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        ports: RelayPorts,
        fallback_addresses: HashMap<AssetId, Address>,
        policy: RelayPolicy,
    ) -> Self {
        Self {
            exchange,
            blockchain: ports.blockchain,
            signer: ports.signer,
            store: ports.store,
            fallback_addresses,
            policy,
            submission_failures: DashMap::new(),
            unsaved_tx2: DashMap::new(),
        }
    }

    /// Address TX1 deposits must be sent to.
    #[must_use]
    pub fn intermediary_address(&self) -> Address {
        self.signer.address()
    }

    /// Consecutive failed attempts to submit TX2 for `id`.
    #[must_use]
    pub fn submission_failures(&self, id: &ActivityId) -> u32 {
        self.submission_failures.get(id).map_or(0, |count| *count)
    }

    /// Mining status of the terminal entry for `id`, if the relay settled it.
    ///
    /// # Errors
    ///
    /// Fails when the relay store cannot be read.
    pub async fn settled_mining_status(&self, id: &ActivityId) -> Result<Option<MiningStatus>> {
        Ok(match self.store.intermediate_tx(id).await? {
            Some((TxTier::Permanent, entry)) => Some(entry.mining_status),
            _ => None,
        })
    }

    /// Advance the relay for one deposit and report the exchange-side status.
    ///
    /// Returns [`ExchangeStatus::Unset`] while the deposit is still in flight,
    /// `Done` once the exchange credited it, and `Failed` on a terminal failure.
    ///
    /// # Errors
    ///
    /// Only ledger failures surface; chain and exchange hiccups are retried on
    /// the next call.
    pub async fn deposit_status(
        &self,
        id: &ActivityId,
        tx1_hash: TxHash,
        asset: &Asset,
        amount: U256,
    ) -> Result<ExchangeStatus> {
        self.store_unsaved_tx2(id).await?;
        match self.store.intermediate_tx(id).await? {
            None => self.await_tx1(id, tx1_hash, asset, amount).await,
            Some((TxTier::Pending, entry)) => self.track_tx2(id, entry).await,
            // Terminal entries never change; report what was recorded.
            Some((TxTier::Permanent, entry)) => Ok(entry.exchange_status),
        }
    }

    async fn await_tx1(
        &self,
        id: &ActivityId,
        tx1_hash: TxHash,
        asset: &Asset,
        amount: U256,
    ) -> Result<ExchangeStatus> {
        let status = match self.blockchain.tx_status(tx1_hash).await {
            Ok(status) => status,
            Err(e) => {
                warn!(activity = %id, tx = %tx1_hash, error = %e, "TX1 status unavailable");
                return Ok(ExchangeStatus::Unset);
            }
        };

        let tx1_entry = |mining: MiningStatus| TxEntry {
            hash: tx1_hash,
            exchange: self.exchange.id().clone(),
            asset: asset.id.clone(),
            mining_status: mining,
            exchange_status: ExchangeStatus::Failed,
            amount,
            timestamp: now_millis(),
        };

        match status {
            MiningStatus::Mined => self.submit_tx2(id, tx1_hash, asset, amount).await,
            MiningStatus::Failed => {
                self.store
                    .store_intermediate_tx(id, tx1_entry(MiningStatus::Failed))
                    .await?;
                warn!(activity = %id, tx = %tx1_hash, "TX1 failed on chain");
                Ok(ExchangeStatus::Failed)
            }
            MiningStatus::Lost if self.expired(id.timepoint() / 1_000_000) => {
                self.store
                    .store_intermediate_tx(id, tx1_entry(MiningStatus::Lost))
                    .await?;
                warn!(activity = %id, tx = %tx1_hash, "TX1 lost");
                Ok(ExchangeStatus::Failed)
            }
            _ => Ok(ExchangeStatus::Unset),
        }
    }

    async fn submit_tx2(
        &self,
        id: &ActivityId,
        tx1_hash: TxHash,
        asset: &Asset,
        amount: U256,
    ) -> Result<ExchangeStatus> {
        let symbol = self.exchange.symbol(asset);
        let destination = match self.exchange.live_deposit_address(&symbol).await {
            Ok(address) => address,
            Err(e) => match self.fallback_addresses.get(&asset.id) {
                Some(address) => {
                    warn!(
                        activity = %id,
                        symbol = %symbol,
                        error = %e,
                        fallback = %address,
                        "Live deposit address lookup failed, using configured address"
                    );
                    *address
                }
                None => {
                    self.note_submission_failure(id, &e);
                    return Ok(ExchangeStatus::Unset);
                }
            },
        };

        let sent = if asset.is_ether() {
            self.signer.transfer_ether(amount, destination).await
        } else {
            self.signer
                .transfer_token(asset.address, amount, destination)
                .await
        };

        let tx2 = match sent {
            Ok(tx) => tx,
            Err(e) => {
                self.note_submission_failure(id, &e);
                return Ok(ExchangeStatus::Unset);
            }
        };
        self.submission_failures.remove(id);

        let entry = TxEntry {
            hash: tx2.hash,
            exchange: self.exchange.id().clone(),
            asset: asset.id.clone(),
            mining_status: MiningStatus::Submitted,
            exchange_status: ExchangeStatus::Unset,
            amount,
            timestamp: now_millis(),
        };
        if let Err(e) = self.store.store_pending_intermediate_tx(id, entry.clone()).await {
            error!(
                activity = %id,
                tx2 = %tx2.hash,
                error = %e,
                "TX2 submitted but could not be stored"
            );
            // Held until stored so the next poll tracks this TX2 instead of sending another.
            self.unsaved_tx2.insert(id.clone(), entry);
            return Err(e.into());
        }

        info!(
            activity = %id,
            tx1 = %tx1_hash,
            tx2 = %tx2.hash,
            to = %destination,
            "Relayed deposit to exchange"
        );
        Ok(ExchangeStatus::Unset)
    }

    async fn track_tx2(&self, id: &ActivityId, entry: TxEntry) -> Result<ExchangeStatus> {
        let status = match self.blockchain.tx_status(entry.hash).await {
            Ok(status) => status,
            Err(e) => {
                warn!(activity = %id, tx2 = %entry.hash, error = %e, "TX2 status unavailable");
                return Ok(ExchangeStatus::Unset);
            }
        };

        match status {
            MiningStatus::Mined => {
                let mined = entry.with_status(MiningStatus::Mined, entry.exchange_status);
                self.store.store_pending_intermediate_tx(id, mined.clone()).await?;

                let history = match self.exchange.deposit_history().await {
                    Ok(history) => history,
                    Err(e) => {
                        warn!(activity = %id, error = %e, "Deposit history unavailable");
                        return Ok(ExchangeStatus::Unset);
                    }
                };
                let credited = history
                    .iter()
                    .any(|deposit| deposit.tx_hash == entry.hash && deposit.state.is_final());
                if !credited {
                    return Ok(ExchangeStatus::Unset);
                }

                self.store
                    .store_intermediate_tx(
                        id,
                        mined.with_status(MiningStatus::Mined, ExchangeStatus::Done),
                    )
                    .await?;
                info!(activity = %id, tx2 = %entry.hash, "Deposit confirmed by exchange");
                Ok(ExchangeStatus::Done)
            }
            MiningStatus::Failed => {
                self.store
                    .store_intermediate_tx(
                        id,
                        entry.with_status(MiningStatus::Failed, ExchangeStatus::Failed),
                    )
                    .await?;
                warn!(activity = %id, tx2 = %entry.hash, "TX2 failed on chain");
                Ok(ExchangeStatus::Failed)
            }
            MiningStatus::Lost if self.expired(entry.timestamp) => {
                self.store
                    .store_intermediate_tx(
                        id,
                        entry.with_status(MiningStatus::Lost, ExchangeStatus::Failed),
                    )
                    .await?;
                warn!(activity = %id, tx2 = %entry.hash, "TX2 lost past timeout");
                Ok(ExchangeStatus::Failed)
            }
            _ => Ok(ExchangeStatus::Unset),
        }
    }

    async fn store_unsaved_tx2(&self, id: &ActivityId) -> Result<()> {
        let Some(entry) = self.unsaved_tx2.get(id).map(|held| held.value().clone()) else {
            return Ok(());
        };
        self.store.store_pending_intermediate_tx(id, entry.clone()).await?;
        self.unsaved_tx2.remove(id);
        info!(activity = %id, tx2 = %entry.hash, "Stored previously unsaved TX2");
        Ok(())
    }

    fn expired(&self, since_millis: u64) -> bool {
        let timeout = u64::try_from(self.policy.lost_timeout.as_millis()).unwrap_or(u64::MAX);
        now_millis().saturating_sub(since_millis) > timeout
    }

    fn note_submission_failure(&self, id: &ActivityId, cause: &Error) {
        let failures = {
            let mut count = self.submission_failures.entry(id.clone()).or_insert(0);
            *count += 1;
            *count
        };
        warn!(
            activity = %id,
            exchange = %self.exchange.id(),
            failures,
            error = %cause,
            "TX2 submission failed, will retry"
        );
        let threshold = self.policy.failure_alert_threshold.max(1);
        if failures % threshold == 0 {
            error!(
                activity = %id,
                exchange = %self.exchange.id(),
                intermediary = %self.signer.address(),
                failures,
                "Deposit relay keeps failing; funds remain at the intermediary"
            );
        }
    }
}
