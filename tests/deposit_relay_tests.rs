//! Integration tests for deposit reconciliation, direct and relayed.

mod support;

use std::time::Duration;

use reservekeeper::domain::time::now_millis;
use reservekeeper::domain::{
    ActivityId, ActivityRecord, ExchangeId, ExchangeStatus, MiningStatus, TxEntry, TxTier,
};
use reservekeeper::error::{Error, ValidationError};
use reservekeeper::port::{ActivityLedger, DepositState, RelayStore};
use reservekeeper::testkit::chain::{chain_hash, signer_hash, Transfer};
use reservekeeper::testkit::domain::{eth, knc, tokens, tx_hash};

use support::reserve::{huobi_eth_address, huobi_fallback_address, Reserve, BINANCE, HUOBI};

const NANOS_PER_MILLI: u64 = 1_000_000;

fn record(reserve: &Reserve, id: &ActivityId) -> ActivityRecord {
    reserve
        .records()
        .into_iter()
        .find(|r| &r.id == id)
        .unwrap()
}

/// Activity id whose timepoint lies `age` in the past.
fn aged_id(age: Duration, eid: &str) -> ActivityId {
    let millis = now_millis() - u64::try_from(age.as_millis()).unwrap();
    ActivityId::new(millis * NANOS_PER_MILLI, eid)
}

async fn huobi_deposit(reserve: &Reserve) -> ActivityId {
    reserve
        .orchestrator
        .deposit(&ExchangeId::from(HUOBI), &eth(), tokens(1), 1_000)
        .await
        .unwrap()
}

#[tokio::test]
async fn relay_waits_for_tx1() {
    let reserve = Reserve::new();
    let id = huobi_deposit(&reserve).await;

    let status = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();

    assert_eq!(status, ExchangeStatus::Unset);
    assert!(reserve.signer.transfers().is_empty());
    assert!(record(&reserve, &id).is_pending());
}

#[tokio::test]
async fn mined_tx1_is_relayed_to_live_address() {
    let reserve = Reserve::new();
    let id = huobi_deposit(&reserve).await;
    reserve.chain.set_status(chain_hash(0), MiningStatus::Mined);

    let status = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();

    assert_eq!(status, ExchangeStatus::Unset);
    assert_eq!(
        reserve.signer.transfers(),
        vec![Transfer {
            token: None,
            amount: tokens(1),
            to: huobi_eth_address(),
        }]
    );
    let (tier, entry) = reserve.ledger.intermediate_tx(&id).await.unwrap().unwrap();
    assert_eq!(tier, TxTier::Pending);
    assert_eq!(entry.hash, signer_hash(0));
    assert_eq!(entry.mining_status, MiningStatus::Submitted);
}

#[tokio::test]
async fn tx2_is_sent_only_once() {
    let reserve = Reserve::new();
    let id = huobi_deposit(&reserve).await;
    reserve.chain.set_status(chain_hash(0), MiningStatus::Mined);

    reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();
    reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();
    reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();

    assert_eq!(reserve.signer.transfers().len(), 1);
}

#[tokio::test]
async fn credited_tx2_completes_deposit() {
    let reserve = Reserve::new();
    let id = huobi_deposit(&reserve).await;
    reserve.chain.set_status(chain_hash(0), MiningStatus::Mined);
    reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();

    reserve.chain.set_status(signer_hash(0), MiningStatus::Mined);
    let status = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();
    assert_eq!(status, ExchangeStatus::Unset);
    let (tier, entry) = reserve.ledger.intermediate_tx(&id).await.unwrap().unwrap();
    assert_eq!(tier, TxTier::Pending);
    assert_eq!(entry.mining_status, MiningStatus::Mined);

    reserve.huobi.credit(signer_hash(0), "ETH", DepositState::Confirmed);
    let status = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();

    assert_eq!(status, ExchangeStatus::Done);
    let recorded = record(&reserve, &id);
    assert_eq!(recorded.exchange_status, ExchangeStatus::Done);
    assert_eq!(recorded.mining_status, MiningStatus::Mined);
    assert!(!recorded.is_pending());
    let (tier, _) = reserve.ledger.intermediate_tx(&id).await.unwrap().unwrap();
    assert_eq!(tier, TxTier::Permanent);
}

#[tokio::test]
async fn pending_credit_is_not_final() {
    let reserve = Reserve::new();
    let id = huobi_deposit(&reserve).await;
    reserve.chain.set_status(chain_hash(0), MiningStatus::Mined);
    reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();
    reserve.chain.set_status(signer_hash(0), MiningStatus::Mined);
    reserve.huobi.credit(signer_hash(0), "ETH", DepositState::Pending);

    let status = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();

    assert_eq!(status, ExchangeStatus::Unset);
}

#[tokio::test]
async fn failed_tx1_is_terminal() {
    let reserve = Reserve::new();
    let id = huobi_deposit(&reserve).await;
    reserve.chain.set_status(chain_hash(0), MiningStatus::Failed);

    let status = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();

    assert_eq!(status, ExchangeStatus::Failed);
    assert!(reserve.signer.transfers().is_empty());
    let recorded = record(&reserve, &id);
    assert_eq!(recorded.exchange_status, ExchangeStatus::Failed);
    assert_eq!(recorded.mining_status, MiningStatus::Failed);
    assert!(!recorded.is_pending());

    // A later mined report cannot revive it.
    reserve.chain.set_status(chain_hash(0), MiningStatus::Mined);
    let relay = reserve.huobi_relay();
    let again = relay
        .deposit_status(&id, chain_hash(0), &eth(), tokens(1))
        .await
        .unwrap();
    assert_eq!(again, ExchangeStatus::Failed);
    assert!(reserve.signer.transfers().is_empty());
}

#[tokio::test]
async fn failed_tx2_is_terminal() {
    let reserve = Reserve::new();
    let id = huobi_deposit(&reserve).await;
    reserve.chain.set_status(chain_hash(0), MiningStatus::Mined);
    reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();
    reserve.chain.set_status(signer_hash(0), MiningStatus::Failed);

    let status = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();

    assert_eq!(status, ExchangeStatus::Failed);
    let (tier, entry) = reserve.ledger.intermediate_tx(&id).await.unwrap().unwrap();
    assert_eq!(tier, TxTier::Permanent);
    assert_eq!(entry.mining_status, MiningStatus::Failed);
    assert_eq!(entry.exchange_status, ExchangeStatus::Failed);
    let recorded = record(&reserve, &id);
    assert_eq!(recorded.exchange_status, ExchangeStatus::Failed);
    assert_eq!(recorded.mining_status, MiningStatus::Failed);
    assert!(!recorded.is_pending());
}

#[tokio::test]
async fn lost_tx1_marks_deposit_record_lost() {
    let reserve = Reserve::new();
    let id = huobi_deposit(&reserve).await;
    let stale = aged_id(Duration::from_secs(16 * 60), id.eid());
    let mut aged = record(&reserve, &id);
    aged.id = stale.clone();
    reserve.ledger.record(aged).await.unwrap();
    reserve.chain.set_status(chain_hash(0), MiningStatus::Lost);

    let status = reserve.orchestrator.reconcile_deposit(&stale, &eth()).await.unwrap();

    assert_eq!(status, ExchangeStatus::Failed);
    let recorded = record(&reserve, &stale);
    assert_eq!(recorded.exchange_status, ExchangeStatus::Failed);
    assert_eq!(recorded.mining_status, MiningStatus::Lost);
}

#[tokio::test]
async fn tx2_whose_entry_was_not_stored_is_not_sent_again() {
    let reserve = Reserve::new();
    let id = huobi_deposit(&reserve).await;
    reserve.chain.set_status(chain_hash(0), MiningStatus::Mined);

    reserve.ledger.set_fail_writes(true);
    let first = reserve.orchestrator.reconcile_deposit(&id, &eth()).await;
    assert!(matches!(first, Err(Error::Storage(_))));
    let still_failing = reserve.orchestrator.reconcile_deposit(&id, &eth()).await;
    assert!(still_failing.is_err());
    assert_eq!(reserve.signer.transfers().len(), 1);

    reserve.ledger.set_fail_writes(false);
    let status = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();

    assert_eq!(status, ExchangeStatus::Unset);
    assert_eq!(reserve.signer.transfers().len(), 1);
    let (tier, entry) = reserve.ledger.intermediate_tx(&id).await.unwrap().unwrap();
    assert_eq!(tier, TxTier::Pending);
    assert_eq!(entry.hash, signer_hash(0));
    assert_eq!(entry.mining_status, MiningStatus::Submitted);
}

#[tokio::test]
async fn lost_tx1_fails_after_timeout() {
    let reserve = Reserve::new();
    let relay = reserve.huobi_relay();
    let tx1 = tx_hash(0x77);
    reserve.chain.set_status(tx1, MiningStatus::Lost);

    let fresh = aged_id(Duration::from_secs(5 * 60), "fresh");
    let status = relay.deposit_status(&fresh, tx1, &eth(), tokens(1)).await.unwrap();
    assert_eq!(status, ExchangeStatus::Unset);
    assert!(reserve.ledger.intermediate_tx(&fresh).await.unwrap().is_none());

    let stale = aged_id(Duration::from_secs(16 * 60), "stale");
    let status = relay.deposit_status(&stale, tx1, &eth(), tokens(1)).await.unwrap();
    assert_eq!(status, ExchangeStatus::Failed);
    let (tier, entry) = reserve.ledger.intermediate_tx(&stale).await.unwrap().unwrap();
    assert_eq!(tier, TxTier::Permanent);
    assert_eq!(entry.mining_status, MiningStatus::Lost);
}

#[tokio::test]
async fn lost_tx2_fails_after_timeout() {
    let reserve = Reserve::new();
    let relay = reserve.huobi_relay();
    let tx2 = tx_hash(0x88);
    reserve.chain.set_status(tx2, MiningStatus::Lost);

    let entry = |age: Duration| TxEntry {
        hash: tx2,
        exchange: ExchangeId::from(HUOBI),
        asset: eth().id,
        mining_status: MiningStatus::Submitted,
        exchange_status: ExchangeStatus::Unset,
        amount: tokens(1),
        timestamp: now_millis() - u64::try_from(age.as_millis()).unwrap(),
    };

    let recent = ActivityId::new(1, "recent");
    reserve
        .ledger
        .store_pending_intermediate_tx(&recent, entry(Duration::from_secs(5 * 60)))
        .await
        .unwrap();
    let status = relay.deposit_status(&recent, tx_hash(1), &eth(), tokens(1)).await.unwrap();
    assert_eq!(status, ExchangeStatus::Unset);
    let (tier, stored) = reserve.ledger.intermediate_tx(&recent).await.unwrap().unwrap();
    assert_eq!(tier, TxTier::Pending);
    assert_eq!(stored.mining_status, MiningStatus::Submitted);

    let old = ActivityId::new(2, "old");
    reserve
        .ledger
        .store_pending_intermediate_tx(&old, entry(Duration::from_secs(16 * 60)))
        .await
        .unwrap();
    let status = relay.deposit_status(&old, tx_hash(2), &eth(), tokens(1)).await.unwrap();
    assert_eq!(status, ExchangeStatus::Failed);
    let (tier, stored) = reserve.ledger.intermediate_tx(&old).await.unwrap().unwrap();
    assert_eq!(tier, TxTier::Permanent);
    assert_eq!(stored.mining_status, MiningStatus::Lost);
}

#[tokio::test]
async fn live_lookup_failure_uses_fallback_address() {
    let reserve = Reserve::new();
    let id = huobi_deposit(&reserve).await;
    reserve.chain.set_status(chain_hash(0), MiningStatus::Mined);
    reserve.huobi.drop_live_address("ETH");

    reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();

    let transfers = reserve.signer.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].to, huobi_fallback_address());
}

#[tokio::test]
async fn missing_address_counts_as_submission_failure() {
    let reserve = Reserve::new();
    let relay = reserve.huobi_relay();
    let id = ActivityId::new(1, "knc-deposit");
    let tx1 = tx_hash(0x99);
    reserve.chain.set_status(tx1, MiningStatus::Mined);

    for attempt in 1..=3 {
        let status = relay.deposit_status(&id, tx1, &knc(), tokens(5)).await.unwrap();
        assert_eq!(status, ExchangeStatus::Unset);
        assert_eq!(relay.submission_failures(&id), attempt);
    }
    assert!(reserve.signer.transfers().is_empty());
    assert!(reserve.ledger.intermediate_tx(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn successful_transfer_resets_failure_count() {
    let reserve = Reserve::new();
    let relay = reserve.huobi_relay();
    let id = huobi_deposit(&reserve).await;
    reserve.chain.set_status(chain_hash(0), MiningStatus::Mined);
    reserve
        .signer
        .push_result(Err(Error::external("intermediary", "insufficient funds for gas")));

    relay.deposit_status(&id, chain_hash(0), &eth(), tokens(1)).await.unwrap();
    assert_eq!(relay.submission_failures(&id), 1);
    assert!(reserve.ledger.intermediate_tx(&id).await.unwrap().is_none());

    relay.deposit_status(&id, chain_hash(0), &eth(), tokens(1)).await.unwrap();
    assert_eq!(relay.submission_failures(&id), 0);
    assert_eq!(reserve.signer.transfers().len(), 2);
    assert!(reserve.ledger.intermediate_tx(&id).await.unwrap().is_some());
}

#[tokio::test]
async fn chain_outage_is_not_terminal() {
    let reserve = Reserve::new();
    let id = huobi_deposit(&reserve).await;
    reserve.chain.set_status(chain_hash(0), MiningStatus::Mined);
    reserve.chain.set_status_failing(true);

    let status = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();

    assert_eq!(status, ExchangeStatus::Unset);
    assert!(reserve.signer.transfers().is_empty());
    assert!(record(&reserve, &id).is_pending());
}

#[tokio::test]
async fn deposit_history_outage_is_not_terminal() {
    let reserve = Reserve::new();
    let id = huobi_deposit(&reserve).await;
    reserve.chain.set_status(chain_hash(0), MiningStatus::Mined);
    reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();
    reserve.chain.set_status(signer_hash(0), MiningStatus::Mined);
    reserve.huobi.set_history_failing(true);

    let status = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();

    assert_eq!(status, ExchangeStatus::Unset);
}

#[tokio::test]
async fn direct_deposit_follows_exchange_history() {
    let reserve = Reserve::new();
    let id = reserve
        .orchestrator
        .deposit(&ExchangeId::from(BINANCE), &eth(), tokens(2), 1_000)
        .await
        .unwrap();

    let status = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();
    assert_eq!(status, ExchangeStatus::Unset);

    reserve.binance.credit(chain_hash(0), "ETH", DepositState::Pending);
    let status = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();
    assert_eq!(status, ExchangeStatus::Pending);
    assert_eq!(record(&reserve, &id).exchange_status, ExchangeStatus::Pending);
    assert!(record(&reserve, &id).is_pending());
}

#[tokio::test]
async fn confirmed_direct_deposit_allows_next_deposit() {
    let reserve = Reserve::new();
    let binance = ExchangeId::from(BINANCE);
    let id = reserve
        .orchestrator
        .deposit(&binance, &eth(), tokens(2), 1_000)
        .await
        .unwrap();
    reserve.binance.credit(chain_hash(0), "ETH", DepositState::Confirmed);

    let status = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();
    assert_eq!(status, ExchangeStatus::Done);

    reserve
        .orchestrator
        .deposit(&binance, &eth(), tokens(1), 2_000)
        .await
        .unwrap();
    assert_eq!(reserve.chain.sends().len(), 2);
}

#[tokio::test]
async fn reconcile_rejects_other_asset() {
    let reserve = Reserve::new();
    let id = huobi_deposit(&reserve).await;

    let err = reserve.orchestrator.reconcile_deposit(&id, &knc()).await.unwrap_err();

    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::AssetMismatch { .. })
    ));
}

#[tokio::test]
async fn reconcile_rejects_non_deposit() {
    let reserve = Reserve::new();
    let id = reserve
        .orchestrator
        .withdraw(&ExchangeId::from(BINANCE), &eth(), tokens(1))
        .await
        .unwrap();

    let err = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap_err();

    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::WrongAction { expected: "deposit", .. })
    ));
}

#[tokio::test]
async fn settled_deposit_is_not_polled_again() {
    let reserve = Reserve::new();
    let id = huobi_deposit(&reserve).await;
    reserve.chain.set_status(chain_hash(0), MiningStatus::Failed);
    reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();
    reserve.chain.set_status_failing(true);

    let status = reserve.orchestrator.reconcile_deposit(&id, &eth()).await.unwrap();

    assert_eq!(status, ExchangeStatus::Failed);
    assert_eq!(record(&reserve, &id).mining_status, MiningStatus::Submitted);
}
