//! Integration tests for set-rates submission, replace-by-fee and cancellation.

mod support;

use alloy_primitives::{TxHash, U256};
use reservekeeper::application::SetRatesRequest;
use reservekeeper::domain::gas::{gwei_to_wei, next_price};
use reservekeeper::domain::{Action, MiningStatus};
use reservekeeper::error::{Error, ValidationError};
use reservekeeper::testkit::chain::{ChainCall, ScriptedBlockchain};
use reservekeeper::testkit::domain::{eth, knc};
use serde_json::json;

use support::reserve::Reserve;

fn wei(x: u64) -> U256 {
    U256::from(x) * U256::from(10u64).pow(U256::from(18u64))
}

/// Buy value whose inverted ETH-relative rate is `x`.
fn buy_at(x: u64) -> U256 {
    U256::from(10u64).pow(U256::from(18u64)) / U256::from(x)
}

fn request() -> SetRatesRequest {
    SetRatesRequest {
        assets: vec![knc()],
        buys: vec![buy_at(200)],
        sells: vec![wei(100)],
        block: 9_000_000,
        afp_mids: vec![wei(150)],
        additional_msgs: vec!["rebalance".into()],
    }
}

fn chain_at(gas_gwei: f64, mined_nonce: u64) -> ScriptedBlockchain {
    let chain = ScriptedBlockchain::new().with_gas_price(gas_gwei);
    chain.set_mined_nonce(mined_nonce);
    chain
}

#[tokio::test]
async fn fresh_submission_uses_recommended_price_at_mined_nonce() {
    let reserve = Reserve::with_chain(chain_at(20.0, 7));

    let id = reserve.orchestrator.set_rates(&request()).await.unwrap();

    let calls = reserve.chain.set_rates_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].nonce, 7);
    assert_eq!(calls[0].gas_price, gwei_to_wei(20.0));
    assert_eq!(calls[0].tokens, vec![knc().address]);
    assert_eq!(calls[0].block, 9_000_000);

    let record = reserve.only_record();
    assert_eq!(record.id, id);
    assert_eq!(record.action, Action::SetRates);
    assert_eq!(record.mining_status, MiningStatus::Submitted);
    assert_eq!(record.nonce(), Some(7));
    assert_eq!(record.gas_price(), Some(gwei_to_wei(20.0)));
    assert_eq!(record.params["msgs"], json!(["rebalance"]));
}

#[tokio::test]
async fn unusable_recommendation_falls_back_to_floor() {
    for recommended in [0.0, 150.0] {
        let reserve = Reserve::with_chain(chain_at(recommended, 0));

        reserve.orchestrator.set_rates(&request()).await.unwrap();

        assert_eq!(reserve.chain.set_rates_calls()[0].gas_price, gwei_to_wei(10.0));
    }
}

#[tokio::test]
async fn low_recommendation_is_raised_to_floor() {
    let reserve = Reserve::with_chain(chain_at(3.0, 0));

    reserve.orchestrator.set_rates(&request()).await.unwrap();

    assert_eq!(reserve.chain.set_rates_calls()[0].gas_price, gwei_to_wei(10.0));
}

#[tokio::test]
async fn unmined_submission_is_replaced_at_same_nonce_with_higher_price() {
    let reserve = Reserve::with_chain(chain_at(20.0, 7));

    reserve.orchestrator.set_rates(&request()).await.unwrap();
    reserve.orchestrator.set_rates(&request()).await.unwrap();
    reserve.orchestrator.set_rates(&request()).await.unwrap();

    let calls = reserve.chain.set_rates_calls();
    assert!(calls.iter().all(|call| call.nonce == 7));
    assert_eq!(calls[1].gas_price, gwei_to_wei(next_price(20.0, 1, 100.1)));
    assert!(calls[1].gas_price > calls[0].gas_price);
    assert!(calls[2].gas_price > calls[1].gas_price);
    assert!(calls[2].gas_price <= gwei_to_wei(100.1));
}

#[tokio::test]
async fn mined_nonce_starts_fresh_submission() {
    let reserve = Reserve::with_chain(chain_at(20.0, 7));
    reserve.orchestrator.set_rates(&request()).await.unwrap();

    reserve.chain.set_mined_nonce(8);
    reserve.orchestrator.set_rates(&request()).await.unwrap();

    let calls = reserve.chain.set_rates_calls();
    assert_eq!(calls[1].nonce, 8);
    assert_eq!(calls[1].gas_price, gwei_to_wei(20.0));
}

#[tokio::test]
async fn inconsistent_rates_are_recorded_failed_without_submission() {
    let reserve = Reserve::new();
    let mut bad = request();
    bad.sells = vec![wei(300)];

    let err = reserve.orchestrator.set_rates(&bad).await.unwrap_err();

    assert!(matches!(
        err.error.as_validation(),
        Some(ValidationError::InconsistentRates { index: 0, .. })
    ));
    assert!(reserve.chain.set_rates_calls().is_empty());

    let record = reserve.only_record();
    assert_eq!(record.mining_status, MiningStatus::Failed);
    assert_eq!(record.id.eid(), TxHash::ZERO.to_string());
    assert!(!record.is_pending());
}

#[tokio::test]
async fn mismatched_asset_count_is_rejected() {
    let reserve = Reserve::new();
    let mut bad = request();
    bad.assets.push(eth());

    let err = reserve.orchestrator.set_rates(&bad).await.unwrap_err();

    assert_eq!(err.error.as_validation(), Some(&ValidationError::LengthMismatch));
    assert!(reserve.chain.set_rates_calls().is_empty());
}

#[tokio::test]
async fn chain_rejection_is_recorded_failed() {
    let chain = chain_at(20.0, 3)
        .with_set_rates_results(vec![Err(Error::external("node", "nonce too low"))]);
    let reserve = Reserve::with_chain(chain);

    let err = reserve.orchestrator.set_rates(&request()).await.unwrap_err();

    assert!(matches!(err.error, Error::ExternalCall { .. }));
    let record = reserve.only_record();
    assert_eq!(record.mining_status, MiningStatus::Failed);
    assert_eq!(record.id.eid(), TxHash::ZERO.to_string());
}

#[tokio::test]
async fn cancel_without_pending_set_rates_fails() {
    let reserve = Reserve::with_chain(chain_at(20.0, 4));

    let err = reserve.orchestrator.cancel_set_rates().await.unwrap_err();

    assert_eq!(
        err.error.as_validation(),
        Some(&ValidationError::NothingToCancel { nonce: 4 })
    );
    let record = reserve.only_record();
    assert_eq!(record.action, Action::CancelSetRates);
    assert_eq!(record.mining_status, MiningStatus::Failed);
}

#[tokio::test]
async fn cancel_replaces_pending_nonce_with_higher_price() {
    let reserve = Reserve::with_chain(chain_at(20.0, 7));
    let pending = reserve.orchestrator.set_rates(&request()).await.unwrap();

    let id = reserve.orchestrator.cancel_set_rates().await.unwrap();

    let cancel = reserve
        .chain
        .calls()
        .into_iter()
        .find_map(|call| match call {
            ChainCall::CancelNonce { nonce, gas_price } => Some((nonce, gas_price)),
            _ => None,
        })
        .unwrap();
    assert_eq!(cancel.0, 7);
    assert_eq!(cancel.1, gwei_to_wei(next_price(20.0, 1, 100.1)));

    let record = reserve.ledger.inner().records().into_iter().find(|r| r.id == id).unwrap();
    assert_eq!(record.action, Action::CancelSetRates);
    assert_eq!(record.mining_status, MiningStatus::Submitted);
    assert_eq!(record.result["replaces"], json!(pending.to_string()));
}

#[tokio::test]
async fn pending_cancellation_is_outbid_by_next_batch() {
    let reserve = Reserve::with_chain(chain_at(20.0, 7));
    reserve.orchestrator.set_rates(&request()).await.unwrap();
    reserve.orchestrator.cancel_set_rates().await.unwrap();

    reserve.orchestrator.set_rates(&request()).await.unwrap();

    let cancel_price = reserve
        .chain
        .calls()
        .into_iter()
        .find_map(|call| match call {
            ChainCall::CancelNonce { gas_price, .. } => Some(gas_price),
            _ => None,
        })
        .unwrap();
    let calls = reserve.chain.set_rates_calls();
    assert_eq!(calls[1].nonce, 7);
    assert!(calls[1].gas_price > cancel_price);
}
