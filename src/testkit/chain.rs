//! Mock [`Blockchain`] and [`IntermediarySigner`] for testing.
//!
//! Transactions get deterministic hashes (see [`tx_hash`]) and report the
//! mining status set with `set_status`, or `pending` when none was set.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use parking_lot::Mutex;

use super::domain::tx_hash;
use crate::domain::{Asset, AssetId, MiningStatus, SubmittedTx};
use crate::error::{Error, Result};
use crate::port::{Blockchain, IntermediarySigner, SetRatesCall};

/// Hashes issued by [`ScriptedBlockchain`] start here.
const CHAIN_HASH_BASE: u64 = 0x1000;

/// Hashes issued by [`ScriptedSigner`] start here.
const SIGNER_HASH_BASE: u64 = 0x2000;

/// A call received by a [`ScriptedBlockchain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
    Send {
        asset: AssetId,
        amount: U256,
        to: Address,
    },
    SetRates(SetRatesCall),
    CancelNonce {
        nonce: u64,
        gas_price: U256,
    },
}

/// A chain with scripted submissions and mining statuses.
///
/// Successful submissions are reported at the nonce and gas price they were
/// given; `send` reports nonce zero and no gas price.
pub struct ScriptedBlockchain {
    gas_price_gwei: Mutex<f64>,
    mined_nonce: AtomicU64,
    send_results: Mutex<VecDeque<Result<SubmittedTx>>>,
    set_rates_results: Mutex<VecDeque<Result<SubmittedTx>>>,
    statuses: Mutex<HashMap<TxHash, MiningStatus>>,
    status_failing: AtomicBool,
    calls: Mutex<Vec<ChainCall>>,
    sequence: AtomicU64,
}

impl ScriptedBlockchain {
    pub fn new() -> Self {
        Self {
            gas_price_gwei: Mutex::new(0.0),
            mined_nonce: AtomicU64::new(0),
            send_results: Mutex::new(VecDeque::new()),
            set_rates_results: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(HashMap::new()),
            status_failing: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(CHAIN_HASH_BASE),
        }
    }

    /// Recommended gas price returned by `standard_gas_price`.
    pub fn with_gas_price(self, gwei: f64) -> Self {
        *self.gas_price_gwei.lock() = gwei;
        self
    }

    pub fn with_send_results(self, results: Vec<Result<SubmittedTx>>) -> Self {
        *self.send_results.lock() = results.into();
        self
    }

    pub fn with_set_rates_results(self, results: Vec<Result<SubmittedTx>>) -> Self {
        *self.set_rates_results.lock() = results.into();
        self
    }

    pub fn set_mined_nonce(&self, nonce: u64) {
        self.mined_nonce.store(nonce, Ordering::SeqCst);
    }

    pub fn set_status(&self, hash: TxHash, status: MiningStatus) {
        self.statuses.lock().insert(hash, status);
    }

    /// Make `tx_status` fail until reset.
    pub fn set_status_failing(&self, failing: bool) {
        self.status_failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ChainCall> {
        self.calls.lock().clone()
    }

    /// Destinations and amounts of every `send` call.
    pub fn sends(&self) -> Vec<(AssetId, U256, Address)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                ChainCall::Send { asset, amount, to } => Some((asset.clone(), *amount, *to)),
                _ => None,
            })
            .collect()
    }

    /// Every `set_rates` call, in order.
    pub fn set_rates_calls(&self) -> Vec<SetRatesCall> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                ChainCall::SetRates(call) => Some(call.clone()),
                _ => None,
            })
            .collect()
    }

    fn next_hash(&self) -> TxHash {
        tx_hash(self.sequence.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for ScriptedBlockchain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Blockchain for ScriptedBlockchain {
    async fn standard_gas_price(&self) -> f64 {
        *self.gas_price_gwei.lock()
    }

    async fn send(&self, asset: &Asset, amount: U256, to: Address) -> Result<SubmittedTx> {
        self.calls.lock().push(ChainCall::Send {
            asset: asset.id.clone(),
            amount,
            to,
        });
        let scripted = self.send_results.lock().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(SubmittedTx {
                hash: self.next_hash(),
                nonce: 0,
                gas_price: U256::ZERO,
            })
        })
    }

    async fn set_rates(&self, call: &SetRatesCall) -> Result<SubmittedTx> {
        self.calls.lock().push(ChainCall::SetRates(call.clone()));
        let scripted = self.set_rates_results.lock().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(SubmittedTx {
                hash: self.next_hash(),
                nonce: call.nonce,
                gas_price: call.gas_price,
            })
        })
    }

    async fn set_rate_mined_nonce(&self) -> Result<u64> {
        Ok(self.mined_nonce.load(Ordering::SeqCst))
    }

    async fn cancel_nonce(&self, nonce: u64, gas_price: U256) -> Result<SubmittedTx> {
        self.calls
            .lock()
            .push(ChainCall::CancelNonce { nonce, gas_price });
        Ok(SubmittedTx {
            hash: self.next_hash(),
            nonce,
            gas_price,
        })
    }

    async fn tx_status(&self, hash: TxHash) -> Result<MiningStatus> {
        if self.status_failing.load(Ordering::SeqCst) {
            return Err(Error::external("node", "connection refused"));
        }
        Ok(self
            .statuses
            .lock()
            .get(&hash)
            .copied()
            .unwrap_or(MiningStatus::Pending))
    }
}

/// A relay transfer made by a [`ScriptedSigner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// Token contract, or `None` for ether.
    pub token: Option<Address>,
    pub amount: U256,
    pub to: Address,
}

/// Intermediary account with scripted transfer results.
///
/// Transfers succeed once the queue is exhausted.
pub struct ScriptedSigner {
    address: Address,
    results: Mutex<VecDeque<Result<SubmittedTx>>>,
    transfers: Mutex<Vec<Transfer>>,
    sequence: AtomicU64,
}

impl ScriptedSigner {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            results: Mutex::new(VecDeque::new()),
            transfers: Mutex::new(Vec::new()),
            sequence: AtomicU64::new(SIGNER_HASH_BASE),
        }
    }

    /// Queue one more transfer result.
    pub fn push_result(&self, result: Result<SubmittedTx>) {
        self.results.lock().push_back(result);
    }

    /// Every transfer attempted, including failed ones.
    pub fn transfers(&self) -> Vec<Transfer> {
        self.transfers.lock().clone()
    }

    fn transfer(&self, transfer: Transfer) -> Result<SubmittedTx> {
        self.transfers.lock().push(transfer);
        let scripted = self.results.lock().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(SubmittedTx {
                hash: tx_hash(self.sequence.fetch_add(1, Ordering::SeqCst)),
                nonce: 0,
                gas_price: U256::ZERO,
            })
        })
    }
}

#[async_trait]
impl IntermediarySigner for ScriptedSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn transfer_ether(&self, amount: U256, to: Address) -> Result<SubmittedTx> {
        self.transfer(Transfer {
            token: None,
            amount,
            to,
        })
    }

    async fn transfer_token(
        &self,
        token: Address,
        amount: U256,
        to: Address,
    ) -> Result<SubmittedTx> {
        self.transfer(Transfer {
            token: Some(token),
            amount,
            to,
        })
    }
}

/// Hash of the `n`-th (zero-based) successful [`ScriptedBlockchain`] submission.
pub fn chain_hash(n: u64) -> TxHash {
    tx_hash(CHAIN_HASH_BASE + n)
}

/// Hash of the `n`-th (zero-based) successful [`ScriptedSigner`] transfer.
pub fn signer_hash(n: u64) -> TxHash {
    tx_hash(SIGNER_HASH_BASE + n)
}
