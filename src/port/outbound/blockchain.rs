//! Blockchain ports: the reserve's operator accounts and the deposit intermediary.

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::domain::{Asset, MiningStatus, SubmittedTx};
use crate::error::Result;

/// Arguments of a set-rates contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetRatesCall {
    pub tokens: Vec<Address>,
    pub buys: Vec<U256>,
    pub sells: Vec<U256>,
    pub block: u64,
    pub nonce: u64,
    /// Gas price in wei.
    pub gas_price: U256,
}

/// Chain access for the reserve's own accounts.
#[async_trait]
pub trait Blockchain: Send + Sync {
    /// Node-recommended gas price in gwei. Zero when unknown.
    async fn standard_gas_price(&self) -> f64;

    /// Transfer `amount` base units of `asset` from the reserve to `to`.
    async fn send(&self, asset: &Asset, amount: U256, to: Address) -> Result<SubmittedTx>;

    /// Push new rates to the reserve contract from the set-rate operator.
    async fn set_rates(&self, call: &SetRatesCall) -> Result<SubmittedTx>;

    /// Number of set-rate operator transactions already mined, i.e. the lowest
    /// nonce that can still be (re)submitted.
    async fn set_rate_mined_nonce(&self) -> Result<u64>;

    /// Replace whatever is queued at `nonce` with a zero-value self transfer.
    async fn cancel_nonce(&self, nonce: u64, gas_price: U256) -> Result<SubmittedTx>;

    /// Inclusion status of a transaction.
    async fn tx_status(&self, hash: TxHash) -> Result<MiningStatus>;
}

/// The shared intermediary account that relays deposits to exchanges without
/// per-asset deposit addresses.
#[async_trait]
pub trait IntermediarySigner: Send + Sync {
    /// Address TX1 deposits are sent to.
    fn address(&self) -> Address;

    /// Relay ether.
    async fn transfer_ether(&self, amount: U256, to: Address) -> Result<SubmittedTx>;

    /// Relay an ERC-20 token.
    async fn transfer_token(&self, token: Address, amount: U256, to: Address)
        -> Result<SubmittedTx>;
}
