//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`exchange`]: `ScriptedExchange`, an [`Exchange`](crate::port::Exchange)
//!   with queued results and a call log.
//! - [`chain`]: `ScriptedBlockchain` and `ScriptedSigner` with per-hash
//!   mining statuses.
//! - [`ledger`]: `FlakyLedger`, a memory ledger whose reads and writes can be
//!   made to fail.
//! - [`domain`]: Builders for assets, pairs, hashes and addresses.
//! - [`config`]: Canonical test configurations.

pub mod chain;
pub mod config;
pub mod domain;
pub mod exchange;
pub mod ledger;
