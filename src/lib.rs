//! Reservekeeper - transaction lifecycle orchestration for an automated
//! liquidity reserve.
//!
//! The reserve holds assets in an on-chain contract, rebalances them across
//! centralized exchanges, and publishes buy/sell rates to the contract. This
//! crate decides, validates, dispatches and durably records those actions.
//!
//! # Architecture
//!
//! - **`domain`** - Pure types and rules: activity ids and records, sanity
//!   checks, gas price escalation
//! - **`port`** - Traits for the exchange, chain and ledger collaborators
//! - **`adapter`** - Collaborator implementations shipped with the crate
//! - **`application`** - The action orchestrator, the exchange registry and
//!   the two-hop deposit relay
//! - **`infrastructure`** - Configuration, logging and wiring
//!
//! # Modules
//!
//! - [`domain`] - Exchange- and chain-agnostic reserve types
//! - [`error`] - Error types for the crate
//! - [`port`] - Collaborator traits
//! - [`adapter`] - In-memory ledger
//! - [`application`] - Use cases
//! - [`infrastructure`] - Config loading and bootstrap
//!
//! # Features
//!
//! - `testkit` - Scripted collaborators for integration tests
//!
//! # Example
//!
//! ```no_run
//! use reservekeeper::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("reserve.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
