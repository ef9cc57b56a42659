//! Outbound adapters implementing the driven ports.
//!
//! Exchange and chain clients are supplied by the embedding service; the crate
//! ships the ledger implementation it needs to run standalone.

pub mod memory;
