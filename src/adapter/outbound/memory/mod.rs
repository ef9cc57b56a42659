//! In-memory adapters.

pub mod ledger;

pub use ledger::MemoryLedger;
