//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the reserve's external collaborators: exchanges,
//! the blockchain, the deposit intermediary, and the activity ledger.

pub mod blockchain;
pub mod exchange;
pub mod ledger;
