//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! # Architecture
//!
//! ```text
//!                  ┌──────────────────────────┐
//!                  │       Application        │
//!                  │  orchestrator · relay    │
//!                  └────────────┬─────────────┘
//!          ┌────────────────────┼────────────────────┐
//!          ▼                    ▼                    ▼
//!    ┌──────────┐        ┌────────────┐       ┌────────────┐
//!    │ Exchange │        │ Blockchain │       │   Ledger   │
//!    └──────────┘        └────────────┘       └────────────┘
//! ```

pub mod outbound;

pub use outbound::blockchain::{Blockchain, IntermediarySigner, SetRatesCall};
pub use outbound::exchange::{DepositRecord, DepositState, Exchange, TradeOutcome};
pub use outbound::ledger::{ActivityLedger, PendingActivity, RelayStore};
