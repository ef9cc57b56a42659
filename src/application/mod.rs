//! Application services (use cases).
//!
//! These services drive the domain rules against the outbound ports: the
//! orchestrator records every reserve action, the registry holds per-exchange
//! capabilities, and the relay reconciles two-hop deposits.

pub mod orchestrator;
pub mod registry;
pub mod relay;

pub use orchestrator::{ActionOrchestrator, SetRatesRequest, TradeReceipt};
pub use registry::{DepositRoute, ExchangeEntry, ExchangeRegistry};
pub use relay::{DepositRelay, RelayPolicy, RelayPorts};
