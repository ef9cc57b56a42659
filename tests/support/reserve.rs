//! A fully wired reserve over scripted collaborators.
//!
//! Built from `testkit::config::RESERVE_TOML` through the real bootstrap:
//! `binance` takes direct deposits of ETH and KNC, `huobi` takes ETH through
//! the intermediary at `address(0x11)`.

use std::sync::Arc;

use alloy_primitives::Address;
use reservekeeper::application::{ActionOrchestrator, DepositRelay, DepositRoute, RelayPorts};
use reservekeeper::domain::{ActivityRecord, ExchangeId};
use reservekeeper::infrastructure::bootstrap::{build_orchestrator, ReservePorts};
use reservekeeper::infrastructure::config::settings::Config;
use reservekeeper::port::Exchange;
use reservekeeper::testkit::chain::{ScriptedBlockchain, ScriptedSigner};
use reservekeeper::testkit::config::RESERVE_TOML;
use reservekeeper::testkit::domain::{address, eth, knc};
use reservekeeper::testkit::exchange::ScriptedExchange;
use reservekeeper::testkit::ledger::FlakyLedger;

pub const BINANCE: &str = "binance";
pub const HUOBI: &str = "huobi";

pub fn binance_eth_address() -> Address {
    address(0xb1)
}

pub fn binance_knc_address() -> Address {
    address(0xb2)
}

pub fn huobi_eth_address() -> Address {
    address(0xc1)
}

/// Configured fallback deposit address for ETH on huobi.
pub fn huobi_fallback_address() -> Address {
    address(0x22)
}

pub fn intermediary() -> Address {
    address(0x11)
}

pub fn reserve_address() -> Address {
    address(0xaa)
}

pub struct Reserve {
    pub orchestrator: ActionOrchestrator,
    pub chain: Arc<ScriptedBlockchain>,
    pub ledger: Arc<FlakyLedger>,
    pub binance: Arc<ScriptedExchange>,
    pub huobi: Arc<ScriptedExchange>,
    pub signer: Arc<ScriptedSigner>,
}

impl Reserve {
    pub fn new() -> Self {
        Self::with_parts(ScriptedBlockchain::new(), ScriptedExchange::new(BINANCE))
    }

    pub fn with_chain(chain: ScriptedBlockchain) -> Self {
        Self::with_parts(chain, ScriptedExchange::new(BINANCE))
    }

    pub fn with_binance(binance: ScriptedExchange) -> Self {
        Self::with_parts(ScriptedBlockchain::new(), binance)
    }

    fn with_parts(chain: ScriptedBlockchain, binance: ScriptedExchange) -> Self {
        let config = Config::parse_toml(RESERVE_TOML).unwrap();

        let chain = Arc::new(chain);
        let ledger = Arc::new(FlakyLedger::new());
        let signer = Arc::new(ScriptedSigner::new(intermediary()));
        let binance = Arc::new(
            binance
                .with_asset(&eth(), binance_eth_address())
                .with_asset(&knc(), binance_knc_address()),
        );
        let huobi = Arc::new(
            ScriptedExchange::new(HUOBI)
                .with_asset(&eth(), huobi_eth_address())
                .with_live_address("ETH", huobi_eth_address()),
        );

        let ports = ReservePorts {
            blockchain: chain.clone(),
            ledger: ledger.clone(),
            relay: Some(RelayPorts {
                blockchain: chain.clone(),
                signer: signer.clone(),
                store: ledger.clone(),
            }),
        };
        let exchanges: Vec<Arc<dyn Exchange>> = vec![binance.clone(), huobi.clone()];
        let orchestrator = build_orchestrator(&config, exchanges, ports).unwrap();

        Self {
            orchestrator,
            chain,
            ledger,
            binance,
            huobi,
            signer,
        }
    }

    pub fn records(&self) -> Vec<ActivityRecord> {
        self.ledger.inner().records()
    }

    /// The single recorded activity.
    pub fn only_record(&self) -> ActivityRecord {
        let records = self.records();
        assert_eq!(records.len(), 1, "expected exactly one record, got {records:?}");
        records.into_iter().next().unwrap()
    }

    pub fn huobi_relay(&self) -> Arc<DepositRelay> {
        let entry = self
            .orchestrator
            .registry()
            .get(&ExchangeId::from(HUOBI))
            .unwrap();
        match entry.route() {
            DepositRoute::Relayed(relay) => relay.clone(),
            DepositRoute::Direct => panic!("huobi should be relayed"),
        }
    }
}
