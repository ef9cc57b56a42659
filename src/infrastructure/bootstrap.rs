//! Infrastructure bootstrap helpers for runtime wiring.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::application::orchestrator::ActionOrchestrator;
use crate::application::registry::ExchangeRegistry;
use crate::application::relay::{RelayPolicy, RelayPorts};
use crate::domain::ExchangeId;
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::settings::Config;
use crate::port::{ActivityLedger, Blockchain, Exchange};

/// Collaborators the reserve core is wired against.
#[derive(Clone)]
pub struct ReservePorts {
    pub blockchain: Arc<dyn Blockchain>,
    pub ledger: Arc<dyn ActivityLedger>,
    /// Required only when an exchange uses the relayed deposit route.
    pub relay: Option<RelayPorts>,
}

/// Build the exchange registry from the configured profiles and exchange handles.
///
/// Handles without a profile are skipped with a warning.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a profile has no matching handle, or if a
/// relayed profile cannot be wired to the intermediary signer.
#[allow(clippy::result_large_err)]
pub fn build_registry(
    config: &Config,
    exchanges: Vec<Arc<dyn Exchange>>,
    relay: Option<&RelayPorts>,
) -> Result<ExchangeRegistry> {
    let mut handles: HashMap<ExchangeId, Arc<dyn Exchange>> = exchanges
        .into_iter()
        .map(|exchange| (exchange.id().clone(), exchange))
        .collect();
    let policy = RelayPolicy::from(config.relay);

    let mut registry = ExchangeRegistry::new();
    for profile in &config.exchanges {
        let exchange = handles.remove(&profile.id).ok_or_else(|| ConfigError::InvalidValue {
            field: "exchanges.id",
            reason: format!("no exchange adapter for '{}'", profile.id),
        })?;
        registry.register(profile.clone().into_entry(exchange, relay, policy)?)?;
    }

    for id in handles.keys() {
        warn!(exchange = %id, "Exchange adapter has no configuration, skipping");
    }
    Ok(registry)
}

/// Wire the action orchestrator.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the reserve address is missing or the
/// registry cannot be built.
#[allow(clippy::result_large_err)]
pub fn build_orchestrator(
    config: &Config,
    exchanges: Vec<Arc<dyn Exchange>>,
    ports: ReservePorts,
) -> Result<ActionOrchestrator> {
    let reserve_address = config.reserve_address()?;
    let registry = build_registry(config, exchanges, ports.relay.as_ref())?;
    info!(
        reserve = %reserve_address,
        exchanges = registry.len(),
        high_bound_gwei = config.gas.high_bound_gwei,
        "Action orchestrator ready"
    );
    Ok(ActionOrchestrator::new(
        Arc::new(registry),
        ports.blockchain,
        ports.ledger,
        reserve_address,
        config.gas.into(),
    ))
}
