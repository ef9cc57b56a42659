//! Canonical test configurations.
//!
//! Single source of truth for the reserve config used across tests.

/// A complete reserve config with a direct (`binance`) and a relayed
/// (`huobi`) exchange. The intermediary is `address(0x11)`.
pub const RESERVE_TOML: &str = r#"
reserve_address = "0x00000000000000000000000000000000000000aa"

[[assets]]
id = "ETH"
symbol = "ETH"
decimals = 18
address = "0x0000000000000000000000000000000000000000"

[[assets]]
id = "KNC"
symbol = "KNC"
decimals = 18
address = "0x00000000000000000000000000000000000000dd"

[[exchanges]]
id = "binance"
withdraw_fees = { ETH = "0.01", KNC = "1" }

[[exchanges]]
id = "huobi"
withdraw_fees = { ETH = "0.01" }

[exchanges.deposit]
route = "relayed"
intermediary_address = "0x0000000000000000000000000000000000000011"
fallback_addresses = { ETH = "0x0000000000000000000000000000000000000022" }
"#;
