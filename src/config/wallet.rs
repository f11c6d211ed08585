use serde::Deserialize;

/// Credentials are never read from the TOML file; `Settings::load` fills
/// `private_key` from `WALLET_PRIVATE_KEY` after parsing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    #[serde(skip)]
    pub private_key: Option<String>,
    pub keystore_path: Option<String>,
    /// Public address used to query balances and tag outgoing orders.
    pub address: Option<String>,
}
