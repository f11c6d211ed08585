use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_clob_url")]
    pub clob_url: String,
    #[serde(default = "default_gamma_url")]
    pub gamma_url: String,
    #[serde(default = "default_data_url")]
    pub data_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

fn default_ws_url() -> String {
    "wss://ws-subscriptions-clob.polymarket.com/ws/market".into()
}

fn default_clob_url() -> String {
    "https://clob.polymarket.com".into()
}

fn default_gamma_url() -> String {
    "https://gamma-api.polymarket.com".into()
}

fn default_data_url() -> String {
    "https://data-api.polymarket.com".into()
}

const fn default_chain_id() -> u64 {
    137
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            clob_url: default_clob_url(),
            gamma_url: default_gamma_url(),
            data_url: default_data_url(),
            chain_id: default_chain_id(),
        }
    }
}
