//! Configuration: a TOML file with environment variable overrides for
//! secrets, following the same load-then-validate shape the teacher's
//! `app::config` module uses.

mod logging;
mod network;
mod scheduler;
mod strategies;
mod telegram;
mod wallet;

pub use logging::LoggingConfig;
pub use network::NetworkConfig;
pub use scheduler::SchedulerConfig;
pub use strategies::StrategiesConfig;
pub use telegram::TelegramConfig;
pub use wallet::WalletConfig;

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub strategies: StrategiesConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_database_path")]
    pub database: String,
    /// Detect opportunities and log intents without calling the exchange.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_database_path() -> String {
    "hunter.db".to_string()
}

impl Settings {
    /// Loads `path`, then overlays secrets from the environment (populated
    /// from a `.env` file first, if present) so credentials never have to
    /// live in the TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let content = std::fs::read_to_string(path).map_err(|e| Error::Config(e.to_string()))?;
        let mut settings: Self = toml::from_str(&content)?;

        if let Ok(key) = std::env::var("WALLET_PRIVATE_KEY") {
            settings.wallet.private_key = Some(key);
        }
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            settings.telegram.bot_token = Some(token);
        }

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.network.ws_url.is_empty() {
            return Err(Error::Config("network.ws_url must not be empty".into()));
        }
        if self.network.clob_url.is_empty() {
            return Err(Error::Config("network.clob_url must not be empty".into()));
        }
        if self.network.gamma_url.is_empty() {
            return Err(Error::Config("network.gamma_url must not be empty".into()));
        }
        if self.telegram.enabled && self.telegram.bot_token.is_none() {
            return Err(Error::Config(
                "telegram.enabled requires TELEGRAM_BOT_TOKEN".into(),
            ));
        }
        Ok(())
    }

    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ws_url_fails_validation() {
        let settings = Settings {
            network: NetworkConfig {
                ws_url: String::new(),
                ..NetworkConfig::default()
            },
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn telegram_enabled_without_token_fails_validation() {
        let settings = Settings {
            network: NetworkConfig::default(),
            telegram: TelegramConfig {
                enabled: true,
                bot_token: None,
                ..TelegramConfig::default()
            },
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
