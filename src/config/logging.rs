use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Installs the global subscriber. `RUST_LOG` overrides `level` when set.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));
        let subscriber = fmt().with_env_filter(filter);
        if self.json {
            let _ = subscriber.json().try_init();
        } else {
            let _ = subscriber.try_init();
        }
    }
}
