use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_market_universe_minutes")]
    pub market_universe_minutes: u64,
    #[serde(default = "default_trade_resolver_minutes")]
    pub trade_resolver_minutes: u64,
    #[serde(default = "default_report_minutes")]
    pub report_minutes: u64,
}

const fn default_market_universe_minutes() -> u64 {
    5
}

const fn default_trade_resolver_minutes() -> u64 {
    5
}

const fn default_report_minutes() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            market_universe_minutes: default_market_universe_minutes(),
            trade_resolver_minutes: default_trade_resolver_minutes(),
            report_minutes: default_report_minutes(),
        }
    }
}
