use super::ids::{MarketId, TokenId};
use super::trend::TrendPrediction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// `{BUY: price, SELL: price}` for one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SidePrices {
    pub buy: Option<Decimal>,
    pub sell: Option<Decimal>,
}

/// Immutable snapshot built fresh by the price-change handler on every tick
/// and handed to the strategy evaluator. Owned for the duration of one tick,
/// then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketContext {
    pub market_id: MarketId,
    pub slug: String,
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
    pub liquidity: Decimal,
    pub spread: Decimal,
    pub outcomes: Vec<String>,
    pub outcome_prices: HashMap<String, SidePrices>,
    pub outcome_assets: HashMap<String, TokenId>,
    pub outcome_trends: HashMap<String, TrendPrediction>,
    pub tags: HashSet<String>,
    pub event_ts: f64,
    pub order_min_size: Decimal,
}

impl MarketContext {
    /// Seconds remaining until `end_date`, or `None` if unknown.
    #[must_use]
    pub fn time_left(&self) -> Option<f64> {
        let end = self.end_date?;
        let now = chrono::DateTime::from_timestamp(self.event_ts as i64, 0)?;
        Some((end - now).num_seconds() as f64)
    }

    #[must_use]
    pub fn trend_for(&self, outcome: &str) -> Option<&TrendPrediction> {
        self.outcome_trends.get(outcome)
    }

    #[must_use]
    pub fn asset_for(&self, outcome: &str) -> Option<&TokenId> {
        self.outcome_assets.get(outcome)
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}
