use super::ids::{MarketId, TokenId};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Static-ish market metadata needed to build a `MarketContext`: outcome
/// list, the parallel asset-id list (i-th asset is the token for the i-th
/// outcome), timing, and strategy defaults. Refreshed by the market
/// universe job (C12) and the slug subscription manager (C13).
#[derive(Debug, Clone)]
pub struct MarketMeta {
    pub market_id: MarketId,
    pub slug: String,
    pub outcomes: Vec<String>,
    pub asset_ids: Vec<TokenId>,
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
    pub tick_size: Option<Decimal>,
    pub liquidity: Decimal,
    pub order_min_size: Decimal,
    pub tags: HashSet<String>,
}

impl MarketMeta {
    /// Invariant: outcomes and asset_ids are equal length >= 2, asset ids
    /// unique within a market.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.outcomes.len() == self.asset_ids.len() && self.outcomes.len() >= 2 && {
            let unique: HashSet<_> = self.asset_ids.iter().collect();
            unique.len() == self.asset_ids.len()
        }
    }

    #[must_use]
    pub fn asset_for(&self, outcome: &str) -> Option<&TokenId> {
        self.outcomes
            .iter()
            .position(|o| o == outcome)
            .and_then(|i| self.asset_ids.get(i))
    }

    #[must_use]
    pub fn outcome_for(&self, asset_id: &TokenId) -> Option<&str> {
        self.asset_ids
            .iter()
            .position(|a| a == asset_id)
            .and_then(|i| self.outcomes.get(i))
            .map(String::as_str)
    }
}
