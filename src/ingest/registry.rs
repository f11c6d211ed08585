//! Shared, concurrently-updated market metadata keyed by `market_id`
//! (mirrors `MessageContext.markets` in the original handler router).

use crate::domain::ids::MarketId;
use crate::domain::market_meta::MarketMeta;
use dashmap::DashMap;

#[derive(Default)]
pub struct MarketRegistry {
    markets: DashMap<MarketId, MarketMeta>,
}

impl MarketRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, meta: MarketMeta) {
        self.markets.insert(meta.market_id.clone(), meta);
    }

    pub fn remove(&self, market_id: &MarketId) {
        self.markets.remove(market_id);
    }

    #[must_use]
    pub fn get(&self, market_id: &MarketId) -> Option<MarketMeta> {
        self.markets.get(market_id).map(|m| m.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = MarketMeta> + '_ {
        self.markets.iter().map(|e| e.value().clone())
    }
}
