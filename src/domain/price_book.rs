use super::ids::TokenId;
use super::trend::TrendPrediction;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Best bid/ask for one outcome, plus its current trend verdict.
#[derive(Debug, Clone)]
pub struct PriceLevels {
    pub outcome: String,
    pub best_ask: Option<Decimal>,
    pub best_bid: Option<Decimal>,
    pub trend: Option<TrendPrediction>,
}

impl PriceLevels {
    #[must_use]
    pub const fn new(outcome: String) -> Self {
        Self {
            outcome,
            best_ask: None,
            best_bid: None,
            trend: None,
        }
    }

    /// Invariant: `best_ask >= best_bid` once both are known.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_ask, self.best_bid) {
            (Some(ask), Some(bid)) => ask < bid,
            _ => false,
        }
    }
}

/// The live order book state for every tracked asset of one market. Updated
/// exclusively by the price-change handler under the per-market actor's lock.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    levels: HashMap<TokenId, PriceLevels>,
}

impl PriceBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels_mut(&mut self, token: &TokenId, outcome: &str) -> &mut PriceLevels {
        self.levels
            .entry(token.clone())
            .or_insert_with(|| PriceLevels::new(outcome.to_string()))
    }

    #[must_use]
    pub fn get(&self, token: &TokenId) -> Option<&PriceLevels> {
        self.levels.get(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TokenId, &PriceLevels)> {
        self.levels.iter()
    }

    /// Apply a price-change update, preserving whichever side is absent from
    /// the event.
    pub fn apply_update(
        &mut self,
        token: &TokenId,
        outcome: &str,
        best_ask: Option<Decimal>,
        best_bid: Option<Decimal>,
    ) {
        let entry = self.levels_mut(token, outcome);
        if let Some(ask) = best_ask {
            entry.best_ask = Some(ask);
        }
        if let Some(bid) = best_bid {
            entry.best_bid = Some(bid);
        }
    }
}
