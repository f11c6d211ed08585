//! The strategy rule condition DSL. Rules are data, not compiled code: a
//! `Predicate` is a small tagged tree walked against a `MarketContext`, so
//! rule content can be hot-reloaded from configuration without a rebuild.

use crate::domain::context::MarketContext;
use crate::domain::ids::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Predicate {
    HasTag {
        tags: Vec<String>,
    },
    PriceIn {
        outcome: String,
        side: Side,
        lo: Decimal,
        hi: Decimal,
    },
    SpreadAtMost {
        max: Decimal,
    },
    TimeLeft {
        min_seconds: f64,
    },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
}

impl Predicate {
    #[must_use]
    pub fn eval(&self, ctx: &MarketContext) -> bool {
        match self {
            Self::HasTag { tags } => tags.iter().all(|t| ctx.has_tag(t)),
            Self::PriceIn {
                outcome,
                side,
                lo,
                hi,
            } => {
                let Some(prices) = ctx.outcome_prices.get(outcome) else {
                    return false;
                };
                let price = match side {
                    Side::Buy => prices.buy,
                    Side::Sell => prices.sell,
                };
                match price {
                    Some(p) => p >= *lo && p <= *hi,
                    None => false,
                }
            }
            Self::SpreadAtMost { max } => ctx.spread <= *max,
            Self::TimeLeft { min_seconds } => ctx.time_left().is_some_and(|t| t >= *min_seconds),
            Self::All(preds) => preds.iter().all(|p| p.eval(ctx)),
            Self::Any(preds) => preds.iter().any(|p| p.eval(ctx)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    fn ctx_with_price(outcome: &str, buy: Decimal) -> MarketContext {
        let mut outcome_prices = HashMap::new();
        outcome_prices.insert(
            outcome.to_string(),
            crate::domain::context::SidePrices {
                buy: Some(buy),
                sell: None,
            },
        );
        MarketContext {
            market_id: crate::domain::ids::MarketId::from("m"),
            slug: "s".into(),
            start_date: None,
            end_date: None,
            liquidity: Decimal::ZERO,
            spread: Decimal::ZERO,
            outcomes: vec![outcome.to_string()],
            outcome_prices,
            outcome_assets: HashMap::new(),
            outcome_trends: HashMap::new(),
            tags: HashSet::new(),
            event_ts: 0.0,
            order_min_size: Decimal::ZERO,
        }
    }

    #[test]
    fn price_in_range_matches_inclusive_bounds() {
        let ctx = ctx_with_price("Up", rust_decimal_macros::dec!(0.85));
        let pred = Predicate::PriceIn {
            outcome: "Up".into(),
            side: Side::Buy,
            lo: rust_decimal_macros::dec!(0.75),
            hi: rust_decimal_macros::dec!(0.90),
        };
        assert!(pred.eval(&ctx));
    }

    #[test]
    fn price_in_range_rejects_out_of_bounds() {
        let ctx = ctx_with_price("Up", rust_decimal_macros::dec!(0.95));
        let pred = Predicate::PriceIn {
            outcome: "Up".into(),
            side: Side::Buy,
            lo: rust_decimal_macros::dec!(0.75),
            hi: rust_decimal_macros::dec!(0.90),
        };
        assert!(!pred.eval(&ctx));
    }

    #[test]
    fn all_requires_every_child() {
        let ctx = ctx_with_price("Up", rust_decimal_macros::dec!(0.85));
        let pred = Predicate::All(vec![
            Predicate::PriceIn {
                outcome: "Up".into(),
                side: Side::Buy,
                lo: rust_decimal_macros::dec!(0.75),
                hi: rust_decimal_macros::dec!(0.90),
            },
            Predicate::SpreadAtMost { max: Decimal::ZERO },
        ]);
        assert!(pred.eval(&ctx));
    }
}
