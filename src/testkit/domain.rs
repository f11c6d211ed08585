//! Builders for domain primitives used across tests.
//!
//! Concise factory functions for ids, exchange markets, and raw wire
//! envelopes so tests focus on assertions rather than construction
//! boilerplate.

use crate::domain::{MarketId, TokenId};
use crate::exchange::ExchangeMarket;
use rust_decimal::Decimal;
use serde_json::json;

/// Create a [`MarketId`] from a string.
pub fn market_id(id: &str) -> MarketId {
    MarketId::from(id.to_string())
}

/// Create a [`TokenId`] from a string.
pub fn token(id: &str) -> TokenId {
    TokenId::from(id.to_string())
}

/// A two-outcome market ending `hours_from_now` hours out, with default
/// liquidity/order-size fields untouched so tests can override what they
/// care about.
pub fn market(slug: &str, hours_from_now: i64) -> ExchangeMarket {
    ExchangeMarket {
        market_id: market_id(slug),
        slug: slug.to_string(),
        outcomes: vec!["Up".into(), "Down".into()],
        asset_ids: vec![token(&format!("{slug}-up")), token(&format!("{slug}-down"))],
        start_date: None,
        end_date: Some(chrono::Utc::now() + chrono::Duration::hours(hours_from_now)),
        tick_size: None,
        liquidity: Decimal::ZERO,
        order_min_size: Decimal::ZERO,
        neg_risk: false,
        tags: vec![],
    }
}

/// A raw `price_change` frame as the exchange would send it, suitable for
/// [`crate::ingest::envelope::parse_frame`].
pub fn price_change_frame(market: &str, timestamp: i64, asset_id: &str, price: &str) -> String {
    json!({
        "market": market,
        "timestamp": timestamp,
        "event_type": "price_change",
        "asset_id": asset_id,
        "price": price,
    })
    .to_string()
}
