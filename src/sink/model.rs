//! Mechanical relational projections of the in-memory records (§6).

use crate::strategy::BlockCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub market_id: String,
    pub slug: String,
    pub event_ts: f64,
    pub outcome: String,
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    pub t_stat: Option<f64>,
    pub direction: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSnapshot {
    pub market_id: String,
    pub asset_id: String,
    pub side: String,
    pub order_id: String,
    pub strategy: String,
    pub rule: String,
    pub request_source: String,
    pub status: String,
    pub price: Decimal,
    pub size: Decimal,
    pub matched_amount: Decimal,
    pub trader_side: String,
    pub matched_ts: Option<f64>,
    pub created_ts: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TradeEventState {
    Blocked,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub market_id: String,
    pub asset_id: String,
    pub side: String,
    pub code: String,
    pub state: TradeEventState,
    pub detail: Option<String>,
    pub created_ts: f64,
}

impl TradeEvent {
    #[must_use]
    pub fn blocked(
        market_id: &str,
        asset_id: &str,
        side: &str,
        code: BlockCode,
        created_ts: f64,
    ) -> Self {
        Self {
            market_id: market_id.to_string(),
            asset_id: asset_id.to_string(),
            side: side.to_string(),
            code: format!("{code:?}").to_uppercase(),
            state: TradeEventState::Blocked,
            detail: None,
            created_ts,
        }
    }

    #[must_use]
    pub fn failed(
        market_id: &str,
        asset_id: &str,
        side: &str,
        detail: String,
        created_ts: f64,
    ) -> Self {
        Self {
            market_id: market_id.to_string(),
            asset_id: asset_id.to_string(),
            side: side.to_string(),
            code: "CLOB_API_ERROR".to_string(),
            state: TradeEventState::Failed,
            detail: Some(detail),
            created_ts,
        }
    }
}
