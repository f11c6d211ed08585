use super::context::MarketContext;
use super::ids::{MarketId, Side, TokenId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tif {
    Gtc,
    Fok,
    Gtd,
    Fak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestSource {
    StrategyEnter,
    StrategyExit,
    StopLoss,
    TakeProfit,
    ApiCall,
}

/// An order intent: at most one active per `(market_id, asset_id, side)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub market_id: MarketId,
    pub asset_id: TokenId,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub tif: Tif,
    pub order_type: OrderType,
    pub request_source: RequestSource,
    pub strategy: String,
    pub rule: String,
    pub context: MarketContext,
    pub created_ts: f64,
}

impl OrderRequest {
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.market_id, self.asset_id, self.side)
    }
}
