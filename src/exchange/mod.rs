//! Exchange client (consumed boundary): blocking RPC calls to place/cancel
//! orders, query positions, and read on-chain balances, wrapped with
//! retry + timeout.

pub mod polymarket;
pub mod retry;

use crate::domain::ids::{MarketId, TokenId};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeMarket {
    pub market_id: MarketId,
    pub slug: String,
    pub outcomes: Vec<String>,
    pub asset_ids: Vec<TokenId>,
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
    pub tick_size: Option<Decimal>,
    #[serde(default)]
    pub liquidity: Decimal,
    #[serde(default)]
    pub order_min_size: Decimal,
    #[serde(default)]
    pub neg_risk: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeOrder {
    pub id: String,
    pub market_id: MarketId,
    pub asset_id: TokenId,
    pub side: crate::domain::ids::Side,
    pub status: String,
    pub price: Decimal,
    pub original_size: Decimal,
    pub size_matched: Decimal,
    pub created_at: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

#[derive(Debug, Clone)]
pub struct PlaceOrderArgs {
    pub market_id: MarketId,
    pub asset_id: TokenId,
    pub side: crate::domain::ids::Side,
    pub price: Decimal,
    pub size: Decimal,
    pub tif: crate::domain::order_request::Tif,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderResult {
    pub success: bool,
    pub order_id: String,
    pub making_amount: Decimal,
    pub taking_amount: Decimal,
    pub status: String,
    pub transaction_hashes: Vec<String>,
    pub error_msg: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResult {
    pub success: bool,
    pub order_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub market_id: MarketId,
    pub condition_id: String,
    pub asset_id: TokenId,
    pub size: Decimal,
}

/// Blocking exchange RPC surface. Implementers wrap each call with the
/// retry+timeout policy from §5 (10s timeout, base 0.5s/max 8s backoff, up
/// to 5 attempts, retryable on 5xx/429/timeout).
#[async_trait]
pub trait Client: Send + Sync {
    async fn get_market(&self, market_id: &MarketId) -> Result<ExchangeMarket>;
    async fn get_orders(
        &self,
        market_id: Option<&MarketId>,
        asset_id: Option<&TokenId>,
    ) -> Result<Vec<ExchangeOrder>>;
    async fn get_order(&self, order_id: &str) -> Result<ExchangeOrder>;
    async fn get_order_book(&self, asset_id: &TokenId) -> Result<OrderBookSnapshot>;
    async fn create_market_order(&self, args: PlaceOrderArgs) -> Result<PlaceOrderResult>;
    async fn create_limit_order(&self, args: PlaceOrderArgs) -> Result<PlaceOrderResult>;
    async fn cancel(&self, order_id: &str) -> Result<CancelResult>;
    async fn redeem(&self, market_id: &MarketId, asset_id: &TokenId) -> Result<CancelResult>;
    async fn wallet_address(&self) -> Result<String>;
    async fn wallet_balance(&self) -> Result<Decimal>;
    async fn get_positions(&self) -> Result<Vec<Position>>;
    async fn is_market_resolved(&self, market_id: &MarketId) -> Result<bool>;
    /// Active, non-archived markets ending before `end_before`, newest
    /// `start_date` first.
    async fn list_active_markets(
        &self,
        end_before: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<ExchangeMarket>>;
}
