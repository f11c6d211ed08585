//! [`ScriptedExchange`]: a fully scripted [`Client`] double for seeded
//! end-to-end scenarios, mirroring the resolution module's `FakeExchange`
//! test double but exposed for use across integration tests.

use crate::domain::ids::{MarketId, TokenId};
use crate::error::{Error, Result};
use crate::exchange::{
    CancelResult, Client, ExchangeMarket, ExchangeOrder, OrderBookSnapshot, PlaceOrderArgs,
    PlaceOrderResult, Position,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Scripted responses for every [`Client`] call, keyed where relevant by
/// market or order id. Missing entries fail with [`Error::UnknownMarket`]
/// or an empty result, never a panic, so scenario authors see a normal
/// error path rather than a test harness crash.
#[derive(Default)]
pub struct ScriptedExchange {
    markets: Mutex<HashMap<MarketId, ExchangeMarket>>,
    orders: Mutex<Vec<ExchangeOrder>>,
    positions: Mutex<Vec<Position>>,
    resolved: Mutex<HashMap<MarketId, bool>>,
    cancelled: Mutex<Vec<String>>,
    redeemed: Mutex<Vec<MarketId>>,
    placed: Mutex<Vec<PlaceOrderArgs>>,
    wallet_address: Mutex<String>,
    wallet_balance: Mutex<Decimal>,
}

impl ScriptedExchange {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_market(self, market: ExchangeMarket) -> Self {
        self.markets.lock().insert(market.market_id.clone(), market);
        self
    }

    pub fn with_order(self, order: ExchangeOrder) -> Self {
        self.orders.lock().push(order);
        self
    }

    pub fn with_position(self, position: Position) -> Self {
        self.positions.lock().push(position);
        self
    }

    pub fn resolve(&self, market_id: &MarketId, resolved: bool) {
        self.resolved.lock().insert(market_id.clone(), resolved);
    }

    pub fn cancelled_order_ids(&self) -> Vec<String> {
        self.cancelled.lock().clone()
    }

    pub fn redeemed_markets(&self) -> Vec<MarketId> {
        self.redeemed.lock().clone()
    }

    pub fn placed_orders(&self) -> Vec<PlaceOrderArgs> {
        self.placed.lock().clone()
    }
}

#[async_trait]
impl Client for ScriptedExchange {
    async fn get_market(&self, market_id: &MarketId) -> Result<ExchangeMarket> {
        self.markets
            .lock()
            .get(market_id)
            .cloned()
            .ok_or_else(|| Error::UnknownMarket(market_id.to_string()))
    }

    async fn get_orders(
        &self,
        market_id: Option<&MarketId>,
        asset_id: Option<&TokenId>,
    ) -> Result<Vec<ExchangeOrder>> {
        Ok(self
            .orders
            .lock()
            .iter()
            .filter(|o| market_id.map_or(true, |m| &o.market_id == m))
            .filter(|o| asset_id.map_or(true, |a| &o.asset_id == a))
            .cloned()
            .collect())
    }

    async fn get_order(&self, order_id: &str) -> Result<ExchangeOrder> {
        self.orders
            .lock()
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
            .ok_or_else(|| Error::Exchange(format!("no such order: {order_id}")))
    }

    async fn get_order_book(&self, _asset_id: &TokenId) -> Result<OrderBookSnapshot> {
        Ok(OrderBookSnapshot {
            bids: vec![],
            asks: vec![],
        })
    }

    async fn create_market_order(&self, args: PlaceOrderArgs) -> Result<PlaceOrderResult> {
        self.placed.lock().push(args.clone());
        Ok(PlaceOrderResult {
            success: true,
            order_id: format!("scripted-{}", self.placed.lock().len()),
            making_amount: args.size,
            taking_amount: args.size * args.price,
            status: "MATCHED".into(),
            transaction_hashes: vec![],
            error_msg: None,
        })
    }

    async fn create_limit_order(&self, args: PlaceOrderArgs) -> Result<PlaceOrderResult> {
        self.create_market_order(args).await
    }

    async fn cancel(&self, order_id: &str) -> Result<CancelResult> {
        self.cancelled.lock().push(order_id.to_string());
        Ok(CancelResult {
            success: true,
            order_id: order_id.to_string(),
        })
    }

    async fn redeem(&self, market_id: &MarketId, _asset_id: &TokenId) -> Result<CancelResult> {
        self.redeemed.lock().push(market_id.clone());
        Ok(CancelResult {
            success: true,
            order_id: market_id.to_string(),
        })
    }

    async fn wallet_address(&self) -> Result<String> {
        Ok(self.wallet_address.lock().clone())
    }

    async fn wallet_balance(&self) -> Result<Decimal> {
        Ok(*self.wallet_balance.lock())
    }

    async fn get_positions(&self) -> Result<Vec<Position>> {
        Ok(self.positions.lock().clone())
    }

    async fn is_market_resolved(&self, market_id: &MarketId) -> Result<bool> {
        Ok(self
            .resolved
            .lock()
            .get(market_id)
            .copied()
            .unwrap_or(false))
    }

    async fn list_active_markets(
        &self,
        end_before: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<ExchangeMarket>> {
        Ok(self
            .markets
            .lock()
            .values()
            .filter(|m| m.end_date.is_some_and(|d| d <= end_before))
            .cloned()
            .collect())
    }
}
