//! Trade handler (C8): user-channel fill notifications. Only `CONFIRMED`
//! events are processed; TAKER events resolve the taker's own order via the
//! exchange client, MAKER events upsert one record per maker order.

use super::HandlerState;
use crate::domain::ids::{MarketId, Side, TokenId};
use crate::domain::trade_record::{TradeRecord, TradeStatus, TraderSide};
use crate::exchange::ExchangeOrder;
use crate::ingest::envelope::MsgEnvelope;
use crate::ingest::router::Handler;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub struct TradeHandler {
    state: Arc<HandlerState>,
}

impl TradeHandler {
    #[must_use]
    pub fn new(state: Arc<HandlerState>) -> Self {
        Self { state }
    }

    fn status_of(status: &str) -> TradeStatus {
        match status.to_uppercase().as_str() {
            "MATCHED" => TradeStatus::Matched,
            "CANCELLED" | "CANCELED" => TradeStatus::Cancelled,
            "FAILED" => TradeStatus::Failed,
            _ => TradeStatus::Live,
        }
    }

    /// Merge one fill observation (from an `ExchangeOrder` for TAKER, or a
    /// raw `maker_orders[]` entry for MAKER) into the trade record store.
    async fn merge_one(
        &self,
        market_id: &MarketId,
        asset_id: TokenId,
        side: Side,
        order_id: String,
        status_str: &str,
        size_orig: Decimal,
        size_matched: Decimal,
        price: Decimal,
        trader_side: TraderSide,
        matched_ts: f64,
    ) -> crate::error::Result<()> {
        let status = Self::status_of(status_str);
        let existing = self
            .state
            .trade_store
            .get(market_id, &asset_id, side, &order_id)?;

        match existing {
            None => {
                let record = TradeRecord {
                    market_id: market_id.clone(),
                    asset_id,
                    side,
                    order_id,
                    transaction_hash: None,
                    matched_amount: size_matched,
                    size: size_orig,
                    price,
                    fee_rate_bps: Decimal::ZERO,
                    trader_side,
                    status,
                    active: true,
                    raw: Value::Null,
                    matched_ts: Some(matched_ts),
                    created_ts: matched_ts,
                    order_request_key: None,
                };
                self.state.trade_store.add(None, &record)?;
            }
            Some(mut record) => {
                // size_matched of zero means "unchanged" per the upstream merge rule.
                let new_matched = if size_matched != Decimal::ZERO {
                    size_matched
                } else {
                    record.matched_amount
                };
                record.merge_fill(
                    new_matched,
                    status,
                    price,
                    size_orig,
                    trader_side,
                    matched_ts,
                );
                self.state.trade_store.update(&record)?;
            }
        }
        Ok(())
    }

    fn parse_maker_order(order: &Value) -> Option<(TokenId, Side, String, Decimal, Decimal)> {
        let asset_id = TokenId::from(order.get("asset_id")?.as_str()?);
        let side = if order.get("side")?.as_str()? == "SELL" {
            Side::Sell
        } else {
            Side::Buy
        };
        let order_id = order
            .get("order_id")
            .or_else(|| order.get("id"))?
            .as_str()?
            .to_string();
        let price = order.get("price")?.as_str()?.parse::<Decimal>().ok()?;
        let matched = order
            .get("matched_amount")
            .or_else(|| order.get("size_matched"))
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Decimal>().ok())
            .unwrap_or(Decimal::ZERO);
        Some((asset_id, side, order_id, price, matched))
    }

    fn exchange_order_parts(order: &ExchangeOrder) -> (TokenId, Side, String, Decimal, Decimal) {
        (
            order.asset_id.clone(),
            order.side,
            order.id.clone(),
            order.price,
            order.size_matched,
        )
    }
}

#[async_trait]
impl Handler for TradeHandler {
    fn event_types(&self) -> &[&str] {
        &["trade"]
    }

    async fn handle(&self, envelope: &MsgEnvelope) -> crate::error::Result<()> {
        let status = envelope
            .payload
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        if status != "CONFIRMED" {
            return Ok(());
        }

        let market_id = MarketId::from(envelope.market.as_str());
        let size_orig = envelope
            .payload
            .get("size")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Decimal>().ok())
            .unwrap_or(Decimal::ZERO);
        let trader_side = envelope
            .payload
            .get("trader_side")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        info!(market = %market_id, trader_side, "processing confirmed trade");

        match trader_side {
            "TAKER" => {
                let Some(taker_order_id) = envelope
                    .payload
                    .get("taker_order_id")
                    .and_then(|v| v.as_str())
                else {
                    return Ok(());
                };
                let order = match self.state.exchange.get_order(taker_order_id).await {
                    Ok(order) => order,
                    Err(err) => {
                        warn!(market = %market_id, error = %err, "failed to fetch taker order");
                        return Ok(());
                    }
                };
                let (asset_id, side, order_id, price, matched) = Self::exchange_order_parts(&order);
                self.merge_one(
                    &market_id,
                    asset_id,
                    side,
                    order_id,
                    &order.status,
                    size_orig,
                    matched,
                    price,
                    TraderSide::Taker,
                    envelope.timestamp as f64,
                )
                .await?;
            }
            "MAKER" => {
                let Some(maker_orders) = envelope
                    .payload
                    .get("maker_orders")
                    .and_then(|v| v.as_array())
                else {
                    return Ok(());
                };
                for order in maker_orders {
                    let Some((asset_id, side, order_id, price, matched)) =
                        Self::parse_maker_order(order)
                    else {
                        continue;
                    };
                    self.merge_one(
                        &market_id,
                        asset_id,
                        side,
                        order_id,
                        status,
                        size_orig,
                        matched,
                        price,
                        TraderSide::Maker,
                        envelope.timestamp as f64,
                    )
                    .await?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::registry::MarketRegistry;
    use crate::notifier::NullNotifier;
    use crate::sink::NullSink;
    use crate::store::{KvStore, OrderRequestStore, TradeRecordStore};

    fn state_with_exchange() -> Arc<HandlerState> {
        let kv = Arc::new(KvStore::new());
        Arc::new(HandlerState {
            registry: Arc::new(MarketRegistry::new()),
            market_state: dashmap::DashMap::new(),
            strategies: vec![],
            order_store: OrderRequestStore::new(kv.clone()),
            trade_store: TradeRecordStore::new(kv),
            sink: Arc::new(NullSink),
            notifier: Arc::new(NullNotifier),
            exchange: Arc::new(crate::exchange::polymarket::PolymarketClient::new(
                "http://localhost".into(),
                "http://localhost".into(),
                "0xabc".into(),
            )),
        })
    }

    #[tokio::test]
    async fn non_confirmed_status_is_ignored() {
        let handler = TradeHandler::new(state_with_exchange());
        let envelope = MsgEnvelope {
            market: "m1".into(),
            timestamp: 1,
            event_type: "trade".into(),
            payload: serde_json::json!({"status": "MATCHED", "trader_side": "TAKER"}),
        };
        handler.handle(&envelope).await.unwrap();
    }

    #[tokio::test]
    async fn maker_orders_each_create_a_trade_record() {
        let state = state_with_exchange();
        let handler = TradeHandler::new(state.clone());
        let envelope = MsgEnvelope {
            market: "m1".into(),
            timestamp: 1,
            event_type: "trade".into(),
            payload: serde_json::json!({
                "status": "CONFIRMED",
                "trader_side": "MAKER",
                "size": "20",
                "maker_orders": [
                    {"asset_id": "a1", "side": "BUY", "order_id": "mo1", "price": "0.55", "matched_amount": "10"},
                    {"asset_id": "a2", "side": "SELL", "order_id": "mo2", "price": "0.45", "matched_amount": "10"}
                ]
            }),
        };
        handler.handle(&envelope).await.unwrap();

        let rec1 = state
            .trade_store
            .get(
                &MarketId::from("m1"),
                &TokenId::from("a1"),
                Side::Buy,
                "mo1",
            )
            .unwrap();
        assert!(rec1.is_some());
        let rec2 = state
            .trade_store
            .get(
                &MarketId::from("m1"),
                &TokenId::from("a2"),
                Side::Sell,
                "mo2",
            )
            .unwrap();
        assert!(rec2.is_some());
    }

    #[tokio::test]
    async fn repeated_maker_fill_with_same_matched_amount_preserves_matched_ts() {
        let state = state_with_exchange();
        let handler = TradeHandler::new(state.clone());
        let envelope = MsgEnvelope {
            market: "m1".into(),
            timestamp: 1,
            event_type: "trade".into(),
            payload: serde_json::json!({
                "status": "CONFIRMED", "trader_side": "MAKER", "size": "10",
                "maker_orders": [{"asset_id": "a1", "side": "BUY", "order_id": "mo1", "price": "0.55", "matched_amount": "10"}]
            }),
        };
        handler.handle(&envelope).await.unwrap();
        let mut envelope2 = envelope.clone();
        envelope2.timestamp = 2;
        handler.handle(&envelope2).await.unwrap();

        let rec = state
            .trade_store
            .get(
                &MarketId::from("m1"),
                &TokenId::from("a1"),
                Side::Buy,
                "mo1",
            )
            .unwrap()
            .unwrap();
        assert_eq!(rec.matched_amount, rust_decimal_macros::dec!(10));
        assert_eq!(rec.matched_ts, Some(1.0));
    }
}
