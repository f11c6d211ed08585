//! Order handler (C8): user-channel confirmations of placed orders. Updates
//! the matching trade record in place; does not create new records (that is
//! the trade handler's job once a fill lands).

use super::HandlerState;
use crate::domain::ids::{MarketId, Side, TokenId};
use crate::domain::trade_record::{TradeStatus, TraderSide};
use crate::ingest::envelope::MsgEnvelope;
use crate::ingest::router::Handler;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct OrderHandler {
    state: Arc<HandlerState>,
}

impl OrderHandler {
    #[must_use]
    pub fn new(state: Arc<HandlerState>) -> Self {
        Self { state }
    }
}

fn status_of(status: Option<&str>) -> TradeStatus {
    match status.unwrap_or("").to_uppercase().as_str() {
        "MATCHED" => TradeStatus::Matched,
        "CANCELLED" | "CANCELED" => TradeStatus::Cancelled,
        "FAILED" => TradeStatus::Failed,
        _ => TradeStatus::Live,
    }
}

fn trader_side_of(side: Option<&str>) -> TraderSide {
    match side.unwrap_or("").to_uppercase().as_str() {
        "MAKER" => TraderSide::Maker,
        _ => TraderSide::Taker,
    }
}

#[async_trait]
impl Handler for OrderHandler {
    fn event_types(&self) -> &[&str] {
        &["order"]
    }

    async fn handle(&self, envelope: &MsgEnvelope) -> crate::error::Result<()> {
        debug!(market = %envelope.market, "order confirmation");
        let market_id = MarketId::from(envelope.market.as_str());
        let Some(asset_id) = envelope.payload.get("asset_id").and_then(|v| v.as_str()) else {
            return Ok(());
        };
        let asset_id = TokenId::from(asset_id);
        let Some(side) = envelope.payload.get("side").and_then(|v| v.as_str()) else {
            return Ok(());
        };
        let side = if side.eq_ignore_ascii_case("SELL") {
            Side::Sell
        } else {
            Side::Buy
        };
        let Some(order_id) = envelope
            .payload
            .get("order_id")
            .or_else(|| envelope.payload.get("id"))
            .and_then(|v| v.as_str())
        else {
            return Ok(());
        };

        let existing = self
            .state
            .trade_store
            .get(&market_id, &asset_id, side, order_id)?;
        let Some(mut record) = existing else {
            return Ok(());
        };

        let status = status_of(envelope.payload.get("status").and_then(|v| v.as_str()));
        let matched_amount = envelope
            .payload
            .get("matched_amount")
            .or_else(|| envelope.payload.get("size_matched"))
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Decimal>().ok())
            .unwrap_or(Decimal::ZERO);
        let price = envelope
            .payload
            .get("price")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Decimal>().ok())
            .unwrap_or(record.price);
        let size = envelope
            .payload
            .get("size")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Decimal>().ok())
            .unwrap_or(record.size);
        let trader_side =
            trader_side_of(envelope.payload.get("trader_side").and_then(|v| v.as_str()));

        record.merge_fill(
            matched_amount,
            status,
            price,
            size,
            trader_side,
            envelope.timestamp as f64,
        );
        if let Err(err) = self.state.trade_store.update(&record) {
            warn!(market = %market_id, error = %err, "failed to update trade record from order confirmation");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::Side as DomainSide;
    use crate::domain::trade_record::TradeRecord;
    use crate::ingest::registry::MarketRegistry;
    use crate::notifier::NullNotifier;
    use crate::sink::NullSink;
    use crate::store::{KvStore, OrderRequestStore, TradeRecordStore};

    fn state() -> Arc<HandlerState> {
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
    async fn updates_existing_trade_record_status() {
        let state = state();
        let rec = TradeRecord {
            market_id: MarketId::from("m1"),
            asset_id: TokenId::from("a1"),
            side: DomainSide::Buy,
            order_id: "o1".into(),
            transaction_hash: None,
            matched_amount: rust_decimal_macros::dec!(0),
            size: rust_decimal_macros::dec!(10),
            price: rust_decimal_macros::dec!(0.6),
            fee_rate_bps: rust_decimal_macros::dec!(0),
            trader_side: TraderSide::Taker,
            status: TradeStatus::Live,
            active: true,
            raw: serde_json::json!({}),
            matched_ts: None,
            created_ts: 0.0,
            order_request_key: None,
        };
        state.trade_store.add(None, &rec).unwrap();

        let handler = OrderHandler::new(state.clone());
        let envelope = MsgEnvelope {
            market: "m1".into(),
            timestamp: 5,
            event_type: "order".into(),
            payload: serde_json::json!({
                "asset_id": "a1", "side": "BUY", "order_id": "o1",
                "status": "MATCHED", "matched_amount": "10", "price": "0.61", "size": "10"
            }),
        };
        handler.handle(&envelope).await.unwrap();

        let updated = state
            .trade_store
            .get(
                &MarketId::from("m1"),
                &TokenId::from("a1"),
                DomainSide::Buy,
                "o1",
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TradeStatus::Matched);
        assert_eq!(updated.matched_amount, rust_decimal_macros::dec!(10));
    }

    #[tokio::test]
    async fn unknown_order_is_a_noop() {
        let state = state();
        let handler = OrderHandler::new(state);
        let envelope = MsgEnvelope {
            market: "m1".into(),
            timestamp: 5,
            event_type: "order".into(),
            payload: serde_json::json!({"asset_id": "a1", "side": "BUY", "order_id": "unknown"}),
        };
        handler.handle(&envelope).await.unwrap();
    }
}
