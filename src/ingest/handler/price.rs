//! Price-change handler (C8): the only writer of a market's price book and
//! Kalman trend state. Builds a fresh `MarketContext` every tick and feeds
//! it to the strategy evaluator.

use super::HandlerState;
use crate::domain::context::{MarketContext, SidePrices};
use crate::domain::ids::{MarketId, TokenId};
use crate::domain::order_request::OrderRequest;
use crate::ingest::envelope::MsgEnvelope;
use crate::ingest::router::Handler;
use crate::strategy::{evaluate_outcome, EvalOutcome};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct PriceChangeHandler {
    state: Arc<HandlerState>,
}

impl PriceChangeHandler {
    #[must_use]
    pub fn new(state: Arc<HandlerState>) -> Self {
        Self { state }
    }

    fn build_context(&self, market_id: &MarketId, event_ts: f64) -> Option<MarketContext> {
        let meta = self.state.registry.get(market_id)?;
        let market_state = self.state.market_state(market_id);
        let guard = market_state.lock();

        let mut outcome_prices = std::collections::HashMap::new();
        let mut outcome_assets = std::collections::HashMap::new();
        let mut outcome_trends = std::collections::HashMap::new();
        for outcome in &meta.outcomes {
            let Some(asset_id) = meta.asset_for(outcome) else {
                continue;
            };
            outcome_assets.insert(outcome.clone(), asset_id.clone());
            if let Some(levels) = guard.price_book.get(asset_id) {
                outcome_prices.insert(
                    outcome.clone(),
                    SidePrices {
                        buy: levels.best_ask,
                        sell: levels.best_bid,
                    },
                );
                if let Some(trend) = levels.trend {
                    outcome_trends.insert(outcome.clone(), trend);
                }
            }
        }

        Some(MarketContext {
            market_id: market_id.clone(),
            slug: meta.slug.clone(),
            start_date: meta.start_date,
            end_date: meta.end_date,
            liquidity: meta.liquidity,
            spread: Decimal::ZERO,
            outcomes: meta.outcomes.clone(),
            outcome_prices,
            outcome_assets,
            outcome_trends,
            tags: meta.tags.clone(),
            event_ts,
            order_min_size: meta.order_min_size,
        })
    }
}

#[async_trait]
impl Handler for PriceChangeHandler {
    fn event_types(&self) -> &[&str] {
        &["price_change"]
    }

    async fn handle(&self, envelope: &MsgEnvelope) -> crate::error::Result<()> {
        let market_id = MarketId::from(envelope.market.as_str());
        let Some(meta) = self.state.registry.get(&market_id) else {
            debug!(market = %market_id, "price change for untracked market");
            return Ok(());
        };

        let Some(changes) = envelope
            .payload
            .get("price_changes")
            .and_then(|v| v.as_array())
        else {
            return Ok(());
        };

        let market_state = self.state.market_state(&market_id);
        {
            let mut guard = market_state.lock();
            for change in changes {
                let Some(asset_id) = change.get("asset_id").and_then(|v| v.as_str()) else {
                    continue;
                };
                let asset_id = TokenId::from(asset_id);
                let Some(outcome) = meta.outcome_for(&asset_id) else {
                    continue;
                };
                let best_ask = change
                    .get("best_ask")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse::<Decimal>().ok());
                let best_bid = change
                    .get("best_bid")
                    .and_then(|v| v.as_str())
                    .and_then(|s| s.parse::<Decimal>().ok());
                guard
                    .price_book
                    .apply_update(&asset_id, outcome, best_ask, best_bid);
            }

            let ts = envelope.timestamp as f64;
            let tick_size = meta.tick_size.and_then(|d| d.to_f64());
            for (asset_id, _) in meta.asset_ids.iter().map(|a| (a.clone(), ())) {
                let key = format!("{market_id}:{asset_id}");
                let levels = guard.price_book.get(&asset_id).cloned();
                let Some(levels) = levels else { continue };
                let (Some(ask), Some(bid)) = (levels.best_ask, levels.best_bid) else {
                    continue;
                };
                if ask < bid || bid <= Decimal::ZERO {
                    continue;
                }
                let mid = ((ask + bid) / Decimal::TWO).to_f64().unwrap_or(0.5);
                let spread = (ask - bid).to_f64();
                let trend = guard.kalman.update(&key, mid, spread, ts, tick_size);
                guard
                    .price_book
                    .levels_mut(&asset_id, levels.outcome.as_str())
                    .trend = Some(trend);
            }
        }

        let Some(ctx) = self.build_context(&market_id, envelope.timestamp as f64) else {
            return Ok(());
        };

        for outcome in ctx.outcomes.clone() {
            let Some(outcome_result) = evaluate_outcome(
                &ctx,
                &outcome,
                &self.state.strategies,
                &self.state.order_store,
                &self.state.trade_store,
                ctx.event_ts,
            ) else {
                continue;
            };
            let asset_id = ctx.asset_for(&outcome).cloned();
            match outcome_result {
                EvalOutcome::Intent(req) => {
                    if let Err(err) = self.place_intent(&req) {
                        warn!(market = %market_id, outcome = %outcome, error = %err, "failed to record order intent");
                    }
                }
                EvalOutcome::Blocked(code) => {
                    let asset_str = asset_id.map(|a| a.to_string()).unwrap_or_default();
                    let event = crate::sink::TradeEvent::blocked(
                        market_id.as_str(),
                        &asset_str,
                        "",
                        code,
                        ctx.event_ts,
                    );
                    if let Err(err) = self.state.sink.record_trade_event(event).await {
                        warn!(market = %market_id, error = %err, "failed to record blocked trade event");
                    }
                }
            }
        }

        Ok(())
    }
}

impl PriceChangeHandler {
    fn place_intent(&self, req: &OrderRequest) -> crate::error::Result<()> {
        self.state.order_store.add(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_meta::MarketMeta;
    use crate::exchange::{
        CancelResult, Client, ExchangeMarket, ExchangeOrder, OrderBookSnapshot, PlaceOrderArgs,
        PlaceOrderResult, Position,
    };
    use crate::ingest::registry::MarketRegistry;
    use crate::notifier::NullNotifier;
    use crate::sink::NullSink;
    use crate::store::{KvStore, OrderRequestStore, TradeRecordStore};
    use std::collections::HashSet;

    struct NullClient;

    #[async_trait]
    impl Client for NullClient {
        async fn get_market(&self, _market_id: &MarketId) -> crate::error::Result<ExchangeMarket> {
            unimplemented!()
        }
        async fn get_orders(
            &self,
            _market_id: Option<&MarketId>,
            _asset_id: Option<&TokenId>,
        ) -> crate::error::Result<Vec<ExchangeOrder>> {
            unimplemented!()
        }
        async fn get_order(&self, _order_id: &str) -> crate::error::Result<ExchangeOrder> {
            unimplemented!()
        }
        async fn get_order_book(
            &self,
            _asset_id: &TokenId,
        ) -> crate::error::Result<OrderBookSnapshot> {
            unimplemented!()
        }
        async fn create_market_order(
            &self,
            _args: PlaceOrderArgs,
        ) -> crate::error::Result<PlaceOrderResult> {
            unimplemented!()
        }
        async fn create_limit_order(
            &self,
            _args: PlaceOrderArgs,
        ) -> crate::error::Result<PlaceOrderResult> {
            unimplemented!()
        }
        async fn cancel(&self, _order_id: &str) -> crate::error::Result<CancelResult> {
            unimplemented!()
        }
        async fn redeem(
            &self,
            _market_id: &MarketId,
            _asset_id: &TokenId,
        ) -> crate::error::Result<CancelResult> {
            unimplemented!()
        }
        async fn wallet_address(&self) -> crate::error::Result<String> {
            unimplemented!()
        }
        async fn wallet_balance(&self) -> crate::error::Result<Decimal> {
            unimplemented!()
        }
        async fn get_positions(&self) -> crate::error::Result<Vec<Position>> {
            unimplemented!()
        }
        async fn is_market_resolved(&self, _market_id: &MarketId) -> crate::error::Result<bool> {
            unimplemented!()
        }
        async fn list_active_markets(
            &self,
            _end_before: chrono::DateTime<chrono::Utc>,
        ) -> crate::error::Result<Vec<ExchangeMarket>> {
            unimplemented!()
        }
    }

    fn handler() -> PriceChangeHandler {
        let registry = Arc::new(MarketRegistry::new());
        registry.upsert(MarketMeta {
            market_id: MarketId::from("m1"),
            slug: "will-it-rain".into(),
            outcomes: vec!["Up".into(), "Down".into()],
            asset_ids: vec![TokenId::from("a1"), TokenId::from("a2")],
            start_date: None,
            end_date: None,
            tick_size: None,
            liquidity: Decimal::ZERO,
            order_min_size: Decimal::ONE,
            tags: HashSet::new(),
        });
        let kv = Arc::new(KvStore::new());
        let state = Arc::new(HandlerState {
            registry,
            market_state: dashmap::DashMap::new(),
            strategies: vec![],
            order_store: OrderRequestStore::new(kv.clone()),
            trade_store: TradeRecordStore::new(kv),
            sink: Arc::new(NullSink),
            notifier: Arc::new(NullNotifier),
            exchange: Arc::new(NullClient),
        });
        PriceChangeHandler::new(state)
    }

    fn envelope() -> MsgEnvelope {
        MsgEnvelope {
            market: "m1".into(),
            timestamp: 1,
            event_type: "price_change".into(),
            payload: serde_json::json!({
                "market": "m1",
                "timestamp": 1,
                "event_type": "price_change",
                "price_changes": [
                    {"asset_id": "a1", "best_ask": "0.60", "best_bid": "0.58"}
                ]
            }),
        }
    }

    #[tokio::test]
    async fn updates_price_book_and_does_not_error_without_strategies() {
        let handler = handler();
        handler.handle(&envelope()).await.unwrap();
        let market_state = handler.state.market_state(&MarketId::from("m1"));
        let guard = market_state.lock();
        let levels = guard.price_book.get(&TokenId::from("a1")).unwrap();
        assert_eq!(levels.best_ask, Some(rust_decimal_macros::dec!(0.60)));
    }

    #[tokio::test]
    async fn untracked_market_is_a_noop() {
        let handler = handler();
        let mut env = envelope();
        env.market = "unknown".into();
        handler.handle(&env).await.unwrap();
    }
}
