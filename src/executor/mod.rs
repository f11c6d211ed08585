//! Order executor (C10): subscribes to the order request store's events
//! channel and turns accepted intents into exchange orders.

pub mod trade_subscriber;

pub use trade_subscriber::TradeSubscriber;

use crate::domain::ids::Side;
use crate::domain::order_request::{OrderRequest, OrderType};
use crate::domain::trade_record::{TradeRecord, TradeStatus, TraderSide};
use crate::error::Result;
use crate::exchange::{Client, PlaceOrderArgs, PlaceOrderResult};
use crate::notifier::{format, Notifier};
use crate::sink::{Sink, TradeEvent};
use crate::store::{OrderRequestStore, TradeRecordStore};
use std::sync::Arc;
use tracing::{info, warn};

pub struct OrderExecutor {
    order_store: OrderRequestStore,
    trade_store: TradeRecordStore,
    exchange: Arc<dyn Client>,
    sink: Arc<dyn Sink>,
    notifier: Arc<dyn Notifier>,
}

impl OrderExecutor {
    #[must_use]
    pub fn new(
        order_store: OrderRequestStore,
        trade_store: TradeRecordStore,
        exchange: Arc<dyn Client>,
        sink: Arc<dyn Sink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            order_store,
            trade_store,
            exchange,
            sink,
            notifier,
        }
    }

    /// Drives the order store's pub/sub channel until `shutdown` fires.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut events = self.order_store.subscribe();
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(payload) => self.on_event(&payload).await,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "executor lagged behind order store events");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    }

    async fn on_event(&self, payload: &serde_json::Value) {
        let action = payload.get("action").and_then(|v| v.as_str()).unwrap_or("");
        if action != "add" && action != "update" {
            return;
        }
        let Some(raw) = payload.get("order").and_then(|v| v.as_str()) else {
            return;
        };
        let Ok(req) = serde_json::from_str::<OrderRequest>(raw) else {
            warn!("order store event carried an undeserializable order");
            return;
        };

        if let Err(err) = self.execute(&req).await {
            warn!(market = %req.market_id, error = %err, "order execution failed");
        }
    }

    async fn execute(&self, req: &OrderRequest) -> Result<()> {
        let args = PlaceOrderArgs {
            market_id: req.market_id.clone(),
            asset_id: req.asset_id.clone(),
            side: req.side,
            price: req.price,
            size: req.size,
            tif: req.tif,
        };

        let placed = match req.order_type {
            OrderType::Market => self.exchange.create_market_order(args).await,
            OrderType::Limit => self.exchange.create_limit_order(args).await,
        };

        match placed {
            Ok(result) => self.on_success(req, result).await,
            Err(err) => self.on_failure(req, err.to_string()).await,
        }
    }

    async fn on_success(&self, req: &OrderRequest, result: PlaceOrderResult) -> Result<()> {
        let status = if result.success {
            TradeStatus::Matched
        } else {
            TradeStatus::Failed
        };
        let trader_side = TraderSide::Taker;
        let existing =
            self.trade_store
                .get(&req.market_id, &req.asset_id, req.side, &result.order_id)?;
        let record = match existing {
            Some(mut rec) => {
                rec.merge_fill(
                    result.making_amount + result.taking_amount,
                    status,
                    req.price,
                    req.size,
                    trader_side,
                    req.created_ts,
                );
                rec
            }
            None => TradeRecord {
                market_id: req.market_id.clone(),
                asset_id: req.asset_id.clone(),
                side: req.side,
                order_id: result.order_id.clone(),
                transaction_hash: result.transaction_hashes.first().cloned(),
                matched_amount: result.making_amount + result.taking_amount,
                size: req.size,
                price: req.price,
                fee_rate_bps: rust_decimal::Decimal::ZERO,
                trader_side,
                status,
                active: result.success,
                raw: serde_json::json!({}),
                matched_ts: Some(req.created_ts),
                created_ts: req.created_ts,
                order_request_key: Some(req.key()),
            },
        };
        self.trade_store.add(Some(req), &record)?;
        self.remove_intent(req, result.success);

        if result.success {
            let message =
                format::place_order_message(&req.context.slug, "", req.side, req.price, req.size);
            let notification = crate::domain::notification::Notification {
                key: format!("order:{}", result.order_id),
                text: message,
                severity: crate::domain::notification::Severity::Info,
                target: String::new(),
                medium: "chat".into(),
                created_ts: req.created_ts,
            };
            if let Err(err) = self.notifier.send(&notification).await {
                warn!(error = %err, "failed to send order placed notification");
            }
        } else {
            let detail = result.error_msg.unwrap_or_default();
            self.sink
                .record_trade_event(TradeEvent::failed(
                    req.market_id.as_str(),
                    req.asset_id.as_str(),
                    req.side.as_str(),
                    detail,
                    req.created_ts,
                ))
                .await?;
        }
        Ok(())
    }

    async fn on_failure(&self, req: &OrderRequest, detail: String) -> Result<()> {
        self.remove_intent(req, false);
        self.sink
            .record_trade_event(TradeEvent::failed(
                req.market_id.as_str(),
                req.asset_id.as_str(),
                req.side.as_str(),
                detail,
                req.created_ts,
            ))
            .await
    }

    /// `is_success == (side == SELL)` removes the BUY intent; otherwise
    /// removes the SELL intent. Reproduced verbatim per the executor's
    /// two-way intent-removal rule.
    fn remove_intent(&self, req: &OrderRequest, is_success: bool) {
        let side_to_remove = if is_success == (req.side == Side::Sell) {
            Side::Buy
        } else {
            Side::Sell
        };
        if let Err(err) = self
            .order_store
            .remove(&req.market_id, &req.asset_id, side_to_remove)
        {
            warn!(market = %req.market_id, error = %err, "failed to remove order intent");
        }
        info!(market = %req.market_id, asset = %req.asset_id, side = %side_to_remove, "removed order intent");
    }
}
