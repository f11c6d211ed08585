//! Trade subscriber (consumer of the trade record store, §4.9): on every
//! `add` event, denormalizes a `TradeSnapshot` into the relational sink,
//! deactivates the opposite-side active record, and notifies.

use crate::domain::ids::{MarketId, TokenId};
use crate::domain::notification::{Notification, Severity};
use crate::domain::trade_record::TradeRecord;
use crate::notifier::{format, Notifier};
use crate::sink::{Sink, TradeSnapshot};
use crate::store::TradeRecordStore;
use std::sync::Arc;
use tracing::warn;

pub struct TradeSubscriber {
    trade_store: TradeRecordStore,
    sink: Arc<dyn Sink>,
    notifier: Arc<dyn Notifier>,
}

impl TradeSubscriber {
    #[must_use]
    pub fn new(
        trade_store: TradeRecordStore,
        sink: Arc<dyn Sink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            trade_store,
            sink,
            notifier,
        }
    }

    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut events = self.trade_store.subscribe();
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Ok(payload) => self.on_event(&payload).await,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "trade subscriber lagged behind trade store events");
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
        if payload.get("action").and_then(|v| v.as_str()) != Some("add") {
            return;
        }
        let Some(raw) = payload.get("trade_record").and_then(|v| v.as_str()) else {
            return;
        };
        let Ok(record) = serde_json::from_str::<TradeRecord>(raw) else {
            warn!("trade store event carried an undeserializable record");
            return;
        };

        if let Err(err) = self.persist_snapshot(&record, payload).await {
            warn!(market = %record.market_id, error = %err, "failed to persist trade snapshot");
        }
        if let Err(err) = self.deactivate_opposite(&record) {
            warn!(market = %record.market_id, error = %err, "failed to deactivate opposite-side trade");
        }
        self.notify(&record).await;
    }

    async fn persist_snapshot(
        &self,
        record: &TradeRecord,
        payload: &serde_json::Value,
    ) -> crate::error::Result<()> {
        let (strategy, rule, request_source) = payload
            .get("order_request")
            .and_then(|v| v.as_str())
            .and_then(|raw| {
                serde_json::from_str::<crate::domain::order_request::OrderRequest>(raw).ok()
            })
            .map(|req| (req.strategy, req.rule, format!("{:?}", req.request_source)))
            .unwrap_or_default();

        self.sink
            .record_trade_snapshot(TradeSnapshot {
                market_id: record.market_id.to_string(),
                asset_id: record.asset_id.to_string(),
                side: record.side.to_string(),
                order_id: record.order_id.clone(),
                strategy,
                rule,
                request_source,
                status: format!("{:?}", record.status).to_uppercase(),
                price: record.price,
                size: record.size,
                matched_amount: record.matched_amount,
                trader_side: format!("{:?}", record.trader_side).to_uppercase(),
                matched_ts: record.matched_ts,
                created_ts: record.created_ts,
            })
            .await
    }

    fn deactivate_opposite(&self, record: &TradeRecord) -> crate::error::Result<()> {
        let opposite_side = record.side.opposite();
        let market_id = MarketId::from(record.market_id.as_str());
        let asset_id = TokenId::from(record.asset_id.as_str());
        if let Some(mut opposite) =
            self.trade_store
                .get_active(&market_id, Some(&asset_id), Some(opposite_side))?
        {
            opposite.active = false;
            self.trade_store.update(&opposite)?;
        }
        Ok(())
    }

    async fn notify(&self, record: &TradeRecord) {
        let text = format::close_position_message(record.market_id.as_str(), "", record);
        let notification = Notification {
            key: format!("trade:{}", record.order_id),
            text,
            severity: Severity::Info,
            target: String::new(),
            medium: "chat".into(),
            created_ts: record.created_ts,
        };
        if let Err(err) = self.notifier.send(&notification).await {
            warn!(error = %err, "failed to send trade notification");
        }
    }
}
