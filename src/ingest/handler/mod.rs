pub mod book;
pub mod order;
pub mod price;
pub mod trade;

use crate::domain::ids::MarketId;
use crate::domain::price_book::PriceBook;
use crate::domain::trend::KalmanTrend;
use crate::exchange::Client;
use crate::ingest::registry::MarketRegistry;
use crate::notifier::Notifier;
use crate::sink::Sink;
use crate::store::{OrderRequestStore, TradeRecordStore};
use crate::strategy::Strategy;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Per-market price book + Kalman state, guarded by a single lock so only
/// the price-change handler on that market's actor mutates it.
pub struct MarketState {
    pub price_book: PriceBook,
    pub kalman: KalmanTrend,
}

impl Default for MarketState {
    fn default() -> Self {
        Self {
            price_book: PriceBook::new(),
            kalman: KalmanTrend::default(),
        }
    }
}

/// Shared dependencies every handler needs: market metadata, per-market
/// price/trend state, the order/trade stores, strategy configuration, the
/// relational sink, and the notification transport.
pub struct HandlerState {
    pub registry: Arc<MarketRegistry>,
    pub market_state: DashMap<MarketId, Arc<Mutex<MarketState>>>,
    pub strategies: Vec<Strategy>,
    pub order_store: OrderRequestStore,
    pub trade_store: TradeRecordStore,
    pub sink: Arc<dyn Sink>,
    pub notifier: Arc<dyn Notifier>,
    pub exchange: Arc<dyn Client>,
}

impl HandlerState {
    pub fn market_state(&self, market_id: &MarketId) -> Arc<Mutex<MarketState>> {
        self.market_state
            .entry(market_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(MarketState::default())))
            .clone()
    }
}
