//! Relational sink (append/upsert for `MarketSnapshot`/`TradeSnapshot`/
//! `TradeEvent` rows). Specified only as an append-only sink accepting a
//! typed record; the concrete implementation is a detail.

pub mod model;
pub mod schema;
pub mod sqlite;

pub use model::{MarketSnapshot, TradeEvent, TradeSnapshot};
pub use sqlite::SqliteSink;

use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Sink: Send + Sync {
    async fn record_market_snapshot(&self, snap: MarketSnapshot) -> Result<()>;
    /// Subscribers MUST dedupe by `(order_id, matched_ts)` on the caller
    /// side before invoking this, since pub/sub redelivery can produce
    /// duplicate snapshot rows otherwise (§5).
    async fn record_trade_snapshot(&self, snap: TradeSnapshot) -> Result<()>;
    async fn record_trade_event(&self, event: TradeEvent) -> Result<()>;
}

/// No-op sink for tests and dry-run mode.
pub struct NullSink;

#[async_trait]
impl Sink for NullSink {
    async fn record_market_snapshot(&self, _snap: MarketSnapshot) -> Result<()> {
        Ok(())
    }
    async fn record_trade_snapshot(&self, _snap: TradeSnapshot) -> Result<()> {
        Ok(())
    }
    async fn record_trade_event(&self, _event: TradeEvent) -> Result<()> {
        Ok(())
    }
}
