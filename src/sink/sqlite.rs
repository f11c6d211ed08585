//! SQLite-backed `Sink` using Diesel + r2d2, the concrete implementation
//! behind the relational sink boundary.

use super::model::TradeEventState;
use super::schema::{market_snapshots, trade_events, trade_snapshots};
use super::{MarketSnapshot, Sink, TradeEvent, TradeSnapshot};
use crate::error::{Error, Result};
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub fn create_pool(database_url: &str) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .max_size(5)
        .build(manager)
        .map_err(Error::from)
}

#[derive(Insertable)]
#[diesel(table_name = market_snapshots)]
struct NewMarketSnapshotRow {
    market_id: String,
    slug: String,
    event_ts: f64,
    outcome: String,
    best_bid: Option<String>,
    best_ask: Option<String>,
    t_stat: Option<f64>,
    direction: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = trade_snapshots)]
struct NewTradeSnapshotRow {
    market_id: String,
    asset_id: String,
    side: String,
    order_id: String,
    strategy: String,
    rule: String,
    request_source: String,
    status: String,
    price: String,
    size: String,
    matched_amount: String,
    trader_side: String,
    matched_ts: Option<f64>,
    created_ts: f64,
}

#[derive(Insertable)]
#[diesel(table_name = trade_events)]
struct NewTradeEventRow {
    market_id: String,
    asset_id: String,
    side: String,
    code: String,
    state: String,
    detail: Option<String>,
    created_ts: f64,
}

pub struct SqliteSink {
    pool: DbPool,
}

impl SqliteSink {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Run the embedded migrations against the pooled connection.
    pub fn run_migrations(&self) -> Result<()> {
        use diesel::connection::SimpleConnection;
        let mut conn = self.pool.get()?;
        conn.batch_execute(
            "CREATE TABLE IF NOT EXISTS market_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                market_id TEXT NOT NULL,
                slug TEXT NOT NULL,
                event_ts DOUBLE NOT NULL,
                outcome TEXT NOT NULL,
                best_bid TEXT,
                best_ask TEXT,
                t_stat DOUBLE,
                direction TEXT
            );
            CREATE TABLE IF NOT EXISTS trade_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                market_id TEXT NOT NULL,
                asset_id TEXT NOT NULL,
                side TEXT NOT NULL,
                order_id TEXT NOT NULL,
                strategy TEXT NOT NULL,
                rule TEXT NOT NULL,
                request_source TEXT NOT NULL,
                status TEXT NOT NULL,
                price TEXT NOT NULL,
                size TEXT NOT NULL,
                matched_amount TEXT NOT NULL,
                trader_side TEXT NOT NULL,
                matched_ts DOUBLE,
                created_ts DOUBLE NOT NULL
            );
            CREATE TABLE IF NOT EXISTS trade_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                market_id TEXT NOT NULL,
                asset_id TEXT NOT NULL,
                side TEXT NOT NULL,
                code TEXT NOT NULL,
                state TEXT NOT NULL,
                detail TEXT,
                created_ts DOUBLE NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Trade count and total matched size for rows with `created_ts >= cutoff`.
    pub fn recent_activity(&self, cutoff: f64) -> Result<(i64, rust_decimal::Decimal)> {
        use diesel::dsl::count_star;

        let mut conn = self.pool.get()?;
        let count: i64 = trade_snapshots::table
            .filter(trade_snapshots::created_ts.ge(cutoff))
            .select(count_star())
            .first(&mut conn)?;
        let amounts: Vec<String> = trade_snapshots::table
            .filter(trade_snapshots::created_ts.ge(cutoff))
            .select(trade_snapshots::matched_amount)
            .load(&mut conn)?;
        let matched = amounts
            .iter()
            .filter_map(|a| a.parse::<rust_decimal::Decimal>().ok())
            .sum();
        Ok((count, matched))
    }
}

#[async_trait]
impl Sink for SqliteSink {
    async fn record_market_snapshot(&self, snap: MarketSnapshot) -> Result<()> {
        let mut conn = self.pool.get()?;
        let row = NewMarketSnapshotRow {
            market_id: snap.market_id,
            slug: snap.slug,
            event_ts: snap.event_ts,
            outcome: snap.outcome,
            best_bid: snap.best_bid.map(|d| d.to_string()),
            best_ask: snap.best_ask.map(|d| d.to_string()),
            t_stat: snap.t_stat,
            direction: snap.direction,
        };
        diesel::insert_into(market_snapshots::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    async fn record_trade_snapshot(&self, snap: TradeSnapshot) -> Result<()> {
        let mut conn = self.pool.get()?;
        let row = NewTradeSnapshotRow {
            market_id: snap.market_id,
            asset_id: snap.asset_id,
            side: snap.side,
            order_id: snap.order_id,
            strategy: snap.strategy,
            rule: snap.rule,
            request_source: snap.request_source,
            status: snap.status,
            price: snap.price.to_string(),
            size: snap.size.to_string(),
            matched_amount: snap.matched_amount.to_string(),
            trader_side: snap.trader_side,
            matched_ts: snap.matched_ts,
            created_ts: snap.created_ts,
        };
        diesel::insert_into(trade_snapshots::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    async fn record_trade_event(&self, event: TradeEvent) -> Result<()> {
        let mut conn = self.pool.get()?;
        let state = match event.state {
            TradeEventState::Blocked => "BLOCKED",
            TradeEventState::Failed => "FAILED",
        };
        let row = NewTradeEventRow {
            market_id: event.market_id,
            asset_id: event.asset_id,
            side: event.side,
            code: event.code,
            state: state.to_string(),
            detail: event.detail,
            created_ts: event.created_ts,
        };
        diesel::insert_into(trade_events::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }
}
