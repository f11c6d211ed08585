//! Scheduler (C12): three interval jobs running independently of the
//! streaming pipeline — market universe refresh, stale-order/position
//! resolution, and an hourly activity report.
//!
//! `tokio::time::interval` with `MissedTickBehavior::Skip` gives the
//! `coalesce=true` semantics the upstream scheduler configures (a burst of
//! missed ticks collapses into one); a per-job `AtomicBool` guard skips a
//! tick that arrives while the previous run is still in flight, standing
//! in for `replace_existing=true`.

use crate::exchange::Client;
use crate::notifier::Notifier;
use crate::resolution::ResolutionService;
use crate::store::TradeRecordStore;
use crate::subscription::SlugSubscriber;
use chrono::TimeZone;
use chrono_tz::America::New_York;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// End of the current trading day in the market's timezone (ET), as a UTC
/// instant. Hourly markets are named and bounded by the ET calendar day,
/// not the UTC one.
fn end_of_trading_day() -> chrono::DateTime<chrono::Utc> {
    let now_et = chrono::Utc::now().with_timezone(&New_York);
    now_et
        .date_naive()
        .and_hms_opt(23, 59, 59)
        .and_then(|naive| New_York.from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(chrono::Utc::now)
}

const MARKET_UNIVERSE_PERIOD: Duration = Duration::from_secs(5 * 60);
const TRADE_RESOLVER_PERIOD: Duration = Duration::from_secs(5 * 60);
const REPORT_NOTIFIER_PERIOD: Duration = Duration::from_secs(60 * 60);
/// Window the hourly report summarizes, mirroring the upstream default.
const REPORT_WINDOW_HOURS: i64 = 240;

/// Runs `job` on `period`, skipping any tick whose predecessor hasn't
/// finished yet, until `shutdown` fires.
async fn run_interval<F, Fut>(
    period: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
    job: F,
) where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let running = AtomicBool::new(false);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if running.swap(true, Ordering::SeqCst) {
                    continue;
                }
                job().await;
                running.store(false, Ordering::SeqCst);
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

/// Refreshes the tracked slug set: subscribes to markets ending today that
/// aren't already tracked, and drops slugs whose market has ended.
pub struct MarketUniverseJob {
    exchange: Arc<dyn Client>,
    subscriber: Arc<SlugSubscriber>,
}

impl MarketUniverseJob {
    #[must_use]
    pub fn new(exchange: Arc<dyn Client>, subscriber: Arc<SlugSubscriber>) -> Self {
        Self {
            exchange,
            subscriber,
        }
    }

    fn is_trackable(market: &crate::exchange::ExchangeMarket) -> bool {
        if market.neg_risk {
            return false;
        }
        !market.tags.iter().any(|t| t == "Sports" || t == "15M")
    }

    async fn tick(&self) {
        let end_before = end_of_trading_day();

        match self.exchange.list_active_markets(end_before).await {
            Ok(markets) => {
                let have: std::collections::HashSet<String> =
                    self.subscriber.get_slugs().into_iter().collect();
                for market in markets.iter().filter(|m| Self::is_trackable(m)) {
                    if !have.contains(&market.slug) {
                        self.subscriber.add_slug(&market.slug);
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "market universe refresh failed to list active markets")
            }
        }

        for market_id in self.subscriber.get_slugs() {
            match self
                .exchange
                .get_market(&crate::domain::ids::MarketId::from(market_id.as_str()))
                .await
            {
                Ok(m) if m.end_date.is_some_and(|end| end <= chrono::Utc::now()) => {
                    self.subscriber.remove_slug(&market_id);
                }
                _ => {}
            }
        }
    }

    pub async fn run(&self, shutdown: tokio::sync::watch::Receiver<bool>) {
        run_interval(MARKET_UNIVERSE_PERIOD, shutdown, || self.tick()).await;
    }
}

/// Cancels stale orders and redeems resolved positions on ended markets.
pub struct TradeResolverJob {
    resolver: ResolutionService,
}

impl TradeResolverJob {
    #[must_use]
    pub fn new(exchange: Arc<dyn Client>) -> Self {
        Self {
            resolver: ResolutionService::new(exchange),
        }
    }

    async fn tick(&self) {
        let now_ts = chrono::Utc::now().timestamp() as f64;
        let cancels = self.resolver.cancel_stale_orders(now_ts).await;
        for order_id in &cancels.cancelled {
            info!(order_id, "trade resolver cancelled stale order");
        }
        for (order_id, err) in &cancels.failed {
            warn!(order_id, error = %err, "trade resolver failed to cancel order");
        }

        let redeems = self.resolver.redeem_resolved_positions(now_ts).await;
        for condition_id in &redeems.redeemed {
            info!(condition_id, "trade resolver redeemed position");
        }
        for (condition_id, err) in &redeems.failed {
            warn!(condition_id, error = %err, "trade resolver failed to redeem position");
        }
    }

    pub async fn run(&self, shutdown: tokio::sync::watch::Receiver<bool>) {
        run_interval(TRADE_RESOLVER_PERIOD, shutdown, || self.tick()).await;
    }
}

/// Summarizes recent trading activity and sends it to the chat transport.
pub struct ReportNotifierJob {
    trade_store: TradeRecordStore,
    notifier: Arc<dyn Notifier>,
}

impl ReportNotifierJob {
    #[must_use]
    pub fn new(trade_store: TradeRecordStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            trade_store,
            notifier,
        }
    }

    fn build_report(&self) -> String {
        let cutoff = chrono::Utc::now().timestamp() as f64 - (REPORT_WINDOW_HOURS * 3600) as f64;
        let trades = self
            .trade_store
            .get_all(None, None, None, true)
            .unwrap_or_default();
        let recent: Vec<_> = trades
            .into_iter()
            .filter(|t| t.created_ts >= cutoff)
            .collect();
        let matched: rust_decimal::Decimal = recent.iter().map(|t| t.matched_amount).sum();
        format!(
            "📊 *Activity Report*\n\n🕐 last {}h\n🔢 {} trades\n💵 `{}` matched",
            REPORT_WINDOW_HOURS / 24,
            recent.len(),
            matched,
        )
    }

    async fn tick(&self) {
        let notification = crate::domain::notification::Notification {
            key: format!("report:{}", chrono::Utc::now().timestamp()),
            text: self.build_report(),
            severity: crate::domain::notification::Severity::Info,
            target: String::new(),
            medium: "chat".into(),
            created_ts: chrono::Utc::now().timestamp() as f64,
        };
        if let Err(err) = self.notifier.send(&notification).await {
            warn!(error = %err, "report notifier failed to send report");
        }
    }

    pub async fn run(&self, shutdown: tokio::sync::watch::Receiver<bool>) {
        run_interval(REPORT_NOTIFIER_PERIOD, shutdown, || self.tick()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ExchangeMarket;

    #[test]
    fn sports_and_15m_tagged_markets_are_not_trackable() {
        let m = ExchangeMarket {
            market_id: crate::domain::ids::MarketId::from("m1"),
            slug: "s".into(),
            outcomes: vec![],
            asset_ids: vec![],
            start_date: None,
            end_date: None,
            tick_size: None,
            liquidity: rust_decimal::Decimal::ZERO,
            order_min_size: rust_decimal::Decimal::ZERO,
            neg_risk: false,
            tags: vec!["Sports".into()],
        };
        assert!(!MarketUniverseJob::is_trackable(&m));
    }

    #[test]
    fn end_of_trading_day_is_after_now_and_before_tomorrow() {
        let now = chrono::Utc::now();
        let end = end_of_trading_day();
        assert!(end >= now);
        assert!(end < now + chrono::Duration::hours(30));
    }

    #[test]
    fn neg_risk_markets_are_not_trackable() {
        let m = ExchangeMarket {
            market_id: crate::domain::ids::MarketId::from("m1"),
            slug: "s".into(),
            outcomes: vec![],
            asset_ids: vec![],
            start_date: None,
            end_date: None,
            tick_size: None,
            liquidity: rust_decimal::Decimal::ZERO,
            order_min_size: rust_decimal::Decimal::ZERO,
            neg_risk: true,
            tags: vec![],
        };
        assert!(!MarketUniverseJob::is_trackable(&m));
    }

    #[tokio::test]
    async fn report_job_sends_on_each_tick() {
        use crate::store::KvStore;
        struct CountingNotifier(std::sync::atomic::AtomicUsize);
        #[async_trait::async_trait]
        impl Notifier for CountingNotifier {
            async fn send(
                &self,
                _n: &crate::domain::notification::Notification,
            ) -> crate::error::Result<()> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
        let store = TradeRecordStore::new(Arc::new(KvStore::new()));
        let notifier = Arc::new(CountingNotifier(std::sync::atomic::AtomicUsize::new(0)));
        let job = ReportNotifierJob::new(store, notifier.clone());
        job.tick().await;
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    }
}
