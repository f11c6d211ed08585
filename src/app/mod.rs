//! Application orchestration: wires configuration into the full pipeline
//! (ingester → actors → handlers → strategy evaluator → executor →
//! resolution/scheduler) and runs it until shutdown.

use crate::config::Settings;
use crate::error::Result;
use crate::exchange::polymarket::PolymarketClient;
use crate::exchange::Client;
use crate::ingest::handler::HandlerState;
use crate::ingest::registry::MarketRegistry;
use crate::ingest::websocket::{StreamIngester, SubscriptionState};
use crate::ingest::ActorManager;
use crate::notifier::{Notifier, NullNotifier};
use crate::scheduler::{MarketUniverseJob, ReportNotifierJob, TradeResolverJob};
use crate::sink::{sqlite, NullSink, Sink, SqliteSink};
use crate::store::kv::KvStore;
use crate::store::{OrderRequestStore, TradeRecordStore};
use crate::subscription::SlugSubscriber;
use std::sync::Arc;
use tracing::info;

#[cfg(feature = "telegram")]
use crate::notifier::telegram::TelegramNotifier;

pub struct App {
    settings: Settings,
}

impl App {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    fn build_notifier(&self) -> Arc<dyn Notifier> {
        #[cfg(feature = "telegram")]
        if self.settings.telegram.enabled {
            if let (Some(token), Some(chat_id)) = (
                self.settings.telegram.bot_token.clone(),
                self.settings
                    .telegram
                    .chat_id
                    .as_ref()
                    .and_then(|c| c.parse::<i64>().ok()),
            ) {
                return Arc::new(TelegramNotifier::new(token, chat_id));
            }
        }
        Arc::new(NullNotifier)
    }

    fn build_sink(&self) -> Result<Arc<dyn Sink>> {
        if self.settings.dry_run {
            return Ok(Arc::new(NullSink));
        }
        let pool = sqlite::create_pool(&self.settings.database)?;
        let sink = SqliteSink::new(pool);
        sink.run_migrations()?;
        Ok(Arc::new(sink))
    }

    /// Runs every subsystem concurrently until `shutdown` fires.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) -> Result<()> {
        let exchange: Arc<dyn Client> = Arc::new(PolymarketClient::new(
            self.settings.network.clob_url.clone(),
            self.settings.network.gamma_url.clone(),
            self.settings.wallet.address.clone().unwrap_or_default(),
        ));

        let order_kv = Arc::new(KvStore::new());
        let trade_kv = Arc::new(KvStore::new());
        let order_store = OrderRequestStore::new(order_kv);
        let trade_store = TradeRecordStore::new(trade_kv);
        let registry = Arc::new(MarketRegistry::new());
        let sink = self.build_sink()?;
        let notifier = self.build_notifier();

        let handler_state = Arc::new(HandlerState {
            registry: registry.clone(),
            market_state: dashmap::DashMap::new(),
            strategies: self.settings.strategies.strategies.clone(),
            order_store: order_store.clone(),
            trade_store: trade_store.clone(),
            sink: sink.clone(),
            notifier: notifier.clone(),
            exchange: exchange.clone(),
        });
        let router = Arc::new(crate::ingest::build_router(handler_state));
        let actors = Arc::new(ActorManager::new(router));

        let subscriptions = Arc::new(SubscriptionState::new(vec![]));
        let ingester = StreamIngester::new(
            self.settings.network.ws_url.clone(),
            subscriptions.clone(),
            actors.clone(),
        );
        let slug_subscriber = Arc::new(SlugSubscriber::new(registry, subscriptions));

        let executor = crate::executor::OrderExecutor::new(
            order_store.clone(),
            trade_store.clone(),
            exchange.clone(),
            sink.clone(),
            notifier.clone(),
        );
        let trade_subscriber =
            crate::executor::TradeSubscriber::new(trade_store.clone(), sink, notifier);

        let market_universe = MarketUniverseJob::new(exchange.clone(), slug_subscriber);
        let trade_resolver = TradeResolverJob::new(exchange.clone());
        let report_notifier = ReportNotifierJob::new(trade_store, self.build_notifier());

        info!("starting pipeline");
        tokio::select! {
            _ = ingester.run(shutdown.clone()) => {}
            _ = executor.run(shutdown.clone()) => {}
            _ = trade_subscriber.run(shutdown.clone()) => {}
            _ = market_universe.run(shutdown.clone()) => {}
            _ = trade_resolver.run(shutdown.clone()) => {}
            _ = report_notifier.run(shutdown.clone()) => {}
            _ = shutdown.changed() => {}
        }
        actors.shutdown();
        Ok(())
    }
}
