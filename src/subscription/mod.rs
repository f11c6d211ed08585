//! Slug subscription manager (C13): the set of market slugs currently
//! tracked, with add/remove/replace publishing change events and driving
//! the ingester's asset-id resubscribe.

use crate::ingest::registry::MarketRegistry;
use crate::ingest::websocket::SubscriptionState;
use crate::store::kv::KvStore;
use std::sync::Arc;

const SLUGS_SET: &str = "hunter:slugs";
pub const EVENTS_CHANNEL: &str = "hunter:slugs:events";

/// Tracks the subscribed slug set and keeps the ingester's asset-id list in
/// sync with it. Asset ids are resolved through the market registry, so a
/// slug only starts streaming once its market metadata has been ingested.
pub struct SlugSubscriber {
    kv: Arc<KvStore>,
    registry: Arc<MarketRegistry>,
    subscriptions: Arc<SubscriptionState>,
}

impl SlugSubscriber {
    #[must_use]
    pub fn new(registry: Arc<MarketRegistry>, subscriptions: Arc<SubscriptionState>) -> Self {
        Self {
            kv: Arc::new(KvStore::new()),
            registry,
            subscriptions,
        }
    }

    #[must_use]
    pub fn get_slugs(&self) -> Vec<String> {
        let mut slugs = self.kv.smembers(SLUGS_SET);
        slugs.sort();
        slugs
    }

    pub fn add_slug(&self, slug: &str) {
        let added = self.kv.sadd(SLUGS_SET, slug);
        if added {
            self.kv
                .publish(serde_json::json!({"action": "add", "slug": slug}));
            self.resync_assets();
        }
    }

    pub fn remove_slug(&self, slug: &str) {
        let removed = self.kv.srem(SLUGS_SET, slug);
        if removed {
            self.kv
                .publish(serde_json::json!({"action": "remove", "slug": slug}));
            self.resync_assets();
        }
    }

    /// Replaces the whole tracked slug set transactionally, publishing an
    /// `add` event per surviving slug followed by a single `replace` marker.
    pub fn replace_all(&self, slugs: impl IntoIterator<Item = String>) {
        let slugs: std::collections::HashSet<String> = slugs.into_iter().collect();
        for existing in self.kv.smembers(SLUGS_SET) {
            self.kv.srem(SLUGS_SET, &existing);
        }
        for slug in &slugs {
            self.kv.sadd(SLUGS_SET, slug);
            self.kv
                .publish(serde_json::json!({"action": "add", "slug": slug}));
        }
        self.kv
            .publish(serde_json::json!({"action": "replace", "slug": null}));
        self.resync_assets();
    }

    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<serde_json::Value> {
        self.kv.subscribe()
    }

    /// Recomputes the asset-id list the ingester should stream, from every
    /// tracked slug whose market metadata is already in the registry.
    fn resync_assets(&self) {
        let slugs = self.get_slugs();
        let assets: Vec<String> = self
            .registry
            .iter()
            .filter(|meta| slugs.contains(&meta.slug))
            .flat_map(|meta| {
                meta.asset_ids
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
            })
            .collect();
        self.subscriptions.replace(assets);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{MarketId, TokenId};
    use crate::domain::market_meta::MarketMeta;
    use rust_decimal::Decimal;
    use std::collections::HashSet;

    fn meta(slug: &str, asset: &str) -> MarketMeta {
        MarketMeta {
            market_id: MarketId::from(slug),
            slug: slug.into(),
            outcomes: vec!["Up".into(), "Down".into()],
            asset_ids: vec![TokenId::from(asset), TokenId::from(format!("{asset}-no"))],
            start_date: None,
            end_date: None,
            tick_size: None,
            liquidity: Decimal::ZERO,
            order_min_size: Decimal::ZERO,
            tags: HashSet::new(),
        }
    }

    #[test]
    fn add_slug_is_idempotent_in_the_tracked_set() {
        let registry = Arc::new(MarketRegistry::new());
        let subs = Arc::new(SubscriptionState::new(vec![]));
        let subscriber = SlugSubscriber::new(registry, subs);
        subscriber.add_slug("will-it-rain");
        subscriber.add_slug("will-it-rain");
        assert_eq!(subscriber.get_slugs(), vec!["will-it-rain".to_string()]);
    }

    #[test]
    fn add_slug_resyncs_assets_once_market_is_registered() {
        let registry = Arc::new(MarketRegistry::new());
        registry.upsert(meta("will-it-rain", "a1"));
        let subs = Arc::new(SubscriptionState::new(vec![]));
        let subscriber = SlugSubscriber::new(registry, subs.clone());
        subscriber.add_slug("will-it-rain");
        let (assets, _) = subs.snapshot();
        assert_eq!(assets.len(), 2);
    }

    #[test]
    fn replace_all_drops_slugs_not_in_the_new_set() {
        let registry = Arc::new(MarketRegistry::new());
        let subs = Arc::new(SubscriptionState::new(vec![]));
        let subscriber = SlugSubscriber::new(registry, subs);
        subscriber.add_slug("a");
        subscriber.add_slug("b");
        subscriber.replace_all(vec!["b".to_string(), "c".to_string()]);
        let mut slugs = subscriber.get_slugs();
        slugs.sort();
        assert_eq!(slugs, vec!["b".to_string(), "c".to_string()]);
    }
}
