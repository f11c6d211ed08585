//! Lazily creates one `MarketActor` per market key on first event.

use super::actor::MarketActor;
use super::envelope::MsgEnvelope;
use super::router::MessageRouter;
use dashmap::DashMap;
use std::sync::Arc;

pub struct ActorManager {
    actors: DashMap<String, Arc<MarketActor>>,
    router: Arc<MessageRouter>,
    shutdown: tokio::sync::watch::Sender<bool>,
}

impl ActorManager {
    #[must_use]
    pub fn new(router: Arc<MessageRouter>) -> Self {
        let (shutdown, _rx) = tokio::sync::watch::channel(false);
        Self {
            actors: DashMap::new(),
            router,
            shutdown,
        }
    }

    /// Route an envelope to its market's actor, creating it (and spawning
    /// its run loop) if this is the first event for that market.
    pub fn post(&self, envelope: MsgEnvelope) {
        let actor = self
            .actors
            .entry(envelope.market.clone())
            .or_insert_with(|| {
                let actor = Arc::new(MarketActor::new(
                    envelope.market.clone(),
                    self.router.clone(),
                ));
                let rx = self.shutdown.subscribe();
                tokio::spawn(actor.clone().run(rx));
                actor
            })
            .clone();
        actor.post(envelope);
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    #[must_use]
    pub fn market_count(&self) -> usize {
        self.actors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_one_actor_per_distinct_market() {
        let router = Arc::new(MessageRouter::new(vec![]));
        let manager = ActorManager::new(router);
        manager.post(MsgEnvelope {
            market: "m1".into(),
            timestamp: 1,
            event_type: "price_change".into(),
            payload: serde_json::json!({}),
        });
        manager.post(MsgEnvelope {
            market: "m2".into(),
            timestamp: 1,
            event_type: "price_change".into(),
            payload: serde_json::json!({}),
        });
        manager.post(MsgEnvelope {
            market: "m1".into(),
            timestamp: 2,
            event_type: "price_change".into(),
            payload: serde_json::json!({}),
        });
        assert_eq!(manager.market_count(), 2);
        manager.shutdown();
    }
}
