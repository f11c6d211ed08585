//! Order Request Store (C2): the set of active `(market, asset, side)`
//! order intents, their JSON docs, and a pub/sub events channel.

use super::kv::KvStore;
use crate::domain::ids::{MarketId, Side, TokenId};
use crate::domain::order_request::OrderRequest;
use crate::error::{Error, Result};
use std::sync::Arc;

const ACTIVE_SET: &str = "order_requests:active_set";
const DOC_PREFIX: &str = "order_requests:doc:";
pub const EVENTS_CHANNEL: &str = "hunter:order_requests:events";

fn set_key(market_id: &MarketId, asset_id: &TokenId, side: Side) -> String {
    format!("{market_id}:{asset_id}:{side}")
}

fn doc_key(market_id: &MarketId, asset_id: &TokenId, side: Side) -> String {
    format!("{DOC_PREFIX}{}", set_key(market_id, asset_id, side))
}

#[derive(Clone)]
pub struct OrderRequestStore {
    kv: Arc<KvStore>,
}

impl OrderRequestStore {
    #[must_use]
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self { kv }
    }

    /// `SADD + SET`; publishes `add` if the set key was new, else `update`.
    pub fn add(&self, req: &OrderRequest) -> Result<()> {
        let skey = set_key(&req.market_id, &req.asset_id, req.side);
        let dkey = doc_key(&req.market_id, &req.asset_id, req.side);
        let raw = serde_json::to_string(req)?;

        let added = self.kv.sadd(ACTIVE_SET, &skey);
        self.kv.set_doc(&dkey, raw.clone());

        let action = if added { "add" } else { "update" };
        self.kv.publish(serde_json::json!({
            "action": action,
            "key": skey,
            "order": raw,
        }));
        Ok(())
    }

    pub fn get(
        &self,
        market_id: &MarketId,
        asset_id: &TokenId,
        side: Side,
    ) -> Result<Option<OrderRequest>> {
        let dkey = doc_key(market_id, asset_id, side);
        match self.kv.get_doc(&dkey) {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn update(&self, req: &OrderRequest) -> Result<()> {
        let skey = set_key(&req.market_id, &req.asset_id, req.side);
        let dkey = doc_key(&req.market_id, &req.asset_id, req.side);
        let raw = serde_json::to_string(req)?;
        self.kv.set_doc(&dkey, raw.clone());
        self.kv.publish(serde_json::json!({
            "action": "update",
            "key": skey,
            "order": raw,
        }));
        Ok(())
    }

    /// `SREM + DEL`; publishes `remove` only if the set member was present.
    pub fn remove(&self, market_id: &MarketId, asset_id: &TokenId, side: Side) -> Result<()> {
        let skey = set_key(market_id, asset_id, side);
        let dkey = doc_key(market_id, asset_id, side);
        let removed = self.kv.srem(ACTIVE_SET, &skey);
        self.kv.del_doc(&dkey);
        if removed {
            self.kv.publish(serde_json::json!({
                "action": "remove",
                "key": skey,
            }));
        }
        Ok(())
    }

    #[must_use]
    pub fn list_keys(&self) -> Vec<String> {
        self.kv.smembers(ACTIVE_SET)
    }

    pub fn list_docs(&self) -> Result<Vec<OrderRequest>> {
        self.list_keys()
            .into_iter()
            .filter_map(|k| self.kv.get_doc(&format!("{DOC_PREFIX}{k}")))
            .map(|raw| serde_json::from_str(&raw).map_err(Error::from))
            .collect()
    }

    /// Remove set members whose doc key is absent.
    pub fn cleanup_stale_pointers(&self) -> usize {
        self.kv.cleanup_stale_pointers(ACTIVE_SET, DOC_PREFIX)
    }

    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<serde_json::Value> {
        self.kv.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::MarketContext;
    use crate::domain::order_request::{OrderType, RequestSource, Tif};
    use rust_decimal_macros::dec;
    use std::collections::{HashMap, HashSet};

    fn sample_request() -> OrderRequest {
        OrderRequest {
            market_id: MarketId::from("m1"),
            asset_id: TokenId::from("a1"),
            side: Side::Buy,
            price: dec!(0.6),
            size: dec!(10),
            tif: Tif::Gtc,
            order_type: OrderType::Limit,
            request_source: RequestSource::StrategyEnter,
            strategy: "trend".into(),
            rule: "enter_up".into(),
            context: MarketContext {
                market_id: MarketId::from("m1"),
                slug: "s".into(),
                start_date: None,
                end_date: None,
                liquidity: dec!(0),
                spread: dec!(0),
                outcomes: vec![],
                outcome_prices: HashMap::new(),
                outcome_assets: HashMap::new(),
                outcome_trends: HashMap::new(),
                tags: HashSet::new(),
                event_ts: 0.0,
                order_min_size: dec!(5),
            },
            created_ts: 0.0,
        }
    }

    #[test]
    fn add_then_get_round_trips() {
        let store = OrderRequestStore::new(Arc::new(KvStore::new()));
        let req = sample_request();
        store.add(&req).unwrap();
        let got = store.get(&req.market_id, &req.asset_id, req.side).unwrap();
        assert_eq!(got.unwrap().price, req.price);
    }

    #[test]
    fn second_add_is_update_and_leaves_set_unchanged() {
        let store = OrderRequestStore::new(Arc::new(KvStore::new()));
        let req = sample_request();
        store.add(&req).unwrap();
        let before = store.list_keys();
        store.add(&req).unwrap();
        let after = store.list_keys();
        assert_eq!(before, after);
    }

    #[test]
    fn cleanup_is_noop_right_after_add() {
        let store = OrderRequestStore::new(Arc::new(KvStore::new()));
        let req = sample_request();
        store.add(&req).unwrap();
        assert_eq!(store.cleanup_stale_pointers(), 0);
    }

    #[test]
    fn remove_clears_doc_and_set() {
        let store = OrderRequestStore::new(Arc::new(KvStore::new()));
        let req = sample_request();
        store.add(&req).unwrap();
        store
            .remove(&req.market_id, &req.asset_id, req.side)
            .unwrap();
        assert!(store
            .get(&req.market_id, &req.asset_id, req.side)
            .unwrap()
            .is_none());
        assert!(store.list_keys().is_empty());
    }
}
