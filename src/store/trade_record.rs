//! Trade Record Store (C3): historical trade records keyed by the
//! four-tuple `(market, asset, side, order_id)`, with a pub/sub events
//! channel analogous to the order request store.

use super::kv::KvStore;
use crate::domain::ids::{MarketId, Side, TokenId};
use crate::domain::order_request::OrderRequest;
use crate::domain::trade_record::TradeRecord;
use crate::error::{Error, Result};
use std::sync::Arc;

const RECORD_SET: &str = "trade_records:set";
const DOC_PREFIX: &str = "trade_records:doc:";
pub const EVENTS_CHANNEL: &str = "hunter:trade_records:events";

fn set_key(market_id: &MarketId, asset_id: &TokenId, side: Side, order_id: &str) -> String {
    format!("{market_id}:{asset_id}:{side}:{order_id}")
}

#[derive(Clone)]
pub struct TradeRecordStore {
    kv: Arc<KvStore>,
}

impl TradeRecordStore {
    #[must_use]
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self { kv }
    }

    #[must_use]
    pub fn contains(
        &self,
        market_id: &MarketId,
        asset_id: &TokenId,
        side: Side,
        order_id: &str,
    ) -> bool {
        self.kv
            .sismember(RECORD_SET, &set_key(market_id, asset_id, side, order_id))
    }

    /// Upsert. Publishes `{action, key, order_request, trade_record}`.
    pub fn add(&self, req: Option<&OrderRequest>, rec: &TradeRecord) -> Result<()> {
        let skey = rec.set_key();
        let dkey = format!("{DOC_PREFIX}{skey}");
        let raw_trade = serde_json::to_string(rec)?;
        let raw_order = req.map(serde_json::to_string).transpose()?;

        self.kv.sadd(RECORD_SET, &skey);
        self.kv.set_doc(&dkey, raw_trade.clone());

        self.kv.publish(serde_json::json!({
            "action": "add",
            "key": skey,
            "order_request": raw_order,
            "trade_record": raw_trade,
        }));
        Ok(())
    }

    pub fn get(
        &self,
        market_id: &MarketId,
        asset_id: &TokenId,
        side: Side,
        order_id: &str,
    ) -> Result<Option<TradeRecord>> {
        let dkey = format!(
            "{DOC_PREFIX}{}",
            set_key(market_id, asset_id, side, order_id)
        );
        match self.kv.get_doc(&dkey) {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn matches(
        key: &str,
        market_id: Option<&MarketId>,
        asset_id: Option<&TokenId>,
        side: Option<Side>,
    ) -> bool {
        let mut parts = key.splitn(4, ':');
        let (m, a, s) = (parts.next(), parts.next(), parts.next());
        if let Some(market_id) = market_id {
            if m != Some(market_id.as_str()) {
                return false;
            }
        }
        if let Some(asset_id) = asset_id {
            if a != Some(asset_id.as_str()) {
                return false;
            }
        }
        if let Some(side) = side {
            if s != Some(side.as_str()) {
                return false;
            }
        }
        true
    }

    fn scan(
        &self,
        market_id: Option<&MarketId>,
        asset_id: Option<&TokenId>,
        side: Option<Side>,
    ) -> Result<Vec<TradeRecord>> {
        self.kv
            .smembers(RECORD_SET)
            .into_iter()
            .filter(|k| Self::matches(k, market_id, asset_id, side))
            .filter_map(|k| self.kv.get_doc(&format!("{DOC_PREFIX}{k}")))
            .map(|raw| serde_json::from_str(&raw).map_err(Error::from))
            .collect()
    }

    /// The most recently updated record with `active = true` under the
    /// given prefix, or `None`.
    pub fn get_active(
        &self,
        market_id: &MarketId,
        asset_id: Option<&TokenId>,
        side: Option<Side>,
    ) -> Result<Option<TradeRecord>> {
        let mut best: Option<TradeRecord> = None;
        for rec in self.scan(Some(market_id), asset_id, side)? {
            if rec.active {
                match &best {
                    Some(cur) if cur.created_ts >= rec.created_ts => {}
                    _ => best = Some(rec),
                }
            }
        }
        Ok(best)
    }

    pub fn get_all(
        &self,
        market_id: Option<&MarketId>,
        asset_id: Option<&TokenId>,
        side: Option<Side>,
        sort_desc: bool,
    ) -> Result<Vec<TradeRecord>> {
        let mut items = self.scan(market_id, asset_id, side)?;
        items.sort_by(|a, b| {
            if sort_desc {
                b.created_ts
                    .partial_cmp(&a.created_ts)
                    .unwrap_or(std::cmp::Ordering::Equal)
            } else {
                a.created_ts
                    .partial_cmp(&b.created_ts)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }
        });
        Ok(items)
    }

    /// Simple upsert without add/update event differentiation.
    pub fn update(&self, rec: &TradeRecord) -> Result<()> {
        let skey = rec.set_key();
        let dkey = format!("{DOC_PREFIX}{skey}");
        let raw = serde_json::to_string(rec)?;
        self.kv.set_doc(&dkey, raw.clone());
        self.kv.publish(serde_json::json!({
            "action": "update",
            "key": skey,
            "trade_record": raw,
        }));
        Ok(())
    }

    pub fn remove(
        &self,
        market_id: &MarketId,
        asset_id: &TokenId,
        side: Side,
        order_id: &str,
    ) -> Result<()> {
        let skey = set_key(market_id, asset_id, side, order_id);
        let dkey = format!("{DOC_PREFIX}{skey}");
        let removed = self.kv.srem(RECORD_SET, &skey);
        self.kv.del_doc(&dkey);
        if removed {
            self.kv
                .publish(serde_json::json!({"action": "remove", "key": skey}));
        }
        Ok(())
    }

    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<serde_json::Value> {
        self.kv.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trade_record::TraderSide;
    use rust_decimal_macros::dec;

    fn sample(order_id: &str, active: bool, created_ts: f64) -> TradeRecord {
        TradeRecord {
            market_id: MarketId::from("m1"),
            asset_id: TokenId::from("a1"),
            side: Side::Buy,
            order_id: order_id.into(),
            transaction_hash: None,
            matched_amount: dec!(10),
            size: dec!(10),
            price: dec!(0.6),
            fee_rate_bps: dec!(0),
            trader_side: TraderSide::Taker,
            status: crate::domain::trade_record::TradeStatus::Matched,
            active,
            raw: serde_json::json!({}),
            matched_ts: None,
            created_ts,
            order_request_key: None,
        }
    }

    #[test]
    fn at_most_one_active_per_key_is_caller_enforced_and_get_active_finds_latest() {
        let store = TradeRecordStore::new(Arc::new(KvStore::new()));
        store.add(None, &sample("o1", true, 1.0)).unwrap();
        store.add(None, &sample("o2", true, 2.0)).unwrap();
        let active = store
            .get_active(
                &MarketId::from("m1"),
                Some(&TokenId::from("a1")),
                Some(Side::Buy),
            )
            .unwrap();
        assert_eq!(active.unwrap().order_id, "o2");
    }

    #[test]
    fn get_all_sorts_desc_by_default() {
        let store = TradeRecordStore::new(Arc::new(KvStore::new()));
        store.add(None, &sample("o1", false, 1.0)).unwrap();
        store.add(None, &sample("o2", false, 2.0)).unwrap();
        let all = store
            .get_all(Some(&MarketId::from("m1")), None, None, true)
            .unwrap();
        assert_eq!(all[0].order_id, "o2");
        assert_eq!(all[1].order_id, "o1");
    }
}
