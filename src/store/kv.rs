//! In-process key-value + pub/sub substrate (C1).
//!
//! Backs the order request and trade record stores with the same shape a
//! Redis-backed deployment would use (named sets, keyed JSON documents, a
//! broadcast channel per store) so a future swap to a real KV server is a
//! drop-in behind the same call sites. Best-effort: pub/sub delivery is
//! lossy by design (see module docs on subscribers reconciling on startup);
//! durability lives in the relational sink, not here.

use dashmap::{DashMap, DashSet};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// A keyed-document store with named sets and a pub/sub event channel.
/// One instance backs one logical Redis-style keyspace (e.g. order requests
/// or trade records); each store module owns its own `KvStore`.
pub struct KvStore {
    sets: DashMap<String, DashSet<String>>,
    docs: DashMap<String, String>,
    events: broadcast::Sender<serde_json::Value>,
}

impl Default for KvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            sets: DashMap::new(),
            docs: DashMap::new(),
            events: tx,
        }
    }

    /// Add `member` to `set`. Returns `true` if it was newly added.
    pub fn sadd(&self, set: &str, member: &str) -> bool {
        self.sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string())
    }

    /// Remove `member` from `set`. Returns `true` if it was present.
    pub fn srem(&self, set: &str, member: &str) -> bool {
        self.sets
            .get(set)
            .map(|s| s.remove(member).is_some())
            .unwrap_or(false)
    }

    #[must_use]
    pub fn sismember(&self, set: &str, member: &str) -> bool {
        self.sets.get(set).is_some_and(|s| s.contains(member))
    }

    #[must_use]
    pub fn smembers(&self, set: &str) -> Vec<String> {
        self.sets
            .get(set)
            .map(|s| s.iter().map(|m| m.clone()).collect())
            .unwrap_or_default()
    }

    pub fn set_doc(&self, key: &str, value: String) {
        self.docs.insert(key.to_string(), value);
    }

    #[must_use]
    pub fn get_doc(&self, key: &str) -> Option<String> {
        self.docs.get(key).map(|v| v.clone())
    }

    pub fn del_doc(&self, key: &str) -> bool {
        self.docs.remove(key).is_some()
    }

    /// Remove set members whose corresponding doc key is absent. Returns
    /// the number of stale pointers removed.
    pub fn cleanup_stale_pointers(&self, set: &str, doc_prefix: &str) -> usize {
        let members = self.smembers(set);
        let mut removed = 0;
        for member in members {
            let doc_key = format!("{doc_prefix}{member}");
            if !self.docs.contains_key(&doc_key) {
                self.srem(set, &member);
                removed += 1;
            }
        }
        removed
    }

    pub fn publish(&self, event: serde_json::Value) {
        // No active subscribers is not an error; best-effort delivery only.
        let _ = self.events.send(event);
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<serde_json::Value> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sadd_reports_novelty_and_sismember_reflects_it() {
        let kv = KvStore::new();
        assert!(kv.sadd("s", "k1"));
        assert!(!kv.sadd("s", "k1"));
        assert!(kv.sismember("s", "k1"));
    }

    #[test]
    fn cleanup_stale_pointers_removes_dangling_set_members() {
        let kv = KvStore::new();
        kv.sadd("s", "k1");
        kv.sadd("s", "k2");
        kv.set_doc("doc:k1", "{}".into());
        let removed = kv.cleanup_stale_pointers("s", "doc:");
        assert_eq!(removed, 1);
        assert!(kv.sismember("s", "k1"));
        assert!(!kv.sismember("s", "k2"));
    }

    #[test]
    fn cleanup_is_noop_immediately_after_add() {
        let kv = KvStore::new();
        kv.sadd("s", "k1");
        kv.set_doc("doc:k1", "{}".into());
        assert_eq!(kv.cleanup_stale_pointers("s", "doc:"), 0);
    }

    #[tokio::test]
    async fn publish_is_received_by_subscriber() {
        let kv = KvStore::new();
        let mut rx = kv.subscribe();
        kv.publish(serde_json::json!({"action": "add"}));
        let msg = rx.recv().await.unwrap();
        assert_eq!(msg["action"], "add");
    }
}
