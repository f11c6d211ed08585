//! Streaming ingester (C6): one outbound connection, heartbeat-monitored,
//! reconnecting with exponential backoff, demuxing every frame to its
//! market's actor.

use super::actor_manager::ActorManager;
use super::envelope::parse_frame;
use crate::error::Result;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const PING_INTERVAL: Duration = Duration::from_secs(20);
const PONG_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const INCOMING_QUEUE: usize = 1000;
/// Close code the ingester sends itself to force a reconnect after a
/// slug-set change, mirroring the upstream resubscribe signal.
const RESUBSCRIBE_CLOSE_CODE: u16 = 4000;

/// Tracks the asset-id set the ingester subscribes with. Updates are
/// serialized by the inner mutex so concurrent slug-set changes can't race,
/// and bump a generation counter the run loop polls to trigger a tear-down.
pub struct SubscriptionState {
    assets: Mutex<Vec<String>>,
    generation: AtomicU64,
}

impl SubscriptionState {
    #[must_use]
    pub fn new(assets: Vec<String>) -> Self {
        Self {
            assets: Mutex::new(assets),
            generation: AtomicU64::new(0),
        }
    }

    pub fn replace(&self, assets: Vec<String>) {
        *self.assets.lock() = assets;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self) -> (Vec<String>, u64) {
        (
            self.assets.lock().clone(),
            self.generation.load(Ordering::SeqCst),
        )
    }
}

pub struct StreamIngester {
    url: String,
    subscriptions: Arc<SubscriptionState>,
    actors: Arc<ActorManager>,
}

impl StreamIngester {
    #[must_use]
    pub fn new(
        url: String,
        subscriptions: Arc<SubscriptionState>,
        actors: Arc<ActorManager>,
    ) -> Self {
        Self {
            url,
            subscriptions,
            actors,
        }
    }

    /// Runs until `shutdown` fires, reconnecting on every drop or
    /// resubscribe teardown. Backoff resets to zero on each successful
    /// connect.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        let mut backoff = Duration::from_millis(250);
        loop {
            if *shutdown.borrow() {
                return;
            }
            match self.run_once(shutdown.clone()).await {
                Ok(()) => backoff = Duration::from_millis(250),
                Err(err) => {
                    warn!(error = %err, backoff_ms = backoff.as_millis(), "ingester connection failed, retrying");
                }
            }
            if *shutdown.borrow() {
                return;
            }
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    async fn run_once(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let (mut ws, _response) = tokio_tungstenite::connect_async(&self.url).await?;
        info!(url = %self.url, "ingester connected");

        let (assets, generation) = self.subscriptions.snapshot();
        let sub_frame = serde_json::json!({ "assets_ids": assets, "type": "market" });
        ws.send(Message::Text(sub_frame.to_string())).await?;

        let mut ping_interval = tokio::time::interval(PING_INTERVAL);
        let mut last_pong = tokio::time::Instant::now();
        let mut malformed = 0u64;
        let mut dropped = 0u64;

        // Decouples socket reads from per-market demuxing: a slow actor
        // mailbox must never stall the ping/pong loop and trip a reconnect.
        let (incoming_tx, mut incoming_rx) = tokio::sync::mpsc::channel(INCOMING_QUEUE);
        let actors = self.actors.clone();
        let _demux = tokio::spawn(async move {
            while let Some(event) = incoming_rx.recv().await {
                actors.post(event);
            }
        });

        loop {
            tokio::select! {
                _ = ping_interval.tick() => {
                    if last_pong.elapsed() > PONG_TIMEOUT {
                        warn!("pong timeout, forcing reconnect");
                        return Ok(());
                    }
                    ws.send(Message::Ping(Vec::new())).await?;
                }
                msg = ws.next() => {
                    let Some(msg) = msg else {
                        return Ok(());
                    };
                    match msg {
                        Ok(Message::Text(text)) => {
                            let events = parse_frame(&text);
                            if events.is_empty() {
                                malformed += 1;
                                debug!(malformed, "frame produced no events");
                            }
                            for event in events {
                                if incoming_tx.try_send(event).is_err() {
                                    dropped += 1;
                                    warn!(dropped, "incoming queue full, dropping event");
                                }
                            }
                        }
                        Ok(Message::Pong(_)) => {
                            last_pong = tokio::time::Instant::now();
                        }
                        Ok(Message::Ping(payload)) => {
                            ws.send(Message::Pong(payload)).await?;
                        }
                        Ok(Message::Close(frame)) => {
                            info!(frame = ?frame, "ingester connection closed");
                            return Ok(());
                        }
                        Ok(_) => {}
                        Err(err) => return Err(err.into()),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        let _ = ws.close(Some(tokio_tungstenite::tungstenite::protocol::CloseFrame {
                            code: tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode::Normal,
                            reason: "shutdown".into(),
                        })).await;
                        return Ok(());
                    }
                }
            }

            let (_, current_generation) = self.subscriptions.snapshot();
            if current_generation != generation {
                let _ = ws.close(Some(tokio_tungstenite::tungstenite::protocol::CloseFrame {
                    code: tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode::Library(RESUBSCRIBE_CLOSE_CODE),
                    reason: "resubscribe".into(),
                })).await;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_replace_bumps_generation() {
        let state = SubscriptionState::new(vec!["a1".into()]);
        let (_, gen0) = state.snapshot();
        state.replace(vec!["a1".into(), "a2".into()]);
        let (assets, gen1) = state.snapshot();
        assert_ne!(gen0, gen1);
        assert_eq!(assets.len(), 2);
    }

    #[test]
    fn incoming_queue_constant_matches_spec_bound() {
        assert_eq!(INCOMING_QUEUE, 1000);
    }
}
