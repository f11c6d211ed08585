//! Handler routing (C8): an ordered list of handlers, each declaring the
//! event types it consumes. Handlers run sequentially within a tick;
//! errors are logged and swallowed so they never crash the actor.

use super::envelope::MsgEnvelope;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait Handler: Send + Sync {
    fn event_types(&self) -> &[&str];
    async fn handle(&self, envelope: &MsgEnvelope) -> Result<()>;
}

pub struct MessageRouter {
    handlers: Vec<Box<dyn Handler>>,
    per_handler_timeout: Option<Duration>,
}

impl MessageRouter {
    #[must_use]
    pub fn new(handlers: Vec<Box<dyn Handler>>) -> Self {
        Self {
            handlers,
            per_handler_timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.per_handler_timeout = Some(timeout);
        self
    }

    pub async fn dispatch(&self, envelope: &MsgEnvelope) -> Result<()> {
        let mut matched = false;
        for handler in &self.handlers {
            if !handler
                .event_types()
                .contains(&envelope.event_type.as_str())
            {
                continue;
            }
            matched = true;
            let result = match self.per_handler_timeout {
                Some(timeout) => {
                    match tokio::time::timeout(timeout, handler.handle(envelope)).await {
                        Ok(res) => res,
                        Err(_) => {
                            warn!(market = %envelope.market, event_type = %envelope.event_type, "handler timed out");
                            continue;
                        }
                    }
                }
                None => handler.handle(envelope).await,
            };
            if let Err(err) = result {
                warn!(market = %envelope.market, event_type = %envelope.event_type, error = %err, "handler error");
            }
        }
        if !matched {
            debug!(market = %envelope.market, event_type = %envelope.event_type, "no handler matched");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FailingHandler;
    #[async_trait]
    impl Handler for FailingHandler {
        fn event_types(&self) -> &[&str] {
            &["price_change"]
        }
        async fn handle(&self, _envelope: &MsgEnvelope) -> Result<()> {
            Err(crate::error::Error::Other("boom".into()))
        }
    }

    struct CountingHandler(Arc<AtomicUsize>);
    #[async_trait]
    impl Handler for CountingHandler {
        fn event_types(&self) -> &[&str] {
            &["price_change"]
        }
        async fn handle(&self, _envelope: &MsgEnvelope) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn envelope() -> MsgEnvelope {
        MsgEnvelope {
            market: "m".into(),
            timestamp: 1,
            event_type: "price_change".into(),
            payload: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn handler_errors_are_swallowed_and_do_not_stop_dispatch() {
        let count = Arc::new(AtomicUsize::new(0));
        let router = MessageRouter::new(vec![
            Box::new(FailingHandler),
            Box::new(CountingHandler(count.clone())),
        ]);
        router.dispatch(&envelope()).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unmatched_event_type_is_a_noop() {
        let router = MessageRouter::new(vec![Box::new(FailingHandler)]);
        let mut unmatched = envelope();
        unmatched.event_type = "book".into();
        router.dispatch(&unmatched).await.unwrap();
    }
}
