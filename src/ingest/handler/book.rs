//! Book handler (C8): descriptive depth logging only, same scope as the
//! original Python handler it replaces.

use super::HandlerState;
use crate::ingest::envelope::MsgEnvelope;
use crate::ingest::router::Handler;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct BookHandler {
    #[allow(dead_code)]
    state: Arc<HandlerState>,
}

impl BookHandler {
    #[must_use]
    pub fn new(state: Arc<HandlerState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Handler for BookHandler {
    fn event_types(&self) -> &[&str] {
        &["book"]
    }

    async fn handle(&self, envelope: &MsgEnvelope) -> crate::error::Result<()> {
        debug!(market = %envelope.market, "book depth update");
        Ok(())
    }
}
