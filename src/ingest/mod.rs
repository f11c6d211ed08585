//! Streaming ingestion pipeline: websocket connection → per-market actors
//! → handler routing.

pub mod actor;
pub mod actor_manager;
pub mod envelope;
pub mod handler;
pub mod registry;
pub mod router;
pub mod websocket;

pub use actor_manager::ActorManager;
pub use registry::MarketRegistry;
pub use router::MessageRouter;
pub use websocket::{StreamIngester, SubscriptionState};

use handler::HandlerState;
use std::sync::Arc;

/// Assembles the router from the four C8 handlers sharing one `HandlerState`.
#[must_use]
pub fn build_router(state: Arc<HandlerState>) -> MessageRouter {
    MessageRouter::new(vec![
        Box::new(handler::price::PriceChangeHandler::new(state.clone())),
        Box::new(handler::book::BookHandler::new(state.clone())),
        Box::new(handler::order::OrderHandler::new(state.clone())),
        Box::new(handler::trade::TradeHandler::new(state)),
    ])
}
