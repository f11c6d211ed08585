//! Notification transport boundary (chat message delivery) plus message
//! formatting for the kinds the subscribers emit.

pub mod format;
#[cfg(feature = "telegram")]
pub mod telegram;

use crate::domain::notification::Notification;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Discards notifications; used in tests and when no transport is
/// configured.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send(&self, _notification: &Notification) -> Result<()> {
        Ok(())
    }
}
