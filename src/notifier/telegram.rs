//! Telegram chat transport, the one notification adapter this agent ships.

use super::Notifier;
use crate::domain::notification::{Notification, Severity};
use crate::error::{Error, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::warn;

pub struct TelegramNotifier {
    bot: Bot,
    default_chat_id: ChatId,
}

impl TelegramNotifier {
    #[must_use]
    pub fn new(token: String, default_chat_id: i64) -> Self {
        Self {
            bot: Bot::new(token),
            default_chat_id: ChatId(default_chat_id),
        }
    }

    fn target_chat(&self, target: &str) -> ChatId {
        target
            .parse::<i64>()
            .map(ChatId)
            .unwrap_or(self.default_chat_id)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let chat_id = self.target_chat(&notification.target);
        let prefix = match notification.severity {
            Severity::Info => "",
            Severity::Warning => "⚠️ ",
            Severity::Error => "🛑 ",
        };
        let text = format!("{prefix}{}", notification.text);
        if let Err(err) = self.bot.send_message(chat_id, text).await {
            warn!(error = %err, key = %notification.key, "telegram send failed");
            return Err(Error::Notification(err.to_string()));
        }
        Ok(())
    }
}
