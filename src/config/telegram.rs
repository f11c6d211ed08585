use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(skip)]
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}
