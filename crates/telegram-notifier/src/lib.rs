//! Telegram delivery of the run digest. One synchronous send per run; the
//! pipeline owns no retry policy for this channel.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use radar_core::{NotificationSink, RadarError};

pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    client: Client,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            bot_token,
            chat_id,
            client: Client::new(),
        }
    }

    /// Construct from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID` when both
    /// are present.
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|s| !s.trim().is_empty())?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID")
            .ok()
            .filter(|s| !s.trim().is_empty())?;
        Some(Self::new(bot_token.trim().to_string(), chat_id.trim().to_string()))
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), RadarError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| RadarError::Notify(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RadarError::Notify(format!(
                "Telegram HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        tracing::debug!("Digest delivered to Telegram chat {}", self.chat_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_message_payload_shape() {
        let payload = SendMessage {
            chat_id: "12345",
            text: "hello",
            disable_web_page_preview: true,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["chat_id"], "12345");
        assert_eq!(json["text"], "hello");
        assert_eq!(json["disable_web_page_preview"], true);
    }
}
