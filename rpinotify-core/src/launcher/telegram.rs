//! Telegram chat bot: Bot API client and the per-recipient launcher

use crate::error::{ChatApiError, DeliveryError};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Outbound chat bot API used by the Telegram launcher.
#[async_trait]
pub trait ChatBotApi: Send + Sync {
    /// Provider name for logging (e.g. "telegram").
    fn name(&self) -> &str;

    /// Send `text` to the chat identified by `chat_id`.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), ChatApiError>;
}

/// Telegram Bot API client (sendMessage). Never log the token.
pub struct TelegramBotApi {
    token: String,
    api_base: String,
    client: Arc<Client>,
}

impl TelegramBotApi {
    pub fn new(token: String) -> Self {
        Self {
            token,
            api_base: TELEGRAM_API_BASE.to_string(),
            client: Arc::new(Client::new()),
        }
    }

    /// Point the client at another API host (self-hosted Bot API server, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }
}

#[async_trait]
impl ChatBotApi for TelegramBotApi {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), ChatApiError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        let res = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(ChatApiError::Status { status, body });
        }
        Ok(())
    }
}

/// Telegram launcher. A recipient that has not finished registration has no chat id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramLauncher {
    chat_id: Option<i64>,
}

impl TelegramLauncher {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id: Some(chat_id),
        }
    }

    /// Launcher for a recipient whose chat id is not resolved yet.
    pub fn unconfirmed() -> Self {
        Self { chat_id: None }
    }

    pub fn chat_id(&self) -> Option<i64> {
        self.chat_id
    }

    pub fn is_confirmed(&self) -> bool {
        self.chat_id.is_some()
    }

    fn format_message(title: &str, message: &str) -> String {
        format!("{}:\n{}", title, message)
    }

    /// Send `title:\nmessage` to the recipient's chat.
    pub async fn fire(
        &self,
        chat_bot: Option<&dyn ChatBotApi>,
        title: &str,
        message: &str,
    ) -> Result<(), DeliveryError> {
        let chat_id = self.chat_id.ok_or_else(|| {
            tracing::error!("user not confirmed");
            DeliveryError::UserNotConfirmed
        })?;
        let bot = chat_bot.ok_or(DeliveryError::ChatBotUnavailable)?;

        let text = Self::format_message(title, message);
        bot.send_message(chat_id, &text).await.map_err(|e| {
            tracing::error!(provider = bot.name(), chat_id, error = %e, "chat bot delivery failed");
            DeliveryError::ChatApi(e.to_string())
        })?;
        tracing::debug!(provider = bot.name(), chat_id, "launcher fired");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    struct RecordingBot {
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl ChatBotApi for RecordingBot {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), ChatApiError> {
            self.sent.lock().await.push((chat_id, text.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_telegram_bot_name() {
        let bot = TelegramBotApi::new("token".into());
        assert_eq!(bot.name(), "telegram");
    }

    #[test]
    fn test_method_url_uses_api_base() {
        let bot = TelegramBotApi::new("abc".into()).with_api_base("http://127.0.0.1:9000/");
        assert_eq!(
            bot.method_url("sendMessage"),
            "http://127.0.0.1:9000/botabc/sendMessage"
        );
    }

    #[tokio::test]
    async fn test_fire_formats_title_and_message() {
        let bot = RecordingBot {
            sent: Mutex::new(Vec::new()),
        };
        let launcher = TelegramLauncher::new(7);
        launcher
            .fire(Some(&bot), "Weather", "rain\ntomorrow")
            .await
            .unwrap();

        let sent = bot.sent.lock().await;
        assert_eq!(sent.as_slice(), &[(7, "Weather:\nrain\ntomorrow".to_string())]);
    }

    #[tokio::test]
    async fn test_unconfirmed_user_fails_before_contacting_bot() {
        let bot = RecordingBot {
            sent: Mutex::new(Vec::new()),
        };
        let err = TelegramLauncher::unconfirmed()
            .fire(Some(&bot), "t", "m")
            .await
            .unwrap_err();
        assert_eq!(err, DeliveryError::UserNotConfirmed);
        assert!(bot.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_bot_is_reported() {
        let err = TelegramLauncher::new(1).fire(None, "t", "m").await.unwrap_err();
        assert_eq!(err, DeliveryError::ChatBotUnavailable);
    }
}
