//! Launchers: the per-recipient delivery channels
//!
//! A launcher is a tagged union over the supported channels. Webhook-style launchers
//! (IFTTT, Notify.run) are best-effort: network failures are logged and reported as
//! [`DeliveryOutcome::SilentlyDropped`]. The Telegram launcher and the invalid launcher
//! return a [`DeliveryError`], which the dispatcher records as a failure.

mod telegram;
mod webhook;

pub use telegram::{ChatBotApi, TelegramBotApi, TelegramLauncher, TELEGRAM_API_BASE};
pub use webhook::{IftttLauncher, NotifyRunLauncher};

use crate::downloader::Downloader;
use crate::error::DeliveryError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;

/// Non-error result of firing a launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The channel accepted the notification.
    Delivered,
    /// Best-effort channel failed; the failure was logged and swallowed.
    SilentlyDropped { reason: String },
}

/// Shared delivery collaborators handed to every `fire` call.
#[derive(Clone)]
pub struct Transports {
    pub downloader: Arc<Downloader>,
    pub chat_bot: Option<Arc<dyn ChatBotApi>>,
}

impl Transports {
    pub fn new(downloader: Arc<Downloader>) -> Self {
        Self {
            downloader,
            chat_bot: None,
        }
    }

    pub fn with_chat_bot(mut self, chat_bot: Arc<dyn ChatBotApi>) -> Self {
        self.chat_bot = Some(chat_bot);
        self
    }
}

/// Delivery channel owned by a recipient.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Launcher {
    Ifttt(IftttLauncher),
    NotifyRun(NotifyRunLauncher),
    Telegram(TelegramLauncher),
    /// Configuration could not be parsed or was never set. Cannot fire.
    #[default]
    Invalid,
}

impl Launcher {
    /// Short identifier for logs and listings.
    pub fn kind(&self) -> &'static str {
        match self {
            Launcher::Ifttt(_) => "ifttt",
            Launcher::NotifyRun(_) => "notify_run",
            Launcher::Telegram(_) => "telegram",
            Launcher::Invalid => "invalid",
        }
    }

    /// Webhook launchers swallow their own failures, a timeout included.
    pub fn is_best_effort(&self) -> bool {
        matches!(self, Launcher::Ifttt(_) | Launcher::NotifyRun(_))
    }

    /// Send `title` and `message` through this launcher.
    pub async fn fire(
        &self,
        transports: &Transports,
        title: &str,
        message: &str,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        match self {
            Launcher::Ifttt(launcher) => {
                Ok(launcher.fire(&transports.downloader, title, message).await)
            }
            Launcher::NotifyRun(launcher) => {
                Ok(launcher.fire(&transports.downloader, title, message).await)
            }
            Launcher::Telegram(launcher) => launcher
                .fire(transports.chat_bot.as_deref(), title, message)
                .await
                .map(|()| DeliveryOutcome::Delivered),
            Launcher::Invalid => Err(DeliveryError::NotImplemented),
        }
    }

    /// Serialized configuration, as persisted by the recipient directory.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(LauncherRecord::from(self)).unwrap_or(Value::Null)
    }

    /// Rebuild a launcher from its serialized configuration.
    ///
    /// Never fails: anything unparseable degrades to [`Launcher::Invalid`].
    pub fn from_value(value: &Value) -> Self {
        match LauncherRecord::deserialize(value) {
            Ok(record) => record.into(),
            Err(e) => {
                tracing::warn!(config = %value, error = %e, "invalid launcher configuration");
                Launcher::Invalid
            }
        }
    }

    /// Rebuild a launcher from a JSON string. Malformed JSON yields [`Launcher::Invalid`].
    pub fn from_json_str(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                tracing::warn!(error = %e, "launcher configuration is not valid JSON");
                Launcher::Invalid
            }
        }
    }
}

impl Serialize for Launcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        LauncherRecord::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Launcher {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Launcher::from_value(&value))
    }
}

/// Persisted form: `{"type": "...", "config": ...}`.
#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum LauncherRecord {
    #[serde(rename = "IFTTT")]
    Ifttt {
        #[serde(alias = "url")]
        config: String,
    },
    #[serde(rename = "NotifyRun")]
    NotifyRun { config: String },
    #[serde(rename = "Telegram")]
    Telegram {
        #[serde(default, with = "chat_id_config")]
        config: Option<i64>,
    },
    #[serde(rename = "Invalid")]
    Invalid,
}

impl From<&Launcher> for LauncherRecord {
    fn from(launcher: &Launcher) -> Self {
        match launcher {
            Launcher::Ifttt(l) => LauncherRecord::Ifttt {
                config: l.url().to_string(),
            },
            Launcher::NotifyRun(l) => LauncherRecord::NotifyRun {
                config: l.url().to_string(),
            },
            Launcher::Telegram(l) => LauncherRecord::Telegram {
                config: l.chat_id(),
            },
            Launcher::Invalid => LauncherRecord::Invalid,
        }
    }
}

impl From<LauncherRecord> for Launcher {
    fn from(record: LauncherRecord) -> Self {
        match record {
            LauncherRecord::Ifttt { config } => Launcher::Ifttt(IftttLauncher::new(config)),
            LauncherRecord::NotifyRun { config } => {
                Launcher::NotifyRun(NotifyRunLauncher::new(config))
            }
            LauncherRecord::Telegram { config } => Launcher::Telegram(match config {
                Some(chat_id) => TelegramLauncher::new(chat_id),
                None => TelegramLauncher::unconfirmed(),
            }),
            LauncherRecord::Invalid => Launcher::Invalid,
        }
    }
}

/// Telegram chat ids are stored as strings; an empty string means "not confirmed yet".
mod chat_id_config {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(chat_id: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match chat_id {
            Some(id) => serializer.serialize_str(&id.to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("chat id out of range: {}", n))),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("chat id is not numeric: {:?}", s))),
            other => Err(D::Error::custom(format!("unexpected chat id: {}", other))),
        }
    }
}
