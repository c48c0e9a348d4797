//! Configuration data structures

use crate::downloader::DownloaderConfig;
use crate::launcher::TELEGRAM_API_BASE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the Telegram bot token. The token is never stored in
/// the configuration file.
pub const TELEGRAM_TOKEN_ENV: &str = "RPINOTIFY_TELEGRAM_BOT_TOKEN";

/// Logging level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "info")]
    #[default]
    Info,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "trace")]
    Trace,
}

/// Downloader retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloaderSettings {
    /// Attempts per request before giving up
    pub retries: u32,
    /// Pause between attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Per-attempt timeout in seconds
    pub request_timeout_seconds: u64,
}

impl Default for DownloaderSettings {
    fn default() -> Self {
        Self {
            retries: crate::downloader::DEFAULT_RETRIES,
            retry_delay_ms: 0,
            request_timeout_seconds: 30,
        }
    }
}

/// Telegram bot settings (token comes from the environment)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub enabled: bool,
    pub api_base: String,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Logging verbosity level
    pub log_level: LogLevel,
    /// Recipient directory file
    pub directory_path: PathBuf,
    /// Maximum age of the cached recipient directory
    pub directory_refresh_seconds: u64,
    /// Per-recipient delivery timeout
    pub delivery_timeout_seconds: u64,
    /// Skip every delivery unless forced
    pub notifications_disabled: bool,
    pub downloader: DownloaderSettings,
    pub telegram: TelegramSettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            directory_path: default_config_dir().join("recipients.json"),
            directory_refresh_seconds: 60,
            delivery_timeout_seconds: 30,
            // Notifications are off on Windows development machines.
            notifications_disabled: cfg!(windows),
            downloader: DownloaderSettings::default(),
            telegram: TelegramSettings::default(),
        }
    }
}

impl Configuration {
    /// Load configuration from file
    pub fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Configuration = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Return default configuration if file doesn't exist
            Ok(Configuration::default())
        }
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn default_config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_dir = dirs::config_dir().ok_or("Could not determine config directory")?;
        Ok(config_dir.join("rpinotify").join("config.toml"))
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_seconds)
    }

    pub fn directory_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.directory_refresh_seconds)
    }

    pub fn downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig {
            retries: self.downloader.retries,
            retry_delay: Duration::from_millis(self.downloader.retry_delay_ms),
            request_timeout: Duration::from_secs(self.downloader.request_timeout_seconds),
        }
    }

    /// Bot token from the environment, if Telegram is enabled and the token is set.
    pub fn telegram_token(&self) -> Option<String> {
        if !self.telegram.enabled {
            return None;
        }
        std::env::var(TELEGRAM_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.delivery_timeout_seconds == 0 || self.delivery_timeout_seconds > 600 {
            errors.push("delivery_timeout_seconds must be between 1 and 600".to_string());
        }

        if self.directory_refresh_seconds > 86400 {
            errors.push("directory_refresh_seconds cannot exceed 86400 (1 day)".to_string());
        }

        if self.downloader.retries == 0 || self.downloader.retries > 50 {
            errors.push("downloader.retries must be between 1 and 50".to_string());
        }

        if self.downloader.request_timeout_seconds == 0 {
            errors.push("downloader.request_timeout_seconds must be at least 1".to_string());
        }

        match url::Url::parse(&self.telegram.api_base) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
            _ => errors.push("telegram.api_base must be an http(s) URL".to_string()),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rpinotify")
}
