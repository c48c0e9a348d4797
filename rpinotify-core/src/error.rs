//! Error types shared across the notification engine

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Caller-input errors raised by the dispatcher before any delivery starts.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("necessary argument missing: {0}")]
    NecessaryArgument(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("unknown username: {0:?}")]
    RecipientNotFound(String),

    #[error("destinations must be a username or a list of usernames, not {0}")]
    InvalidDestination(String),

    #[error("recipient directory unavailable: {0}")]
    Directory(#[from] DirectoryError),
}

/// Errors that propagate out of `Launcher::fire` and land in the failure list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("launcher is not implemented (invalid or unset configuration)")]
    NotImplemented,

    #[error("user not confirmed: no chat id resolved")]
    UserNotConfirmed,

    #[error("chat bot is not configured")]
    ChatBotUnavailable,

    #[error("chat bot api error: {0}")]
    ChatApi(String),

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("delivery task aborted: {0}")]
    Aborted(String),
}

/// Errors from the shared HTTP downloader.
#[derive(Error, Debug)]
pub enum DownloaderError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{method} {url}: max retries failed after {attempts} attempts")]
    RetriesExhausted {
        method: &'static str,
        url: String,
        attempts: u32,
    },

    #[error("{method} {url}: {source}")]
    Request {
        method: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors from the chat bot API client.
#[derive(Error, Debug)]
pub enum ChatApiError {
    #[error("telegram api error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("telegram transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors from a recipient directory.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("recipient directory not found ({0})")]
    Missing(PathBuf),

    #[error("failed to access recipient directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse recipient directory {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown username: {0:?}")]
    NotFound(String),
}
