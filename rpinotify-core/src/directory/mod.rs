//! Recipient directory: where the dispatcher looks recipients up

mod file;
mod memory;
pub mod validation;

pub use file::{JsonFileDirectory, DEFAULT_REFRESH_INTERVAL};
pub use memory::InMemoryDirectory;
pub use validation::{is_valid_username, validate_username, UsernameValidationError};

use crate::error::DirectoryError;
use crate::launcher::Launcher;
use crate::models::Recipient;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Read access to the set of known recipients.
///
/// Every call must reflect the latest active/subscription state the implementation
/// knows of, since the dispatcher authorizes against it.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Snapshot of every known recipient.
    async fn all(&self) -> Result<Vec<Recipient>, DirectoryError>;

    async fn get_by_username(&self, username: &str) -> Result<Recipient, DirectoryError> {
        self.all()
            .await?
            .into_iter()
            .find(|r| r.username == username)
            .ok_or_else(|| {
                tracing::error!(username, "unknown username");
                DirectoryError::NotFound(username.to_string())
            })
    }

    async fn usernames(&self) -> Result<BTreeSet<String>, DirectoryError> {
        Ok(self.all().await?.into_iter().map(|r| r.username).collect())
    }

    /// Recipient whose Telegram launcher is bound to `chat_id`.
    async fn get_by_chat_id(&self, chat_id: i64) -> Result<Recipient, DirectoryError> {
        self.all()
            .await?
            .into_iter()
            .find(|r| matches!(&r.launcher, Launcher::Telegram(l) if l.chat_id() == Some(chat_id)))
            .ok_or_else(|| DirectoryError::NotFound(format!("chat_id {}", chat_id)))
    }
}
