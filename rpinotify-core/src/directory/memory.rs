//! In-memory recipient directory

use super::RecipientDirectory;
use crate::error::DirectoryError;
use crate::models::Recipient;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Directory held entirely in memory. Mutations are visible to the next lookup.
#[derive(Default)]
pub struct InMemoryDirectory {
    recipients: RwLock<Vec<Recipient>>,
}

impl InMemoryDirectory {
    pub fn new(recipients: Vec<Recipient>) -> Self {
        let mut list = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            upsert(&mut list, recipient);
        }
        Self {
            recipients: RwLock::new(list),
        }
    }

    /// Insert a recipient, replacing any record with the same username.
    pub async fn insert(&self, recipient: Recipient) {
        upsert(&mut *self.recipients.write().await, recipient);
    }

    pub async fn remove(&self, username: &str) -> Option<Recipient> {
        let mut guard = self.recipients.write().await;
        let pos = guard.iter().position(|r| r.username == username)?;
        Some(guard.remove(pos))
    }

    /// Ban or unban a recipient.
    pub async fn set_active(&self, username: &str, active: bool) -> Result<(), DirectoryError> {
        self.update(username, |r| r.is_active = active).await
    }

    pub async fn subscribe(&self, username: &str, service: &str) -> Result<(), DirectoryError> {
        let service = service.to_uppercase();
        self.update(username, move |r| {
            r.services.insert(service);
        })
        .await
    }

    pub async fn unsubscribe(&self, username: &str, service: &str) -> Result<(), DirectoryError> {
        let service = service.to_uppercase();
        self.update(username, move |r| {
            r.services.remove(&service);
        })
        .await
    }

    async fn update<F>(&self, username: &str, f: F) -> Result<(), DirectoryError>
    where
        F: FnOnce(&mut Recipient),
    {
        let mut guard = self.recipients.write().await;
        let recipient = guard
            .iter_mut()
            .find(|r| r.username == username)
            .ok_or_else(|| DirectoryError::NotFound(username.to_string()))?;
        f(recipient);
        Ok(())
    }
}

fn upsert(list: &mut Vec<Recipient>, recipient: Recipient) {
    match list.iter_mut().find(|r| r.username == recipient.username) {
        Some(existing) => *existing = recipient,
        None => list.push(recipient),
    }
}

#[async_trait]
impl RecipientDirectory for InMemoryDirectory {
    async fn all(&self) -> Result<Vec<Recipient>, DirectoryError> {
        Ok(self.recipients.read().await.clone())
    }
}
