//! Recipient data structures

use crate::launcher::Launcher;
use crate::models::Service;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A person who can receive notifications through exactly one launcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    /// Unique username
    pub username: String,
    /// Delivery channel owned by this recipient
    #[serde(default)]
    pub launcher: Launcher,
    /// Inactive (banned) recipients never receive notifications
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    /// Contact address, unused by dispatch
    #[serde(default)]
    pub email: Option<String>,
    /// Canonical names of the services this recipient opted into
    #[serde(default)]
    pub services: BTreeSet<String>,
}

impl Recipient {
    /// Create an active recipient with no subscriptions.
    pub fn new(username: impl Into<String>, launcher: Launcher) -> Self {
        Self {
            username: username.into(),
            launcher,
            is_active: true,
            email: None,
            services: BTreeSet::new(),
        }
    }

    /// Subscribe to a service by name.
    pub fn subscribed_to(mut self, service: impl AsRef<str>) -> Self {
        self.services.insert(service.as_ref().to_uppercase());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Whether this recipient opted into `service`.
    pub fn is_subscribed(&self, service: &Service) -> bool {
        self.services.contains(service.name())
    }

    pub fn is_banned(&self) -> bool {
        !self.is_active
    }
}

fn active_by_default() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_creation() {
        let recipient = Recipient::new("alice", Launcher::Invalid);
        assert_eq!(recipient.username, "alice");
        assert!(recipient.is_active);
        assert!(!recipient.is_banned());
        assert!(recipient.services.is_empty());
    }

    #[test]
    fn test_subscription_is_case_insensitive_on_insert() {
        let recipient = Recipient::new("bob", Launcher::Invalid).subscribed_to("aemet");
        assert!(recipient.is_subscribed(&Service::new("AEMET")));
        assert!(!recipient.is_subscribed(&Service::new("MENUS")));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let recipient: Recipient = serde_json::from_value(serde_json::json!({
            "username": "dave",
            "services": ["AEMET"]
        }))
        .unwrap();
        assert!(recipient.is_active);
        assert_eq!(recipient.launcher, Launcher::Invalid);
        assert!(recipient.services.contains("AEMET"));
    }

    #[test]
    fn test_inactive_recipient_is_banned() {
        let recipient = Recipient::new("carol", Launcher::Invalid).inactive();
        assert!(recipient.is_banned());
    }
}
