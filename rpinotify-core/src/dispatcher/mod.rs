//! Notification dispatcher
//!
//! Resolves a destination expression against a directory snapshot, filters the
//! candidates by subscription and liveness, then fires every remaining recipient's
//! launcher concurrently. A failing or slow recipient never blocks the others.

mod request;

pub use request::NotifyRequest;

use crate::directory::{JsonFileDirectory, RecipientDirectory};
use crate::downloader::Downloader;
use crate::error::{DeliveryError, NotifyError};
use crate::launcher::{DeliveryOutcome, TelegramBotApi, Transports};
use crate::logging::{log_authorization_denied, log_dispatch_summary, log_error};
use crate::models::{
    Configuration, DeliveryFailure, Destination, DispatchResult, DroppedDelivery, Recipient,
    Service, ServiceContext, ServiceRegistry, ServiceResolver, SkipReason, SkippedRecipient,
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use uuid::Uuid;

/// Default per-recipient delivery timeout
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Fans notifications out to recipients.
#[derive(Clone)]
pub struct Dispatcher {
    directory: Arc<dyn RecipientDirectory>,
    resolver: Arc<dyn ServiceResolver>,
    transports: Transports,
    delivery_timeout: Duration,
    notifications_disabled: bool,
}

impl Dispatcher {
    pub fn new(
        directory: Arc<dyn RecipientDirectory>,
        resolver: Arc<dyn ServiceResolver>,
        transports: Transports,
    ) -> Self {
        Self {
            directory,
            resolver,
            transports,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            notifications_disabled: false,
        }
    }

    /// Wire the file directory, the built-in service registry, the downloader and,
    /// when a bot token is available, the Telegram client.
    pub fn from_config(config: &Configuration) -> Self {
        let directory = JsonFileDirectory::new(&config.directory_path)
            .with_refresh_interval(config.directory_refresh_interval());

        let mut transports =
            Transports::new(Arc::new(Downloader::new(config.downloader_config())));
        match config.telegram_token() {
            Some(token) => {
                let bot = TelegramBotApi::new(token).with_api_base(config.telegram.api_base.clone());
                transports = transports.with_chat_bot(Arc::new(bot));
            }
            None => {
                tracing::debug!("No Telegram bot token configured; Telegram recipients will fail")
            }
        }

        Self::new(
            Arc::new(directory),
            Arc::new(ServiceRegistry::builtin()),
            transports,
        )
        .with_delivery_timeout(config.delivery_timeout())
        .with_notifications_disabled(config.notifications_disabled)
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Default for the disable flag. Calls can override it through [`NotifyRequest`].
    pub fn with_notifications_disabled(mut self, disabled: bool) -> Self {
        self.notifications_disabled = disabled;
        self
    }

    pub fn directory(&self) -> &Arc<dyn RecipientDirectory> {
        &self.directory
    }

    pub fn resolver(&self) -> &Arc<dyn ServiceResolver> {
        &self.resolver
    }

    /// Notify `destinations` on behalf of `context`.
    pub async fn notify(
        &self,
        title: &str,
        message: &str,
        destinations: Option<Destination>,
        context: Option<ServiceContext>,
        force: bool,
    ) -> Result<DispatchResult, NotifyError> {
        self.notify_with(NotifyRequest {
            title: title.to_string(),
            message: message.to_string(),
            destinations,
            context,
            force,
            disabled: None,
        })
        .await
    }

    /// Forced notify that ignores the disable flag for this call only.
    pub async fn force_notify(
        &self,
        title: &str,
        message: &str,
        destinations: Option<Destination>,
    ) -> Result<DispatchResult, NotifyError> {
        self.notify_with(NotifyRequest {
            title: title.to_string(),
            message: message.to_string(),
            destinations,
            context: None,
            force: true,
            disabled: Some(false),
        })
        .await
    }

    pub async fn notify_with(&self, request: NotifyRequest) -> Result<DispatchResult, NotifyError> {
        let NotifyRequest {
            title,
            message,
            destinations,
            context,
            force,
            disabled,
        } = request;

        if destinations.as_ref().is_some_and(Destination::is_multicast) && context.is_none() {
            return Err(NotifyError::NecessaryArgument(
                "multicast needs the originating service".to_string(),
            ));
        }
        if destinations.as_ref().is_some_and(Destination::is_broadcast) && !force {
            return Err(NotifyError::Permission(
                "broadcast is only allowed with force".to_string(),
            ));
        }
        if context.is_none() && !force {
            return Err(NotifyError::NecessaryArgument(
                "originating service is required unless the call is forced".to_string(),
            ));
        }
        let destinations =
            destinations.ok_or_else(|| NotifyError::InvalidDestination("none".to_string()))?;

        let service = match &context {
            Some(context) => self.resolver.resolve(context),
            None => self.resolver.unknown(),
        };
        let disabled = disabled.unwrap_or(self.notifications_disabled);
        let dispatch_id = Uuid::new_v4();
        let started_at = Utc::now();

        let snapshot = self.directory.all().await.map_err(|e| {
            log_error(&e.to_string(), Some("recipient directory"));
            e
        })?;
        let candidates = select_candidates(snapshot, &destinations, &service)?;

        let mut skipped = Vec::new();
        let mut targets = Vec::with_capacity(candidates.len());
        for recipient in candidates {
            let reason = if !(force || recipient.is_subscribed(&service)) {
                log_authorization_denied(service.name(), &recipient.username);
                Some(SkipReason::Unauthorized)
            } else if !recipient.is_active {
                tracing::warn!(
                    dispatch_id = %dispatch_id,
                    username = %recipient.username,
                    "Banned user, notification not sent"
                );
                Some(SkipReason::Inactive)
            } else if disabled {
                tracing::warn!(
                    dispatch_id = %dispatch_id,
                    username = %recipient.username,
                    "Notifications disabled, notification not sent"
                );
                Some(SkipReason::Disabled)
            } else {
                None
            };

            match reason {
                Some(reason) => skipped.push(SkippedRecipient {
                    username: recipient.username,
                    reason,
                }),
                None => targets.push(recipient),
            }
        }

        if targets.is_empty() {
            tracing::debug!(dispatch_id = %dispatch_id, service = %service, "No recipient to notify");
        }

        let Delivery {
            delivered,
            dropped,
            failures,
        } = self.deliver(dispatch_id, targets, &title, &message).await;

        let result = DispatchResult::new(
            dispatch_id,
            service.name().to_string(),
            delivered,
            dropped,
            skipped,
            failures,
            started_at,
        );
        log_dispatch_summary(&result);
        Ok(result)
    }

    /// Fire every target concurrently and collect the outcomes.
    async fn deliver(
        &self,
        dispatch_id: Uuid,
        targets: Vec<Recipient>,
        title: &str,
        message: &str,
    ) -> Delivery {
        let outcomes: Arc<Mutex<Delivery>> = Arc::new(Mutex::new(Delivery::default()));
        let title: Arc<str> = Arc::from(title);
        let message: Arc<str> = Arc::from(message);
        let usernames: Vec<String> = targets.iter().map(|r| r.username.clone()).collect();

        let mut tasks = JoinSet::new();
        for recipient in targets {
            let transports = self.transports.clone();
            let timeout = self.delivery_timeout;
            let title = Arc::clone(&title);
            let message = Arc::clone(&message);
            let outcomes = Arc::clone(&outcomes);

            tasks.spawn(async move {
                let Recipient {
                    username, launcher, ..
                } = recipient;
                let outcome =
                    match tokio::time::timeout(timeout, launcher.fire(&transports, &title, &message))
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(_) if launcher.is_best_effort() => {
                            tracing::warn!(dispatch_id = %dispatch_id, username = %username, launcher = launcher.kind(), timeout = ?timeout, "Best-effort delivery timed out");
                            Ok(DeliveryOutcome::SilentlyDropped {
                                reason: DeliveryError::Timeout(timeout).to_string(),
                            })
                        }
                        Err(_) => Err(DeliveryError::Timeout(timeout)),
                    };

                match outcome {
                    Ok(DeliveryOutcome::Delivered) => {
                        tracing::debug!(dispatch_id = %dispatch_id, username = %username, launcher = launcher.kind(), "Notification delivered");
                        outcomes.lock().await.delivered.push(username);
                    }
                    Ok(DeliveryOutcome::SilentlyDropped { reason }) => {
                        tracing::debug!(dispatch_id = %dispatch_id, username = %username, launcher = launcher.kind(), reason = %reason, "Notification dropped by best-effort launcher");
                        outcomes
                            .lock()
                            .await
                            .dropped
                            .push(DroppedDelivery { username, reason });
                    }
                    Err(e) => {
                        tracing::error!(dispatch_id = %dispatch_id, username = %username, launcher = launcher.kind(), error = %e, "Notification failed");
                        outcomes.lock().await.failures.push(DeliveryFailure {
                            username,
                            error: e.to_string(),
                        });
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(dispatch_id = %dispatch_id, error = %e, "Delivery task aborted");
            }
        }

        let mut delivery = std::mem::take(&mut *outcomes.lock().await);

        // A task that panicked reported nothing; account for it as a failure.
        let reported: HashSet<&str> = delivery
            .delivered
            .iter()
            .map(String::as_str)
            .chain(delivery.dropped.iter().map(|d| d.username.as_str()))
            .chain(delivery.failures.iter().map(|f| f.username.as_str()))
            .collect();
        let aborted: Vec<DeliveryFailure> = usernames
            .iter()
            .filter(|u| !reported.contains(u.as_str()))
            .map(|u| DeliveryFailure {
                username: u.clone(),
                error: DeliveryError::Aborted("task panicked".to_string()).to_string(),
            })
            .collect();
        delivery.failures.extend(aborted);

        delivery
    }
}

/// Per-recipient outcomes of one fan-out.
#[derive(Default)]
struct Delivery {
    delivered: Vec<String>,
    dropped: Vec<DroppedDelivery>,
    failures: Vec<DeliveryFailure>,
}

/// Build the candidate set for `destinations` from one directory snapshot.
fn select_candidates(
    snapshot: Vec<Recipient>,
    destinations: &Destination,
    service: &Service,
) -> Result<Vec<Recipient>, NotifyError> {
    match destinations {
        Destination::User(name) => pick(snapshot, std::slice::from_ref(name)),
        Destination::Users(names) => pick(snapshot, names),
        Destination::Multicast => Ok(snapshot
            .into_iter()
            .filter(|r| r.is_subscribed(service))
            .collect()),
        Destination::Broadcast => Ok(snapshot),
    }
}

fn pick(snapshot: Vec<Recipient>, names: &[String]) -> Result<Vec<Recipient>, NotifyError> {
    let mut seen = HashSet::new();
    let mut picked = Vec::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            continue;
        }
        let recipient = snapshot
            .iter()
            .find(|r| &r.username == name)
            .ok_or_else(|| {
                tracing::error!(username = %name, "Unknown username");
                NotifyError::RecipientNotFound(name.clone())
            })?;
        picked.push(recipient.clone());
    }
    Ok(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::Launcher;

    fn snapshot() -> Vec<Recipient> {
        vec![
            Recipient::new("alice", Launcher::Invalid).subscribed_to("AEMET"),
            Recipient::new("bob", Launcher::Invalid).subscribed_to("MENUS"),
            Recipient::new("carol", Launcher::Invalid)
                .subscribed_to("AEMET")
                .inactive(),
        ]
    }

    fn names(recipients: &[Recipient]) -> Vec<&str> {
        recipients.iter().map(|r| r.username.as_str()).collect()
    }

    #[test]
    fn test_multicast_selects_subscribers() {
        let selected =
            select_candidates(snapshot(), &Destination::Multicast, &Service::new("AEMET")).unwrap();
        assert_eq!(names(&selected), vec!["alice", "carol"]);
    }

    #[test]
    fn test_broadcast_selects_everyone() {
        let selected =
            select_candidates(snapshot(), &Destination::Broadcast, &Service::unknown()).unwrap();
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_list_duplicates_collapse() {
        let destinations = Destination::Users(vec![
            "bob".to_string(),
            "alice".to_string(),
            "bob".to_string(),
        ]);
        let selected = select_candidates(snapshot(), &destinations, &Service::unknown()).unwrap();
        assert_eq!(names(&selected), vec!["bob", "alice"]);
    }

    #[test]
    fn test_first_unknown_name_fails() {
        let destinations = Destination::Users(vec![
            "alice".to_string(),
            "zed".to_string(),
            "yann".to_string(),
        ]);
        match select_candidates(snapshot(), &destinations, &Service::unknown()) {
            Err(NotifyError::RecipientNotFound(name)) => assert_eq!(name, "zed"),
            other => panic!("Expected RecipientNotFound, got {:?}", other),
        }
    }
}
