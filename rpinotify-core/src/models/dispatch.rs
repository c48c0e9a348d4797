//! Dispatch outcome data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Why a candidate recipient was not contacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    #[serde(rename = "unauthorized")]
    Unauthorized,
    #[serde(rename = "inactive")]
    Inactive,
    #[serde(rename = "disabled")]
    Disabled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::Unauthorized => "not subscribed to the service",
            SkipReason::Inactive => "banned user",
            SkipReason::Disabled => "notifications disabled",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRecipient {
    pub username: String,
    pub reason: SkipReason,
}

/// A recipient whose delivery raised a propagating error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFailure {
    pub username: String,
    pub error: String,
}

/// A best-effort delivery whose failure was swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedDelivery {
    pub username: String,
    pub reason: String,
}

/// Aggregate outcome of one notify call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    /// Correlation id for logs
    pub dispatch_id: Uuid,
    /// Canonical name of the resolved service
    pub service: String,
    /// Recipients whose channel accepted the notification
    pub delivered: Vec<String>,
    /// Best-effort recipients whose delivery failed without failing the dispatch
    #[serde(default)]
    pub dropped: Vec<DroppedDelivery>,
    /// Candidates filtered out before delivery
    pub skipped: Vec<SkippedRecipient>,
    /// Recipients whose delivery failed
    pub failures: Vec<DeliveryFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DispatchResult {
    pub(crate) fn new(
        dispatch_id: Uuid,
        service: String,
        mut delivered: Vec<String>,
        mut dropped: Vec<DroppedDelivery>,
        mut skipped: Vec<SkippedRecipient>,
        mut failures: Vec<DeliveryFailure>,
        started_at: DateTime<Utc>,
    ) -> Self {
        // Completion order is arbitrary; the result must not depend on it.
        delivered.sort();
        dropped.sort_by(|a, b| a.username.cmp(&b.username));
        skipped.sort_by(|a, b| a.username.cmp(&b.username));
        failures.sort_by(|a, b| a.username.cmp(&b.username));
        Self {
            dispatch_id,
            service,
            delivered,
            dropped,
            skipped,
            failures,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// True iff no delivery failed. Skipped recipients never count as failures.
    pub fn success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Usernames of the failed recipients.
    pub fn failed_usernames(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.username.as_str()).collect()
    }

    /// Usernames of the best-effort recipients whose delivery was dropped.
    pub fn dropped_usernames(&self) -> Vec<&str> {
        self.dropped.iter().map(|d| d.username.as_str()).collect()
    }

    /// Number of recipients a delivery task was started for.
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.dropped.len() + self.failures.len()
    }
}
