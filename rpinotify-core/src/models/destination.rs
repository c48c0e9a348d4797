//! Destination expressions: who a notification is addressed to

use crate::error::NotifyError;
use serde_json::Value;

/// Sentinel addressing every recipient subscribed to the calling service.
pub const MULTICAST: &str = "multicast";
/// Sentinel addressing every known recipient. Requires `force`.
pub const BROADCAST: &str = "broadcast";

/// Caller-supplied specification of notification recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    User(String),
    Users(Vec<String>),
    Multicast,
    Broadcast,
}

impl Destination {
    /// Build a destination from a JSON value (string or array of strings).
    pub fn from_json(value: &Value) -> Result<Self, NotifyError> {
        match value {
            Value::String(s) => Ok(Destination::from(s.as_str())),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(NotifyError::InvalidDestination(format!(
                        "a list containing {}",
                        json_type_name(other)
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Destination::Users),
            other => Err(NotifyError::InvalidDestination(
                json_type_name(other).to_string(),
            )),
        }
    }

    pub fn is_multicast(&self) -> bool {
        matches!(self, Destination::Multicast)
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self, Destination::Broadcast)
    }
}

impl From<&str> for Destination {
    fn from(value: &str) -> Self {
        match value {
            MULTICAST => Destination::Multicast,
            BROADCAST => Destination::Broadcast,
            name => Destination::User(name.to_string()),
        }
    }
}

impl From<String> for Destination {
    fn from(value: String) -> Self {
        Destination::from(value.as_str())
    }
}

impl From<Vec<String>> for Destination {
    fn from(value: Vec<String>) -> Self {
        Destination::Users(value)
    }
}

impl From<&[&str]> for Destination {
    fn from(value: &[&str]) -> Self {
        Destination::Users(value.iter().map(|s| s.to_string()).collect())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
