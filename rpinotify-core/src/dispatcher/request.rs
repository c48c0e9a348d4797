//! Notify call parameters

use crate::models::{Destination, ServiceContext};

/// Everything one notify call needs.
///
/// `disabled` overrides the dispatcher's configured disable flag for this call
/// only; `None` keeps the configured value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyRequest {
    pub title: String,
    pub message: String,
    pub destinations: Option<Destination>,
    pub context: Option<ServiceContext>,
    pub force: bool,
    pub disabled: Option<bool>,
}

impl NotifyRequest {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            destinations: None,
            context: None,
            force: false,
            disabled: None,
        }
    }

    pub fn to(mut self, destinations: impl Into<Destination>) -> Self {
        self.destinations = Some(destinations.into());
        self
    }

    /// Originating service, or a file path / script name identifying it.
    pub fn from_service(mut self, context: impl Into<ServiceContext>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Bypass the subscription check.
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let request = NotifyRequest::new("Title", "Body");
        assert!(!request.force);
        assert!(request.destinations.is_none());
        assert!(request.context.is_none());
        assert_eq!(request.disabled, None);
    }

    #[test]
    fn test_builder_sets_every_field() {
        let request = NotifyRequest::new("Title", "Body")
            .to("multicast")
            .from_service("/home/pi/scripts/aemet.py")
            .forced()
            .with_disabled(false);

        assert_eq!(request.destinations, Some(Destination::Multicast));
        assert_eq!(
            request.context,
            Some(ServiceContext::Identifier("/home/pi/scripts/aemet.py".to_string()))
        );
        assert!(request.force);
        assert_eq!(request.disabled, Some(false));
    }
}
