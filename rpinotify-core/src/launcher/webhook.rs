//! Best-effort webhook launchers: IFTTT maker webhooks and Notify.run channels

use super::DeliveryOutcome;
use crate::downloader::Downloader;

/// IFTTT maker webhook. Accepts multi-line messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IftttLauncher {
    url: String,
}

impl IftttLauncher {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post `value1=<title>&value2=<message>` to the webhook.
    pub async fn fire(&self, downloader: &Downloader, title: &str, message: &str) -> DeliveryOutcome {
        let form = [("value1", title), ("value2", message)];
        post_best_effort(downloader, "ifttt", &self.url, &form).await
    }
}

/// Notify.run push relay. Only the message text is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyRunLauncher {
    url: String,
}

impl NotifyRunLauncher {
    /// Create a launcher. Subscription URLs (`/c/<channel>`) are turned into the
    /// channel's post URL by collapsing every `/c/` segment to `/`.
    pub fn new(url: impl Into<String>) -> Self {
        let mut url = url.into();
        while url.contains("/c/") {
            url = url.replace("/c/", "/");
        }
        Self { url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fire(&self, downloader: &Downloader, _title: &str, message: &str) -> DeliveryOutcome {
        let form = [("message", message)];
        post_best_effort(downloader, "notify_run", &self.url, &form).await
    }
}

async fn post_best_effort(
    downloader: &Downloader,
    launcher: &'static str,
    url: &str,
    form: &[(&str, &str)],
) -> DeliveryOutcome {
    match downloader.post_form(url, form).await {
        Ok(response) if response.status().is_success() => {
            tracing::debug!(launcher, "launcher fired");
            DeliveryOutcome::Delivered
        }
        Ok(response) => {
            let status = response.status();
            tracing::warn!(launcher, status = %status, "webhook rejected notification");
            DeliveryOutcome::SilentlyDropped {
                reason: format!("HTTP {}", status),
            }
        }
        Err(e) => {
            tracing::error!(launcher, error = %e, "download error in launcher");
            DeliveryOutcome::SilentlyDropped {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_run_collapses_channel_segments() {
        let launcher = NotifyRunLauncher::new("https://notify.run/c/abcdef");
        assert_eq!(launcher.url(), "https://notify.run/abcdef");

        let launcher = NotifyRunLauncher::new("https://host/c/c/x");
        assert_eq!(launcher.url(), "https://host/x");
    }

    #[test]
    fn test_notify_run_keeps_plain_urls() {
        let launcher = NotifyRunLauncher::new("https://notify.run/abcdef");
        assert_eq!(launcher.url(), "https://notify.run/abcdef");
    }
}
