//! Shared HTTP downloader with a connection-retry budget

use crate::error::DownloaderError;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use url::Url;

/// Default number of attempts before giving up on a request.
pub const DEFAULT_RETRIES: u32 = 10;

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Total attempts per request (at least one is always made)
    pub retries: u32,
    /// Pause between attempts after a connection failure
    pub retry_delay: Duration,
    /// Per-attempt timeout
    pub request_timeout: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            retry_delay: Duration::ZERO,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client used by every webhook launcher.
///
/// Connection failures and timeouts are retried up to the configured budget. HTTP error
/// statuses are not errors: the response is handed back to the caller.
pub struct Downloader {
    client: Client,
    config: DownloaderConfig,
}

impl Downloader {
    pub fn new(config: DownloaderConfig) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default http client");
                Client::new()
            });
        Self { client, config }
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    pub async fn get(&self, url: &str) -> Result<Response, DownloaderError> {
        self.execute("GET", url, |client, url| client.get(url)).await
    }

    /// POST `form` as `application/x-www-form-urlencoded`.
    pub async fn post_form(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<Response, DownloaderError> {
        self.execute("POST", url, |client, url| client.post(url).form(form))
            .await
    }

    async fn execute<F>(
        &self,
        method: &'static str,
        url: &str,
        build: F,
    ) -> Result<Response, DownloaderError>
    where
        F: Fn(&Client, Url) -> RequestBuilder,
    {
        let parsed = parse_http_url(url)?;
        let attempts = self.config.retries.max(1);
        tracing::debug!(method, url, "sending request");

        for attempt in 1..=attempts {
            match build(&self.client, parsed.clone()).send().await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_connect() || e.is_timeout() => {
                    tracing::warn!(
                        method,
                        url,
                        retries = attempts - attempt,
                        error = %e,
                        "connection error"
                    );
                    if attempt < attempts && !self.config.retry_delay.is_zero() {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
                Err(e) => {
                    return Err(DownloaderError::Request {
                        method,
                        url: url.to_string(),
                        source: e,
                    })
                }
            }
        }

        tracing::error!(method, url, attempts, "max retries failed");
        Err(DownloaderError::RetriesExhausted {
            method,
            url: url.to_string(),
            attempts,
        })
    }
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new(DownloaderConfig::default())
    }
}

fn parse_http_url(url: &str) -> Result<Url, DownloaderError> {
    let parsed = Url::parse(url).map_err(|e| DownloaderError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(DownloaderError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme {:?}", scheme),
        }),
    }
}
