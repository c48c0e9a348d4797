//! Downloader retry and error-reporting behaviour.

use rpinotify_core::downloader::{Downloader, DownloaderConfig};
use rpinotify_core::error::DownloaderError;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn downloader(retries: u32) -> Downloader {
    Downloader::new(DownloaderConfig {
        retries,
        retry_delay: Duration::from_millis(10),
        request_timeout: Duration::from_secs(2),
    })
}

/// A local port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_error_statuses_are_responses_not_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = downloader(3)
        .get(&format!("{}/missing", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn test_connection_failures_exhaust_the_retry_budget() {
    let url = format!("http://127.0.0.1:{}/hook", closed_port());

    match downloader(3).post_form(&url, &[("message", "hi")]).await {
        Err(DownloaderError::RetriesExhausted {
            method,
            url: failed_url,
            attempts,
        }) => {
            assert_eq!(method, "POST");
            assert_eq!(failed_url, url);
            assert_eq!(attempts, 3);
        }
        other => panic!("Expected RetriesExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_zero_retries_still_makes_one_attempt() {
    let url = format!("http://127.0.0.1:{}/", closed_port());

    match downloader(0).get(&url).await {
        Err(DownloaderError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 1),
        other => panic!("Expected RetriesExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_urls_are_rejected_without_a_request() {
    for url in ["not a url", "ftp://example.com/file"] {
        assert!(matches!(
            downloader(3).get(url).await,
            Err(DownloaderError::InvalidUrl { .. })
        ));
    }
}
