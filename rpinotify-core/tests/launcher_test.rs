//! Launcher contract tests against mock HTTP endpoints.

use rpinotify_core::downloader::{Downloader, DownloaderConfig};
use rpinotify_core::error::DeliveryError;
use rpinotify_core::launcher::{
    DeliveryOutcome, IftttLauncher, Launcher, NotifyRunLauncher, TelegramBotApi,
    TelegramLauncher, Transports,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, body_string, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transports() -> Transports {
    Transports::new(Arc::new(Downloader::new(DownloaderConfig {
        retries: 2,
        retry_delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
    })))
}

#[tokio::test]
async fn test_ifttt_posts_title_and_message_as_form() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/trigger/rpi/with/key/abc"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("value1=Disk+alert"))
        .and(body_string_contains("value2=sda1+is+full%0Aclean+up"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let launcher = Launcher::Ifttt(IftttLauncher::new(format!(
        "{}/trigger/rpi/with/key/abc",
        mock_server.uri()
    )));
    let outcome = launcher
        .fire(&transports(), "Disk alert", "sda1 is full\nclean up")
        .await;

    assert_eq!(outcome, Ok(DeliveryOutcome::Delivered));
}

#[tokio::test]
async fn test_ifttt_error_status_is_swallowed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let launcher = Launcher::Ifttt(IftttLauncher::new(mock_server.uri()));
    match launcher.fire(&transports(), "t", "m").await {
        Ok(DeliveryOutcome::SilentlyDropped { reason }) => assert!(reason.contains("500")),
        other => panic!("Expected SilentlyDropped, got {:?}", other),
    }
}

#[tokio::test]
async fn test_notify_run_posts_message_to_normalised_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ch4nnel"))
        .and(body_string("message=Backup+done"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let launcher = Launcher::NotifyRun(NotifyRunLauncher::new(format!(
        "{}/c/ch4nnel",
        mock_server.uri()
    )));
    let outcome = launcher.fire(&transports(), "ignored", "Backup done").await;

    assert_eq!(outcome, Ok(DeliveryOutcome::Delivered));
}

#[tokio::test]
async fn test_telegram_sends_title_and_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bottest-token/sendMessage"))
        .and(body_partial_json(json!({
            "chat_id": 42,
            "text": "Menu:\nLentejas"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let bot = TelegramBotApi::new("test-token".to_string()).with_api_base(mock_server.uri());
    let transports = transports().with_chat_bot(Arc::new(bot));
    let launcher = Launcher::Telegram(TelegramLauncher::new(42));

    let outcome = launcher.fire(&transports, "Menu", "Lentejas").await;
    assert_eq!(outcome, Ok(DeliveryOutcome::Delivered));
}

#[tokio::test]
async fn test_telegram_api_error_propagates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bottest-token/sendMessage"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"ok": false, "description": "Forbidden: bot was blocked by the user"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let bot = TelegramBotApi::new("test-token".to_string()).with_api_base(format!("{}/", mock_server.uri()));
    let transports = transports().with_chat_bot(Arc::new(bot));
    let launcher = Launcher::Telegram(TelegramLauncher::new(7));

    match launcher.fire(&transports, "t", "m").await {
        Err(DeliveryError::ChatApi(message)) => {
            assert!(message.contains("403"));
            assert!(message.contains("blocked"));
        }
        other => panic!("Expected ChatApi error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unconfirmed_telegram_never_reaches_the_api() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let bot = TelegramBotApi::new("test-token".to_string()).with_api_base(mock_server.uri());
    let transports = transports().with_chat_bot(Arc::new(bot));
    let launcher = Launcher::Telegram(TelegramLauncher::unconfirmed());

    assert_eq!(
        launcher.fire(&transports, "t", "m").await,
        Err(DeliveryError::UserNotConfirmed)
    );
}

#[test]
fn test_serialized_launchers_load_back_equal() {
    let launchers = vec![
        Launcher::Ifttt(IftttLauncher::new("https://maker.ifttt.com/trigger/x/with/key/y")),
        Launcher::NotifyRun(NotifyRunLauncher::new("https://notify.run/abc")),
        Launcher::Telegram(TelegramLauncher::new(-100123)),
        Launcher::Telegram(TelegramLauncher::unconfirmed()),
        Launcher::Invalid,
    ];

    for launcher in launchers {
        let raw = serde_json::to_string(&launcher).unwrap();
        assert_eq!(Launcher::from_json_str(&raw), launcher, "config: {}", raw);
    }
}
