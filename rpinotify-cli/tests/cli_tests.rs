use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub fn run_rpinotify(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rpinotify"))
        .args(args)
        .env_remove("RPINOTIFY_TELEGRAM_BOT_TOKEN")
        .output()
        .expect("Failed to run rpinotify")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout)
        .trim_end_matches('\n')
        .to_string()
}

/// Write a config pointing at a recipients file inside `dir`.
fn setup(dir: &Path) -> PathBuf {
    let recipients = dir.join("recipients.json");
    std::fs::write(
        &recipients,
        r#"{"recipients": [
            {"username": "alice", "services": ["AEMET"], "launcher": {"type": "Invalid"}},
            {"username": "bob", "is_active": false, "launcher": {"type": "Telegram", "config": "12"}}
        ]}"#,
    )
    .unwrap();

    let config = dir.join("config.toml");
    std::fs::write(
        &config,
        format!(
            "log_level = \"error\"\nnotifications_disabled = false\ndirectory_path = {:?}\n",
            recipients.display().to_string()
        ),
    )
    .unwrap();
    config
}

#[test]
fn test_services_lists_builtin_registry() {
    let output = run_rpinotify(&["services"]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("AEMET\tpublic\t/home/pi/scripts/aemet.py"));
    assert!(text.contains("UNKNOWN\tprivate\t"));
}

#[test]
fn test_users_lists_recipients_from_configured_directory() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());

    let output = run_rpinotify(&["users", "--config", config.to_str().unwrap()]);
    assert!(output.status.success());

    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(lines, vec!["alice\tactive\tinvalid\tAEMET", "bob\tbanned\ttelegram\t"]);
}

#[test]
fn test_notify_failure_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());

    let output = run_rpinotify(&[
        "notify",
        "Weather",
        "Rain",
        "alice",
        "--service",
        "aemet.py",
        "--config",
        config.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    assert!(stdout(&output).contains("Failed alice"));
}

#[test]
fn test_broadcast_without_force_is_refused() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());

    let output = run_rpinotify(&[
        "notify",
        "t",
        "m",
        "broadcast",
        "--config",
        config.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("permission denied"));
}

#[test]
fn test_skipped_recipient_is_not_a_failure() {
    let dir = TempDir::new().unwrap();
    let config = setup(dir.path());

    let output = run_rpinotify(&[
        "notify",
        "t",
        "m",
        "bob",
        "--force",
        "--config",
        config.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Skipped bob: banned user"));
}
