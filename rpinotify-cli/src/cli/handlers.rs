//! Command handlers

use anyhow::{Context, Result};
use rpinotify_core::logging::init_logging;
use rpinotify_core::models::{Configuration, Destination, ServiceContext, BROADCAST, MULTICAST};
use rpinotify_core::Dispatcher;
use std::path::PathBuf;

/// Load the configuration from `config_file` or the default location, then validate it.
pub fn load_configuration(config_file: Option<String>) -> Result<Configuration> {
    let config_path = match config_file {
        Some(path) => expand_home(&path)?,
        None => Configuration::default_config_path()
            .map_err(|e| anyhow::anyhow!("Failed to get default config path: {}", e))?,
    };

    let config = Configuration::load_from_file(&config_path).map_err(|e| {
        anyhow::anyhow!("Failed to load config {}: {}", config_path.display(), e)
    })?;

    if let Err(errors) = config.validate() {
        anyhow::bail!(
            "Invalid configuration in {}:\n  {}",
            config_path.display(),
            errors.join("\n  ")
        );
    }
    Ok(config)
}

fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = home_dir()?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

fn home_dir() -> Result<PathBuf> {
    std::env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| anyhow::anyhow!("HOME environment variable not set"))
}

/// Turn positional destination arguments into a destination expression.
pub fn parse_destinations(values: &[String]) -> Result<Destination> {
    match values {
        [] => anyhow::bail!("At least one destination is required"),
        [single] => Ok(Destination::from(single.as_str())),
        many => {
            if let Some(sentinel) = many
                .iter()
                .find(|v| v.as_str() == MULTICAST || v.as_str() == BROADCAST)
            {
                anyhow::bail!("'{}' cannot be combined with other destinations", sentinel);
            }
            Ok(Destination::Users(many.to_vec()))
        }
    }
}

pub async fn handle_notify(
    title: String,
    message: String,
    destinations: Vec<String>,
    service: Option<String>,
    force: bool,
    config_file: Option<String>,
) -> Result<()> {
    let config = load_configuration(config_file)?;
    let _ = init_logging(config.log_level);

    let destinations = parse_destinations(&destinations)?;
    tracing::debug!(
        destinations = ?destinations,
        service = service.as_deref().unwrap_or("-"),
        force,
        directory = %config.directory_path.display(),
        "Dispatching from command line"
    );
    let dispatcher = Dispatcher::from_config(&config);

    let result = dispatcher
        .notify(
            &title,
            &message,
            Some(destinations),
            service.map(ServiceContext::from),
            force,
        )
        .await
        .context("Failed to send notification")?;

    println!("📤 Service: {}", result.service);
    if !result.delivered.is_empty() {
        println!("✅ Delivered: {}", result.delivered.join(", "));
    }
    for dropped in &result.dropped {
        println!("📭 Dropped {}: {}", dropped.username, dropped.reason);
    }
    for skipped in &result.skipped {
        println!("⏭️  Skipped {}: {}", skipped.username, skipped.reason);
    }
    for failure in &result.failures {
        println!("❌ Failed {}: {}", failure.username, failure.error);
    }
    if result.attempted() == 0 {
        println!("ℹ️  Nobody to notify");
    }

    if !result.success() {
        anyhow::bail!(
            "Notification failed for: {}",
            result.failed_usernames().join(", ")
        );
    }
    Ok(())
}

pub async fn handle_users(config_file: Option<String>) -> Result<()> {
    let config = load_configuration(config_file)?;
    let _ = init_logging(config.log_level);

    let dispatcher = Dispatcher::from_config(&config);
    let mut recipients = dispatcher
        .directory()
        .all()
        .await
        .with_context(|| format!("Failed to read {}", config.directory_path.display()))?;
    recipients.sort_by(|a, b| a.username.cmp(&b.username));

    for recipient in recipients {
        let services: Vec<&str> = recipient.services.iter().map(String::as_str).collect();
        println!(
            "{}\t{}\t{}\t{}",
            recipient.username,
            if recipient.is_active { "active" } else { "banned" },
            recipient.launcher.kind(),
            services.join(",")
        );
    }
    Ok(())
}

pub fn handle_services() {
    let registry = rpinotify_core::models::ServiceRegistry::builtin();
    for service in registry.services() {
        let paths: Vec<&str> = service.all_paths().collect();
        println!(
            "{}\t{}\t{}",
            service.name(),
            if service.is_public() { "public" } else { "private" },
            paths.join(",")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_single_destination_is_user_or_sentinel() {
        assert_eq!(
            parse_destinations(&args(&["alice"])).unwrap(),
            Destination::User("alice".to_string())
        );
        assert_eq!(
            parse_destinations(&args(&["multicast"])).unwrap(),
            Destination::Multicast
        );
        assert_eq!(
            parse_destinations(&args(&["broadcast"])).unwrap(),
            Destination::Broadcast
        );
    }

    #[test]
    fn test_several_destinations_are_a_user_list() {
        assert_eq!(
            parse_destinations(&args(&["alice", "bob"])).unwrap(),
            Destination::Users(args(&["alice", "bob"]))
        );
    }

    #[test]
    fn test_sentinels_cannot_be_mixed_with_usernames() {
        let err = parse_destinations(&args(&["alice", "broadcast"])).unwrap_err();
        assert!(err.to_string().contains("broadcast"));
        assert!(parse_destinations(&[]).is_err());
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_configuration(Some(path.display().to_string())).unwrap();
        assert_eq!(config.delivery_timeout_seconds, 30);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "delivery_timeout_seconds = 0").unwrap();

        let err = load_configuration(Some(path.display().to_string())).unwrap_err();
        assert!(err.to_string().contains("delivery_timeout_seconds"));
    }
}
