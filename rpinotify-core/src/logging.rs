//! Logging setup and structured log helpers

use crate::models::{DispatchResult, LogLevel};

/// Initialize logging with the specified level
pub fn init_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };
    let filter = format!("rpinotify_core={level},rpinotify={level}");

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()?;

    Ok(())
}

/// Log the outcome of a dispatch. Failures are logged at error level.
pub fn log_dispatch_summary(result: &DispatchResult) {
    if result.success() {
        tracing::info!(
            dispatch_id = %result.dispatch_id,
            service = %result.service,
            delivered = result.delivered.len(),
            dropped = result.dropped.len(),
            skipped = result.skipped.len(),
            "Dispatch finished"
        );
    } else {
        tracing::error!(
            dispatch_id = %result.dispatch_id,
            service = %result.service,
            delivered = result.delivered.len(),
            dropped = result.dropped.len(),
            skipped = result.skipped.len(),
            failed = ?result.failed_usernames(),
            "Dispatch finished with failures"
        );
    }
}

/// Log a recipient that was denied a notification (always logged regardless of level)
pub fn log_authorization_denied(service: &str, username: &str) {
    tracing::warn!(
        event_type = "unauthorized_recipient",
        service = service,
        user = username,
        "Security event: recipient is not subscribed to the calling service"
    );
}

/// Log a system error
pub fn log_error(error: &str, context: Option<&str>) {
    tracing::error!(
        error = error,
        context = context.unwrap_or(""),
        "System error occurred"
    );
}
