//! Logging Infrastructure
//!
//! Structured logging setup for development and production:
//! console output always, plus an optional daily-rotating
//! application log file.

use std::fs;
use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logging system with an optional rotating log file
///
/// # Arguments
/// * `level` - Log level fallback when `RUST_LOG` is unset ("info", "debug", ...)
/// * `json_format` - JSON output for production, pretty for development
/// * `log_dir` - Optional directory for daily-rotating file logs
pub fn init_logger_with_file(
    level: &str,
    json_format: bool,
    log_dir: Option<&str>,
) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    if json_format {
        let console_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(EnvFilter::new(level));

        if let Some(dir) = log_dir {
            let log_dir = Path::new(dir);
            fs::create_dir_all(log_dir)?;
            let app_log = RollingFileAppender::new(Rotation::DAILY, log_dir, "app");
            let file_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::sync::Mutex::new(app_log));
            subscriber.with(console_layer).with(file_layer).init();
        } else {
            subscriber.with(console_layer).init();
        }
    } else {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(EnvFilter::new(level));

        if let Some(dir) = log_dir {
            let log_dir = Path::new(dir);
            fs::create_dir_all(log_dir)?;
            let app_log = RollingFileAppender::new(Rotation::DAILY, log_dir, "app");
            let file_layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::sync::Mutex::new(app_log));
            subscriber.with(console_layer).with(file_layer).init();
        } else {
            subscriber.with(console_layer).init();
        }
    }

    Ok(())
}

/// Initialize the logging system (console only)
///
/// Convenience function for console-only logging
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    init_logger_with_file(level, json_format, None)
}
