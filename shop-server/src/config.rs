use std::path::PathBuf;
use std::time::Duration;

use crate::inventory::RetryPolicy;

/// Server configuration
///
/// Every field can be overridden through an environment variable:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | Working directory (database, logs) |
/// | LOG_LEVEL | info | Log filter (tracing `EnvFilter` syntax) |
/// | LOG_JSON | false | Emit JSON log records |
/// | LOCK_MAX_ATTEMPTS | 3 | Inventory lock attempts per checkout |
/// | LOCK_RETRY_DELAY_MS | 1000 | Delay between lock attempts |
/// | ENVIRONMENT | development | development \| staging \| production |
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory holding the database file and log files
    pub work_dir: String,
    /// Log filter directive
    pub log_level: String,
    /// JSON log output (production aggregation)
    pub log_json: bool,
    /// Inventory lock attempts, including the first
    pub lock_max_attempts: u32,
    /// Delay between lock attempts (milliseconds)
    pub lock_retry_delay_ms: u64,
    /// Runtime environment name
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables, with defaults
    /// for anything unset.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            lock_max_attempts: std::env::var("LOCK_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            lock_retry_delay_ms: std::env::var("LOCK_RETRY_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("shop.redb")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.lock_max_attempts,
            retry_delay: Duration::from_millis(self.lock_retry_delay_ms),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
