use serde::{Deserialize, Serialize};

/// Main configuration structure for errspec
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            scheduler: SchedulerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".errspec/errspec.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Maximum number of operations outstanding at the remote service
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Sleep between polling rounds that completed nothing, in milliseconds
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,

    /// Retry policy for transient remote faults
    #[serde(default)]
    pub retry: RetryConfig,
}

const fn default_max_in_flight() -> usize {
    4
}

const fn default_idle_backoff_ms() -> u64 {
    5_000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            idle_backoff_ms: default_idle_backoff_ms(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Fixed backoff between attempts, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub backoff_ms: u64,

    /// Maximum attempts before giving up. Absent means retry forever: a
    /// persistent service outage then presents as an infinite hang.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

const fn default_retry_backoff_ms() -> u64 {
    1_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_ms: default_retry_backoff_ms(),
            max_attempts: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
