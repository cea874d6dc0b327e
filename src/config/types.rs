// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";
/// 24 MiB
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 24 << 20;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub timeouts: TimeoutsConfig,
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads, CPU count when unset
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            workers: None,
        }
    }
}

/// Upload directory configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Served as the static root and written to by uploads
    pub upload_dir: String,
    /// Whole multipart body limit in bytes
    pub max_upload_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: DEFAULT_UPLOAD_DIR.to_string(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

/// Connection timeouts, all in seconds
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutsConfig {
    pub header_read: u64,
    pub read: u64,
    pub write: u64,
    pub shutdown_grace: u64,
}

impl TimeoutsConfig {
    pub const fn header_read(&self) -> Duration {
        Duration::from_secs(self.header_read)
    }

    pub const fn read(&self) -> Duration {
        Duration::from_secs(self.read)
    }

    pub const fn write(&self) -> Duration {
        Duration::from_secs(self.write)
    }

    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace)
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            header_read: 5,
            read: 15,
            write: 10,
            shutdown_grace: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `env_logger` filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common or json)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Log file path (optional, stderr if not set)
    #[serde(default)]
    pub log_file: Option<String>,
}

fn default_access_log_format() -> String {
    "combined".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            access_log: true,
            access_log_format: default_access_log_format(),
            log_file: None,
        }
    }
}
