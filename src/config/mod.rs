// Configuration module entry point
// Layers defaults, an optional config file, IMGDROP_* environment variables
// and command line flags, in that order of precedence

mod state;
mod types;

use std::net::{IpAddr, SocketAddr};

use crate::cli::Args;
use crate::error::ServerError;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, LoggingConfig, ServerConfig, StorageConfig, TimeoutsConfig, DEFAULT_MAX_UPLOAD_SIZE,
    DEFAULT_PORT, DEFAULT_UPLOAD_DIR,
};

/// Config file looked up when `-config` is not given. Optional.
const DEFAULT_CONFIG_FILE: &str = "imgdrop";
const ENV_PREFIX: &str = "IMGDROP";

impl Config {
    /// Load configuration for the given command line
    pub fn load(args: &Args) -> Result<Self, config::ConfigError> {
        let file = match &args.config {
            Some(path) => config::File::from(path.as_path()).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let defaults = Self::default();
        let settings = config::Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("storage.upload_dir", defaults.storage.upload_dir)?
            .set_default("storage.max_upload_size", defaults.storage.max_upload_size)?
            .set_default("timeouts.header_read", defaults.timeouts.header_read)?
            .set_default("timeouts.read", defaults.timeouts.read)?
            .set_default("timeouts.write", defaults.timeouts.write)?
            .set_default("timeouts.shutdown_grace", defaults.timeouts.shutdown_grace)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.access_log", defaults.logging.access_log)?
            .set_default("logging.access_log_format", defaults.logging.access_log_format)?
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("server.port", args.port.map(i64::from))?
            .set_override_option(
                "storage.upload_dir",
                args.upload_dir
                    .as_ref()
                    .map(|dir| dir.to_string_lossy().into_owned()),
            )?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ServerError::InvalidAddress(self.server.host.clone()))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}
