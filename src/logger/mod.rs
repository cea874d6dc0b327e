//! Logger module
//!
//! Thin facade over the `log` macros, installed with `env_logger`:
//! - Server lifecycle logging
//! - Upload outcome logging
//! - Access logging with multiple formats
//! - Optional file output

mod format;

pub use format::AccessLogEntry;

use crate::config::LoggingConfig;
use chrono::Local;
use env_logger::{Builder, Env, Target};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Target used for access log records so they can be filtered separately
pub const ACCESS_TARGET: &str = "access";

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize the global logger with configuration
///
/// Should be called once at application startup. `RUST_LOG` takes
/// precedence over `logging.level`.
pub fn init(config: &LoggingConfig) -> io::Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(config.level.as_str()));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] {}",
            Local::now().format("%Y/%m/%d %H:%M:%S"),
            record.level(),
            record.args()
        )
    });

    if let Some(path) = config.log_file.as_deref() {
        builder.target(Target::Pipe(Box::new(open_log_file(path)?)));
    }

    builder
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))?;
    INITIALIZED.store(true, Ordering::SeqCst);
    Ok(())
}

/// Check if `init` has completed
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::SeqCst)
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<std::fs::File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

pub fn log_server_start(addr: &SocketAddr, upload_dir: &Path) {
    log::info!("Server started on port {}", addr.port());
    log::info!("Listening on: http://{addr}");
    log::info!("Serving and storing uploads in {}", upload_dir.display());
}

pub fn log_upload_dir_created(path: &Path) {
    log::info!("Created uploads directory {}", path.display());
}

pub fn log_shutdown_started() {
    log::info!("Server shutting down");
}

pub fn log_shutdown_complete() {
    log::info!("bye.");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    log::debug!("[Connection] Accepted from: {peer_addr}");
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    log::warn!("[Connection] Failed to serve connection: {err}");
}

pub fn log_upload_stored(path: &Path, bytes: u64, content_type: &str) {
    log::info!(
        "[Upload] Stored {} ({bytes} bytes, {content_type})",
        path.display()
    );
}

pub fn log_upload_rejected(err: &crate::error::UploadError) {
    if err.is_server_fault() {
        log::error!("[Upload] {err}");
    } else {
        log::warn!("[Upload] {err}");
    }
}

pub fn log_error(message: &str) {
    log::error!("{message}");
}

pub fn log_warning(message: &str) {
    log::warn!("{message}");
}

/// Report a fatal error, even when the logger never came up
pub fn log_fatal(err: &anyhow::Error) {
    if is_initialized() {
        log::error!("{err:#}");
    } else {
        eprintln!("[FATAL] {err:#}");
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    log::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}
