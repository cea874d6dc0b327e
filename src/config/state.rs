// Application state module
// Immutable per-process state shared by every connection

use super::types::Config;
use crate::storage::UploadDir;

/// Application state
pub struct AppState {
    pub config: Config,
    pub uploads: UploadDir,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let uploads = UploadDir::new(&config.storage.upload_dir);
        Self { config, uploads }
    }
}
