//! Upload directory
//!
//! The one directory this server reads from and writes to. Uploaded files
//! are stored flat under it, keyed by the client-supplied filename.

use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};

use crate::error::UploadError;

pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory (owner-only permissions) if it does not exist.
    ///
    /// Returns `true` when the directory was created by this call.
    pub fn ensure_exists(&self) -> io::Result<bool> {
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(false),
            Ok(_) => Err(io::Error::other(format!(
                "{} exists and is not a directory",
                self.root.display()
            ))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let mut builder = DirBuilder::new();
                builder.recursive(true);
                #[cfg(unix)]
                {
                    use std::os::unix::fs::DirBuilderExt;
                    builder.mode(0o700);
                }
                builder.create(&self.root)?;
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    /// Path an upload named `file_name` is stored at
    pub fn destination(&self, file_name: &str) -> Result<PathBuf, UploadError> {
        resolve_file_name(file_name)
            .map(|name| self.root.join(name))
            .ok_or_else(|| UploadError::InvalidFilename(file_name.to_string()))
    }

    /// Open `path` for writing, creating it or truncating an existing file
    pub async fn create(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await
    }
}

/// Reduce a client-supplied filename to its final path component.
///
/// `../../etc/passwd` becomes `passwd` and `C:\pics\cat.png` becomes
/// `cat.png`. Names that reduce to nothing usable are rejected.
pub fn resolve_file_name(raw: &str) -> Option<&str> {
    let name = raw.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(raw);
    match name {
        "" | "." | ".." => None,
        _ if name.contains('\0') => None,
        _ => Some(name),
    }
}
