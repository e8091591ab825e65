//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while tailing a log file.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// Watched file was deleted.
    #[error("Watched file deleted: {0}")]
    FileDeleted(PathBuf),

    /// Permission denied accessing file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
