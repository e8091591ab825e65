//! Incremental log file tailer.
//!
//! Reads new lines from a file as they are appended.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

use super::error::WatcherError;

/// Incremental line reader that tracks its read position.
///
/// Reads only lines appended since the last read. A trailing line without
/// a newline is held back until the writer finishes it.
#[derive(Debug)]
pub struct LineTailer {
    /// Path to the log file.
    path: PathBuf,
    /// Current byte offset in the file.
    offset: u64,
    /// Bytes of an unfinished last line.
    partial: Vec<u8>,
}

impl LineTailer {
    /// Create a new tailer for the given path, starting at the beginning.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self::with_offset(path, 0)
    }

    /// Create a new tailer starting at a specific offset.
    #[must_use]
    pub fn with_offset(path: PathBuf, offset: u64) -> Self {
        Self {
            path,
            offset,
            partial: Vec::new(),
        }
    }

    /// Create a tailer that skips the current content of the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be inspected.
    pub async fn at_end(path: PathBuf) -> Result<Self, WatcherError> {
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| Self::open_error(&path, e))?;
        Ok(Self::with_offset(path, metadata.len()))
    }

    /// Get the current byte offset.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Get the path being tailed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_error(path: &Path, e: std::io::Error) -> WatcherError {
        match e.kind() {
            std::io::ErrorKind::NotFound => WatcherError::FileDeleted(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => {
                WatcherError::PermissionDenied(path.to_path_buf())
            }
            _ => WatcherError::Io(e),
        }
    }

    /// Read the lines appended since the last read.
    ///
    /// Lines are returned without their line terminator; empty lines are
    /// skipped and invalid UTF-8 is replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened (file deleted, permission denied)
    /// - I/O errors occur during reading
    ///
    /// If the file is truncated (smaller than our offset), the offset is
    /// reset to 0 and reading starts from the beginning.
    pub async fn read_new_lines(&mut self) -> Result<Vec<String>, WatcherError> {
        let file = File::open(&self.path)
            .await
            .map_err(|e| Self::open_error(&self.path, e))?;

        let file_len = file.metadata().await?.len();

        if file_len < self.offset {
            tracing::warn!(
                path = %self.path.display(),
                old_offset = self.offset,
                new_len = file_len,
                "File truncated, resetting offset to 0"
            );
            self.reset();
        }

        if file_len == self.offset {
            return Ok(Vec::new());
        }

        let mut file = file;
        file.seek(std::io::SeekFrom::Start(self.offset)).await?;

        let mut reader = BufReader::new(file);
        let mut lines = Vec::new();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let bytes_read = reader.read_until(b'\n', &mut buf).await?;
            if bytes_read == 0 {
                break;
            }
            self.offset += bytes_read as u64;

            if buf.last() != Some(&b'\n') {
                self.partial.extend_from_slice(&buf);
                break;
            }

            let mut bytes = std::mem::take(&mut self.partial);
            bytes.extend_from_slice(&buf);
            let text = String::from_utf8_lossy(&bytes);
            let line = text.trim_end_matches(['\n', '\r']);
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }

        Ok(lines)
    }

    /// Reset the offset to the beginning of the file.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.partial.clear();
    }
}
