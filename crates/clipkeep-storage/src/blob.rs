//! File-based blob storage for captured clipboard images.
//!
//! Each image is written once as `<millis>.png` inside the images directory.
//! Blobs are never reference-counted: deleting or pruning an image entry
//! leaves its file on disk.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

use clipkeep_core::error::{ClipkeepError, Result};

/// Attempts at finding a free timestamp-derived name before giving up.
const MAX_NAME_ATTEMPTS: i64 = 1000;

/// Directory of image blobs named by capture timestamp.
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a fresh file and return its path.
    ///
    /// The directory is created on demand. A name already taken in the same
    /// millisecond is skipped in favour of the next one. On failure no file is
    /// left behind for the caller to reference.
    pub fn put(&self, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            ClipkeepError::BlobWrite(format!(
                "Failed to create blob directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let stamp = Utc::now().timestamp_millis();
        for offset in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(format!("{}.png", stamp + offset));
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(ClipkeepError::BlobWrite(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    )))
                }
            };

            if let Err(e) = file.write_all(bytes).and_then(|_| file.sync_all()) {
                drop(file);
                if let Err(remove_err) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %remove_err, "Failed to remove partial blob");
                }
                return Err(ClipkeepError::BlobWrite(format!(
                    "Failed to write {}: {}",
                    path.display(),
                    e
                )));
            }

            debug!(path = %path.display(), size = bytes.len(), "Stored image blob");
            return Ok(path);
        }

        Err(ClipkeepError::BlobWrite(format!(
            "No free blob name in {} after {} attempts",
            self.dir.display(),
            MAX_NAME_ATTEMPTS
        )))
    }

    /// Read a blob back by the reference returned from [`BlobStore::put`].
    pub fn read(&self, reference: &Path) -> Result<Vec<u8>> {
        let bytes = fs::read(reference)?;
        debug!(path = %reference.display(), size = bytes.len(), "Loaded image blob");
        Ok(bytes)
    }
}
