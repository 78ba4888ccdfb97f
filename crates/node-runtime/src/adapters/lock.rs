//! Exclusive data directory lock.
//!
//! Two mirrors replaying into the same RocksDB would interleave commits and
//! corrupt the watermark ordering, so the runtime takes an advisory lock on
//! `mirror.lock` inside the data directory before opening anything.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Name of the lock file inside the data directory.
pub const LOCK_FILE: &str = "mirror.lock";

/// Errors taking the data directory lock.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Failed to prepare data directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Data directory {path} is already locked by another mirror process")]
    AlreadyLocked { path: String },
}

/// Holds the exclusive lock for as long as the value lives.
pub struct DataDirLock {
    file: File,
    path: PathBuf,
}

impl DataDirLock {
    /// Creates the data directory if needed and takes the lock.
    pub fn acquire(data_dir: &Path) -> Result<Self, LockError> {
        let io = |source| LockError::Io {
            path: data_dir.display().to_string(),
            source,
        };

        std::fs::create_dir_all(data_dir).map_err(io)?;

        let path = data_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(io)?;

        file.try_lock_exclusive()
            .map_err(|_| LockError::AlreadyLocked {
                path: data_dir.display().to_string(),
            })?;

        tracing::debug!("Locked data directory {}", data_dir.display());
        Ok(DataDirLock { file, path })
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DataDirLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
