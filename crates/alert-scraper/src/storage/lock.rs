//! Single-instance lock over the scraper's state files.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::error::LedgerError;

/// Exclusive advisory lock on `<id file>.lock`, held until dropped.
///
/// Two scrapers appending to the same log and rewriting the same identifier
/// file would corrupt both, so startup fails if the lock is taken.
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
    _file: File,
}

impl StateLock {
    /// Acquire the lock guarding `id_file`.
    pub fn acquire(id_file: &Path) -> Result<Self, LedgerError> {
        let path = lock_path(id_file);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LedgerError::LockFile {
                path: path.clone(),
                source,
            })?;
        file.try_lock_exclusive().map_err(|source| LedgerError::Locked {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), "Acquired state lock");
        Ok(Self { path, _file: file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lock_path(id_file: &Path) -> PathBuf {
    let mut name = id_file.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}
