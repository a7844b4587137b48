//! Path-identified advisory file lock.
//!
//! [`FileLock`] opens a fresh descriptor for every acquisition and closes it
//! on release. Locks are `flock(2)` style: they belong to the open file
//! description, so two descriptors exclude each other even inside a single
//! process. On platforms where advisory locks are per-process instead, two
//! `FileLock`s on the same path in one process do not exclude each other;
//! only cross-process exclusion is guaranteed there.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{CacheError, Result};
use crate::fs::open_or_create;

/// Lock mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Compatible with other shared locks.
    Shared,
    /// Excludes every other lock.
    Exclusive,
}

/// Advisory lock on a file path.
///
/// The lock file is created on first use (including missing parent
/// directories) and is never removed. Dropping a held lock releases it.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    file: Option<File>,
}

impl FileLock {
    /// Create an unlocked handle for `path`. No I/O is performed.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    /// Lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this instance currently holds the lock.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Acquire the lock, waiting until it is available.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::AlreadyHeld`] if this instance holds the lock,
    /// or [`CacheError::LockUnavailable`] if the lock file cannot be opened or
    /// the lock call fails.
    pub fn acquire(&mut self, mode: LockMode) -> Result<()> {
        let file = self.open()?;
        let locked = match mode {
            LockMode::Shared => FileExt::lock_shared(&file),
            LockMode::Exclusive => FileExt::lock_exclusive(&file),
        };
        match locked {
            Ok(()) => {
                self.file = Some(file);
                Ok(())
            }
            Err(source) => Err(CacheError::LockUnavailable {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Try to acquire the lock without waiting.
    ///
    /// Returns `false` if another holder prevents acquisition; the descriptor
    /// opened for the attempt is closed before returning.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::AlreadyHeld`] if this instance holds the lock, or
    /// [`CacheError::Io`] if opening or locking fails for a reason other
    /// than contention.
    pub fn try_acquire(&mut self, mode: LockMode) -> Result<bool> {
        let file = self.open()?;
        let locked = match mode {
            LockMode::Shared => FileExt::try_lock_shared(&file),
            LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
        };
        match locked {
            Ok(()) => {
                self.file = Some(file);
                Ok(true)
            }
            Err(e) if is_contended(&e) => Ok(false),
            Err(e) => Err(CacheError::io("lock", &self.path, e)),
        }
    }

    /// Release the lock and close its descriptor. No-op if not held.
    pub fn release(&mut self) {
        if let Some(file) = self.file.take()
            && let Err(e) = FileExt::unlock(&file)
        {
            // Closing the descriptor drops the lock regardless.
            tracing::debug!(path = %self.path.display(), error = %e, "Failed to unlock");
        }
    }

    fn open(&self) -> Result<File> {
        if self.is_held() {
            return Err(CacheError::AlreadyHeld(self.path.clone()));
        }
        open_or_create(&self.path).map_err(|source| CacheError::LockUnavailable {
            path: self.path.clone(),
            source,
        })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
