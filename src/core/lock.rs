//! core::lock
//!
//! Exclusive build-directory lock.
//!
//! # Architecture
//!
//! Two baker processes writing the same objects and precompiled modules at
//! once would interleave compiler outputs. The build lock admits a single
//! writer per build directory.
//!
//! # Storage
//!
//! - `<build>/.baker.lock` - Lock file with OS-level exclusive lock
//!
//! # Invariants
//!
//! - Lock is held from before the first artifact is written until the run ends
//! - Lock is automatically released on drop (RAII pattern)
//! - Lock acquisition is non-blocking (fails fast if locked)
//!
//! # Example
//!
//! ```no_run
//! use baker::core::lock::BuildLock;
//! use baker::core::paths::BuildPaths;
//!
//! let paths = BuildPaths::new("/proj", "src", "build", "obj", "header_units");
//! let lock = BuildLock::acquire(&paths).unwrap();
//!
//! // Compile while holding the lock
//!
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::BuildPaths;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("build directory '{0}' is locked by another baker process")]
    AlreadyLocked(PathBuf),

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

/// An exclusive lock on a build directory.
///
/// Released when dropped.
#[derive(Debug)]
pub struct BuildLock {
    file: File,
}

impl BuildLock {
    /// Attempt to acquire the build lock.
    ///
    /// Creates the build directory if needed. The lock is non-blocking: if
    /// another process holds it, this returns [`LockError::AlreadyLocked`]
    /// immediately.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(paths: &BuildPaths) -> Result<Self, LockError> {
        let build_dir = paths.build_dir();
        fs::create_dir_all(build_dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", build_dir.display(), e))
        })?;

        let path = paths.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { file }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(LockError::AlreadyLocked(build_dir.to_path_buf()))
            }
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
