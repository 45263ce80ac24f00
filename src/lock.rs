//! Exclusive run lock for an output directory.
//!
//! Two runs against the same output directory would race on the staged and
//! baseline snapshots, so every operation holds a [`RunLock`] for its whole
//! duration. The lock is an OS advisory lock on a file inside the output
//! directory; it is released when the guard is dropped or the process dies,
//! so a crashed run never leaves a stale lock behind.

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use log::{debug, trace};
use std::fs::{self, File, OpenOptions};
use std::io::Write;

/// A held run lock. Dropping it releases the lock.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: Utf8PathBuf,
}

impl RunLock {
    /// Take the lock at `path` without blocking.
    ///
    /// The parent directory is created if needed. The file is left on disk
    /// after release; only the OS lock on it matters.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Locked`] if another run holds the lock, or
    /// [`PackagerError::Io`] if the lock file cannot be opened.
    pub fn acquire(path: &Utf8Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(PackagerError::io(parent))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(PackagerError::io(path))?;

        if let Err(err) = file.try_lock_exclusive() {
            if err.kind() == fs2::lock_contended_error().kind() {
                return Err(PackagerError::Locked {
                    path: path.to_owned(),
                });
            }
            return Err(PackagerError::io(path)(err));
        }

        // Record the holder for anyone inspecting a contended lock by hand.
        file.set_len(0).map_err(PackagerError::io(path))?;
        writeln!(file, "{}", std::process::id()).map_err(PackagerError::io(path))?;
        debug!("acquired run lock {path}");

        Ok(Self {
            file,
            path: path.to_owned(),
        })
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if FileExt::unlock(&self.file).is_err() {
            // The descriptor is closed right after, which releases the lock anyway.
        }
        trace!("released run lock {}", self.path);
    }
}
