//! Error types for the packaging engine.
//!
//! Only run-fatal conditions are returned as errors. Per-artifact problems
//! (an unknown extension, a missing template, a file that cannot be read)
//! are recorded in [`crate::detect::Detection`] or
//! [`crate::assemble::AssemblyReport`] and the run carries on.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Errors that can abort a packaging operation.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// A file could not be read, written, copied, or traversed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path the failing operation was acting on.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A hash snapshot could not be serialised.
    #[error("hash snapshot {path} could not be encoded: {source}")]
    Snapshot {
        /// Location of the snapshot file.
        path: Utf8PathBuf,
        /// The underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },

    /// A configuration source exists but could not be parsed.
    #[error("invalid configuration in {path}: {reason}")]
    Config {
        /// The configuration file that failed to parse.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// The archive writer failed while streaming the output tree.
    #[error("failed to write archive {path}: {source}")]
    ArchiveWrite {
        /// Destination of the archive.
        path: Utf8PathBuf,
        /// The underlying archive error.
        #[source]
        source: zip::result::ZipError,
    },

    /// The output tree to be archived does not exist.
    #[error("nothing to archive: output tree {path} does not exist")]
    ArchiveSourceMissing {
        /// The missing output root.
        path: Utf8PathBuf,
    },

    /// There is no staged snapshot to promote.
    #[error("no staged hash snapshot at {path}; run `package` first")]
    NothingStaged {
        /// Where the staged snapshot was expected.
        path: Utf8PathBuf,
    },

    /// The staged snapshot was never archived, or was restaged after the
    /// archive was built.
    #[error("staged hash snapshot {path} has not been archived; run `zip` first")]
    NotArchived {
        /// The staged snapshot that was to be committed.
        path: Utf8PathBuf,
    },

    /// Another packaging run holds the lock for this output directory.
    #[error("another packaging run holds the lock at {path}")]
    Locked {
        /// The contended lock file.
        path: Utf8PathBuf,
    },

    /// No artifact was packaged and the caller asked for that to be fatal.
    #[error("no new or modified files detected")]
    NoChangesDetected,

    /// A digest string in a snapshot is not well-formed.
    #[error("invalid content digest: {reason}")]
    InvalidDigest {
        /// Why the digest was rejected.
        reason: String,
    },
}

impl PackagerError {
    /// Build a closure mapping an [`std::io::Error`] to [`PackagerError::Io`]
    /// for the given path.
    #[must_use]
    pub fn io(path: impl Into<Utf8PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Map a directory traversal error to [`PackagerError::Io`], naming the
/// entry that failed or `root` when walkdir does not know it.
pub(crate) fn walk_error(root: &Utf8Path, err: walkdir::Error) -> PackagerError {
    let path = err
        .path()
        .and_then(Utf8Path::from_path)
        .map_or_else(|| root.to_owned(), Utf8Path::to_owned);
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    PackagerError::Io { path, source }
}

/// Result type alias using [`PackagerError`].
pub type Result<T> = std::result::Result<T, PackagerError>;
