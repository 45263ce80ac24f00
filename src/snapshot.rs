//! Hash snapshots and their two-file store.
//!
//! A run keeps two independent snapshots on disk: the *baseline*, written
//! only by [`crate::commit::commit`], and the *staged* snapshot, rewritten by
//! every change detection. Both are JSON objects mapping artifact path to
//! content digest. Every write goes to a temporary file in the destination
//! directory which is then renamed over the target, so readers observe
//! either the old snapshot or the new one and never a torn file.
//!
//! Beside the staged snapshot sits the archive marker: the digest of the
//! staged bytes an archive was last built from. Staging removes it and
//! committing requires it to match, which ties a commit to the package that
//! was actually archived.

use crate::artifact::ArtifactPath;
use crate::digest::ContentDigest;
use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

/// Mapping from artifact path to the digest of its content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashSnapshot(BTreeMap<ArtifactPath, ContentDigest>);

impl HashSnapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the recorded digest for `path`.
    #[must_use]
    pub fn get(&self, path: &ArtifactPath) -> Option<&ContentDigest> {
        self.0.get(path)
    }

    /// Record `digest` for `path`, replacing any previous entry.
    pub fn insert(&mut self, path: ArtifactPath, digest: ContentDigest) {
        self.0.insert(path, digest);
    }

    /// Number of recorded artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the snapshot records nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Forget `path`, returning its digest if it was recorded.
    pub fn remove(&mut self, path: &ArtifactPath) -> Option<ContentDigest> {
        self.0.remove(path)
    }

    /// Serialise to the on-disk JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Snapshot`] if encoding fails.
    pub fn to_json(&self, path: &Utf8Path) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|source| PackagerError::Snapshot {
            path: path.to_owned(),
            source,
        })
    }
}

impl FromIterator<(ArtifactPath, ContentDigest)> for HashSnapshot {
    fn from_iter<I: IntoIterator<Item = (ArtifactPath, ContentDigest)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A snapshot read from disk, with a note of whether it had to be discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedSnapshot {
    /// The snapshot contents; empty when the file was absent or unreadable.
    pub snapshot: HashSnapshot,
    /// True when the file existed but did not parse and was ignored.
    pub recovered_from_corrupt_file: bool,
}

/// File name of the archive marker, kept in the staged snapshot's directory.
pub const ARCHIVE_MARKER_FILE_NAME: &str = ".force-packager.archived";

/// Locations of the baseline and staged snapshots for one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashStore {
    baseline: Utf8PathBuf,
    staged: Utf8PathBuf,
    marker: Utf8PathBuf,
}

impl HashStore {
    /// Create a store from explicit snapshot paths.
    #[must_use]
    pub fn new(baseline: impl Into<Utf8PathBuf>, staged: impl Into<Utf8PathBuf>) -> Self {
        let staged = staged.into();
        let marker = staged.parent().map_or_else(
            || Utf8PathBuf::from(ARCHIVE_MARKER_FILE_NAME),
            |dir| dir.join(ARCHIVE_MARKER_FILE_NAME),
        );
        Self {
            baseline: baseline.into(),
            staged,
            marker,
        }
    }

    /// Path of the committed baseline snapshot.
    #[must_use]
    pub fn baseline_path(&self) -> &Utf8Path {
        &self.baseline
    }

    /// Path of the staged snapshot.
    #[must_use]
    pub fn staged_path(&self) -> &Utf8Path {
        &self.staged
    }

    /// Path of the archive marker.
    #[must_use]
    pub fn marker_path(&self) -> &Utf8Path {
        &self.marker
    }

    /// Load the baseline, treating a missing or corrupt file as empty.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] if the file exists but cannot be read.
    pub fn load_baseline(&self) -> Result<LoadedSnapshot> {
        load_snapshot(&self.baseline)
    }

    /// Load the staged snapshot, treating a missing or corrupt file as empty.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] if the file exists but cannot be read.
    pub fn load_staged(&self) -> Result<LoadedSnapshot> {
        load_snapshot(&self.staged)
    }

    /// Atomically replace the staged snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] or [`PackagerError::Snapshot`] if the
    /// snapshot cannot be encoded or written.
    pub fn write_staged(&self, snapshot: &HashSnapshot) -> Result<()> {
        let json = snapshot.to_json(&self.staged)?;
        write_atomic(&self.staged, json.as_bytes())
    }

    /// Digest of the staged file's bytes, or `None` when nothing is staged.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] if the file exists but cannot be read.
    pub fn staged_digest(&self) -> Result<Option<ContentDigest>> {
        Ok(read_optional(&self.staged)?.map(|bytes| ContentDigest::of_bytes(&bytes)))
    }

    /// Record that an archive was built from the current staged snapshot.
    ///
    /// Does nothing when nothing is staged.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] if the staged file cannot be read or the
    /// marker cannot be written.
    pub fn mark_archived(&self) -> Result<()> {
        match self.staged_digest()? {
            Some(digest) => write_atomic(&self.marker, digest.as_str().as_bytes()),
            None => Ok(()),
        }
    }

    /// Digest recorded by the last [`Self::mark_archived`], if any.
    ///
    /// A marker that does not hold a well-formed digest counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] if the marker exists but cannot be read.
    pub fn archived_digest(&self) -> Result<Option<ContentDigest>> {
        let Some(bytes) = read_optional(&self.marker)? else {
            return Ok(None);
        };
        let text = String::from_utf8_lossy(&bytes);
        match ContentDigest::try_from(text.trim()) {
            Ok(digest) => Ok(Some(digest)),
            Err(err) => {
                warn!("ignoring unreadable archive marker {}: {err}", self.marker);
                Ok(None)
            }
        }
    }

    /// Forget that the staged snapshot was archived.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] if an existing marker cannot be removed.
    pub fn clear_archived(&self) -> Result<()> {
        match fs::remove_file(&self.marker) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PackagerError::io(&self.marker)(err)),
        }
    }
}

fn read_optional(path: &Utf8Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(PackagerError::io(path)(err)),
    }
}

fn load_snapshot(path: &Utf8Path) -> Result<LoadedSnapshot> {
    if !path.exists() {
        return Ok(LoadedSnapshot::default());
    }
    let content = fs::read_to_string(path).map_err(PackagerError::io(path))?;
    match serde_json::from_str::<HashSnapshot>(&content) {
        Ok(snapshot) => Ok(LoadedSnapshot {
            snapshot,
            recovered_from_corrupt_file: false,
        }),
        Err(err) => {
            warn!("ignoring unreadable hash snapshot {path}: {err}");
            Ok(LoadedSnapshot {
                snapshot: HashSnapshot::new(),
                recovered_from_corrupt_file: true,
            })
        }
    }
}

/// Write `contents` to `path` through a sibling temporary file and a rename.
///
/// # Errors
///
/// Returns [`PackagerError::Io`] if the parent directory cannot be created or
/// the temporary file cannot be written or renamed.
pub fn write_atomic(path: &Utf8Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent).map_err(PackagerError::io(parent))?;
    let mut temp = NamedTempFile::new_in(parent).map_err(PackagerError::io(parent))?;
    temp.write_all(contents).map_err(PackagerError::io(path))?;
    temp.as_file().sync_all().map_err(PackagerError::io(path))?;
    temp.persist(path)
        .map_err(|err| PackagerError::io(path)(err.error))?;
    Ok(())
}
