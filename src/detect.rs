//! Content-hash change detection.
//!
//! Detection walks the project tree, digests every artifact, and compares
//! each digest with the committed baseline. The freshly computed digests
//! form the staged snapshot, which is persisted before assembly starts so
//! an interrupted run can simply be repeated. An artifact that cannot be
//! read is skipped with a warning and does not fail the run.

use crate::artifact::{ArtifactFailure, ArtifactPath, is_artifact_file_name};
use crate::digest::digest_file;
use crate::error::{PackagerError, Result, walk_error};
use crate::snapshot::{HashSnapshot, HashStore};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use walkdir::WalkDir;

/// Why an artifact is part of the change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// The baseline has no entry for the artifact.
    New,
    /// The digest differs from the baseline.
    Modified,
    /// The caller asked for every artifact to be included.
    Forced,
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::New => "new",
            Self::Modified => "modified",
            Self::Forced => "forced",
        };
        f.write_str(label)
    }
}

/// What the assembler should do with a changed artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// Copy the artifact into the package.
    Include(ChangeReason),
}

/// Artifacts to package in this run, keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: BTreeMap<ArtifactPath, ChangeAction>,
}

impl ChangeSet {
    /// Create an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` for inclusion.
    pub fn include(&mut self, path: ArtifactPath, reason: ChangeReason) {
        self.entries.insert(path, ChangeAction::Include(reason));
    }

    /// Whether `path` is part of the change set.
    #[must_use]
    pub fn contains(&self, path: &ArtifactPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of changed artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing changed; callers treat this as "nothing to do".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the changed artifacts in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&ArtifactPath, &ChangeAction)> {
        self.entries.iter()
    }

    /// Iterate over the changed artifact paths.
    pub fn paths(&self) -> impl Iterator<Item = &ArtifactPath> {
        self.entries.keys()
    }
}

/// Result of [`detect_and_stage`].
#[derive(Debug, Clone)]
pub struct Detection {
    /// Artifacts to package.
    pub changes: ChangeSet,
    /// Digests of every artifact read, as written to the staged file.
    pub staged: HashSnapshot,
    /// Artifacts or directories that could not be read this run.
    pub failed: Vec<ArtifactFailure>,
    /// True when the baseline existed but could not be parsed.
    pub baseline_was_corrupt: bool,
}

/// Artifacts found below a project root.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Artifact paths with their location on disk, in sorted order.
    pub artifacts: Vec<(ArtifactPath, Utf8PathBuf)>,
    /// Entries the walk could not read; their contents are not listed.
    pub failed: Vec<ArtifactFailure>,
}

/// Changes found by comparing digests with a baseline.
#[derive(Debug, Default)]
pub struct Comparison {
    /// Artifacts to package.
    pub changes: ChangeSet,
    /// Digest of every artifact that could be read.
    pub staged: HashSnapshot,
    /// Artifacts that could not be digested.
    pub failed: Vec<ArtifactFailure>,
}

/// List every artifact below `project_root` in sorted order.
///
/// An unreadable entry is recorded and skipped; the walk carries on.
///
/// # Errors
///
/// Returns [`PackagerError::Io`] if the root itself is missing.
pub fn discover_artifacts(project_root: &Utf8Path) -> Result<Discovery> {
    if !project_root.is_dir() {
        return Err(PackagerError::Io {
            path: project_root.to_owned(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "project directory does not exist",
            ),
        });
    }
    let mut discovery = Discovery::default();
    for entry in WalkDir::new(project_root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let artifact = err
                    .path()
                    .and_then(Utf8Path::from_path)
                    .and_then(|path| ArtifactPath::relative_to(project_root, path))
                    .unwrap_or_else(|| ArtifactPath::new("."));
                let err = walk_error(project_root, err);
                warn!("skipping unreadable {artifact}: {err}");
                discovery.failed.push(ArtifactFailure::new(artifact, &err));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            warn!("skipping non UTF-8 file name {}", entry.path().display());
            continue;
        };
        if !is_artifact_file_name(name) {
            continue;
        }
        let Ok(path) = Utf8PathBuf::try_from(entry.path().to_path_buf()) else {
            continue;
        };
        if let Some(artifact) = ArtifactPath::relative_to(project_root, &path) {
            discovery.artifacts.push((artifact, path));
        }
    }
    Ok(discovery)
}

/// Digest `artifacts` and compare each digest with `baseline`.
///
/// An artifact that cannot be read is recorded in
/// [`Comparison::failed`] and left out of both the change set and the
/// staged snapshot, so the next run looks at it again.
#[must_use]
pub fn compare_artifacts(
    artifacts: Vec<(ArtifactPath, Utf8PathBuf)>,
    baseline: &HashSnapshot,
    include_all: bool,
) -> Comparison {
    let mut comparison = Comparison::default();

    for (artifact, path) in artifacts {
        let digest = match digest_file(&path) {
            Ok(digest) => digest,
            Err(err) => {
                warn!("skipping {artifact}: {err}");
                comparison.failed.push(ArtifactFailure::new(artifact, &err));
                continue;
            }
        };
        debug!("{artifact}: {digest}");

        let reason = if include_all {
            Some(ChangeReason::Forced)
        } else {
            match baseline.get(&artifact) {
                None => Some(ChangeReason::New),
                Some(previous) if *previous != digest => Some(ChangeReason::Modified),
                Some(_) => None,
            }
        };
        if let Some(reason) = reason {
            info!("change ({reason}): {artifact}");
            comparison.changes.include(artifact.clone(), reason);
        }
        comparison.staged.insert(artifact, digest);
    }

    comparison
}

/// Compare the project tree against `baseline`.
///
/// Every readable artifact is digested, whether or not it ends up in the
/// change set, so the returned snapshot is complete. Artifacts that no
/// longer exist are absent from it.
///
/// # Errors
///
/// Returns [`PackagerError::Io`] if the project root is missing.
pub fn detect_changes(
    project_root: &Utf8Path,
    baseline: &HashSnapshot,
    include_all: bool,
) -> Result<Comparison> {
    let discovery = discover_artifacts(project_root)?;
    let mut comparison = compare_artifacts(discovery.artifacts, baseline, include_all);
    let mut failed = discovery.failed;
    failed.append(&mut comparison.failed);
    comparison.failed = failed;
    Ok(comparison)
}

/// Load the baseline, detect changes, and persist the staged snapshot.
///
/// Any archive marker is removed before the staged file is rewritten, so a
/// commit must be preceded by a fresh archive. The baseline is only read.
///
/// # Errors
///
/// Propagates any error from [`detect_changes`], from removing the marker,
/// or from writing the staged snapshot.
pub fn detect_and_stage(
    project_root: &Utf8Path,
    store: &HashStore,
    include_all: bool,
) -> Result<Detection> {
    let baseline = store.load_baseline()?;
    if baseline.recovered_from_corrupt_file {
        warn!(
            "baseline {} is unreadable; treating every artifact as changed",
            store.baseline_path()
        );
    }
    let Comparison {
        changes,
        staged,
        failed,
    } = detect_changes(project_root, &baseline.snapshot, include_all)?;
    store.clear_archived()?;
    store.write_staged(&staged)?;
    info!(
        "{} of {} artifact(s) changed; staged hashes written to {}",
        changes.len(),
        staged.len(),
        store.staged_path()
    );
    if !failed.is_empty() {
        warn!("{} artifact(s) could not be read and were skipped", failed.len());
    }
    Ok(Detection {
        changes,
        staged,
        failed,
        baseline_was_corrupt: baseline.recovered_from_corrupt_file,
    })
}

#[cfg(test)]
#[path = "detect_tests.rs"]
mod tests;
