//! Operation sequencing.
//!
//! Each public function here is one user-facing operation. All of them hold
//! the [`RunLock`] of the configured output directory for their whole
//! duration. The lower-level modules stay callable on their own for callers
//! that need to interleave other steps (an upload between `zip` and
//! `commit`, say).

use crate::archive::{ArchiveSummary, build_archive};
use crate::assemble::{AssemblyReport, assemble, clear_directory};
use crate::commit;
use crate::config::Config;
use crate::detect::{Detection, detect_and_stage};
use crate::error::{PackagerError, Result};
use crate::lock::RunLock;
use log::{info, warn};

/// Result of [`package`].
#[derive(Debug, Clone)]
pub struct PackageOutcome {
    /// What change detection found and staged.
    pub detection: Detection,
    /// What assembly wrote.
    pub report: AssemblyReport,
}

impl PackageOutcome {
    /// True when change detection found nothing to package.
    ///
    /// Mock artifacts are not changes, so a package holding only mocks
    /// still counts as having no changes.
    #[must_use]
    pub fn has_no_changes(&self) -> bool {
        self.detection.changes.is_empty()
    }
}

/// Outcome of a full [`run`].
#[derive(Debug, Clone)]
pub enum RunStatus {
    /// The package was archived and the baseline advanced.
    Completed {
        /// The packaging step's outcome.
        package: PackageOutcome,
        /// The archive that was written.
        archive: ArchiveSummary,
    },
    /// Nothing changed since the last commit; no archive was written and the
    /// baseline is untouched.
    NoChanges {
        /// The packaging step's outcome.
        package: PackageOutcome,
    },
}

/// Detect changes, stage their digests, and assemble the output tree.
///
/// With `include_all` every artifact is packaged regardless of the baseline.
///
/// # Errors
///
/// Returns [`PackagerError::Locked`] if another run is active, or any error
/// from detection or assembly.
pub fn package(config: &Config, include_all: bool) -> Result<PackageOutcome> {
    let _lock = RunLock::acquire(&config.lock_path())?;
    package_locked(config, include_all)
}

/// Archive the assembled output tree and mark the staged snapshot as
/// archived.
///
/// # Errors
///
/// Returns [`PackagerError::Locked`] if another run is active, or any error
/// from [`build_archive`] or from writing the archive marker.
pub fn zip(config: &Config) -> Result<ArchiveSummary> {
    let _lock = RunLock::acquire(&config.lock_path())?;
    zip_locked(config)
}

/// Promote the staged snapshot to the baseline.
///
/// Only a snapshot that [`zip`] archived since it was last staged can be
/// committed.
///
/// # Errors
///
/// Returns [`PackagerError::Locked`] if another run is active, or any error
/// from [`commit::commit`], including [`PackagerError::NotArchived`].
pub fn commit(config: &Config) -> Result<()> {
    let _lock = RunLock::acquire(&config.lock_path())?;
    commit::commit(&config.hash_store())
}

/// Delete the output directory's contents, hash snapshots included, so the
/// next run packages every artifact.
///
/// The lock file is kept because it is held while clearing.
///
/// # Errors
///
/// Returns [`PackagerError::Locked`] if another run is active, or
/// [`PackagerError::Io`] if something cannot be removed.
pub fn reset(config: &Config) -> Result<()> {
    let lock = RunLock::acquire(&config.lock_path())?;
    let output_dir = config.output_dir();
    clear_directory(&output_dir, &[lock.path().to_owned()])?;
    // The archive may be configured outside the output directory.
    let archive = config.archive_path();
    if archive.is_file() {
        std::fs::remove_file(&archive).map_err(PackagerError::io(&archive))?;
    }
    info!("cleared {output_dir}");
    Ok(())
}

/// Package, archive, and commit in one locked sequence.
///
/// The baseline only advances once the archive has been written. When no
/// artifact changed the run stops after packaging with
/// [`RunStatus::NoChanges`], or fails with
/// [`PackagerError::NoChangesDetected`] if `fail_if_empty` is set.
///
/// # Errors
///
/// Returns [`PackagerError::Locked`] if another run is active, or the first
/// error from any step. An archive failure leaves the baseline unmodified.
pub fn run(config: &Config, include_all: bool, fail_if_empty: bool) -> Result<RunStatus> {
    let _lock = RunLock::acquire(&config.lock_path())?;
    let package = package_locked(config, include_all)?;

    if package.has_no_changes() {
        if fail_if_empty {
            return Err(PackagerError::NoChangesDetected);
        }
        warn!("no new or modified files detected; nothing archived or committed");
        return Ok(RunStatus::NoChanges { package });
    }

    let archive = zip_locked(config)?;
    commit::commit(&config.hash_store())?;
    Ok(RunStatus::Completed { package, archive })
}

fn package_locked(config: &Config, include_all: bool) -> Result<PackageOutcome> {
    let store = config.hash_store();
    let mut detection = detect_and_stage(&config.project_root(), &store, include_all)?;
    let report = assemble(&detection.changes, config)?;

    if unstage_failures(&mut detection, &report) {
        store.write_staged(&detection.staged)?;
    }
    Ok(PackageOutcome { detection, report })
}

/// Drop artifacts that failed assembly from the staged snapshot so they are
/// not committed without having been packaged. Returns true if any were
/// dropped.
fn unstage_failures(detection: &mut Detection, report: &AssemblyReport) -> bool {
    let mut dropped = false;
    for failure in &report.failed {
        dropped |= detection.staged.remove(&failure.artifact).is_some();
    }
    dropped
}

fn zip_locked(config: &Config) -> Result<ArchiveSummary> {
    let store = config.hash_store();
    // build_archive removes the old archive before it can fail.
    store.clear_archived()?;
    let summary = build_archive(&config.content_root(), &config.archive_path())?;
    store.mark_archived()?;
    Ok(summary)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
