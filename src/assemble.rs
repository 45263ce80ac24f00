//! Output tree assembly.
//!
//! The assembler turns a [`ChangeSet`] into the directory layout the
//! deployment archive expects: each artifact copied to
//! `<content root>/<target folder>/<file name>`, its descriptor beside it
//! when one is required, and `package.xml` at the root. The tree is rebuilt
//! from scratch every run. Assembly never touches the hash snapshots.

use crate::artifact::{ArtifactFailure, ArtifactPath};
use crate::classify::{Classification, UnclassifiedReason, classify};
use crate::config::{Config, MockArtifact};
use crate::detect::ChangeSet;
use crate::error::{PackagerError, Result};
use crate::manifest::{MANIFEST_FILE_NAME, PackageManifest};
use crate::metadata::{CompanionIndex, MetadataDescriptor, Resolution, resolve_metadata};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;

/// Where a packaged artifact's descriptor came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorOutcome {
    /// The artifact kind carries no descriptor.
    NotRequired,
    /// A companion file from the project tree was copied.
    Companion(Utf8PathBuf),
    /// A descriptor was rendered from a template.
    Synthesized,
    /// A descriptor was required but no template exists; none was written.
    MissingTemplate,
}

/// An artifact written to the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedArtifact {
    /// The source artifact.
    pub artifact: ArtifactPath,
    /// Location of the copy, relative to the content root.
    pub target: String,
    /// How its descriptor was obtained.
    pub descriptor: DescriptorOutcome,
    /// True when the artifact came from configuration rather than the tree.
    pub mock: bool,
}

/// An artifact left out of the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedArtifact {
    /// The source artifact.
    pub artifact: ArtifactPath,
    /// Why no rule matched.
    pub reason: UnclassifiedReason,
}

/// Summary of one assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Artifacts written, in processing order.
    pub packaged: Vec<PackagedArtifact>,
    /// Artifacts skipped as unclassified.
    pub skipped: Vec<SkippedArtifact>,
    /// Artifacts that could not be copied or whose descriptor could not be
    /// read or written.
    pub failed: Vec<ArtifactFailure>,
    /// Path of the written `package.xml`.
    pub manifest_path: Utf8PathBuf,
}

impl AssemblyReport {
    /// True when only the manifest was written.
    ///
    /// This is a legitimate outcome; whether it is acceptable is up to the
    /// caller.
    #[must_use]
    pub fn is_empty_package(&self) -> bool {
        self.packaged.is_empty()
    }

    /// Artifacts whose required descriptor could not be produced.
    pub fn missing_templates(&self) -> impl Iterator<Item = &ArtifactPath> {
        self.packaged
            .iter()
            .filter(|p| p.descriptor == DescriptorOutcome::MissingTemplate)
            .map(|p| &p.artifact)
    }
}

/// Where an artifact's bytes come from.
enum Source<'a> {
    File(Utf8PathBuf),
    Inline(&'a str),
}

/// Builds the output tree for one run.
#[derive(Debug)]
pub struct Assembler {
    project_root: Utf8PathBuf,
    content_root: Utf8PathBuf,
    api_version: u32,
    preserve: Vec<Utf8PathBuf>,
}

impl Assembler {
    /// Create an assembler writing below `content_root`.
    #[must_use]
    pub fn new(
        project_root: impl Into<Utf8PathBuf>,
        content_root: impl Into<Utf8PathBuf>,
        api_version: u32,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            content_root: content_root.into(),
            api_version,
            preserve: Vec::new(),
        }
    }

    /// Never delete `path` when clearing the content root.
    ///
    /// Used for the snapshot and lock files in case the content root is
    /// configured to coincide with the output directory.
    #[must_use]
    pub fn preserving(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.preserve.push(path.into());
        self
    }

    /// Rebuild the output tree from `changes` plus `mocks`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] if the tree cannot be cleared or the
    /// manifest cannot be written. Unclassified artifacts, missing templates,
    /// and artifacts that fail to copy are reported, not raised.
    pub fn assemble(&self, changes: &ChangeSet, mocks: &[MockArtifact]) -> Result<AssemblyReport> {
        self.reset_content_root()?;
        let companions = CompanionIndex::scan(&self.project_root);
        let mut report = AssemblyReport::default();
        let mut written: HashMap<String, ArtifactPath> = HashMap::new();

        let sources = changes
            .paths()
            .map(|artifact| {
                (
                    artifact.clone(),
                    Source::File(artifact.to_path(&self.project_root)),
                )
            })
            .chain(
                mocks
                    .iter()
                    .map(|mock| (ArtifactPath::new(&mock.path), Source::Inline(&mock.contents))),
            );
        for (artifact, source) in sources {
            if let Err(err) = self.place(&artifact, &source, &companions, &mut report, &mut written)
            {
                warn!("failed to package {artifact}: {err}");
                report.failed.push(ArtifactFailure::new(artifact, &err));
            }
        }

        let manifest_path = self.content_root.join(MANIFEST_FILE_NAME);
        let manifest = PackageManifest::new(self.api_version).render();
        fs::write(&manifest_path, manifest).map_err(PackagerError::io(&manifest_path))?;
        report.manifest_path = manifest_path;

        if report.is_empty_package() {
            warn!("no artifacts were packaged; the output tree holds only {MANIFEST_FILE_NAME}");
        } else {
            info!(
                "assembled {} artifact(s) into {} ({} skipped)",
                report.packaged.len(),
                self.content_root,
                report.skipped.len()
            );
        }
        Ok(report)
    }

    fn place(
        &self,
        artifact: &ArtifactPath,
        source: &Source<'_>,
        companions: &CompanionIndex,
        report: &mut AssemblyReport,
        written: &mut HashMap<String, ArtifactPath>,
    ) -> Result<()> {
        let (target_folder, requires_metadata) = match classify(artifact, artifact.extension()) {
            Classification::Classified {
                target_folder,
                requires_metadata,
            } => (target_folder, requires_metadata),
            Classification::Unclassified(reason) => {
                warn!("skipping {artifact}: {reason}");
                report.skipped.push(SkippedArtifact {
                    artifact: artifact.clone(),
                    reason,
                });
                return Ok(());
            }
        };

        // Resolve first so a failed companion read leaves no copy behind.
        let resolution = resolve_metadata(artifact, requires_metadata, companions, self.api_version)?;

        let target = format!("{target_folder}/{}", artifact.file_name());
        let folder = self.content_path(&target_folder);
        fs::create_dir_all(&folder).map_err(PackagerError::io(&folder))?;
        let destination = folder.join(artifact.file_name());
        match source {
            Source::File(path) => {
                fs::copy(path, &destination).map_err(PackagerError::io(path))?;
            }
            Source::Inline(contents) => {
                fs::write(&destination, contents).map_err(PackagerError::io(&destination))?;
            }
        }
        if let Some(previous) = written.insert(target.clone(), artifact.clone()) {
            warn!("{artifact} replaces {previous} at {target}");
        }
        debug!("{artifact} -> {target}");

        let descriptor = match resolution {
            Resolution::NotRequired => DescriptorOutcome::NotRequired,
            Resolution::MissingTemplate { .. } => DescriptorOutcome::MissingTemplate,
            Resolution::Descriptor(descriptor) => {
                let path = folder.join(artifact.descriptor_name());
                if let Err(err) = fs::write(&path, descriptor.as_bytes()) {
                    if let Err(cleanup) = fs::remove_file(&destination) {
                        debug!("could not remove {destination}: {cleanup}");
                    }
                    return Err(PackagerError::io(&path)(err));
                }
                match descriptor {
                    MetadataDescriptor::Companion { source, .. } => {
                        DescriptorOutcome::Companion(source)
                    }
                    MetadataDescriptor::Synthesized(_) => {
                        info!("generated descriptor {}", path);
                        DescriptorOutcome::Synthesized
                    }
                }
            }
        };

        report.packaged.push(PackagedArtifact {
            artifact: artifact.clone(),
            target,
            descriptor,
            mock: matches!(source, Source::Inline(_)),
        });
        Ok(())
    }

    fn content_path(&self, relative: &str) -> Utf8PathBuf {
        relative
            .split('/')
            .fold(self.content_root.clone(), |acc, part| acc.join(part))
    }

    /// Empty the content root, keeping any preserved files, and recreate it.
    fn reset_content_root(&self) -> Result<()> {
        clear_directory(&self.content_root, &self.preserve)?;
        fs::create_dir_all(&self.content_root).map_err(PackagerError::io(&self.content_root))
    }
}

/// Delete everything inside `root` except entries leading to a path in
/// `preserve`. A missing `root` is left missing.
pub(crate) fn clear_directory(root: &Utf8Path, preserve: &[Utf8PathBuf]) -> Result<()> {
    if !root.is_dir() {
        return Ok(());
    }
    let entries = root.read_dir_utf8().map_err(PackagerError::io(root))?;
    for entry in entries {
        let entry = entry.map_err(PackagerError::io(root))?;
        let path = entry.path();
        if preserve.iter().any(|keep| keep.starts_with(path)) {
            continue;
        }
        let file_type = entry.file_type().map_err(PackagerError::io(path))?;
        if file_type.is_dir() {
            fs::remove_dir_all(path).map_err(PackagerError::io(path))?;
        } else {
            fs::remove_file(path).map_err(PackagerError::io(path))?;
        }
    }
    Ok(())
}

/// Assemble the output tree described by `config` from `changes`.
///
/// Configured mock artifacts are always included. The hash snapshot and
/// lock files are protected from the clean-up of the content root.
///
/// # Errors
///
/// See [`Assembler::assemble`].
pub fn assemble(changes: &ChangeSet, config: &Config) -> Result<AssemblyReport> {
    let store = config.hash_store();
    Assembler::new(config.project_root(), config.content_root(), config.api_version())
        .preserving(store.baseline_path())
        .preserving(store.staged_path())
        .preserving(config.lock_path())
        .assemble(changes, config.mock_artifacts())
}

#[cfg(test)]
#[path = "assemble_tests.rs"]
mod tests;
