//! Artifact identity and discovery rules.
//!
//! An artifact is a source file identified by its path relative to the
//! project root. Paths are always stored with `/` separators so hash
//! snapshots written on one platform compare equal on another.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix appended to an artifact's file name to form its descriptor name.
pub const DESCRIPTOR_SUFFIX: &str = "-meta.xml";

/// Per-directory control file that is never treated as an artifact.
pub const CONTROL_FILE: &str = "force.config";

/// A project-relative artifact path such as `classes/Invoice.cls`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactPath(String);

impl ArtifactPath {
    /// Create an artifact path, normalising separators to `/`.
    #[must_use]
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(path.as_ref().replace('\\', "/"))
    }

    /// Build the artifact path of `file` relative to `root`.
    ///
    /// Returns `None` when `file` does not live under `root`.
    #[must_use]
    pub fn relative_to(root: &Utf8Path, file: &Utf8Path) -> Option<Self> {
        let relative = file.strip_prefix(root).ok()?;
        let joined = relative
            .components()
            .filter_map(|component| match component {
                Utf8Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        (!joined.is_empty()).then_some(Self(joined))
    }

    /// Get the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final path segment, e.g. `Invoice.cls`.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The extension without its leading dot, e.g. `cls`.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        Utf8Path::new(self.file_name()).extension()
    }

    /// The file name without its extension, e.g. `Invoice`.
    #[must_use]
    pub fn base_name(&self) -> &str {
        Utf8Path::new(self.file_name())
            .file_stem()
            .unwrap_or_else(|| self.file_name())
    }

    /// Name of the directory immediately containing the artifact.
    ///
    /// Artifacts sitting directly in the project root have no parent name.
    #[must_use]
    pub fn parent_name(&self) -> Option<&str> {
        let mut segments = self.0.rsplit('/');
        segments.next();
        segments.next()
    }

    /// File name of the companion descriptor, e.g. `Invoice.cls-meta.xml`.
    #[must_use]
    pub fn descriptor_name(&self) -> String {
        format!("{}{DESCRIPTOR_SUFFIX}", self.file_name())
    }

    /// Resolve the artifact back to a filesystem path under `root`.
    #[must_use]
    pub fn to_path(&self, root: &Utf8Path) -> Utf8PathBuf {
        self.0.split('/').fold(root.to_owned(), |acc, part| acc.join(part))
    }
}

impl AsRef<str> for ArtifactPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ArtifactPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An artifact that could not be read or written during a run.
///
/// Failures are per artifact: the run carries on with everything else and
/// the failed artifact is left out of the staged snapshot so a later run
/// picks it up again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFailure {
    /// The artifact, or directory, that failed.
    pub artifact: ArtifactPath,
    /// The rendered error.
    pub reason: String,
}

impl ArtifactFailure {
    /// Record `err` against `artifact`.
    #[must_use]
    pub fn new(artifact: ArtifactPath, err: &impl fmt::Display) -> Self {
        Self {
            artifact,
            reason: err.to_string(),
        }
    }
}

/// Decide whether a file name denotes an independent artifact.
///
/// Hidden files, names without an extension, the per-directory control file,
/// and companion descriptors are all excluded.
#[must_use]
pub fn is_artifact_file_name(name: &str) -> bool {
    if name.starts_with('.') || name == CONTROL_FILE || name.ends_with(DESCRIPTOR_SUFFIX) {
        return false;
    }
    Utf8Path::new(name)
        .extension()
        .is_some_and(|ext| !ext.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn relative_to_uses_forward_slashes() {
        let root = Utf8Path::new("/work/project");
        let file = Utf8Path::new("/work/project/classes/Invoice.cls");
        let path = ArtifactPath::relative_to(root, file).expect("under root");
        assert_eq!(path.as_str(), "classes/Invoice.cls");
    }

    #[test]
    fn relative_to_rejects_paths_outside_root() {
        let root = Utf8Path::new("/work/project");
        assert!(ArtifactPath::relative_to(root, Utf8Path::new("/elsewhere/a.cls")).is_none());
    }

    #[test]
    fn new_normalises_backslashes() {
        assert_eq!(ArtifactPath::new(r"aura\Cart\Cart.cmp").as_str(), "aura/Cart/Cart.cmp");
    }

    #[test]
    fn name_parts_are_split_from_the_final_segment() {
        let path = ArtifactPath::from("aura/Cart/CartController.js");
        assert_eq!(path.file_name(), "CartController.js");
        assert_eq!(path.extension(), Some("js"));
        assert_eq!(path.base_name(), "CartController");
        assert_eq!(path.parent_name(), Some("Cart"));
        assert_eq!(path.descriptor_name(), "CartController.js-meta.xml");
    }

    #[test]
    fn root_level_artifact_has_no_parent() {
        assert_eq!(ArtifactPath::from("Cart.cmp").parent_name(), None);
    }

    #[test]
    fn to_path_rebuilds_a_native_path() {
        let path = ArtifactPath::from("classes/Invoice.cls");
        assert_eq!(
            path.to_path(Utf8Path::new("project")),
            Utf8PathBuf::from("project").join("classes").join("Invoice.cls")
        );
    }

    #[rstest]
    #[case::class("Invoice.cls", true)]
    #[case::camel_case_extension("Account.objectTranslation", true)]
    #[case::descriptor("Invoice.cls-meta.xml", false)]
    #[case::control_file("force.config", false)]
    #[case::hidden(".gitignore", false)]
    #[case::no_extension("README", false)]
    #[case::trailing_dot("draft.", false)]
    fn artifact_file_name_filter(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_artifact_file_name(name), expected);
    }
}
