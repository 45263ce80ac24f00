//! Companion descriptor resolution and synthesis.
//!
//! An artifact that requires metadata is shipped with a `<file>-meta.xml`
//! descriptor. A hand-authored companion found anywhere in the project tree
//! always wins and is copied byte for byte; otherwise a minimal descriptor is
//! synthesised from the template for the artifact's extension.

use crate::artifact::{ArtifactPath, DESCRIPTOR_SUFFIX};
use crate::error::{PackagerError, Result, walk_error};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use walkdir::WalkDir;

/// XML namespace shared by every descriptor and the package manifest.
pub const METADATA_NAMESPACE: &str = "http://soap.sforce.com/2006/04/metadata";

const XML_PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

/// A descriptor ready to be written next to its artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataDescriptor {
    /// A hand-authored companion file, copied verbatim.
    Companion {
        /// Where the companion was found.
        source: Utf8PathBuf,
        /// Its exact bytes.
        contents: Vec<u8>,
    },
    /// A descriptor rendered from a template.
    Synthesized(String),
}

impl MetadataDescriptor {
    /// The bytes to write to the output tree.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Companion { contents, .. } => contents,
            Self::Synthesized(text) => text.as_bytes(),
        }
    }
}

/// Outcome of [`resolve_metadata`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The artifact kind does not carry a descriptor.
    NotRequired,
    /// A descriptor was found or synthesised.
    Descriptor(MetadataDescriptor),
    /// A descriptor is required but there is neither a companion file nor a
    /// template for the extension; the descriptor is omitted.
    MissingTemplate {
        /// The extension lacking a template.
        extension: String,
    },
}

/// Index of companion descriptors in a project tree, keyed by file name.
///
/// Built once per run so that each lookup is a map probe rather than a
/// fresh traversal. When several directories hold a descriptor with the
/// same name, the first one in sorted traversal order is kept.
#[derive(Debug, Default, Clone)]
pub struct CompanionIndex {
    by_name: HashMap<String, Utf8PathBuf>,
}

impl CompanionIndex {
    /// Scan `project_root` for files ending in the descriptor suffix.
    ///
    /// A missing project root yields an empty index. Directories that cannot
    /// be read are skipped with a warning.
    #[must_use]
    pub fn scan(project_root: &Utf8Path) -> Self {
        let mut by_name = HashMap::new();
        if !project_root.is_dir() {
            return Self { by_name };
        }
        for entry in WalkDir::new(project_root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("companion scan: {}", walk_error(project_root, err));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !name.ends_with(DESCRIPTOR_SUFFIX) {
                continue;
            }
            let Ok(path) = Utf8PathBuf::try_from(entry.into_path()) else {
                continue;
            };
            by_name.entry(name).or_insert(path);
        }
        debug!("indexed {} companion descriptor(s)", by_name.len());
        Self { by_name }
    }

    /// Find the companion descriptor for `artifact`, if any.
    #[must_use]
    pub fn find(&self, artifact: &ArtifactPath) -> Option<&Utf8Path> {
        self.by_name
            .get(&artifact.descriptor_name())
            .map(Utf8PathBuf::as_path)
    }

    /// Number of indexed descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether the index holds no descriptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Resolve the descriptor for an artifact.
///
/// # Errors
///
/// Returns [`PackagerError::Io`] if an existing companion cannot be read.
pub fn resolve_metadata(
    artifact: &ArtifactPath,
    requires_metadata: bool,
    companions: &CompanionIndex,
    api_version: u32,
) -> Result<Resolution> {
    if !requires_metadata {
        return Ok(Resolution::NotRequired);
    }
    if let Some(source) = companions.find(artifact) {
        debug!("using companion descriptor {source} for {artifact}");
        let contents = fs::read(source).map_err(PackagerError::io(source))?;
        return Ok(Resolution::Descriptor(MetadataDescriptor::Companion {
            source: source.to_owned(),
            contents,
        }));
    }
    let extension = artifact.extension().unwrap_or_default();
    match synthesize(artifact.base_name(), extension, api_version) {
        Some(text) => Ok(Resolution::Descriptor(MetadataDescriptor::Synthesized(text))),
        None => {
            warn!("no descriptor template for .{extension}; {artifact} is packaged without one");
            Ok(Resolution::MissingTemplate {
                extension: extension.to_owned(),
            })
        }
    }
}

/// Render the descriptor template for `extension`.
///
/// Returns `None` when the extension has no template. Output is
/// deterministic: equal inputs always yield identical text.
#[must_use]
pub fn synthesize(name: &str, extension: &str, api_version: u32) -> Option<String> {
    let api = format!("<apiVersion>{api_version}.0</apiVersion>");
    let (element, body) = match extension {
        "cls" => ("ApexClass", vec![api, "<status>Active</status>".to_owned()]),
        "trigger" => ("ApexTrigger", vec![api, "<status>Active</status>".to_owned()]),
        "page" => (
            "ApexPage",
            vec![
                api,
                "<availableInTouch>false</availableInTouch>".to_owned(),
                "<confirmationTokenRequired>false</confirmationTokenRequired>".to_owned(),
                format!("<label>{name}</label>"),
            ],
        ),
        "component" => ("ApexComponent", vec![api, format!("<label>{name}</label>")]),
        "cmp" | "evt" | "intf" | "tokens" => (
            "AuraDefinitionBundle",
            vec![api, format!("<description>{name}</description>")],
        ),
        _ => return None,
    };
    Some(render_document(element, &body))
}

/// Render a single-element metadata document with CRLF line endings.
fn render_document(element: &str, children: &[String]) -> String {
    let mut lines = Vec::with_capacity(children.len() + 3);
    lines.push(XML_PROLOG.to_owned());
    lines.push(format!("<{element} xmlns=\"{METADATA_NAMESPACE}\">"));
    lines.extend(children.iter().map(|child| format!("    {child}")));
    lines.push(format!("</{element}>"));
    lines.join("\r\n")
}
