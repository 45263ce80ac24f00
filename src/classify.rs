//! Extension-driven classification of artifacts.
//!
//! Every artifact kind the packager understands has one explicit entry in
//! [`RULES`]. There is no fallback branch: an extension missing from the
//! table yields [`Classification::Unclassified`], which the assembler logs
//! and skips so that projects may carry artifact kinds this build of the
//! tool does not know yet.

use crate::artifact::ArtifactPath;
use std::fmt;

/// Where an artifact kind lands in the package layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderRule {
    /// A fixed folder such as `classes`.
    Fixed(&'static str),
    /// A folder under `root` named after the artifact's parent directory,
    /// used by bundles whose files share one logical container.
    Bundle {
        /// Folder holding all bundles of this kind, e.g. `aura`.
        root: &'static str,
    },
}

/// One row of the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    /// Extension without the leading dot; matched case-sensitively.
    pub extension: &'static str,
    /// Placement of matching artifacts.
    pub folder: FolderRule,
    /// Whether a `-meta.xml` descriptor must accompany the artifact.
    pub requires_metadata: bool,
}

const fn fixed(extension: &'static str, folder: &'static str, requires_metadata: bool) -> Rule {
    Rule {
        extension,
        folder: FolderRule::Fixed(folder),
        requires_metadata,
    }
}

const fn aura(extension: &'static str, requires_metadata: bool) -> Rule {
    Rule {
        extension,
        folder: FolderRule::Bundle { root: "aura" },
        requires_metadata,
    }
}

/// The full classification table.
pub const RULES: &[Rule] = &[
    fixed("app", "applications", false),
    fixed("approvalProcess", "approvalProcesses", false),
    fixed("assignmentRules", "assignmentRules", false),
    fixed("authproviders", "authprovider", false),
    fixed("autoResponseRules", "autoResponseRules", false),
    fixed("cls", "classes", true),
    fixed("community", "communities", false),
    fixed("component", "components", true),
    fixed("connectedApp", "connectedApps", false),
    fixed("customPermission", "customPermissions", false),
    fixed("escalationRules", "escalationRules", false),
    fixed("flexipage", "flexipages", false),
    fixed("flow", "flows", false),
    fixed("globalValueSet", "globalValueSets", false),
    fixed("group", "group", false),
    fixed("homePageComponent", "homePageComponents", false),
    fixed("homePageLayout", "homePageLayouts", false),
    fixed("labels", "labels", false),
    fixed("layout", "layouts", false),
    fixed("letter", "letterhead", false),
    fixed("namedCredential", "namedCredentials", false),
    fixed("object", "objects", false),
    fixed("objectTranslation", "objectTranslations", false),
    fixed("page", "pages", true),
    fixed("permissionset", "permissionsets", false),
    fixed("profile", "profiles", false),
    fixed("queue", "queues", false),
    fixed("quickAction", "quickActions", false),
    fixed("remoteSite", "remoteSiteSettings", false),
    fixed("reportType", "reportTypes", false),
    fixed("resource", "staticresources", true),
    fixed("role", "role", false),
    fixed("sharingRules", "sharingRules", false),
    fixed("site", "sites", false),
    fixed("tab", "tabs", false),
    fixed("translation", "translations", false),
    fixed("trigger", "triggers", true),
    fixed("weblink", "weblinks", false),
    fixed("workflow", "workflows", false),
    aura("cmp", true),
    aura("evt", true),
    aura("intf", true),
    aura("tokens", true),
    aura("design", false),
    aura("auradoc", false),
    aura("css", false),
    aura("js", false),
    aura("svg", false),
];

/// Output of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The artifact has a place in the package.
    Classified {
        /// Folder under the output root, `/`-separated.
        target_folder: String,
        /// Whether a descriptor must be written alongside it.
        requires_metadata: bool,
    },
    /// No rule covers the artifact.
    Unclassified(UnclassifiedReason),
}

/// Why an artifact could not be classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnclassifiedReason {
    /// The file has no extension at all.
    NoExtension,
    /// The extension is absent from the table.
    UnknownExtension(String),
    /// A bundle file sits in the project root, so there is no bundle name.
    BundleWithoutParent(String),
}

impl fmt::Display for UnclassifiedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoExtension => write!(f, "no file extension"),
            Self::UnknownExtension(ext) => write!(f, "unsupported extension .{ext}"),
            Self::BundleWithoutParent(ext) => {
                write!(f, ".{ext} bundle file has no enclosing bundle directory")
            }
        }
    }
}

/// Look up the rule for an extension.
#[must_use]
pub fn rule_for(extension: &str) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.extension == extension)
}

/// Classify an artifact by its extension.
///
/// `extension` is passed separately from `path` so callers holding a
/// pre-split extension do not pay for re-parsing; it is expected to equal
/// `path.extension()`.
#[must_use]
pub fn classify(path: &ArtifactPath, extension: Option<&str>) -> Classification {
    let Some(extension) = extension else {
        return Classification::Unclassified(UnclassifiedReason::NoExtension);
    };
    let Some(rule) = rule_for(extension) else {
        return Classification::Unclassified(UnclassifiedReason::UnknownExtension(
            extension.to_owned(),
        ));
    };
    let target_folder = match rule.folder {
        FolderRule::Fixed(folder) => folder.to_owned(),
        FolderRule::Bundle { root } => match path.parent_name() {
            Some(bundle) => format!("{root}/{bundle}"),
            None => {
                return Classification::Unclassified(UnclassifiedReason::BundleWithoutParent(
                    extension.to_owned(),
                ));
            }
        },
    };
    Classification::Classified {
        target_folder,
        requires_metadata: rule.requires_metadata,
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
