//! The top-level package manifest (`package.xml`).
//!
//! The manifest advertises every metadata type this tool can deploy, with a
//! `*` wildcard member, rather than listing what a particular run packaged.
//! Only the API version varies between runs.

use crate::metadata::METADATA_NAMESPACE;

/// File name of the manifest at the root of the output tree.
pub const MANIFEST_FILE_NAME: &str = "package.xml";

/// Metadata types advertised by the manifest, in output order.
pub const SUPPORTED_TYPES: &[&str] = &[
    "AnalyticSnapshot",
    "ApexClass",
    "ApexComponent",
    "ApexPage",
    "ApexTrigger",
    "ApprovalProcess",
    "AssignmentRules",
    "AuraDefinitionBundle",
    "AuthProvider",
    "AutoResponseRules",
    "BusinessProcess",
    "CallCenter",
    "Community",
    "CompactLayout",
    "ConnectedApp",
    "CustomApplication",
    "CustomApplicationComponent",
    "CustomField",
    "CustomLabels",
    "CustomObject",
    "CustomObjectTranslation",
    "CustomPageWebLink",
    "CustomSite",
    "CustomTab",
    "Dashboard",
    "DataCategoryGroup",
    "Document",
    "EmailTemplate",
    "EntitlementProcess",
    "EntitlementTemplate",
    "ExternalDataSource",
    "FieldSet",
    "Flow",
    "Group",
    "HomePageComponent",
    "HomePageLayout",
    "Layout",
    "Letterhead",
    "ListView",
    "LiveChatAgentConfig",
    "LiveChatButton",
    "LiveChatDeployment",
    "MilestoneType",
    "NamedFilter",
    "Network",
    "PermissionSet",
    "Portal",
    "PostTemplate",
    "Profile",
    "Queue",
    "QuickAction",
    "RecordType",
    "RemoteSiteSetting",
    "Report",
    "ReportType",
    "Role",
    "SamlSsoConfig",
    "Scontrol",
    "SharingReason",
    "Skill",
    "StaticResource",
    "Territory",
    "Translations",
    "ValidationRule",
];

/// The synthesised package manifest for one API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageManifest {
    api_version: u32,
}

impl PackageManifest {
    /// Create the manifest for `api_version`.
    #[must_use]
    pub const fn new(api_version: u32) -> Self {
        Self { api_version }
    }

    /// Render the manifest document with CRLF line endings.
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines = vec![
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>".to_owned(),
            format!("<Package xmlns=\"{METADATA_NAMESPACE}\">"),
        ];
        for name in SUPPORTED_TYPES {
            lines.push("    <types>".to_owned());
            lines.push("        <members>*</members>".to_owned());
            lines.push(format!("        <name>{name}</name>"));
            lines.push("    </types>".to_owned());
        }
        lines.push(format!("    <version>{}.0</version>", self.api_version));
        lines.push("</Package>".to_owned());
        lines.join("\r\n")
    }
}
