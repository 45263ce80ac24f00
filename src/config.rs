//! Per-run configuration.
//!
//! A [`Config`] is built once at the start of a run and passed by reference
//! to every operation. Values are layered in increasing precedence:
//!
//! 1. built-in defaults;
//! 2. the `forceDeveloperConfig` object of `package.json` in the base
//!    directory;
//! 3. `force-packager.toml` in the base directory;
//! 4. explicit overrides, typically from the command line.
//!
//! Every layer is a [`ConfigOverrides`] whose unset fields leave the value
//! beneath untouched. Relative paths resolve against the base directory.

use crate::error::{PackagerError, Result};
use crate::snapshot::HashStore;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;

/// Name of the TOML configuration file looked up in the base directory.
pub const CONFIG_FILE_NAME: &str = "force-packager.toml";

/// Name of the Node package manifest that may carry legacy settings.
pub const PACKAGE_JSON_FILE_NAME: &str = "package.json";

/// Key of the settings object inside `package.json`.
pub const PACKAGE_JSON_KEY: &str = "forceDeveloperConfig";

/// Name of the run lock file inside the output directory.
pub const LOCK_FILE_NAME: &str = ".force-packager.lock";

/// A synthetic artifact materialised into the package without existing in
/// the project tree.
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub struct MockArtifact {
    /// Project-relative path the artifact pretends to live at, e.g.
    /// `classes/StubService.cls`. Drives classification.
    pub path: String,
    /// Text written as the artifact's content.
    #[serde(default)]
    pub contents: String,
}

/// One configuration layer. Unset fields defer to lower layers.
///
/// Field names follow the camel-cased keys used in `package.json`; the TOML
/// file uses the same spelling so a block can be moved between the two.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Eq, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigOverrides {
    /// Target API version used in descriptors and the manifest.
    pub api_version: Option<u32>,
    /// File name of the committed baseline snapshot.
    pub file_change_hash_file: Option<String>,
    /// File name of the staged snapshot.
    pub file_change_hash_staging_file: Option<String>,
    /// Directory holding the project's source artifacts.
    pub project_base_directory: Option<Utf8PathBuf>,
    /// Directory receiving snapshots, the output tree, and the lock file.
    pub output_directory: Option<Utf8PathBuf>,
    /// Name of the content subtree inside the output directory.
    pub output_temp_directory: Option<String>,
    /// Destination of the archive.
    pub output_package_zip: Option<Utf8PathBuf>,
    /// Synthetic artifacts to package for test deployments.
    pub mock_artifacts: Option<Vec<MockArtifact>>,
}

impl ConfigOverrides {
    /// Parse a TOML configuration layer.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Config`] if the text is not valid TOML or
    /// holds values of the wrong type.
    pub fn from_toml(path: &Utf8Path, text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| PackagerError::Config {
            path: path.to_owned(),
            reason: err.to_string(),
        })
    }

    /// Extract the `forceDeveloperConfig` layer from a `package.json` text.
    ///
    /// A manifest without that key yields an empty layer.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Config`] if the JSON is malformed or the
    /// settings object holds values of the wrong type.
    pub fn from_package_json(path: &Utf8Path, text: &str) -> Result<Self> {
        let config_error = |err: serde_json::Error| PackagerError::Config {
            path: path.to_owned(),
            reason: err.to_string(),
        };
        let mut manifest: serde_json::Value = serde_json::from_str(text).map_err(config_error)?;
        match manifest.get_mut(PACKAGE_JSON_KEY).map(serde_json::Value::take) {
            Some(section) => serde_json::from_value(section).map_err(config_error),
            None => Ok(Self::default()),
        }
    }
}

/// Fully resolved configuration for one run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    base_dir: Utf8PathBuf,
    api_version: u32,
    hash_file: String,
    staged_hash_file: String,
    project_dir: Utf8PathBuf,
    output_dir: Utf8PathBuf,
    content_dir_name: String,
    archive: Utf8PathBuf,
    mock_artifacts: Vec<MockArtifact>,
}

impl Config {
    const fn default_api_version() -> u32 {
        34
    }

    /// Built-in defaults rooted at `base_dir`.
    #[must_use]
    pub fn defaults(base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            api_version: Self::default_api_version(),
            hash_file: ".force-developer.filehash.json".to_owned(),
            staged_hash_file: ".force-developer.filehash.staging.json".to_owned(),
            project_dir: Utf8PathBuf::from("project"),
            output_dir: Utf8PathBuf::from(".package"),
            content_dir_name: "src".to_owned(),
            archive: Utf8PathBuf::from(".package").join("package.zip"),
            mock_artifacts: Vec::new(),
        }
    }

    /// Load defaults plus any configuration files found in `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Io`] if a present file cannot be read, or
    /// [`PackagerError::Config`] if it cannot be parsed.
    pub fn load(base_dir: impl Into<Utf8PathBuf>) -> Result<Self> {
        let mut config = Self::defaults(base_dir);

        let package_json = config.base_dir.join(PACKAGE_JSON_FILE_NAME);
        if let Some(text) = read_optional(&package_json)? {
            debug!("applying settings from {package_json}");
            config.apply(ConfigOverrides::from_package_json(&package_json, &text)?);
        }

        let toml_path = config.base_dir.join(CONFIG_FILE_NAME);
        if let Some(text) = read_optional(&toml_path)? {
            debug!("applying settings from {toml_path}");
            config.apply(ConfigOverrides::from_toml(&toml_path, &text)?);
        }

        Ok(config)
    }

    /// Layer `overrides` on top of the current values.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides {
            api_version,
            file_change_hash_file,
            file_change_hash_staging_file,
            project_base_directory,
            output_directory,
            output_temp_directory,
            output_package_zip,
            mock_artifacts,
        } = overrides;
        if let Some(value) = api_version {
            self.api_version = value;
        }
        if let Some(value) = file_change_hash_file {
            self.hash_file = value;
        }
        if let Some(value) = file_change_hash_staging_file {
            self.staged_hash_file = value;
        }
        if let Some(value) = project_base_directory {
            self.project_dir = value;
        }
        if let Some(value) = output_directory {
            self.output_dir = value;
        }
        if let Some(value) = output_temp_directory {
            self.content_dir_name = value;
        }
        if let Some(value) = output_package_zip {
            self.archive = value;
        }
        if let Some(value) = mock_artifacts {
            self.mock_artifacts = value;
        }
    }

    /// Builder-style variant of [`Self::apply`].
    #[must_use]
    pub fn with(mut self, overrides: ConfigOverrides) -> Self {
        self.apply(overrides);
        self
    }

    /// Directory every relative setting resolves against.
    #[must_use]
    pub fn base_dir(&self) -> &Utf8Path {
        &self.base_dir
    }

    /// Target API version.
    #[must_use]
    pub const fn api_version(&self) -> u32 {
        self.api_version
    }

    /// Root of the project tree to package.
    #[must_use]
    pub fn project_root(&self) -> Utf8PathBuf {
        self.base_dir.join(&self.project_dir)
    }

    /// Directory holding snapshots, the content subtree, and the lock file.
    #[must_use]
    pub fn output_dir(&self) -> Utf8PathBuf {
        self.base_dir.join(&self.output_dir)
    }

    /// Root of the assembled output tree; this is what gets archived.
    #[must_use]
    pub fn content_root(&self) -> Utf8PathBuf {
        self.output_dir().join(&self.content_dir_name)
    }

    /// Destination of the archive.
    #[must_use]
    pub fn archive_path(&self) -> Utf8PathBuf {
        self.base_dir.join(&self.archive)
    }

    /// Location of the run lock file.
    #[must_use]
    pub fn lock_path(&self) -> Utf8PathBuf {
        self.output_dir().join(LOCK_FILE_NAME)
    }

    /// The baseline and staged snapshot locations.
    #[must_use]
    pub fn hash_store(&self) -> HashStore {
        let output_dir = self.output_dir();
        HashStore::new(
            output_dir.join(&self.hash_file),
            output_dir.join(&self.staged_hash_file),
        )
    }

    /// Synthetic artifacts to add to every package.
    #[must_use]
    pub fn mock_artifacts(&self) -> &[MockArtifact] {
        &self.mock_artifacts
    }
}

fn read_optional(path: &Utf8Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(PackagerError::io(path)(err)),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
