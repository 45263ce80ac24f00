//! A temporary base directory holding a project tree and its output.

use camino::{Utf8Path, Utf8PathBuf};
use force_packager::Config;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use tempfile::TempDir;

/// A base directory with default configuration and an empty project tree.
pub struct TestProject {
    _dir: TempDir,
    config: Config,
}

impl TestProject {
    /// Create the base directory and its `project` subdirectory.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf8 temp dir");
        let config = Config::defaults(base);
        fs::create_dir_all(config.project_root()).expect("mkdir project");
        Self { _dir: dir, config }
    }

    /// The run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the run configuration, e.g. to add overrides.
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Write a file below the project root.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.config.project_root().join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, contents).expect("write project file");
    }

    /// Path of a file in the assembled output tree.
    pub fn output_path(&self, relative: &str) -> Utf8PathBuf {
        self.config.content_root().join(relative)
    }

    /// Raw bytes of the baseline snapshot, if it exists.
    pub fn baseline_bytes(&self) -> Option<Vec<u8>> {
        read_optional(self.config.hash_store().baseline_path())
    }

    /// Raw bytes of the staged snapshot, if it exists.
    pub fn staged_bytes(&self) -> Option<Vec<u8>> {
        read_optional(self.config.hash_store().staged_path())
    }

    /// Every file entry of the archive mapped to its text content.
    pub fn archive_entries(&self) -> BTreeMap<String, String> {
        let file = fs::File::open(self.config.archive_path()).expect("open archive");
        let mut archive = zip::ZipArchive::new(file).expect("read archive");
        let mut entries = BTreeMap::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).expect("archive entry");
            if entry.is_dir() {
                continue;
            }
            let mut text = String::new();
            entry.read_to_string(&mut text).expect("entry text");
            entries.insert(entry.name().to_owned(), text);
        }
        entries
    }
}

fn read_optional(path: &Utf8Path) -> Option<Vec<u8>> {
    fs::read(path).ok()
}
