//! Deployment archive construction.
//!
//! The whole output tree is stored beneath a single top-level directory,
//! [`ARCHIVE_ROOT`]. Entries are written in sorted path order with a fixed
//! timestamp, so identical trees produce byte-identical archives.

use crate::error::{PackagerError, Result, walk_error};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs;
use std::io;
use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Top-level entry every archived path is nested under.
pub const ARCHIVE_ROOT: &str = "unpackaged";

/// What [`build_archive`] wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Number of file entries.
    pub files: usize,
    /// Size of the finished archive in bytes.
    pub bytes: u64,
}

/// Archive the tree at `output_root` into `archive_path`.
///
/// Any existing file at `archive_path` is removed first. Entries are
/// streamed into a temporary file beside the destination which is renamed
/// into place once complete, so a failure never leaves a truncated archive
/// behind.
///
/// # Errors
///
/// Returns [`PackagerError::ArchiveSourceMissing`] if `output_root` is not a
/// directory, [`PackagerError::ArchiveWrite`] if encoding fails, or
/// [`PackagerError::Io`] for filesystem failures.
pub fn build_archive(output_root: &Utf8Path, archive_path: &Utf8Path) -> Result<ArchiveSummary> {
    remove_existing(archive_path)?;
    if !output_root.is_dir() {
        return Err(PackagerError::ArchiveSourceMissing {
            path: output_root.to_owned(),
        });
    }

    let write_error = |source: zip::result::ZipError| PackagerError::ArchiveWrite {
        path: archive_path.to_owned(),
        source,
    };
    let options = SimpleFileOptions::default()
        .last_modified_time(zip::DateTime::default())
        .compression_method(zip::CompressionMethod::Deflated);

    let parent = match archive_path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent).map_err(PackagerError::io(parent))?;
    let temp = NamedTempFile::new_in(parent).map_err(PackagerError::io(parent))?;

    let mut files = 0;
    let mut zip = ZipWriter::new(temp);
    zip.add_directory(format!("{ARCHIVE_ROOT}/"), options)
        .map_err(write_error)?;

    for (name, path, is_dir) in collect_entries(output_root)? {
        if is_dir {
            zip.add_directory(format!("{ARCHIVE_ROOT}/{name}/"), options)
                .map_err(write_error)?;
            continue;
        }
        let mut source = fs::File::open(&path).map_err(PackagerError::io(&path))?;
        zip.start_file(format!("{ARCHIVE_ROOT}/{name}"), options)
            .map_err(write_error)?;
        io::copy(&mut source, &mut zip).map_err(PackagerError::io(&path))?;
        debug!("archived {name}");
        files += 1;
    }

    let temp = zip.finish().map_err(write_error)?;
    temp.as_file()
        .sync_all()
        .map_err(PackagerError::io(archive_path))?;
    let bytes = temp
        .as_file()
        .metadata()
        .map_err(PackagerError::io(archive_path))?
        .len();
    temp.persist(archive_path)
        .map_err(|err| PackagerError::io(archive_path)(err.error))?;
    info!("wrote {archive_path} ({files} file(s), {bytes} bytes)");
    Ok(ArchiveSummary { files, bytes })
}

/// List the tree below `root` as `/`-separated relative names, sorted.
fn collect_entries(root: &Utf8Path) -> Result<Vec<(String, Utf8PathBuf, bool)>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| walk_error(root, err))?;
        let Ok(path) = Utf8PathBuf::try_from(entry.path().to_path_buf()) else {
            continue;
        };
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let name = relative
            .components()
            .map(|component| component.as_str())
            .collect::<Vec<_>>()
            .join("/");
        let is_dir = entry.file_type().is_dir();
        entries.push((name, path, is_dir));
    }
    Ok(entries)
}

fn remove_existing(archive_path: &Utf8Path) -> Result<()> {
    match fs::remove_file(archive_path) {
        Ok(()) => {
            debug!("removed previous archive {archive_path}");
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(PackagerError::io(archive_path)(err)),
    }
}
