//! Promotion of the staged snapshot to the baseline.
//!
//! This is the only code that writes the baseline. It refuses to run unless
//! the archive marker matches the staged snapshot, so the baseline never
//! advances past a package that was not archived.

use crate::digest::ContentDigest;
use crate::error::{PackagerError, Result};
use crate::snapshot::{HashStore, write_atomic};
use log::info;
use std::fs;

/// Replace the baseline with the staged snapshot.
///
/// The staged bytes are copied through [`write_atomic`], so a crash leaves
/// either the previous baseline or the new one. The staged file is kept; a
/// repeated commit is harmless.
///
/// # Errors
///
/// Returns [`PackagerError::NothingStaged`] if no staged snapshot exists,
/// [`PackagerError::NotArchived`] if no archive was built from the staged
/// bytes, or [`PackagerError::Io`] if a file cannot be read or the baseline
/// cannot be written.
pub fn commit(store: &HashStore) -> Result<()> {
    let staged = store.staged_path();
    let contents = match fs::read(staged) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(PackagerError::NothingStaged {
                path: staged.to_owned(),
            });
        }
        Err(err) => return Err(PackagerError::io(staged)(err)),
    };
    let digest = ContentDigest::of_bytes(&contents);
    if store.archived_digest()?.as_ref() != Some(&digest) {
        return Err(PackagerError::NotArchived {
            path: staged.to_owned(),
        });
    }
    write_atomic(store.baseline_path(), &contents)?;
    info!("committed {staged} to {}", store.baseline_path());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactPath;
    use crate::snapshot::HashSnapshot;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> HashStore {
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf8");
        HashStore::new(root.join("baseline.json"), root.join("staged.json"))
    }

    #[test]
    fn commit_without_staged_snapshot_fails() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir);
        let err = commit(&store).expect_err("nothing staged");
        assert!(matches!(err, PackagerError::NothingStaged { .. }));
        assert!(!store.baseline_path().exists());
    }

    #[test]
    fn commit_makes_baseline_equal_to_staged() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir);
        let snapshot: HashSnapshot =
            [(ArtifactPath::from("classes/A.cls"), ContentDigest::of_bytes(b"a"))]
                .into_iter()
                .collect();
        store.write_staged(&snapshot).expect("stage");
        store.mark_archived().expect("mark");

        commit(&store).expect("commit");
        assert_eq!(store.load_baseline().expect("load").snapshot, snapshot);
        assert_eq!(
            fs::read(store.baseline_path()).expect("baseline"),
            fs::read(store.staged_path()).expect("staged")
        );
    }

    #[test]
    fn commit_replaces_an_older_baseline() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir);
        fs::write(store.baseline_path(), "{\"old\": \"x\"}").expect("write");
        store.write_staged(&HashSnapshot::new()).expect("stage");
        store.mark_archived().expect("mark");

        commit(&store).expect("commit");
        assert!(store.load_baseline().expect("load").snapshot.is_empty());
    }

    #[test]
    fn commit_refuses_a_snapshot_that_was_never_archived() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir);
        store.write_staged(&HashSnapshot::new()).expect("stage");

        let err = commit(&store).expect_err("not archived");
        assert!(matches!(err, PackagerError::NotArchived { .. }));
        assert!(!store.baseline_path().exists());
    }

    #[test]
    fn commit_refuses_a_snapshot_restaged_after_archiving() {
        let dir = TempDir::new().expect("temp dir");
        let store = store(&dir);
        store.write_staged(&HashSnapshot::new()).expect("stage");
        store.mark_archived().expect("mark");
        let restaged: HashSnapshot =
            [(ArtifactPath::from("classes/A.cls"), ContentDigest::of_bytes(b"edited"))]
                .into_iter()
                .collect();
        store.write_staged(&restaged).expect("restage");

        let err = commit(&store).expect_err("stale marker");
        assert!(matches!(err, PackagerError::NotArchived { .. }));
    }
}
