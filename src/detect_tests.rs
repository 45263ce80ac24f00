//! Unit tests for change detection.

use super::*;
use crate::digest::ContentDigest;
use rstest::{fixture, rstest};
use std::fs;
use tempfile::TempDir;

struct Project {
    _dir: TempDir,
    root: Utf8PathBuf,
    store: HashStore,
}

impl Project {
    fn write(&self, relative: &str, contents: &str) {
        let path = self.root.join("project").join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, contents).expect("write");
    }

    fn project_root(&self) -> Utf8PathBuf {
        self.root.join("project")
    }
}

#[fixture]
fn project() -> Project {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf8");
    let store = HashStore::new(
        root.join(".package/baseline.json"),
        root.join(".package/staged.json"),
    );
    let project = Project {
        _dir: dir,
        root,
        store,
    };
    fs::create_dir_all(project.project_root()).expect("mkdir project");
    project
}

#[rstest]
fn discovery_skips_descriptors_control_files_and_hidden_files(project: Project) {
    project.write("classes/Invoice.cls", "class");
    project.write("classes/Invoice.cls-meta.xml", "<meta/>");
    project.write("classes/force.config", "{}");
    project.write("classes/.DS_Store", "junk");
    project.write("classes/NOTES", "text");

    let found: Vec<_> = discover_artifacts(&project.project_root())
        .expect("discover")
        .artifacts
        .into_iter()
        .map(|(artifact, _)| artifact)
        .collect();
    assert_eq!(found, vec![ArtifactPath::from("classes/Invoice.cls")]);
}

#[rstest]
fn discovery_fails_for_missing_project_root(project: Project) {
    let err = discover_artifacts(&project.root.join("missing")).expect_err("missing root");
    assert!(matches!(err, PackagerError::Io { .. }));
}

#[rstest]
fn empty_baseline_marks_everything_new(project: Project) {
    project.write("classes/A.cls", "a");
    project.write("pages/B.page", "b");

    let Comparison { changes, staged, .. } =
        detect_changes(&project.project_root(), &HashSnapshot::new(), false).expect("detect");
    assert_eq!(changes.len(), 2);
    assert_eq!(staged.len(), 2);
    assert!(
        changes
            .iter()
            .all(|(_, action)| *action == ChangeAction::Include(ChangeReason::New))
    );
}

#[rstest]
fn unchanged_artifacts_are_excluded_but_still_staged(project: Project) {
    project.write("classes/A.cls", "a");
    project.write("classes/B.cls", "b");
    let baseline: HashSnapshot = [
        (ArtifactPath::from("classes/A.cls"), ContentDigest::of_bytes(b"a")),
        (ArtifactPath::from("classes/B.cls"), ContentDigest::of_bytes(b"old")),
    ]
    .into_iter()
    .collect();

    let Comparison { changes, staged, .. } =
        detect_changes(&project.project_root(), &baseline, false).expect("detect");
    assert_eq!(changes.len(), 1);
    assert!(changes.contains(&ArtifactPath::from("classes/B.cls")));
    assert_eq!(
        staged.get(&ArtifactPath::from("classes/A.cls")),
        Some(&ContentDigest::of_bytes(b"a"))
    );
    assert_eq!(
        staged.get(&ArtifactPath::from("classes/B.cls")),
        Some(&ContentDigest::of_bytes(b"b"))
    );
}

#[rstest]
fn include_all_ignores_matching_baseline(project: Project) {
    project.write("classes/A.cls", "a");
    let baseline: HashSnapshot = [(ArtifactPath::from("classes/A.cls"), ContentDigest::of_bytes(b"a"))]
        .into_iter()
        .collect();

    let Comparison { changes, .. } =
        detect_changes(&project.project_root(), &baseline, true).expect("detect");
    let actions: Vec<_> = changes.iter().map(|(_, action)| *action).collect();
    assert_eq!(actions, vec![ChangeAction::Include(ChangeReason::Forced)]);
}

#[rstest]
fn deleted_artifacts_drop_out_of_the_staged_snapshot(project: Project) {
    project.write("classes/A.cls", "a");
    let baseline: HashSnapshot = [
        (ArtifactPath::from("classes/A.cls"), ContentDigest::of_bytes(b"a")),
        (ArtifactPath::from("classes/Gone.cls"), ContentDigest::of_bytes(b"gone")),
    ]
    .into_iter()
    .collect();

    let Comparison { changes, staged, .. } =
        detect_changes(&project.project_root(), &baseline, false).expect("detect");
    assert!(changes.is_empty());
    assert!(staged.get(&ArtifactPath::from("classes/Gone.cls")).is_none());
}

#[rstest]
fn detect_and_stage_persists_staged_and_never_the_baseline(project: Project) {
    project.write("classes/A.cls", "a");

    let detection = detect_and_stage(&project.project_root(), &project.store, false)
        .expect("detect");
    assert_eq!(detection.changes.len(), 1);
    assert!(!detection.baseline_was_corrupt);
    assert!(!project.store.baseline_path().exists());

    let staged = project.store.load_staged().expect("load").snapshot;
    assert_eq!(staged, detection.staged);
}

#[rstest]
fn repeated_detection_without_commit_stages_the_same_snapshot(project: Project) {
    project.write("classes/A.cls", "a");
    project.write("pages/B.page", "b");

    let first = detect_and_stage(&project.project_root(), &project.store, false).expect("first");
    let second = detect_and_stage(&project.project_root(), &project.store, false).expect("second");
    assert_eq!(first.staged, second.staged);
    assert_eq!(first.changes, second.changes);
}

#[rstest]
fn corrupt_baseline_is_reported(project: Project) {
    project.write("classes/A.cls", "a");
    let baseline = project.store.baseline_path();
    fs::create_dir_all(baseline.parent().expect("parent")).expect("mkdir");
    fs::write(baseline, "[").expect("write");

    let detection = detect_and_stage(&project.project_root(), &project.store, false)
        .expect("detect");
    assert!(detection.baseline_was_corrupt);
    assert_eq!(detection.changes.len(), 1);
}

#[rstest]
fn unreadable_artifact_is_skipped_and_the_rest_still_compared(project: Project) {
    project.write("classes/A.cls", "a");
    project.write("classes/B.cls", "b");
    let discovery = discover_artifacts(&project.project_root()).expect("discover");
    fs::remove_file(project.project_root().join("classes/B.cls")).expect("remove");

    let comparison = compare_artifacts(discovery.artifacts, &HashSnapshot::new(), false);
    assert!(comparison.changes.contains(&ArtifactPath::from("classes/A.cls")));
    assert!(!comparison.changes.contains(&ArtifactPath::from("classes/B.cls")));
    assert!(comparison.staged.get(&ArtifactPath::from("classes/B.cls")).is_none());
    assert_eq!(comparison.failed.len(), 1);
    assert_eq!(comparison.failed[0].artifact, ArtifactPath::from("classes/B.cls"));
}

#[rstest]
fn staging_forgets_an_earlier_archive(project: Project) {
    project.write("classes/A.cls", "a");
    detect_and_stage(&project.project_root(), &project.store, false).expect("first");
    project.store.mark_archived().expect("mark");

    detect_and_stage(&project.project_root(), &project.store, false).expect("second");
    assert!(!project.store.marker_path().exists());
}
