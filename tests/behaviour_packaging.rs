//! Behaviour-driven tests for incremental packaging.
//!
//! These scenarios drive the pipeline the way the command-line front end
//! does and check the archive and hash snapshots left behind. Tests use the
//! rstest-bdd v0.5.0 mutable world pattern.

mod support;

use force_packager::artifact::ArtifactPath;
use force_packager::config::{ConfigOverrides, MockArtifact};
use force_packager::pipeline::{self, PackageOutcome, RunStatus};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use support::project::TestProject;

// ---------------------------------------------------------------------------
// World types
// ---------------------------------------------------------------------------

struct PackagingWorld {
    project: TestProject,
    mocks: Vec<MockArtifact>,
    baseline_before: Option<Vec<u8>>,
    outcome: Option<PackageOutcome>,
    status: Option<RunStatus>,
}

#[fixture]
fn world() -> PackagingWorld {
    PackagingWorld {
        project: TestProject::new(),
        mocks: Vec::new(),
        baseline_before: None,
        outcome: None,
        status: None,
    }
}

/// Fold any configured mocks into the project's configuration.
fn apply_mocks(world: &mut PackagingWorld) {
    if world.mocks.is_empty() {
        return;
    }
    let config = world.project.config().clone().with(ConfigOverrides {
        mock_artifacts: Some(world.mocks.clone()),
        ..ConfigOverrides::default()
    });
    world.project.set_config(config);
}

fn run_pipeline(world: &mut PackagingWorld) {
    apply_mocks(world);
    let status = pipeline::run(world.project.config(), false, false).expect("run");
    world.status = Some(status);
}

fn outcome(world: &PackagingWorld) -> &PackageOutcome {
    world.outcome.as_ref().expect("project was packaged")
}

// ---------------------------------------------------------------------------
// Step definitions
// ---------------------------------------------------------------------------

#[given("a project file \"{path}\" containing \"{contents}\"")]
fn given_project_file(world: &mut PackagingWorld, path: String, contents: String) {
    world.project.write(&path, &contents);
}

#[given("the project file \"{path}\" now contains \"{contents}\"")]
fn given_project_file_edited(world: &mut PackagingWorld, path: String, contents: String) {
    world.project.write(&path, &contents);
}

#[given("a mock artifact \"{path}\" containing \"{contents}\"")]
fn given_mock_artifact(world: &mut PackagingWorld, path: String, contents: String) {
    world.mocks.push(MockArtifact { path, contents });
}

#[given("the project has been packaged, archived and committed")]
fn given_committed_run(world: &mut PackagingWorld) {
    run_pipeline(world);
    world.baseline_before = world.project.baseline_bytes();
}

#[when("the project is packaged, archived and committed")]
fn when_full_run(world: &mut PackagingWorld) {
    run_pipeline(world);
}

#[when("the project is packaged")]
fn when_packaged(world: &mut PackagingWorld) {
    apply_mocks(world);
    let outcome = pipeline::package(world.project.config(), false).expect("package");
    world.outcome = Some(outcome);
}

#[then("the archive contains \"{entry}\"")]
fn then_archive_contains(world: &mut PackagingWorld, entry: String) {
    assert!(
        matches!(world.status, Some(RunStatus::Completed { .. })),
        "expected a completed run"
    );
    let entries = world.project.archive_entries();
    assert!(
        entries.contains_key(&entry),
        "missing {entry}: {:?}",
        entries.keys().collect::<Vec<_>>()
    );
}

#[then("the baseline matches the staged hashes")]
fn then_baseline_matches_staged(world: &mut PackagingWorld) {
    assert_eq!(
        world.project.baseline_bytes().expect("baseline"),
        world.project.staged_bytes().expect("staged")
    );
}

#[then("the baseline is unchanged")]
fn then_baseline_unchanged(world: &mut PackagingWorld) {
    assert_eq!(world.project.baseline_bytes(), world.baseline_before);
}

#[then("no changes are reported")]
fn then_no_changes(world: &mut PackagingWorld) {
    assert!(outcome(world).has_no_changes());
}

#[then("{count} change is reported")]
fn then_change_count(world: &mut PackagingWorld, count: usize) {
    assert_eq!(outcome(world).detection.changes.len(), count);
}

#[then("{count} artifact is packaged")]
fn then_packaged_count(world: &mut PackagingWorld, count: usize) {
    assert_eq!(outcome(world).report.packaged.len(), count);
}

#[then("\"{path}\" is skipped")]
fn then_skipped(world: &mut PackagingWorld, path: String) {
    let artifact = ArtifactPath::from(path.as_str());
    assert!(
        outcome(world)
            .report
            .skipped
            .iter()
            .any(|skipped| skipped.artifact == artifact),
        "{path} was not skipped"
    );
}

// ---------------------------------------------------------------------------
// Scenario bindings
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/packaging.feature",
    name = "First run packages every artifact"
)]
fn scenario_first_run(world: PackagingWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/packaging.feature",
    name = "Unchanged project has nothing to package"
)]
fn scenario_unchanged_project(world: PackagingWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/packaging.feature",
    name = "Repackaging before commit reports the same change"
)]
fn scenario_repackage_before_commit(world: PackagingWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/packaging.feature",
    name = "Unknown file types are skipped"
)]
fn scenario_unknown_types(world: PackagingWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/packaging.feature",
    name = "Mock artifacts are packaged without a project file"
)]
fn scenario_mock_artifacts(world: PackagingWorld) {
    let _ = world;
}
