//! Tests for CLI parsing and flag mapping.

use super::*;
use rstest::rstest;

#[test]
fn cli_parses_package_defaults() {
    let cli = Cli::parse_from(["force-packager", "package"]);
    assert_eq!(cli.command, Command::Package(PackageArgs { all: false }));
    assert!(cli.base_dir.is_none());
    assert_eq!(cli.overrides, OverrideArgs::default());
    assert_eq!(cli.verbosity, 0);
    assert!(!cli.quiet);
}

#[test]
fn cli_parses_run_flags() {
    let cli = Cli::parse_from(["force-packager", "run", "--all", "--fail-if-empty"]);
    assert_eq!(
        cli.command,
        Command::Run(RunArgs {
            all: true,
            fail_if_empty: true,
        })
    );
}

#[rstest]
#[case::zip("zip", Command::Zip)]
#[case::commit("commit", Command::Commit)]
#[case::reset("reset", Command::Reset)]
fn cli_parses_plain_subcommands(#[case] name: &str, #[case] expected: Command) {
    let cli = Cli::parse_from(["force-packager", name]);
    assert_eq!(cli.command, expected);
}

#[test]
fn global_flags_are_accepted_after_the_subcommand() {
    let cli = Cli::parse_from([
        "force-packager",
        "zip",
        "--base-dir",
        "/work",
        "--archive",
        "out/deploy.zip",
    ]);
    assert_eq!(cli.base_dir, Some(Utf8PathBuf::from("/work")));
    assert_eq!(cli.overrides.archive, Some(Utf8PathBuf::from("out/deploy.zip")));
}

#[test]
fn override_flags_map_to_config_fields() {
    let cli = Cli::parse_from([
        "force-packager",
        "--api-version",
        "52",
        "--project-dir",
        "force-app",
        "package",
    ]);
    let overrides = cli.overrides.to_overrides();
    assert_eq!(overrides.api_version, Some(52));
    assert_eq!(
        overrides.project_base_directory,
        Some(Utf8PathBuf::from("force-app"))
    );
    assert!(overrides.output_directory.is_none());
    assert!(overrides.mock_artifacts.is_none());
}

#[rstest]
#[case::quiet(&["-q"], "warn")]
#[case::default(&[], "info")]
#[case::verbose(&["-v"], "debug")]
#[case::very_verbose(&["-vv"], "trace")]
fn log_filter_follows_verbosity(#[case] flags: &[&str], #[case] expected: &str) {
    let args = ["force-packager"]
        .into_iter()
        .chain(flags.iter().copied())
        .chain(["package"]);
    let cli = Cli::parse_from(args);
    assert_eq!(cli.log_filter(), expected);
}

#[test]
fn quiet_and_verbose_conflict() {
    let result = Cli::try_parse_from(["force-packager", "-q", "-v", "package"]);
    assert!(result.is_err());
}

#[test]
fn missing_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["force-packager"]).is_err());
}
