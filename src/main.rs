//! Force packager CLI entrypoint.
//!
//! Parses arguments, loads configuration from the base directory, and runs
//! one pipeline operation. Progress goes through `log`; the short summary a
//! user reads after each command is written straight to stderr.

use camino::Utf8PathBuf;
use clap::Parser;
use force_packager::archive::ArchiveSummary;
use force_packager::cli::{Cli, Command};
use force_packager::config::Config;
use force_packager::error::{PackagerError, Result};
use force_packager::pipeline::{self, PackageOutcome, RunStatus};
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .format_timestamp(None)
        .init();

    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let config = load_config(cli)?;
    let lines = match &cli.command {
        Command::Package(args) => package_lines(&pipeline::package(&config, args.all)?, &config),
        Command::Zip => vec![archive_line(&pipeline::zip(&config)?, &config)],
        Command::Commit => {
            pipeline::commit(&config)?;
            vec![format!(
                "Committed hashes to {}",
                config.hash_store().baseline_path()
            )]
        }
        Command::Reset => {
            pipeline::reset(&config)?;
            vec![format!("Cleared {}", config.output_dir())]
        }
        Command::Run(args) => {
            run_lines(&pipeline::run(&config, args.all, args.fail_if_empty)?, &config)
        }
    };

    if !cli.quiet {
        for line in lines {
            write_stderr_line(stderr, line);
        }
    }
    Ok(())
}

/// Builds the run configuration: files in the base directory, then flags.
fn load_config(cli: &Cli) -> Result<Config> {
    let base_dir = match &cli.base_dir {
        Some(dir) => dir.clone(),
        None => current_dir()?,
    };
    Ok(Config::load(base_dir)?.with(cli.overrides.to_overrides()))
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(PackagerError::io("."))?;
    Utf8PathBuf::try_from(cwd).map_err(|err| PackagerError::Config {
        path: Utf8PathBuf::from("."),
        reason: format!("current directory is not valid UTF-8: {err}"),
    })
}

fn package_lines(outcome: &PackageOutcome, config: &Config) -> Vec<String> {
    let report = &outcome.report;
    let mut lines = Vec::new();
    if outcome.has_no_changes() {
        lines.push("No new or modified files detected.".to_owned());
    }
    let plural = if report.packaged.len() == 1 { "file" } else { "files" };
    lines.push(format!(
        "Packaged {} {plural} into {}",
        report.packaged.len(),
        config.content_root()
    ));
    for skipped in &report.skipped {
        lines.push(format!("  skipped {}: {}", skipped.artifact, skipped.reason));
    }
    for artifact in report.missing_templates() {
        lines.push(format!("  no descriptor template for {artifact}"));
    }
    for failure in outcome.detection.failed.iter().chain(&report.failed) {
        lines.push(format!("  failed {}: {}", failure.artifact, failure.reason));
    }
    lines
}

fn archive_line(summary: &ArchiveSummary, config: &Config) -> String {
    format!(
        "Wrote {} ({} files, {} bytes)",
        config.archive_path(),
        summary.files,
        summary.bytes
    )
}

fn run_lines(status: &RunStatus, config: &Config) -> Vec<String> {
    match status {
        RunStatus::NoChanges { .. } => vec!["No new or modified files detected.".to_owned()],
        RunStatus::Completed { package, archive } => {
            let mut lines = package_lines(package, config);
            lines.push(archive_line(archive, config));
            lines.push(format!(
                "Committed hashes to {}",
                config.hash_store().baseline_path()
            ));
            lines
        }
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}
