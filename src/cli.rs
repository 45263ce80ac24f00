//! CLI argument definitions for the force packager.
//!
//! Kept apart from the binary so the parser can be unit tested and so the
//! mapping from flags to [`ConfigOverrides`] lives next to the flags.

use crate::config::ConfigOverrides;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Incrementally package metadata source files into a deployment archive.
#[derive(Parser, Debug)]
#[command(name = "force-packager")]
#[command(version, about)]
#[command(long_about = concat!(
    "Incrementally package metadata source files into a deployment archive.\n\n",
    "Only files whose content changed since the last commit are packaged. ",
    "Each file is placed in the folder its extension maps to, with a ",
    "`-meta.xml` descriptor copied from the project or generated from a ",
    "template. The baseline of content hashes only advances on `commit`, ",
    "so a failed deployment can simply be packaged again.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Package, archive, and commit in one step:\n",
    "    $ force-packager run\n\n",
    "  Package everything, ignoring the baseline:\n",
    "    $ force-packager package --all\n\n",
    "  Deploy between archiving and committing:\n",
    "    $ force-packager package && force-packager zip\n",
    "    $ <deploy .package/package.zip>\n",
    "    $ force-packager commit\n\n",
    "  Forget every recorded hash:\n",
    "    $ force-packager reset",
))]
pub struct Cli {
    /// Operation to perform.
    #[command(subcommand)]
    pub command: Command,

    /// Directory that relative settings resolve against [default: current directory].
    #[arg(short = 'C', long, value_name = "DIR", global = true)]
    pub base_dir: Option<Utf8PathBuf>,

    /// Settings that override the configuration files.
    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet",
        global = true
    )]
    pub verbosity: u8,

    /// Only report warnings and errors.
    #[arg(short, long, conflicts_with = "verbosity", global = true)]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Detect changed files, stage their hashes, and assemble the output tree.
    Package(PackageArgs),

    /// Archive the assembled output tree.
    Zip,

    /// Promote the staged hashes to the baseline.
    Commit,

    /// Delete the output directory, hashes included.
    Reset,

    /// Package, archive, and commit.
    Run(RunArgs),
}

/// Arguments for `package`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageArgs {
    /// Package every file, not just changed ones.
    #[arg(long)]
    pub all: bool,
}

/// Arguments for `run`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Package every file, not just changed ones.
    #[arg(long)]
    pub all: bool,

    /// Exit with an error when no file changed.
    #[arg(long)]
    pub fail_if_empty: bool,
}

/// Command-line configuration overrides.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideArgs {
    /// Target API version.
    #[arg(long, value_name = "N", global = true)]
    pub api_version: Option<u32>,

    /// Directory holding the project's source files.
    #[arg(long, value_name = "DIR", global = true)]
    pub project_dir: Option<Utf8PathBuf>,

    /// Directory receiving hashes and the output tree.
    #[arg(long, value_name = "DIR", global = true)]
    pub output_dir: Option<Utf8PathBuf>,

    /// Destination of the archive.
    #[arg(long, value_name = "FILE", global = true)]
    pub archive: Option<Utf8PathBuf>,
}

impl OverrideArgs {
    /// The configuration layer these flags describe.
    #[must_use]
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_version: self.api_version,
            project_base_directory: self.project_dir.clone(),
            output_directory: self.output_dir.clone(),
            output_package_zip: self.archive.clone(),
            ..ConfigOverrides::default()
        }
    }
}

impl Cli {
    /// Default `env_logger` filter for the requested verbosity.
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
