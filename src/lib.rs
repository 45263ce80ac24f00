//! Incremental packaging of metadata source trees into deployment archives.
//!
//! A run hashes every artifact under the project root, compares the digests
//! with the committed baseline, copies changed artifacts into an output tree
//! laid out by extension, writes descriptors and a `package.xml` manifest,
//! and archives the tree. The baseline only advances on an explicit commit
//! after the archive exists, so a failed deployment can be repackaged.
//!
//! Every step is callable on its own; [`pipeline`] sequences them under a
//! run lock for the command-line front end.
//!
//! # Modules
//!
//! - [`archive`] - Zip archive of the output tree
//! - [`artifact`] - Artifact paths and the discovery filter
//! - [`assemble`] - Output tree construction
//! - [`classify`] - Extension to target folder rules
//! - [`cli`] - Command-line argument definitions
//! - [`commit`] - Promotion of staged hashes to the baseline
//! - [`config`] - Layered per-run configuration
//! - [`detect`] - Content-hash change detection
//! - [`digest`] - SHA-256 content digests
//! - [`error`] - Error types
//! - [`lock`] - Exclusive run lock
//! - [`manifest`] - `package.xml` rendering
//! - [`metadata`] - Descriptor lookup and synthesis
//! - [`pipeline`] - Operation sequencing
//! - [`snapshot`] - Baseline and staged hash snapshots

pub mod archive;
pub mod artifact;
pub mod assemble;
pub mod classify;
pub mod cli;
pub mod commit;
pub mod config;
pub mod detect;
pub mod digest;
pub mod error;
pub mod lock;
pub mod manifest;
pub mod metadata;
pub mod pipeline;
pub mod snapshot;

pub use config::Config;
pub use error::{PackagerError, Result};
