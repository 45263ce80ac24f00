//! Shared test support for the integration and behaviour suites.
//!
//! Exposes the `project` helpers (for example `TestProject`) that lay out a
//! throwaway base directory with a project tree and read back what a run
//! produced.
pub mod project;
