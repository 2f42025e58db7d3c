//! Weave - a YAML-based build task runner
//!
//! Tasks are declared in a `weave.yml` file with their prerequisites and
//! actions. Weave resolves the prerequisite graph, runs every task at most
//! once per run, and can keep watching the source tree to rebuild on change.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod runner;

// Re-export commonly used types
pub use error::{Result, RunError, WeaveError};

/// Current version of Weave
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
