//! Task execution engine
//!
//! This module holds the task registry, the dependency-ordered runner, and
//! everything a configured task does when it runs: commands, conditions,
//! file operations, and watching.

pub mod action;
pub mod command;
pub mod context;
pub mod files;
pub mod graph;
pub mod interpolate;
pub mod registry;
pub mod task;
pub mod watch;
pub mod when;

pub use action::*;
pub use command::*;
pub use context::*;
pub use graph::*;
pub use interpolate::*;
pub use registry::*;
pub use task::*;
pub use when::*;
