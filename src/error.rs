//! Error types for Weave

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Weave operations
pub type Result<T> = std::result::Result<T, WeaveError>;

/// Main error type for Weave
#[derive(Error, Debug)]
pub enum WeaveError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task graph resolution and execution errors
    #[error(transparent)]
    Run(#[from] RunError),

    /// Errors raised outside of a task action (watch loop, background processes)
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Task '{task}': {reason}")]
    InvalidTask { task: String, reason: String },

    #[error("Failed to include file '{path}': {error}")]
    IncludeFile { path: PathBuf, error: String },

    #[error("Failed to load env file '{path}': {error}")]
    EnvFile { path: PathBuf, error: String },
}

/// Errors that abort a run of the task graph
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Task '{0}' is not defined")]
    UnknownTask(String),

    #[error("Circular dependency detected at task '{task}': {chain}")]
    Cycle { task: String, chain: String },

    #[error("Task '{name}' failed: {source}")]
    Task {
        name: String,
        #[source]
        source: ExecutionError,
    },
}

impl RunError {
    /// Name of the task the error is attributed to
    pub fn task_name(&self) -> &str {
        match self {
            RunError::UnknownTask(name) => name,
            RunError::Cycle { task, .. } => task,
            RunError::Task { name, .. } => name,
        }
    }
}

/// Task action errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command failed with exit code {0:?}")]
    CommandFailed(Option<i32>),

    #[error("Failed to start '{program}': {error}")]
    Spawn { program: String, error: String },

    #[error("{action} '{path}': {source}")]
    File {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid glob pattern '{pattern}': {error}")]
    Glob { pattern: String, error: String },

    #[error("Watch error: {0}")]
    Watch(String),

    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    #[error("{0}")]
    Failed(String),
}

/// Variable interpolation errors
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Variable '{0}' is not defined")]
    UndefinedVariable(String),

    #[error("Recursive interpolation detected")]
    RecursiveInterpolation,
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for task graph runs
pub type RunResult<T> = std::result::Result<T, RunError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Specialized result type for interpolation operations
pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;

impl ExecutionError {
    /// Wrap an I/O error raised while touching `path`
    pub fn file(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        ExecutionError::File {
            action,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_error_task_name() {
        let err = RunError::Task {
            name: "scripts".to_string(),
            source: ExecutionError::CommandFailed(Some(2)),
        };
        assert_eq!(err.task_name(), "scripts");
        assert_eq!(
            err.to_string(),
            "Task 'scripts' failed: Command failed with exit code Some(2)"
        );
    }

    #[test]
    fn test_cycle_message_includes_chain() {
        let err = RunError::Cycle {
            task: "a".to_string(),
            chain: "a -> b -> a".to_string(),
        };
        assert!(err.to_string().contains("a -> b -> a"));
    }
}
