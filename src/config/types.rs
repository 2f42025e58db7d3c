//! Core configuration types
//!
//! This module defines the data structures that represent a weave.yml configuration file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Application name (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Application usage description (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Tasks defined in the configuration
    #[serde(default)]
    pub tasks: HashMap<String, Task>,

    /// Global interpreter to use for commands (e.g., ["sh", "-c"])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Vec<String>>,

    /// Output directories per build mode
    #[serde(default)]
    pub output: OutputDirs,

    /// Global variables available to every task
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub vars: HashMap<String, String>,

    /// Env file merged into the variables at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dotenv: Option<String>,
}

/// Output directory for each build mode
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputDirs {
    #[serde(default = "default_development_dir")]
    pub development: String,

    #[serde(default = "default_production_dir")]
    pub production: String,
}

impl Default for OutputDirs {
    fn default() -> Self {
        OutputDirs {
            development: default_development_dir(),
            production: default_production_dir(),
        }
    }
}

fn default_development_dir() -> String {
    "build".to_string()
}

fn default_production_dir() -> String {
    "dist".to_string()
}

/// A task definition
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Task {
    /// Usage description for help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Longer description for help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether this task is private (hidden from listings)
    #[serde(default)]
    pub private: bool,

    /// Whether this task should run quietly
    #[serde(default)]
    pub quiet: bool,

    /// Prerequisite tasks, run in order before this one
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "deserialize_names")]
    pub deps: Vec<String>,

    /// Run items to execute
    #[serde(default, deserialize_with = "deserialize_run_items")]
    pub run: Vec<Run>,

    /// Finally block - always executes, even on error
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "deserialize_run_items")]
    pub finally: Vec<Run>,

    /// Variables set before the task's run items execute
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub vars: HashMap<String, String>,

    /// Rebuild rules that apply once this task has run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watch: Vec<WatchRule>,

    /// Include another file as task definition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
}

/// A run item - can be a command or a complex item with actions
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Run {
    /// Simple string command
    SimpleCommand(String),

    /// Complex run item with conditionals and multiple actions
    Complex(RunItem),
}

/// A complex run item with conditions and actions
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunItem {
    /// Conditions that must be met for this run item to execute
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub when: Vec<When>,

    /// Commands to execute
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "deserialize_commands"
    )]
    pub command: Vec<Command>,

    /// Environment variables to set
    #[serde(
        rename = "set-environment",
        default,
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub set_environment: HashMap<String, Option<String>>,

    /// Paths or globs to delete
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "deserialize_names")]
    pub clean: Vec<String>,

    /// Files to copy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy: Option<CopyFiles>,

    /// Files to concatenate into one output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concat: Option<Concat>,

    /// References to write into a template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inject: Option<Inject>,

    /// Command to start in the background
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn: Option<String>,
}

/// A command to execute
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Command {
    /// Simple string command
    Simple(String),

    /// Complex command with additional options
    Complex(CommandDetail),
}

/// Detailed command specification
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandDetail {
    /// The command to execute
    pub exec: String,

    /// What to print when running (defaults to exec)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print: Option<String>,

    /// Whether to suppress output
    #[serde(default)]
    pub quiet: bool,

    /// Working directory for the command
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Report a non-zero exit as a warning instead of failing the task
    #[serde(rename = "ignore-errors", default)]
    pub ignore_errors: bool,
}

/// Copy matched files into a destination directory
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CopyFiles {
    /// Globs to copy; a leading `!` excludes matches
    #[serde(deserialize_with = "deserialize_names")]
    pub src: Vec<String>,

    /// Destination directory
    pub dest: String,

    /// Directory the copied paths are made relative to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

/// Concatenate matched files into a single output file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Concat {
    /// Globs to concatenate; a leading `!` excludes matches
    #[serde(deserialize_with = "deserialize_names")]
    pub src: Vec<String>,

    /// Output file
    pub output: String,

    /// Text placed between files
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Text placed before the first file
    #[serde(default)]
    pub header: String,

    /// Text placed after the last file
    #[serde(default)]
    pub footer: String,
}

fn default_separator() -> String {
    "\n".to_string()
}

/// Write references to matched files between the inject markers of a template
///
/// A block opens with a comment naming `<name>:<ext>` (for example
/// `<!-- inject:js -->` or `//- vendor:css`) and closes with `endinject`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Inject {
    /// Template file to read
    pub template: String,

    /// Globs of the files to reference; a leading `!` excludes matches
    #[serde(deserialize_with = "deserialize_names")]
    pub sources: Vec<String>,

    /// Directory the rendered template is written to
    pub dest: String,

    /// Marker name
    #[serde(default = "default_inject_name")]
    pub name: String,

    /// Leading path removed from each reference
    #[serde(rename = "ignore-path", default, skip_serializing_if = "Option::is_none")]
    pub ignore_path: Option<String>,

    /// Path placed in front of each reference
    #[serde(rename = "add-prefix", default, skip_serializing_if = "Option::is_none")]
    pub add_prefix: Option<String>,
}

fn default_inject_name() -> String {
    "inject".to_string()
}

/// A set of paths that re-run tasks when they change
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchRule {
    /// Globs, relative to the working directory
    #[serde(deserialize_with = "deserialize_names")]
    pub paths: Vec<String>,

    /// Tasks to run when a matching path changes
    #[serde(deserialize_with = "deserialize_names")]
    pub tasks: Vec<String>,
}

/// A conditional expression; exactly one condition per entry
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct When {
    /// Check if values are equal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equal: Option<WhenComparison>,

    /// Check if values are not equal
    #[serde(rename = "not-equal", skip_serializing_if = "Option::is_none")]
    pub not_equal: Option<WhenComparison>,

    /// Check if a command succeeds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Check if a path exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exists: Option<String>,

    /// Check if environment variable is set
    #[serde(rename = "env-set", skip_serializing_if = "Option::is_none")]
    pub env_set: Option<String>,

    /// Check if environment variable is not set
    #[serde(rename = "env-not-set", skip_serializing_if = "Option::is_none")]
    pub env_not_set: Option<String>,

    /// Check if a variable is set
    #[serde(rename = "var-set", skip_serializing_if = "Option::is_none")]
    pub var_set: Option<String>,

    /// Check if a variable is not set
    #[serde(rename = "var-not-set", skip_serializing_if = "Option::is_none")]
    pub var_not_set: Option<String>,

    /// Check the build mode (true for production)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production: Option<bool>,
}

impl When {
    /// Number of conditions set in this entry
    pub fn condition_count(&self) -> usize {
        [
            self.equal.is_some(),
            self.not_equal.is_some(),
            self.command.is_some(),
            self.exists.is_some(),
            self.env_set.is_some(),
            self.env_not_set.is_some(),
            self.var_set.is_some(),
            self.var_not_set.is_some(),
            self.production.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

/// A comparison for when conditions
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhenComparison {
    /// Left-hand side of comparison
    pub left: String,

    /// Right-hand side of comparison
    pub right: String,
}

/// Custom deserializer for run items that handles both single values and arrays
fn deserialize_run_items<'de, D>(deserializer: D) -> Result<Vec<Run>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        // Single string command
        Value::String(s) => Ok(vec![Run::SimpleCommand(s)]),
        // Single complex item
        Value::Mapping(_) => {
            let run = Run::deserialize(value).map_err(D::Error::custom)?;
            Ok(vec![run])
        }
        // Array of run items
        Value::Sequence(seq) => {
            let mut runs = Vec::new();
            for item in seq {
                let run = Run::deserialize(item).map_err(D::Error::custom)?;
                runs.push(run);
            }
            Ok(runs)
        }
        // Null or not present
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("run must be a string, object, or array")),
    }
}

/// Custom deserializer for commands that handles both single values and arrays
fn deserialize_commands<'de, D>(deserializer: D) -> Result<Vec<Command>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        // Single string or complex command
        Value::String(s) => Ok(vec![Command::Simple(s)]),
        Value::Mapping(_) => {
            let cmd = Command::deserialize(value).map_err(D::Error::custom)?;
            Ok(vec![cmd])
        }
        // Array of commands
        Value::Sequence(seq) => {
            let mut cmds = Vec::new();
            for item in seq {
                let cmd = Command::deserialize(item).map_err(D::Error::custom)?;
                cmds.push(cmd);
            }
            Ok(cmds)
        }
        // Null or not present
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("command must be a string, object, or array")),
    }
}

/// Custom deserializer for name and glob lists that accepts a single string too
fn deserialize_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(vec![s]),
        Value::Sequence(seq) => seq
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(D::Error::custom(format!(
                    "expected a string, found {:?}",
                    other
                ))),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("expected a string or array of strings")),
    }
}
