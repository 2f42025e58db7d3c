//! Execution context for task running
//!
//! The context tracks all the state a task action needs: the build profile,
//! variables, working directory, and the processes started in the background.

use crate::config::OutputDirs;
use colored::Colorize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::Child;
use std::time::Duration;

/// Build mode selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    pub fn from_flag(production: bool) -> Self {
        if production {
            Mode::Production
        } else {
            Mode::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == Mode::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

/// Build settings fixed at startup and shared by every task action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub mode: Mode,
    /// Output directory for this mode, relative to the working directory
    pub out_dir: PathBuf,
}

impl Profile {
    pub fn new(mode: Mode, output: &OutputDirs) -> Self {
        let out_dir = match mode {
            Mode::Development => &output.development,
            Mode::Production => &output.production,
        };

        Profile {
            mode,
            out_dir: PathBuf::from(out_dir),
        }
    }

    /// Variables every task can interpolate
    pub fn vars(&self) -> HashMap<String, String> {
        HashMap::from([
            ("mode".to_string(), self.mode.as_str().to_string()),
            (
                "production".to_string(),
                self.mode.is_production().to_string(),
            ),
            ("out_dir".to_string(), self.out_dir.display().to_string()),
        ])
    }
}

impl Default for Profile {
    fn default() -> Self {
        Profile::new(Mode::Development, &OutputDirs::default())
    }
}

/// Execution context that tracks state during task execution
pub struct Context {
    /// Current working directory
    pub working_dir: PathBuf,

    /// Configuration file path
    pub config_path: Option<PathBuf>,

    /// Build profile
    pub profile: Profile,

    /// Variables (from the profile, config vars, set-environment, etc.)
    pub vars: HashMap<String, String>,

    /// Custom interpreter (e.g., ["bash", "-c"])
    pub interpreter: Vec<String>,

    /// Verbosity level
    pub verbosity: Verbosity,

    /// Processes started by `spawn` run items
    background: Vec<Background>,
}

/// A process started in the background
struct Background {
    command: String,
    child: Child,
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        let profile = Profile::default();
        Context {
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_path: None,
            vars: profile.vars(),
            profile,
            interpreter: vec!["sh".to_string(), "-c".to_string()],
            verbosity: Verbosity::Normal,
            background: Vec::new(),
        }
    }

    /// Create a context with a specific working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set the configuration file path
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// Set the build profile and the variables derived from it
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.vars.extend(profile.vars());
        self.profile = profile;
        self
    }

    /// Add variables, replacing existing ones with the same name
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars.extend(vars);
        self
    }

    /// Set a single variable
    pub fn set_var(&mut self, key: String, value: String) {
        self.vars.insert(key, value);
    }

    /// Get a variable value
    pub fn get_var(&self, key: &str) -> Option<&String> {
        self.vars.get(key)
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Keep a background process alive for the lifetime of the context
    pub fn adopt_background(&mut self, command: String, child: Child) {
        self.background.push(Background { command, child });
    }

    /// Number of background processes still owned by the context
    pub fn background_count(&self) -> usize {
        self.background.len()
    }

    /// Block until every background process has exited
    pub fn wait_background(&mut self) -> std::io::Result<()> {
        let processes: Vec<Background> = self.background.drain(..).collect();
        for mut process in processes {
            let status = process.child.wait()?;
            if !status.success() {
                self.print_warn(&format!(
                    "background process '{}' exited with {}",
                    process.command, status
                ));
            }
        }
        Ok(())
    }

    /// Kill every background process
    pub fn stop_background(&mut self) {
        let processes: Vec<Background> = self.background.drain(..).collect();
        for mut process in processes {
            self.print_debug(&format!("stopping '{}'", process.command));
            let _ = process.child.kill();
            let _ = process.child.wait();
        }
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "[INFO]".cyan(), message);
        }
    }

    /// Print warning message
    pub fn print_warn(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{} {}", "[WARN]".yellow(), message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{} {}", "[ERROR]".red(), message);
        }
    }

    /// Print debug message (only in verbose mode)
    pub fn print_debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{} {}", "[DEBUG]".dimmed(), message);
        }
    }

    /// Print a command about to run
    pub fn print_command(&self, command: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "[RUN]".green(), command);
        }
    }

    /// Print task start message
    pub fn print_task_start(&self, task_name: &str) {
        self.print_info(&format!("Starting '{}'...", task_name.cyan()));
    }

    /// Print task complete message
    pub fn print_task_complete(&self, task_name: &str, elapsed: Duration) {
        self.print_info(&format!(
            "Finished '{}' after {}",
            task_name.cyan(),
            format_elapsed(elapsed).as_str().magenta()
        ));
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.stop_background();
    }
}

/// Format a duration the way task timings are reported
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1000 {
        format!("{} ms", millis)
    } else {
        format!("{:.2} s", elapsed.as_secs_f64())
    }
}
