//! Task execution types and logic
//!
//! This module contains the runtime representation of configured tasks and
//! the action that executes their run items.

use crate::config;
use crate::error::{ConfigError, ConfigResult, ExecutionResult};
use crate::runner::{
    evaluate_when_list, execute_command, files, interpolate, spawn_background, Action, Context,
};
use std::collections::HashMap;

/// Runtime task representation
///
/// This differs from config::Task by holding run items in the shape the
/// executor consumes
#[derive(Debug, Clone)]
pub struct Task {
    /// Task name
    pub name: String,

    /// Usage description
    pub usage: Option<String>,

    /// Longer description
    pub description: Option<String>,

    /// Whether this task is private
    pub private: bool,

    /// Whether this task should run quietly
    pub quiet: bool,

    /// Prerequisite task names
    pub deps: Vec<String>,

    /// Run items to execute
    pub run: Vec<Run>,

    /// Finally block
    pub finally: Vec<Run>,

    /// Rebuild rules
    pub watch: Vec<config::WatchRule>,

    /// Variables merged into the context before running
    pub vars: HashMap<String, String>,
}

impl Task {
    /// Create a new task from configuration
    pub fn from_config(name: String, config: config::Task) -> ConfigResult<Self> {
        if config.include.is_some() {
            return Err(ConfigError::InvalidTask {
                task: name,
                reason: "include was not resolved; parse the config from a file".to_string(),
            });
        }

        Ok(Task {
            name,
            usage: config.usage,
            description: config.description,
            private: config.private,
            quiet: config.quiet,
            deps: config.deps,
            run: config.run.into_iter().map(Run::from_config).collect(),
            finally: config.finally.into_iter().map(Run::from_config).collect(),
            watch: config.watch,
            vars: config.vars,
        })
    }

    /// Execute the task in the given context
    ///
    /// Task vars and `set-environment` changes are scoped to this task: the
    /// context's variables are restored once `finally` has run.
    pub fn execute(&self, ctx: &mut Context) -> ExecutionResult<()> {
        let saved = ctx.vars.clone();
        let result = self.execute_scoped(ctx);
        ctx.vars = saved;
        result
    }

    fn execute_scoped(&self, ctx: &mut Context) -> ExecutionResult<()> {
        for (key, value) in &self.vars {
            let interpolated = interpolate(value, &ctx.vars)?;
            ctx.set_var(key.clone(), interpolated);
        }

        let result = self.execute_run_items(&self.run, ctx);

        // Always run finally blocks
        if !self.finally.is_empty() {
            ctx.print_debug(&format!("Running finally block of '{}'", self.name));
            let finally_result = self.execute_run_items(&self.finally, ctx);

            // A failure in run wins over a failure in finally
            if result.is_ok() {
                return finally_result;
            }
        }

        result
    }

    fn execute_run_items(&self, items: &[Run], ctx: &mut Context) -> ExecutionResult<()> {
        for run in items {
            self.execute_run_item(run, ctx)?;
        }
        Ok(())
    }

    /// Execute a single run item
    fn execute_run_item(&self, run: &Run, ctx: &mut Context) -> ExecutionResult<()> {
        if !run.when.is_empty() && !evaluate_when_list(&run.when, ctx)? {
            return Ok(());
        }

        for cmd in &run.commands {
            execute_command(cmd, ctx, self.quiet)?;
        }

        for (key, value) in &run.set_environment {
            match value {
                Some(val) => {
                    let interpolated = interpolate(val, &ctx.vars)?;
                    ctx.set_var(key.clone(), interpolated);
                }
                None => {
                    ctx.vars.remove(key);
                }
            }
        }

        if !run.clean.is_empty() {
            let removed = files::clean(&run.clean, ctx)?;
            ctx.print_debug(&format!("clean removed {} paths", removed));
        }

        if let Some(copy) = &run.copy {
            let copied = files::copy(copy, ctx)?;
            ctx.print_debug(&format!("copy wrote {} files", copied));
        }

        if let Some(concat) = &run.concat {
            files::concat(concat, ctx)?;
        }

        if let Some(inject) = &run.inject {
            files::inject(inject, ctx)?;
        }

        if let Some(spawn) = &run.spawn {
            spawn_background(spawn, ctx)?;
        }

        Ok(())
    }
}

impl Action for Task {
    fn run(&self, ctx: &mut Context) -> ExecutionResult<()> {
        self.execute(ctx)
    }
}

/// Runtime representation of a run item
///
/// Actions run in a fixed order: commands, set-environment, clean, copy,
/// concat, inject, spawn.
#[derive(Debug, Clone, Default)]
pub struct Run {
    /// Conditions that must be met
    pub when: Vec<When>,

    /// Commands to execute
    pub commands: Vec<Command>,

    /// Environment variables to set
    pub set_environment: HashMap<String, Option<String>>,

    /// Paths to delete
    pub clean: Vec<String>,

    /// Files to copy
    pub copy: Option<config::CopyFiles>,

    /// Files to concatenate
    pub concat: Option<config::Concat>,

    /// References to write into a template
    pub inject: Option<config::Inject>,

    /// Background command
    pub spawn: Option<String>,
}

impl Run {
    /// Create from config
    pub fn from_config(config: config::Run) -> Self {
        match config {
            config::Run::SimpleCommand(cmd) => Run {
                commands: vec![Command::Simple(cmd)],
                ..Run::default()
            },
            config::Run::Complex(item) => Run {
                when: item.when.into_iter().map(When::from_config).collect(),
                commands: item
                    .command
                    .into_iter()
                    .map(Command::from_config)
                    .collect(),
                set_environment: item.set_environment,
                clean: item.clean,
                copy: item.copy,
                concat: item.concat,
                inject: item.inject,
                spawn: item.spawn,
            },
        }
    }
}

/// Runtime representation of a command
#[derive(Debug, Clone)]
pub enum Command {
    /// Simple command string
    Simple(String),

    /// Complex command with options
    Complex {
        exec: String,
        print: String,
        quiet: bool,
        dir: Option<String>,
        ignore_errors: bool,
    },
}

impl Command {
    /// Create from config
    pub fn from_config(config: config::Command) -> Self {
        match config {
            config::Command::Simple(cmd) => Command::Simple(cmd),
            config::Command::Complex(detail) => Command::Complex {
                print: detail.print.clone().unwrap_or_else(|| detail.exec.clone()),
                exec: detail.exec,
                quiet: detail.quiet,
                dir: detail.dir,
                ignore_errors: detail.ignore_errors,
            },
        }
    }

    /// Get the command to execute
    pub fn exec(&self) -> &str {
        match self {
            Command::Simple(cmd) => cmd,
            Command::Complex { exec, .. } => exec,
        }
    }

    /// Get what to print
    pub fn print(&self) -> &str {
        match self {
            Command::Simple(cmd) => cmd,
            Command::Complex { print, .. } => print,
        }
    }

    /// Check if this command is quiet
    pub fn is_quiet(&self) -> bool {
        match self {
            Command::Simple(_) => false,
            Command::Complex { quiet, .. } => *quiet,
        }
    }

    /// Get the working directory
    pub fn dir(&self) -> Option<&str> {
        match self {
            Command::Simple(_) => None,
            Command::Complex { dir, .. } => dir.as_deref(),
        }
    }

    pub fn ignores_errors(&self) -> bool {
        match self {
            Command::Simple(_) => false,
            Command::Complex { ignore_errors, .. } => *ignore_errors,
        }
    }
}

/// Runtime representation of a when condition
#[derive(Debug, Clone)]
pub struct When {
    pub condition: WhenCondition,
}

impl When {
    pub fn from_config(config: config::When) -> Self {
        // Determine which condition type is set
        let condition = if let Some(eq) = config.equal {
            WhenCondition::Equal {
                left: eq.left,
                right: eq.right,
            }
        } else if let Some(ne) = config.not_equal {
            WhenCondition::NotEqual {
                left: ne.left,
                right: ne.right,
            }
        } else if let Some(cmd) = config.command {
            WhenCondition::Command(cmd)
        } else if let Some(path) = config.exists {
            WhenCondition::Exists(path)
        } else if let Some(var) = config.env_set {
            WhenCondition::EnvSet(var)
        } else if let Some(var) = config.env_not_set {
            WhenCondition::EnvNotSet(var)
        } else if let Some(name) = config.var_set {
            WhenCondition::VarSet(name)
        } else if let Some(name) = config.var_not_set {
            WhenCondition::VarNotSet(name)
        } else if let Some(production) = config.production {
            WhenCondition::Production(production)
        } else {
            WhenCondition::Always
        };

        When { condition }
    }
}

/// Types of when conditions
#[derive(Debug, Clone)]
pub enum WhenCondition {
    Equal { left: String, right: String },
    NotEqual { left: String, right: String },
    Command(String),
    Exists(String),
    EnvSet(String),
    EnvNotSet(String),
    VarSet(String),
    VarNotSet(String),
    Production(bool),
    Always,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::error::ExecutionError;
    use crate::runner::Verbosity;
    use std::fs;
    use tempfile::TempDir;

    fn task_from(yaml: &str, name: &str) -> Task {
        let config = parse_config(yaml, None).unwrap();
        Task::from_config(name.to_string(), config.tasks[name].clone()).unwrap()
    }

    fn context_in(dir: &TempDir) -> Context {
        Context::new()
            .with_working_dir(dir.path().to_path_buf())
            .with_verbosity(Verbosity::Silent)
    }

    #[test]
    fn test_from_config_rejects_unresolved_include() {
        let config = config::Task {
            include: Some("other.yml".to_string()),
            ..config::Task::default()
        };
        let result = Task::from_config("lint".to_string(), config);
        assert!(matches!(result, Err(ConfigError::InvalidTask { .. })));
    }

    #[test]
    fn test_when_from_config_production() {
        let when = When::from_config(config::When {
            production: Some(false),
            ..config::When::default()
        });
        assert!(matches!(when.condition, WhenCondition::Production(false)));
    }

    #[test]
    fn test_run_item_actions_in_order() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("step-templates")).unwrap();
        fs::write(temp_dir.path().join("step-templates/a.json"), "1").unwrap();
        fs::write(temp_dir.path().join("step-templates/b.json"), "2").unwrap();

        let yaml = r#"
tasks:
  templates:
    run:
      - command: mkdir -p stale
        set-environment:
          list: step-templates/*.json
        clean: stale
        concat:
          src: ${list}
          output: ${out_dir}/items.json
          separator: ","
          header: "["
          footer: "]"
"#;
        let task = task_from(yaml, "templates");
        let mut ctx = context_in(&temp_dir);
        task.execute(&mut ctx).unwrap();

        assert!(!temp_dir.path().join("stale").exists());
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("build/items.json")).unwrap(),
            "[1,2]"
        );
    }

    #[test]
    fn test_production_condition_selects_items() {
        let temp_dir = TempDir::new().unwrap();
        let yaml = r#"
tasks:
  styles:
    run:
      - when:
          - production: true
        command: touch minified
      - when:
          - production: false
        command: touch expanded
"#;
        let task = task_from(yaml, "styles");
        let mut ctx = context_in(&temp_dir);
        task.execute(&mut ctx).unwrap();

        assert!(temp_dir.path().join("expanded").exists());
        assert!(!temp_dir.path().join("minified").exists());
    }

    #[test]
    fn test_finally_runs_after_failure() {
        let temp_dir = TempDir::new().unwrap();
        let yaml = r#"
tasks:
  jasmine:
    run: exit 4
    finally: touch report.xml
"#;
        let task = task_from(yaml, "jasmine");
        let mut ctx = context_in(&temp_dir);
        let result = task.execute(&mut ctx);

        assert!(matches!(result, Err(ExecutionError::CommandFailed(Some(4)))));
        assert!(temp_dir.path().join("report.xml").exists());
    }

    #[test]
    fn test_finally_failure_reported_when_run_succeeds() {
        let temp_dir = TempDir::new().unwrap();
        let yaml = r#"
tasks:
  lint:
    run: "true"
    finally: exit 2
"#;
        let task = task_from(yaml, "lint");
        let mut ctx = context_in(&temp_dir);
        assert!(matches!(
            task.execute(&mut ctx),
            Err(ExecutionError::CommandFailed(Some(2)))
        ));
    }

    #[test]
    fn test_unset_environment() {
        let temp_dir = TempDir::new().unwrap();
        let yaml = r#"
tasks:
  env:
    run:
      - set-environment:
          NODE_ENV: ${mode}
      - set-environment:
          STALE: ~
      - command: echo "${NODE_ENV}:${STALE:-unset}" > env.txt
"#;
        let task = task_from(yaml, "env");
        let mut ctx = context_in(&temp_dir);
        ctx.set_var("STALE".to_string(), "1".to_string());
        task.execute(&mut ctx).unwrap();

        let seen = fs::read_to_string(temp_dir.path().join("env.txt")).unwrap();
        assert_eq!(seen.trim(), "development:unset");
    }

    #[test]
    fn test_task_vars_restored_after_execute() {
        let temp_dir = TempDir::new().unwrap();
        let yaml = r#"
tasks:
  styles:
    vars:
      out_dir: elsewhere
    run:
      - set-environment:
          NODE_ENV: production
      - command: mkdir -p "${out_dir}"
    finally: exit 3
"#;
        let task = task_from(yaml, "styles");
        let mut ctx = context_in(&temp_dir);
        assert!(task.execute(&mut ctx).is_err());

        assert!(temp_dir.path().join("elsewhere").is_dir());
        assert_eq!(ctx.get_var("out_dir"), Some(&"build".to_string()));
        assert!(ctx.get_var("NODE_ENV").is_none());
    }
}
