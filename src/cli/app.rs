//! Main CLI application

use crate::config::{load_dotenv, parse_config_auto, parse_config_file, validate_config, Config};
use crate::error::WeaveError;
use crate::runner::{format_elapsed, watch, Context, Mode, Profile, Registry, Runner, Verbosity};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use colored::Colorize;
use std::io;
use std::path::{Path, PathBuf};

/// Task run when none is named on the command line
pub const DEFAULT_TASK: &str = "default";

/// Options parsed from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub tasks: Vec<String>,
    pub file: Option<PathBuf>,
    pub mode: Mode,
    pub verbosity: Verbosity,
    pub list: bool,
    pub dry_run: bool,
}

impl Options {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let tasks: Vec<String> = matches
            .get_many::<String>("tasks")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        Options {
            tasks: if tasks.is_empty() {
                vec![DEFAULT_TASK.to_string()]
            } else {
                tasks
            },
            file: matches.get_one::<PathBuf>("file").cloned(),
            mode: Mode::from_flag(matches.get_flag("production")),
            verbosity: get_verbosity(matches),
            list: matches.get_flag("list"),
            dry_run: matches.get_flag("dry-run"),
        }
    }
}

/// CLI application
pub struct App {
    /// Parsed configuration
    config: Config,
    /// Config file path
    config_path: PathBuf,
}

impl App {
    /// Create a new app from the discovered configuration file
    pub fn new() -> Result<Self, WeaveError> {
        let (config, config_path) = parse_config_auto()?;
        Self::from_parts(config, config_path)
    }

    /// Create app with a specific config file
    pub fn with_config_file(path: PathBuf) -> Result<Self, WeaveError> {
        let config = parse_config_file(&path)?;
        Self::from_parts(config, path)
    }

    fn from_parts(config: Config, config_path: PathBuf) -> Result<Self, WeaveError> {
        validate_config(&config)?;
        Ok(App {
            config,
            config_path,
        })
    }

    /// Build the execution context for a run
    pub fn context(&self, options: &Options) -> Result<Context, WeaveError> {
        let working_dir = config_dir(&self.config_path)?;
        let dotenv = load_dotenv(&self.config, &working_dir)?;
        let profile = Profile::new(options.mode, &self.config.output);

        let mut ctx = Context::new()
            .with_working_dir(working_dir)
            .with_config_path(self.config_path.clone())
            .with_profile(profile)
            .with_vars(self.config.vars.clone())
            .with_vars(dotenv)
            .with_verbosity(options.verbosity);

        // Set interpreter if specified in config
        if let Some(interpreter) = &self.config.interpreter {
            ctx = ctx.with_interpreter(interpreter.clone());
        }

        Ok(ctx)
    }

    /// Run the application with parsed options
    pub fn run(&self, options: &Options) -> Result<(), WeaveError> {
        let registry = Registry::from_config(&self.config)?;

        if options.list {
            self.print_list(&registry);
            return Ok(());
        }

        let runner = Runner::new(&registry);

        if options.dry_run {
            for name in runner.plan(&options.tasks)? {
                println!("{}", name);
            }
            return Ok(());
        }

        let mut ctx = self.context(options)?;
        ctx.print_debug(&format!(
            "Using {} in {} mode",
            self.config_path.display(),
            ctx.profile.mode.as_str()
        ));

        let report = runner.run(&options.tasks, &mut ctx)?;
        ctx.print_info(&format!("Done after {}", format_elapsed(report.elapsed)));

        let rules = registry.watch_rules(&report.executed);
        if !rules.is_empty() {
            watch::watch(&registry, &rules, &mut ctx)?;
        } else if ctx.background_count() > 0 {
            ctx.print_info("Waiting for background processes");
            ctx.wait_background()?;
        }

        Ok(())
    }

    fn print_list(&self, registry: &Registry) {
        if let Some(usage) = &self.config.usage {
            println!("{}\n", usage);
        }
        println!("{}", "Tasks:".bold());
        for name in registry.names() {
            let Some(task) = registry.get(name) else {
                continue;
            };
            if task.private {
                continue;
            }

            let mut line = format!("  {}", name.cyan());
            if let Some(usage) = &task.usage {
                line.push_str(&format!("  {}", usage));
            }
            if !task.prerequisites.is_empty() {
                line.push_str(&format!(
                    " {}",
                    format!("[{}]", task.prerequisites.join(", ")).dimmed()
                ));
            }
            println!("{}", line);
        }
    }
}

/// Directory tasks run in: the one holding the config file
fn config_dir(config_path: &Path) -> io::Result<PathBuf> {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.canonicalize(),
        _ => std::env::current_dir(),
    }
}

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("weave")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A YAML-based build task runner")
        .arg(
            Arg::new("tasks")
                .value_name("TASK")
                .help("Tasks to run (defaults to 'default')")
                .num_args(1..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("production")
                .short('p')
                .long("production")
                .help("Build in production mode")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to weave.yml config file")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List available tasks")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Print the tasks that would run, in order, without running them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .help("Print a shell completion script")
                .value_parser(value_parser!(Shell)),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Run the CLI application with the process arguments
pub fn run() -> Result<(), WeaveError> {
    let mut command = build_command();
    let matches = command.clone().get_matches();

    if let Some(shell) = matches.get_one::<Shell>("completions").copied() {
        clap_complete::generate(shell, &mut command, "weave", &mut io::stdout());
        return Ok(());
    }

    let options = Options::from_matches(&matches);
    let app = match &options.file {
        Some(path) => App::with_config_file(path.clone())?,
        None => App::new()?,
    };

    app.run(&options)
}
