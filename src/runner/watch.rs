//! Watch mode
//!
//! After a run, the watch rules of every executed task are interpolated with
//! the context's variables and compiled into matchers that select paths the
//! same way file actions do. The static root of each rule's globs is watched recursively with
//! a debounced `notify` watcher. Each batch of changes is matched against the
//! rules and the matching tasks are re-run in a fresh run, so their
//! prerequisites run again once per batch.

use crate::config::WatchRule;
use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{files, interpolate_list, Context, Registry, Runner};
use notify::RecursiveMode;
use notify_debouncer_full::new_debouncer;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// Debounce window for filesystem events
const DEBOUNCE: Duration = Duration::from_millis(250);

/// A watch rule ready for matching
#[derive(Debug, Clone)]
pub struct CompiledRule {
    matcher: files::PathMatcher,
    tasks: Vec<String>,
}

impl CompiledRule {
    pub fn matches(&self, relative: &Path) -> bool {
        self.matcher.is_match(relative)
    }
}

/// Interpolate `${var}` references in the rules' paths
pub fn resolve_rules(
    rules: &[&WatchRule],
    vars: &HashMap<String, String>,
) -> ExecutionResult<Vec<WatchRule>> {
    rules
        .iter()
        .map(|rule| {
            Ok(WatchRule {
                paths: interpolate_list(&rule.paths, vars)?,
                tasks: rule.tasks.clone(),
            })
        })
        .collect()
}

/// Compile resolved watch rules into matchers
pub fn compile_rules(rules: &[WatchRule]) -> ExecutionResult<Vec<CompiledRule>> {
    rules
        .iter()
        .map(|rule| {
            Ok(CompiledRule {
                matcher: files::PathMatcher::new(&rule.paths)?,
                tasks: rule.tasks.clone(),
            })
        })
        .collect()
}

/// Tasks to re-run for a batch of changed paths, in rule order without duplicates
///
/// Paths must be relative to the working directory.
pub fn tasks_for_paths(rules: &[CompiledRule], paths: &[PathBuf]) -> Vec<String> {
    let mut tasks: Vec<String> = Vec::new();
    for rule in rules {
        if !paths.iter().any(|path| rule.matches(path)) {
            continue;
        }
        for task in &rule.tasks {
            if !tasks.contains(task) {
                tasks.push(task.clone());
            }
        }
    }
    tasks
}

/// Directories to watch for the given rules, with nested roots collapsed
///
/// Exclusions never add a root.
pub fn watch_roots(rules: &[WatchRule], working_dir: &Path) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = rules
        .iter()
        .flat_map(|rule| rule.paths.iter())
        .filter(|pattern| !pattern.starts_with('!'))
        .flat_map(|pattern| files::expand_braces(pattern))
        .map(|pattern| working_dir.join(files::glob_base(&pattern)))
        .collect();
    roots.sort();
    roots.dedup();

    let mut collapsed: Vec<PathBuf> = Vec::new();
    for root in roots {
        if collapsed.last().is_some_and(|last| root.starts_with(last)) {
            continue;
        }
        collapsed.push(root);
    }
    collapsed
}

fn watch_error(e: impl std::fmt::Display) -> ExecutionError {
    ExecutionError::Watch(e.to_string())
}

/// Watch the rules' paths and re-run matching tasks until the watcher stops
///
/// Failed rebuilds are reported and the loop keeps going.
pub fn watch(registry: &Registry, rules: &[&WatchRule], ctx: &mut Context) -> ExecutionResult<()> {
    let rules = resolve_rules(rules, &ctx.vars)?;
    let compiled = compile_rules(&rules)?;
    let root = ctx
        .working_dir
        .canonicalize()
        .unwrap_or_else(|_| ctx.working_dir.clone());

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(DEBOUNCE, None, tx).map_err(watch_error)?;

    for dir in watch_roots(&rules, &root) {
        if !dir.exists() {
            ctx.print_warn(&format!("not watching missing path {}", dir.display()));
            continue;
        }
        debouncer
            .watch(&dir, RecursiveMode::Recursive)
            .map_err(watch_error)?;
        ctx.print_info(&format!("Watching {}", dir.display()));
    }

    let runner = Runner::new(registry);
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let changed: Vec<PathBuf> = events
                    .iter()
                    .flat_map(|event| event.event.paths.iter())
                    .filter_map(|path| {
                        path.strip_prefix(&root)
                            .or_else(|_| path.strip_prefix(&ctx.working_dir))
                            .ok()
                            .map(Path::to_path_buf)
                    })
                    .collect();

                let tasks = tasks_for_paths(&compiled, &changed);
                if tasks.is_empty() {
                    continue;
                }

                ctx.print_info(&format!("Change detected, running {}", tasks.join(", ")));
                if let Err(e) = runner.run(&tasks, ctx) {
                    ctx.print_error(&format!("Rebuild stopped at '{}': {}", e.task_name(), e));
                }
            }
            Ok(Err(errors)) => {
                for error in errors {
                    ctx.print_error(&format!("watch error: {}", error));
                }
            }
            // The debouncer is gone; nothing more will arrive
            Err(_) => return Ok(()),
        }
    }
}
