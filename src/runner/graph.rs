//! Task graph resolution and execution
//!
//! A run resolves the requested tasks depth-first into a plan, then executes
//! the plan in order. Every prerequisite appears in the plan once, before the
//! tasks that depend on it. Unknown names and cycles are reported before any
//! action starts.

use crate::error::{RunError, RunResult};
use crate::runner::{format_elapsed, Context, Registry};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Per-run bookkeeping for at-most-once resolution
#[derive(Debug, Default)]
struct RunState {
    completed: HashSet<String>,
    in_progress: Vec<String>,
}

impl RunState {
    fn is_completed(&self, name: &str) -> bool {
        self.completed.contains(name)
    }

    fn cycle_at(&self, name: &str) -> Option<String> {
        let start = self.in_progress.iter().position(|n| n == name)?;
        let mut chain: Vec<&str> = self.in_progress[start..].iter().map(String::as_str).collect();
        chain.push(name);
        Some(chain.join(" -> "))
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Tasks whose actions ran, in execution order
    pub executed: Vec<String>,
    pub elapsed: Duration,
}

/// Resolves and executes tasks from a registry
pub struct Runner<'a> {
    registry: &'a Registry,
}

impl<'a> Runner<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Resolve `names` and their transitive prerequisites into execution order
    pub fn plan(&self, names: &[String]) -> RunResult<Vec<String>> {
        let mut state = RunState::default();
        let mut order = Vec::new();
        for name in names {
            self.visit(name, &mut state, &mut order)?;
        }
        Ok(order)
    }

    fn visit(&self, name: &str, state: &mut RunState, order: &mut Vec<String>) -> RunResult<()> {
        if state.is_completed(name) {
            return Ok(());
        }

        if let Some(chain) = state.cycle_at(name) {
            return Err(RunError::Cycle {
                task: name.to_string(),
                chain,
            });
        }

        let task = self
            .registry
            .get(name)
            .ok_or_else(|| RunError::UnknownTask(name.to_string()))?;

        state.in_progress.push(name.to_string());
        for prerequisite in &task.prerequisites {
            self.visit(prerequisite, state, order)?;
        }
        state.in_progress.pop();

        state.completed.insert(name.to_string());
        order.push(name.to_string());
        Ok(())
    }

    /// Run the requested tasks and every prerequisite, each at most once
    ///
    /// Stops at the first failing action; tasks after it in the plan never start.
    pub fn run(&self, names: &[String], ctx: &mut Context) -> RunResult<RunReport> {
        let started = Instant::now();
        let plan = self.plan(names)?;
        ctx.print_debug(&format!("Plan: {}", plan.join(", ")));

        let mut executed = Vec::with_capacity(plan.len());
        for name in plan {
            let task = self
                .registry
                .get(&name)
                .ok_or_else(|| RunError::UnknownTask(name.clone()))?;

            ctx.print_task_start(&name);
            let task_started = Instant::now();

            if let Err(source) = task.action().run(ctx) {
                ctx.print_error(&format!(
                    "'{}' errored after {}",
                    name,
                    format_elapsed(task_started.elapsed())
                ));
                return Err(RunError::Task { name, source });
            }

            ctx.print_task_complete(&name, task_started.elapsed());
            executed.push(name);
        }

        Ok(RunReport {
            executed,
            elapsed: started.elapsed(),
        })
    }
}
