//! Task registry
//!
//! Maps task names to their prerequisites and actions. Prerequisite names are
//! not checked here; the runner resolves them when a run is planned.

use crate::config::{Config, WatchRule};
use crate::error::ConfigResult;
use crate::runner::{Action, Task};
use std::collections::HashMap;
use std::fmt;

/// A task as the runner sees it
pub struct RegisteredTask {
    pub name: String,
    pub prerequisites: Vec<String>,
    pub usage: Option<String>,
    pub private: bool,
    pub watch: Vec<WatchRule>,
    action: Box<dyn Action>,
}

impl RegisteredTask {
    pub fn action(&self) -> &dyn Action {
        self.action.as_ref()
    }
}

impl fmt::Debug for RegisteredTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTask")
            .field("name", &self.name)
            .field("prerequisites", &self.prerequisites)
            .field("private", &self.private)
            .finish_non_exhaustive()
    }
}

/// Mapping from task name to task
#[derive(Debug, Default)]
pub struct Registry {
    tasks: HashMap<String, RegisteredTask>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from every task in the configuration
    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        let mut registry = Registry::new();
        for (name, task) in &config.tasks {
            registry.register_task(Task::from_config(name.clone(), task.clone())?);
        }
        Ok(registry)
    }

    /// Store a task, replacing any earlier task with the same name
    pub fn register<A>(&mut self, name: impl Into<String>, prerequisites: Vec<String>, action: A)
    where
        A: Action + 'static,
    {
        let name = name.into();
        self.tasks.insert(
            name.clone(),
            RegisteredTask {
                name,
                prerequisites,
                usage: None,
                private: false,
                watch: Vec::new(),
                action: Box::new(action),
            },
        );
    }

    /// Store a configured task along with its listing and watch metadata
    pub fn register_task(&mut self, task: Task) {
        let name = task.name.clone();
        let entry = RegisteredTask {
            name: name.clone(),
            prerequisites: task.deps.clone(),
            usage: task.usage.clone(),
            private: task.private,
            watch: task.watch.clone(),
            action: Box::new(task),
        };
        self.tasks.insert(name, entry);
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTask> {
        self.tasks.get(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task names in alphabetical order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Watch rules declared by the given tasks, in task order
    pub fn watch_rules<'a>(&'a self, names: &[String]) -> Vec<&'a WatchRule> {
        names
            .iter()
            .filter_map(|name| self.tasks.get(name))
            .flat_map(|task| task.watch.iter())
            .collect()
    }
}
