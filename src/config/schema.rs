//! Configuration validation
//!
//! Structural checks only. Prerequisite names and cycles are resolved when a
//! run is planned, so a task may name prerequisites defined anywhere in the file.

use crate::config::types::{Config, Run, Task};
use crate::error::{ConfigError, ConfigResult};

/// Validate a complete configuration
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    if config.output.development.trim().is_empty() || config.output.production.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "output directories must not be empty".to_string(),
        ));
    }

    if let Some(interpreter) = &config.interpreter {
        if interpreter.is_empty() {
            return Err(ConfigError::Invalid(
                "interpreter must name a program".to_string(),
            ));
        }
    }

    for (name, task) in &config.tasks {
        validate_task(name, task)?;
    }

    Ok(())
}

/// Validate a single task
pub fn validate_task(name: &str, task: &Task) -> ConfigResult<()> {
    let invalid = |reason: &str| ConfigError::InvalidTask {
        task: name.to_string(),
        reason: reason.to_string(),
    };

    if task.deps.iter().any(|dep| dep.trim().is_empty()) {
        return Err(invalid("prerequisite names must not be empty"));
    }

    for run in task.run.iter().chain(task.finally.iter()) {
        let Run::Complex(item) = run else {
            continue;
        };

        if item.when.iter().any(|when| when.condition_count() != 1) {
            return Err(invalid("each when entry needs exactly one condition"));
        }

        if let Some(copy) = &item.copy {
            if copy.src.is_empty() {
                return Err(invalid("copy needs at least one src pattern"));
            }
            if copy.dest.trim().is_empty() {
                return Err(invalid("copy needs a dest directory"));
            }
        }

        if let Some(concat) = &item.concat {
            if concat.src.is_empty() {
                return Err(invalid("concat needs at least one src pattern"));
            }
            if concat.output.trim().is_empty() {
                return Err(invalid("concat needs an output file"));
            }
        }

        if let Some(inject) = &item.inject {
            if inject.sources.is_empty() {
                return Err(invalid("inject needs at least one source pattern"));
            }
            if inject.template.trim().is_empty() || inject.dest.trim().is_empty() {
                return Err(invalid("inject needs a template and a dest directory"));
            }
        }

        if let Some(spawn) = &item.spawn {
            if spawn.trim().is_empty() {
                return Err(invalid("spawn needs a command"));
            }
        }
    }

    for rule in &task.watch {
        if rule.paths.is_empty() {
            return Err(invalid("watch rules need at least one path"));
        }
        if rule.tasks.is_empty() {
            return Err(invalid("watch rules need at least one task"));
        }
    }

    Ok(())
}
