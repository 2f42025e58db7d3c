//! Configuration file parsing and discovery

use crate::config::types::{Config, Task};
use crate::error::{ConfigError, ConfigResult, WeaveError};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["weave.yml", "weave.yaml"];

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<Config, WeaveError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read file: {}", e)))?;

    parse_config(&contents, Some(path))
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str, config_path: Option<&Path>) -> Result<Config, WeaveError> {
    let mut config: Config = serde_yaml::from_str(yaml)?;

    // Process includes if present
    if let Some(base_path) = config_path {
        process_includes(&mut config, base_path)?;
    }

    Ok(config)
}

/// Process include directives in tasks
fn process_includes(config: &mut Config, config_path: &Path) -> Result<(), WeaveError> {
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    for task in config.tasks.values_mut() {
        if let Some(include_path) = &task.include {
            *task = load_included_task(&base_dir.join(include_path))?;
        }
    }

    Ok(())
}

/// Load a task from an included file
fn load_included_task(path: &Path) -> Result<Task, WeaveError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::IncludeFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let task: Task = serde_yaml::from_str(&contents).map_err(|e| ConfigError::IncludeFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    if task.include.is_some() {
        return Err(ConfigError::IncludeFile {
            path: path.to_path_buf(),
            error: "included tasks cannot include other files".to_string(),
        }
        .into());
    }

    Ok(task)
}

/// Read the env file named by `dotenv`, relative to `base_dir`
///
/// Returns an empty map when no env file is configured.
pub fn load_dotenv(config: &Config, base_dir: &Path) -> ConfigResult<HashMap<String, String>> {
    let Some(file) = &config.dotenv else {
        return Ok(HashMap::new());
    };

    let path = base_dir.join(file);
    let env_error = |e: dotenvy::Error| ConfigError::EnvFile {
        path: path.clone(),
        error: e.to_string(),
    };

    dotenvy::from_path_iter(&path)
        .map_err(env_error)?
        .map(|item| item.map_err(env_error))
        .collect()
}

/// Parse configuration with automatic file discovery
pub fn parse_config_auto() -> Result<(Config, PathBuf), WeaveError> {
    let config_path = find_config_file()?;
    let config = parse_config_file(&config_path)?;
    Ok((config, config_path))
}
