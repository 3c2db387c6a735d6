// src/config/loader.rs
//! Layered configuration loader
//!
//! Built-in defaults are overlaid by each existing config file in order, then
//! by `BCIMON__SECTION__FIELD` environment variables. The merged document is
//! deserialized and validated as a whole.

use crate::config::{constants::paths, MonitorConfig};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("configuration parse error: {0}")]
    Parse(String),

    #[error("configuration validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Configuration loader
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Loader over the standard system, user and local paths
    pub fn new() -> Self {
        Self {
            config_paths: Self::discover_config_paths(),
        }
    }

    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self { config_paths: paths }
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load with overrides from the process environment
    pub fn load(&self) -> Result<MonitorConfig, ConfigError> {
        self.load_with_env(env::vars())
    }

    /// Load with overrides taken from `vars` instead of the process environment
    pub fn load_with_env<I>(&self, vars: I) -> Result<MonitorConfig, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut merged = toml::Value::try_from(MonitorConfig::default())?;

        for path in &self.config_paths {
            if !path.exists() {
                continue;
            }
            let overlay = Self::load_config_file(path)?;
            debug!(path = %path.display(), "merging configuration file");
            merge_toml_values(&mut merged, overlay);
        }

        let applied = apply_environment_overrides(&mut merged, vars);
        if applied > 0 {
            info!(count = applied, "applied environment overrides");
        }

        let config: MonitorConfig = merged.try_into()?;
        config.validate_consistency().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Validate a single file on top of the defaults without loading it
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let mut merged = toml::Value::try_from(MonitorConfig::default())?;
        merge_toml_values(&mut merged, Self::load_config_file(path.as_ref())?);

        let config: MonitorConfig = merged.try_into()?;
        config.validate_consistency().map_err(ConfigError::Validation)
    }

    /// Write `config` as pretty TOML
    pub fn export_config<P: AsRef<Path>>(
        &self,
        config: &MonitorConfig,
        path: P,
    ) -> Result<(), ConfigError> {
        let toml_content = toml::to_string_pretty(config)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn load_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(paths::SYSTEM_CONFIG_PATH)];

        if let Some(home) = env::var_os("HOME") {
            paths.push(PathBuf::from(home).join(paths::USER_CONFIG_DIR).join("config.toml"));
        }

        paths.push(PathBuf::from(paths::DEFAULT_CONFIG_FILE));
        paths.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));
        paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(base_value) => merge_toml_values(base_value, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base_value, overlay_value) => *base_value = overlay_value,
    }
}

/// Returns the number of overrides applied
fn apply_environment_overrides<I>(config: &mut toml::Value, vars: I) -> usize
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut applied = 0;
    for (key, value) in vars {
        let Some(stripped) = key.strip_prefix(paths::ENV_PREFIX) else {
            continue;
        };
        let path: Vec<String> = stripped
            .split(paths::ENV_SEPARATOR)
            .map(str::to_lowercase)
            .collect();
        if path.iter().any(String::is_empty) {
            continue;
        }

        debug!(key = %key, "environment override");
        set_nested_value(config, &path, parse_env_value(&value));
        applied += 1;
    }
    applied
}

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn set_nested_value(config: &mut toml::Value, path: &[String], value: toml::Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = config;
    for part in parents {
        current = match current {
            toml::Value::Table(table) => table
                .entry(part.clone())
                .or_insert_with(|| toml::Value::Table(toml::value::Table::new())),
            _ => return,
        };
    }

    if let toml::Value::Table(table) = current {
        table.insert(last.clone(), value);
    }
}
