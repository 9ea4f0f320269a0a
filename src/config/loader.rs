//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use crate::port::BaudRate;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "UART_TERM";

/// Config file name in the working directory
const LOCAL_CONFIG_FILE_NAME: &str = "uart-term.toml";

/// Config file name in the platform config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "UART_TERM_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `UART_TERM_CONFIG` environment variable (explicit path)
    /// 2. `./uart-term.toml` (current directory)
    /// 3. `config.toml` in the platform config directory
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    ///
    /// Malformed environment overrides are ignored here.
    pub fn with_defaults() -> Self {
        let mut fallback = Config::default();
        let config = match apply_env_overrides(&mut fallback) {
            Ok(()) if validate(&fallback).is_ok() => fallback,
            _ => Config::default(),
        };

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        debug!(path = %path.display(), "{CONFIG_PATH_ENV} points at a missing file");
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    get_default_config_path().filter(|p| p.exists())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "uart-term").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn env_var(suffix: &str) -> (String, Option<String>) {
    let name = format!("{ENV_PREFIX}_{suffix}");
    let value = std::env::var(&name).ok();
    (name, value)
}

/// Apply environment variable overrides to the configuration.
///
/// - `UART_TERM_SERIAL_DEVICE=/dev/ttyUSB0`
/// - `UART_TERM_SERIAL_BAUD=9600`
/// - `UART_TERM_SERIAL_READ_TIMEOUT_DS=10`
/// - `UART_TERM_LOG_LEVEL=debug`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let (_, Some(val)) = env_var("SERIAL_DEVICE") {
        config.serial.default_device = Some(val);
    }
    if let (var, Some(val)) = env_var("SERIAL_BAUD") {
        config.serial.baud_rate = val
            .parse()
            .map_err(|_| ConfigError::env_parse(var, "Invalid baud rate"))?;
    }
    if let (var, Some(val)) = env_var("SERIAL_READ_TIMEOUT_DS") {
        config.serial.read_timeout_ds = val
            .parse()
            .map_err(|_| ConfigError::env_parse(var, "Expected tenths of a second (1-255)"))?;
    }
    if let (_, Some(val)) = env_var("LOG_LEVEL") {
        config.logging.level = val;
    }

    Ok(())
}

fn validate(config: &Config) -> ConfigResult<()> {
    let serial = &config.serial;
    BaudRate::try_from(serial.baud_rate)
        .map_err(|e| ConfigError::validation("serial.baud_rate", e.to_string()))?;
    if serial.read_timeout_ds == 0 {
        return Err(ConfigError::validation(
            "serial.read_timeout_ds",
            "must be at least 1 so reads stay bounded",
        ));
    }
    if serial.read_chunk_size == 0 {
        return Err(ConfigError::validation("serial.read_chunk_size", "must be positive"));
    }
    if serial.max_consecutive_errors == 0 {
        return Err(ConfigError::validation(
            "serial.max_consecutive_errors",
            "must be positive",
        ));
    }
    Ok(())
}
