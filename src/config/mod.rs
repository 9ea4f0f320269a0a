//! Configuration module for uart-term.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `UART_TERM_CONFIG` environment variable (explicit path)
//! 2. `./uart-term.toml` (current directory)
//! 3. `config.toml` in the platform config directory
//!    (`~/.config/uart-term/` on Linux)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! - `UART_TERM_SERIAL_DEVICE`
//! - `UART_TERM_SERIAL_BAUD`
//! - `UART_TERM_SERIAL_READ_TIMEOUT_DS`
//! - `UART_TERM_LOG_LEVEL`
//!
//! # Example
//!
//! ```rust,no_run
//! use uart_term::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let serial = &loader.config().serial;
//! let line = serial.connection("/dev/ttyUSB0");
//! assert_eq!(line.baud_rate, serial.baud_rate);
//! # Ok::<(), uart_term::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig};
