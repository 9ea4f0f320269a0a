//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! Every section has defaults, so an empty file is a valid configuration.

use crate::listener::{Framing, ListenerOptions, DEFAULT_MAX_CONSECUTIVE_ERRORS, DEFAULT_READ_CHUNK};
use crate::port::{
    DataBits, FlowControl, Parity, SerialConfiguration, StopBits, DEFAULT_READ_TIMEOUT_DS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial line defaults
    pub serial: SerialConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Serial line configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device used when none is given on the command line
    pub default_device: Option<String>,
    /// Baud rate for new connections
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Bounded-wait read timeout, in tenths of a second
    pub read_timeout_ds: u8,
    /// Receive buffer size per read
    pub read_chunk_size: usize,
    /// How received bytes are grouped into messages
    pub framing: Framing,
    /// Consecutive read errors tolerated before the listener gives up
    pub max_consecutive_errors: u32,
    /// Short names for device paths
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            default_device: None,
            baud_rate: 115_200,
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            flow_control: FlowControl::default(),
            read_timeout_ds: DEFAULT_READ_TIMEOUT_DS,
            read_chunk_size: DEFAULT_READ_CHUNK,
            framing: Framing::default(),
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Line settings for `device` (alias-resolved).
    pub fn connection(&self, device: &str) -> SerialConfiguration {
        SerialConfiguration {
            device_path: self.resolve_port(device),
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            parity: self.parity,
            stop_bits: self.stop_bits,
            flow_control: self.flow_control,
            read_timeout_ds: self.read_timeout_ds,
        }
    }

    pub fn listener_options(&self) -> ListenerOptions {
        ListenerOptions {
            read_chunk_size: self.read_chunk_size,
            framing: self.framing,
            max_consecutive_errors: self.max_consecutive_errors,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive: "trace", "debug", "info", "warn", "error", or a full
    /// `EnvFilter` expression. `RUST_LOG` takes precedence.
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    Pretty,
    /// Compact format
    #[default]
    Compact,
}
