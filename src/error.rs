use crate::port::PortError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Coarse failure category, for status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The device could not be opened, or has gone away.
    DeviceOpenFailure,
    /// The requested settings are unsupported or were refused.
    ConfigurationFailure,
    /// A write failed; the session is still usable.
    TransmitFailure,
    /// The listener stopped on a read error.
    ReceiveFailure,
    /// The operation is not allowed in the session's current state.
    UsageError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DeviceOpenFailure => "device open failure",
            Self::ConfigurationFailure => "configuration failure",
            Self::TransmitFailure => "transmit failure",
            Self::ReceiveFailure => "receive failure",
            Self::UsageError => "usage error",
        };
        f.write_str(s)
    }
}

/// Unified session error type.
///
/// Every variant renders a reason a user can act on; none of them is fatal
/// to the process.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Could not open {path}: {source}")]
    DeviceOpen {
        path: String,
        #[source]
        source: PortError,
    },

    #[error("Could not configure {path}: {source}")]
    Configuration {
        path: String,
        #[source]
        source: PortError,
    },

    #[error("Write to serial port failed: {0}")]
    Transmit(#[source] PortError),

    #[error("Serial device {path} is no longer available: {reason}")]
    DeviceLost { path: String, reason: String },

    #[error("Receive listener failed: {0}")]
    Receive(String),

    #[error("A receive listener is already running. Stop it before {0}.")]
    ListenerRunning(&'static str),

    #[error("Could not start receive listener: {0}")]
    Spawn(#[source] std::io::Error),
}

impl SessionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::DeviceOpen { .. } | Self::DeviceLost { .. } => FailureKind::DeviceOpenFailure,
            Self::Configuration { .. } => FailureKind::ConfigurationFailure,
            Self::Transmit(_) => FailureKind::TransmitFailure,
            Self::Receive(_) => FailureKind::ReceiveFailure,
            Self::ListenerRunning(_) | Self::Spawn(_) => FailureKind::UsageError,
        }
    }

    /// Whether the session that produced this error can no longer do I/O.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::DeviceOpenFailure | FailureKind::ConfigurationFailure
        )
    }
}

/// A specialized `Result` type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
