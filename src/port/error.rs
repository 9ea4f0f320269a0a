//! Port-specific error types.
//!
//! Defines error types for device-level serial operations, separate from the
//! session-level taxonomy in [`crate::error`].

use std::io;
use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial device does not exist.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// The process may not open the device.
    #[error("Permission denied opening {0}")]
    PermissionDenied(String),

    /// The device is held exclusively by another process.
    #[error("Serial port is busy: {0}")]
    Busy(String),

    /// The requested baud rate is not in the supported set.
    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    /// The configuration is not a valid combination of settings.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// The device refused the translated line settings.
    #[error("Device rejected settings: {0}")]
    DeviceRejectedSettings(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a device path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a DeviceRejectedSettings error from a message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::DeviceRejectedSettings(message.into())
    }

    /// Classify an error from `serialport::new(..).open()`.
    pub fn from_open(path: &str, err: serialport::Error) -> Self {
        match err.kind() {
            serialport::ErrorKind::NoDevice | serialport::ErrorKind::Io(io::ErrorKind::NotFound) => {
                Self::not_found(path)
            }
            serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
                Self::PermissionDenied(path.to_string())
            }
            _ if err.description.to_ascii_lowercase().contains("busy") => {
                Self::Busy(path.to_string())
            }
            _ if cfg!(unix) && !std::path::Path::new(path).exists() => Self::not_found(path),
            _ => Self::Serial(err),
        }
    }

    /// The underlying I/O kind, when there is one.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io(e) => Some(e.kind()),
            Self::Serial(e) => match e.kind() {
                serialport::ErrorKind::Io(kind) => Some(kind),
                _ => None,
            },
            _ => None,
        }
    }

    /// An interrupted system call; the same operation should be reissued.
    pub fn is_interrupted(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::Interrupted)
    }

    /// Errors a read loop treats as "no data this round".
    pub fn is_transient(&self) -> bool {
        matches!(
            self.io_kind(),
            Some(io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
        )
    }

    /// The descriptor no longer refers to a usable device (unplugged, hung up, closed).
    pub fn is_disconnect(&self) -> bool {
        if matches!(self, Self::Serial(e) if e.kind() == serialport::ErrorKind::NoDevice) {
            return true;
        }
        if let Self::Io(e) = self {
            if let Some(code) = e.raw_os_error() {
                if is_disconnect_errno(code) {
                    return true;
                }
            }
        }
        matches!(
            self.io_kind(),
            Some(
                io::ErrorKind::BrokenPipe
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::UnexpectedEof
            )
        )
    }
}

#[cfg(unix)]
fn is_disconnect_errno(code: i32) -> bool {
    matches!(code, libc::EBADF | libc::ENXIO | libc::ENODEV | libc::EIO)
}

#[cfg(not(unix))]
fn is_disconnect_errno(_code: i32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PortError::not_found("/dev/ttyUSB0");
        assert_eq!(err.to_string(), "Serial port not found: /dev/ttyUSB0");

        let err = PortError::UnsupportedBaudRate(999_999);
        assert_eq!(err.to_string(), "Unsupported baud rate: 999999");

        let err = PortError::rejected("parity");
        assert_eq!(err.to_string(), "Device rejected settings: parity");
    }

    #[test]
    fn test_timed_out_io_is_transient() {
        let err = PortError::Io(io::Error::from(io::ErrorKind::TimedOut));
        assert!(err.is_transient());
        assert!(!err.is_disconnect());
    }

    #[test]
    fn test_open_error_classification() {
        let err = serialport::Error::new(serialport::ErrorKind::NoDevice, "gone");
        assert!(matches!(PortError::from_open("/dev/x", err), PortError::NotFound(p) if p == "/dev/x"));

        let err = serialport::Error::new(
            serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied),
            "Permission denied",
        );
        assert!(matches!(PortError::from_open("/dev/x", err), PortError::PermissionDenied(_)));

        let err = serialport::Error::new(serialport::ErrorKind::Unknown, "Device or resource busy");
        assert!(matches!(PortError::from_open("/dev/x", err), PortError::Busy(_)));
    }

    #[test]
    fn test_transient_and_disconnect() {
        let interrupted = PortError::Io(io::Error::from(io::ErrorKind::Interrupted));
        assert!(interrupted.is_interrupted());
        assert!(interrupted.is_transient());
        assert!(!interrupted.is_disconnect());

        let broken = PortError::Io(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(broken.is_disconnect());
        assert!(!broken.is_transient());

        let other = PortError::Io(io::Error::new(io::ErrorKind::Other, "framing"));
        assert!(!other.is_disconnect());
        assert!(!other.is_transient());
    }

    #[cfg(unix)]
    #[test]
    fn test_errno_disconnect() {
        let err = PortError::Io(io::Error::from_raw_os_error(libc::EIO));
        assert!(err.is_disconnect());
    }
}
