//! UART terminal core library
//!
//! Opens a serial character device, applies a line configuration, transmits
//! text, and runs a cancellable background listener that records everything
//! received into a shared, race-free message log.
//!
//! # Modules
//!
//! - `port`: Owned device handle, configuration translation, real and mock adapters
//! - `transmit`: Blocking write path that records sent messages
//! - `listener`: Background receive loop
//! - `cancel`: Stop signal and join rendezvous for the listener thread
//! - `message_log`: Append-only record of sent and received messages
//! - `session`: A configured device plus its optional listener
//! - `error`: Session-level error taxonomy
//! - `config`: Configuration management with TOML support

pub mod cancel;
pub mod config;
pub mod error;
pub mod listener;
pub mod message_log;
pub mod port;
pub mod session;
pub mod transmit;

// Re-export commonly used types for convenience
pub use cancel::CancellationToken;
pub use error::{FailureKind, SessionError, SessionResult};
pub use listener::{Framing, ListenerExit, ListenerOptions, ListenerState, ReceiveListener};
pub use message_log::{Direction, Message, MessageCounts, MessageLog};
pub use port::{
    BaudRate, DataBits, DeviceSettings, FlowControl, MockSerialPort, Parity, PortError,
    PortHandle, SerialConfiguration, SerialPortAdapter, StopBits, SyncSerialPort,
};
pub use session::SerialSession;

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
