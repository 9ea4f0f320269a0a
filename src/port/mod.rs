//! Port abstraction layer for serial communication.
//!
//! Provides the owned [`PortHandle`], configuration translation, and the
//! `SerialPortAdapter` trait with real and mock implementations.

pub mod configure;
pub mod error;
pub mod handle;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use configure::{apply, DeviceSettings};
pub use error::PortError;
pub use handle::PortHandle;
pub use mock::MockSerialPort;
pub use sync_port::SyncSerialPort;
pub use traits::*;
