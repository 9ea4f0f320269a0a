//! Owned handle to an open serial device.

use super::error::PortError;
use super::sync_port::SyncSerialPort;
use super::traits::SerialPortAdapter;
use tracing::info;

/// Exclusive owner of one open serial device.
///
/// The handle is not `Clone`; the device is released exactly once, when the
/// handle is dropped or passed to [`PortHandle::close`]. Because `close`
/// consumes the handle, a closed handle cannot be used again.
#[derive(Debug)]
pub struct PortHandle {
    adapter: Box<dyn SerialPortAdapter>,
}

impl PortHandle {
    /// Open the character device at `device_path`.
    ///
    /// # Errors
    ///
    /// - `PortError::NotFound` if the path does not exist
    /// - `PortError::PermissionDenied` if the process may not open it
    /// - `PortError::Busy` if another process holds it
    pub fn open(device_path: &str) -> Result<Self, PortError> {
        let port = SyncSerialPort::open(device_path)?;
        info!(device = device_path, "opened serial port");
        Ok(Self::from_adapter(port))
    }

    /// Wrap an already-open adapter.
    pub fn from_adapter(adapter: impl SerialPortAdapter + 'static) -> Self {
        Self {
            adapter: Box::new(adapter),
        }
    }

    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    /// Lend the underlying adapter for one operation.
    pub fn adapter_mut(&mut self) -> &mut dyn SerialPortAdapter {
        &mut *self.adapter
    }

    /// Release the device.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for PortHandle {
    fn drop(&mut self) {
        info!(device = self.adapter.name(), "closed serial port");
    }
}
