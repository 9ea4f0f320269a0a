//! Translation of a logical [`SerialConfiguration`] into device line settings.
//!
//! Translation is a pure step that validates everything up front; only a
//! fully valid [`DeviceSettings`] value is ever handed to a device.

use super::error::PortError;
use super::handle::PortHandle;
use super::traits::{BaudRate, DataBits, FlowControl, Parity, SerialConfiguration, StopBits};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Device-level settings derived from a [`SerialConfiguration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceSettings {
    pub baud_rate: BaudRate,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// `VMIN`: a read may return with zero bytes.
    pub min_read_bytes: u8,
    /// `VTIME`: bounded wait per read, in tenths of a second.
    pub read_timeout_ds: u8,
    /// Input is not stripped to 7 bits.
    pub eight_bit_clean: bool,
    /// XON/XOFF is enabled.
    pub software_flow: bool,
}

impl DeviceSettings {
    /// Validate and translate `config`.
    ///
    /// # Errors
    ///
    /// - `PortError::UnsupportedBaudRate` if the rate is not a standard rate
    /// - `PortError::InvalidSettings` if the read timeout is zero
    pub fn from_config(config: &SerialConfiguration) -> Result<Self, PortError> {
        let baud_rate = BaudRate::try_from(config.baud_rate)?;

        // VMIN=0 with VTIME=0 turns every read into a non-blocking poll.
        if config.read_timeout_ds == 0 {
            return Err(PortError::InvalidSettings(
                "read timeout must be at least one tenth of a second".to_string(),
            ));
        }

        Ok(Self {
            baud_rate,
            data_bits: config.data_bits,
            parity: config.parity,
            stop_bits: config.stop_bits,
            flow_control: config.flow_control,
            min_read_bytes: 0,
            read_timeout_ds: config.read_timeout_ds,
            eight_bit_clean: config.data_bits == DataBits::Eight,
            software_flow: config.flow_control == FlowControl::Software,
        })
    }

    /// The bounded-wait interval as a `Duration`.
    ///
    /// This is also the upper bound on listener cancellation latency.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.read_timeout_ds) * 100)
    }
}

/// Validate `config` and write the resulting settings to `handle`.
///
/// Nothing is written to the device unless validation succeeds. Applying the
/// same configuration repeatedly is idempotent.
pub fn apply(
    handle: &mut PortHandle,
    config: &SerialConfiguration,
) -> Result<DeviceSettings, PortError> {
    let settings = DeviceSettings::from_config(config)?;
    handle.adapter_mut().apply_settings(&settings)?;
    debug!(
        device = handle.name(),
        baud = %settings.baud_rate,
        timeout_ds = settings.read_timeout_ds,
        "applied line settings"
    );
    Ok(settings)
}
