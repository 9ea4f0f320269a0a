//! Core types for serial port abstraction.
//!
//! Defines the logical [`SerialConfiguration`], the line-setting enums it is
//! made of, and the `SerialPortAdapter` trait that lets real devices and the
//! mock be used interchangeably.

use super::configure::DeviceSettings;
use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default bounded-wait read timeout, in tenths of a second.
pub const DEFAULT_READ_TIMEOUT_DS: u8 = 5;

/// Logical line configuration for one connection attempt.
///
/// `baud_rate` is kept as the raw requested number; it is validated against
/// [`BaudRate`] when the configuration is applied, before any device call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfiguration {
    /// System path of the character device (e.g. "/dev/ttyUSB0").
    pub device_path: String,

    /// Requested baud rate (bits per second).
    #[serde(default = "default_baud")]
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    #[serde(default)]
    pub data_bits: DataBits,

    /// Parity checking mode.
    #[serde(default)]
    pub parity: Parity,

    /// Number of stop bits.
    #[serde(default)]
    pub stop_bits: StopBits,

    /// Flow control mode.
    #[serde(default)]
    pub flow_control: FlowControl,

    /// Bounded-wait read timeout in device timer units (tenths of a second).
    #[serde(default = "default_read_timeout_ds")]
    pub read_timeout_ds: u8,
}

fn default_baud() -> u32 {
    BaudRate::B115200.as_u32()
}

fn default_read_timeout_ds() -> u8 {
    DEFAULT_READ_TIMEOUT_DS
}

impl SerialConfiguration {
    /// A configuration for `device_path` with 115200 8N1 and no flow control.
    pub fn new(device_path: impl Into<String>) -> Self {
        Self {
            device_path: device_path.into(),
            baud_rate: default_baud(),
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            flow_control: FlowControl::default(),
            read_timeout_ds: DEFAULT_READ_TIMEOUT_DS,
        }
    }

    /// Builder-style baud rate override.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Builder-style read timeout override.
    pub fn with_read_timeout_ds(mut self, read_timeout_ds: u8) -> Self {
        self.read_timeout_ds = read_timeout_ds;
        self
    }
}

/// The supported standard baud rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
    B230400,
    B460800,
    B921600,
}

impl BaudRate {
    /// Every supported rate, slowest first.
    pub const ALL: [BaudRate; 11] = [
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
        BaudRate::B230400,
        BaudRate::B460800,
        BaudRate::B921600,
    ];

    pub const fn as_u32(self) -> u32 {
        match self {
            BaudRate::B1200 => 1200,
            BaudRate::B2400 => 2400,
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115_200,
            BaudRate::B230400 => 230_400,
            BaudRate::B460800 => 460_800,
            BaudRate::B921600 => 921_600,
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = PortError;

    fn try_from(rate: u32) -> Result<Self, Self::Error> {
        BaudRate::ALL
            .into_iter()
            .find(|b| b.as_u32() == rate)
            .ok_or(PortError::UnsupportedBaudRate(rate))
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        rate.as_u32()
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

impl TryFrom<u8> for DataBits {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(format!("data bits must be 5, 6, 7 or 8, got {other}")),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    #[default]
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(format!("stop bits must be 1 or 2, got {other}")),
        }
    }
}

impl From<StopBits> for u8 {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Trait for serial port I/O operations.
///
/// This trait abstracts over a blocking serial device, allowing both real
/// hardware ports and mock implementations for testing.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written, which may be fewer than
    /// requested.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Blocks for at most the configured read timeout. `Ok(0)` means the
    /// timeout elapsed with no data.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Wait until all written bytes have been handed to the device.
    fn flush(&mut self) -> Result<(), PortError> {
        Ok(())
    }

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Write translated line settings to the device.
    ///
    /// Must be idempotent: applying the same settings twice leaves the device
    /// in the same state and does not fail.
    fn apply_settings(&mut self, settings: &DeviceSettings) -> Result<(), PortError>;
}
