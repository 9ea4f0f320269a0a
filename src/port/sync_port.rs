//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate with our own `SerialPortAdapter` trait. On
//! unix the termios read policy (`VMIN`/`VTIME`, software flow, 8-bit-clean
//! input) is written through `nix::sys::termios` after the crate's own
//! setters run.

use super::configure::DeviceSettings;
use super::error::PortError;
use super::traits::SerialPortAdapter;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;

#[cfg(unix)]
type NativePort = serialport::TTYPort;
#[cfg(not(unix))]
type NativePort = Box<dyn serialport::SerialPort>;

/// Baud rate used between open and the first `apply_settings`.
const OPEN_BAUD_RATE: u32 = 9600;

/// Synchronous serial port implementation wrapping a native `serialport` port.
pub struct SyncSerialPort {
    /// The underlying serial port implementation.
    port: NativePort,
    /// The port name/path for identification.
    name: String,
}

impl SyncSerialPort {
    /// Open a serial device in raw mode.
    ///
    /// Line settings are left at the crate defaults until
    /// [`SerialPortAdapter::apply_settings`] is called.
    ///
    /// # Example
    /// ```no_run
    /// use uart_term::port::SyncSerialPort;
    ///
    /// let port = SyncSerialPort::open("/dev/ttyUSB0")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(port_name: &str) -> Result<Self, PortError> {
        let builder =
            serialport::new(port_name, OPEN_BAUD_RATE).timeout(Duration::from_millis(100));

        #[cfg(unix)]
        let port = builder.open_native();
        #[cfg(not(unix))]
        let port = builder.open();

        let port = port.map_err(|e| PortError::from_open(port_name, e))?;

        Ok(Self {
            port,
            name: port_name.to_string(),
        })
    }

    fn set_line(&mut self, settings: &DeviceSettings) -> Result<(), serialport::Error> {
        self.port.set_baud_rate(settings.baud_rate.as_u32())?;
        self.port.set_data_bits(settings.data_bits.into())?;
        self.port.set_parity(settings.parity.into())?;
        self.port.set_stop_bits(settings.stop_bits.into())?;
        self.port.set_flow_control(settings.flow_control.into())?;
        self.port.set_timeout(settings.read_timeout())
    }
}

impl SerialPortAdapter for SyncSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.port.write(data).map_err(PortError::Io)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            // The bounded wait elapsed with nothing on the line.
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(PortError::Io(e)),
        }
    }

    fn flush(&mut self) -> Result<(), PortError> {
        self.port.flush().map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn apply_settings(&mut self, settings: &DeviceSettings) -> Result<(), PortError> {
        self.set_line(settings)
            .map_err(|e| PortError::rejected(e.to_string()))?;

        #[cfg(unix)]
        termios::apply_read_policy(&self.port, settings)
            .map_err(|e| PortError::rejected(e.to_string()))?;

        Ok(())
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate().ok())
            .finish()
    }
}

#[cfg(unix)]
mod termios {
    use super::DeviceSettings;
    use nix::sys::termios::{
        tcgetattr, tcsetattr, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg,
        SpecialCharacterIndices,
    };
    use std::os::unix::io::AsRawFd;

    /// Write the bounded-wait read policy and raw input flags.
    pub(super) fn apply_read_policy(
        port: &impl AsRawFd,
        settings: &DeviceSettings,
    ) -> nix::Result<()> {
        let fd = port.as_raw_fd();
        let mut tty = tcgetattr(fd)?;

        tty.input_flags.remove(InputFlags::IGNBRK);
        if settings.eight_bit_clean {
            tty.input_flags.remove(InputFlags::ISTRIP);
        }
        if !settings.software_flow {
            tty.input_flags
                .remove(InputFlags::IXON | InputFlags::IXOFF | InputFlags::IXANY);
        }
        tty.local_flags
            .remove(LocalFlags::ICANON | LocalFlags::ECHO | LocalFlags::ECHOE | LocalFlags::ISIG);
        tty.output_flags.remove(OutputFlags::OPOST);
        tty.control_flags
            .insert(ControlFlags::CLOCAL | ControlFlags::CREAD);
        tty.control_chars[SpecialCharacterIndices::VMIN as usize] = settings.min_read_bytes;
        tty.control_chars[SpecialCharacterIndices::VTIME as usize] = settings.read_timeout_ds;

        tcsetattr(fd, SetArg::TCSANOW, &tty)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::port::traits::SerialConfiguration;
        use serialport::TTYPort;

        fn settings(read_timeout_ds: u8) -> DeviceSettings {
            DeviceSettings::from_config(
                &SerialConfiguration::new("pty").with_read_timeout_ds(read_timeout_ds),
            )
            .unwrap()
        }

        #[test]
        fn read_policy_lands_on_the_terminal() {
            let (_master, slave) = TTYPort::pair().unwrap();
            apply_read_policy(&slave, &settings(7)).unwrap();

            let tty = tcgetattr(slave.as_raw_fd()).unwrap();
            assert_eq!(tty.control_chars[SpecialCharacterIndices::VMIN as usize], 0);
            assert_eq!(tty.control_chars[SpecialCharacterIndices::VTIME as usize], 7);
            assert!(!tty.local_flags.contains(LocalFlags::ICANON));
            assert!(!tty.local_flags.contains(LocalFlags::ECHO));
            assert!(!tty.input_flags.intersects(InputFlags::IXON | InputFlags::IXOFF));
            assert!(!tty.input_flags.contains(InputFlags::ISTRIP));
            assert!(tty.control_flags.contains(ControlFlags::CLOCAL | ControlFlags::CREAD));
        }

        #[test]
        fn software_flow_keeps_xon_xoff() {
            let (_master, slave) = TTYPort::pair().unwrap();
            let mut with_flow = settings(1);
            with_flow.software_flow = true;

            let mut tty = tcgetattr(slave.as_raw_fd()).unwrap();
            tty.input_flags.insert(InputFlags::IXON | InputFlags::IXOFF);
            tcsetattr(slave.as_raw_fd(), SetArg::TCSANOW, &tty).unwrap();

            apply_read_policy(&slave, &with_flow).unwrap();
            let tty = tcgetattr(slave.as_raw_fd()).unwrap();
            assert!(tty.input_flags.contains(InputFlags::IXON | InputFlags::IXOFF));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_not_found_error() {
        let result = SyncSerialPort::open("/dev/nonexistent_port_12345");

        match result {
            Err(PortError::NotFound(name)) => assert!(name.contains("nonexistent")),
            other => panic!("Expected NotFound error, got: {:?}", other.err()),
        }
    }
}
