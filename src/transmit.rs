//! Blocking transmit path.

use crate::message_log::{Direction, MessageLog};
use crate::port::{PortError, SerialPortAdapter};
use std::io;
use tracing::{debug, trace};

/// Write all of `bytes` to `port`, then record them as one `sent` message.
///
/// Short writes are continued from where they stopped and interrupted writes
/// are reissued. Nothing is recorded unless every byte was written.
///
/// # Errors
///
/// Returns the first non-interrupt error from the device, or a `WriteZero`
/// I/O error if the device accepts no bytes at all.
pub fn send(
    port: &mut dyn SerialPortAdapter,
    bytes: &[u8],
    log: &MessageLog,
) -> Result<usize, PortError> {
    let mut written = 0;
    while written < bytes.len() {
        match port.write_bytes(&bytes[written..]) {
            Ok(0) => {
                return Err(PortError::Io(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "device accepted no bytes",
                )))
            }
            Ok(n) => {
                written += n;
                trace!(chunk = n, written, total = bytes.len(), "partial write");
            }
            Err(e) if e.is_interrupted() => continue,
            Err(e) => return Err(e),
        }
    }
    port.flush()?;

    log.append(Direction::Sent, bytes);
    debug!(device = port.name(), bytes = written, "sent");
    Ok(written)
}
