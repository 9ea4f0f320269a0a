//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that simulates a serial device without
//! hardware. Clones share state, so a test can keep one clone for inspection
//! while a [`PortHandle`](super::PortHandle) owns another.

use super::configure::DeviceSettings;
use super::error::PortError;
use super::traits::SerialPortAdapter;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Inner state of the mock port.
#[derive(Debug, Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the port, one entry per write call.
    write_log: Vec<Vec<u8>>,
    /// Errors to return from upcoming reads, before any data.
    read_errors: VecDeque<PortError>,
    /// Errors to return from upcoming writes.
    write_errors: VecDeque<PortError>,
    /// Echo written bytes into the read queue.
    loopback: bool,
    /// Accept at most this many bytes per write call.
    max_write_chunk: Option<usize>,
    /// Fail `apply_settings` with `DeviceRejectedSettings`.
    reject_settings: bool,
    /// Every settings value applied, in order.
    applied: Vec<DeviceSettings>,
    /// Bounded wait for an empty read.
    timeout: Duration,
    /// Number of read calls issued.
    reads: u64,
}

/// Mock serial port implementation for testing.
///
/// # Example
/// ```
/// use uart_term::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_read(b"Hello, World!");
///
/// let mut buffer = [0u8; 13];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"Hello, World!");
///
/// port.write_bytes(b"Response").unwrap();
/// assert_eq!(port.get_write_log(), vec![b"Response".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
    data_ready: Arc<Condvar>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState {
                timeout: Duration::from_millis(100),
                ..Default::default()
            })),
            data_ready: Arc::new(Condvar::new()),
        }
    }

    /// A mock whose transmitted bytes come back as received bytes.
    pub fn loopback(name: impl Into<String>) -> Self {
        let port = Self::new(name);
        port.set_loopback(true);
        port
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
        self.data_ready.notify_all();
    }

    pub fn set_loopback(&self, enabled: bool) {
        self.state.lock().loopback = enabled;
    }

    /// Limit how many bytes a single write call accepts.
    pub fn set_max_write_chunk(&self, chunk: Option<usize>) {
        self.state.lock().max_write_chunk = chunk;
    }

    /// Queue an error for an upcoming read.
    pub fn push_read_error(&self, error: PortError) {
        self.state.lock().read_errors.push_back(error);
        self.data_ready.notify_all();
    }

    /// Queue an error for an upcoming write.
    pub fn push_write_error(&self, error: PortError) {
        self.state.lock().write_errors.push_back(error);
    }

    pub fn set_reject_settings(&self, reject: bool) {
        self.state.lock().reject_settings = reject;
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// All bytes written, concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.state.lock().write_log.concat()
    }

    /// Every settings value applied so far.
    pub fn applied_settings(&self) -> Vec<DeviceSettings> {
        self.state.lock().applied.clone()
    }

    /// The most recently applied settings.
    pub fn current_settings(&self) -> Option<DeviceSettings> {
        self.state.lock().applied.last().copied()
    }

    /// Number of read calls issued so far.
    pub fn read_calls(&self) -> u64 {
        self.state.lock().reads
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if let Some(err) = state.write_errors.pop_front() {
            return Err(err);
        }

        let n = state.max_write_chunk.map_or(data.len(), |c| c.min(data.len()));
        let accepted = &data[..n];
        state.write_log.push(accepted.to_vec());
        if state.loopback {
            state.read_queue.extend(accepted);
            self.data_ready.notify_all();
        }
        Ok(n)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        state.reads += 1;

        let deadline = Instant::now() + state.timeout;
        while state.read_queue.is_empty() && state.read_errors.is_empty() {
            if self.data_ready.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }

        if let Some(err) = state.read_errors.pop_front() {
            return Err(err);
        }

        let n = buffer.len().min(state.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn apply_settings(&mut self, settings: &DeviceSettings) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if state.reject_settings {
            return Err(PortError::rejected("mock device refused settings"));
        }
        state.timeout = settings.read_timeout();
        state.applied.push(*settings);
        Ok(())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

/// An I/O error of the given kind, for injecting into the mock.
pub fn io_error(kind: io::ErrorKind) -> PortError {
    PortError::Io(io::Error::from(kind))
}
