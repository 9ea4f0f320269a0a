//! Background receive loop.
//!
//! A [`ReceiveListener`] owns one thread that repeatedly performs a
//! bounded-wait read on the shared port, records every non-empty read in the
//! [`MessageLog`], and exits at the next poll boundary once its
//! [`CancellationToken`] is signalled. Cancellation latency is therefore
//! bounded by the device read timeout.

use crate::cancel::CancellationToken;
use crate::message_log::{Direction, MessageLog};
use crate::port::{PortError, PortHandle};
use memchr::memchr;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, info_span, warn};

/// The port as shared between the session and its listener thread.
pub type SharedPort = Arc<Mutex<PortHandle>>;

/// Default read buffer size.
pub const DEFAULT_READ_CHUNK: usize = 256;

/// Default number of consecutive non-transient read errors tolerated.
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// A `Line` message is cut once it reaches this many read chunks without `\n`.
pub const LINE_LIMIT_CHUNKS: usize = 16;

/// How received bytes are cut into messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Each non-empty read becomes one message.
    #[default]
    Chunk,
    /// Bytes are buffered until `\n`; each complete line becomes one message.
    Line,
}

/// Tuning for the receive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerOptions {
    pub read_chunk_size: usize,
    pub framing: Framing,
    pub max_consecutive_errors: u32,
}

impl Default for ListenerOptions {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK,
            framing: Framing::Chunk,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
        }
    }
}

/// Lifecycle of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerState {
    Idle,
    Running,
    StopRequested,
    Terminated,
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ListenerState::Idle => "idle",
            ListenerState::Running => "running",
            ListenerState::StopRequested => "stopping",
            ListenerState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Why the listener thread exited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "exit", rename_all = "snake_case")]
pub enum ListenerExit {
    /// The token was signalled.
    Cancelled,
    /// A persistent read error ended the loop.
    Failed { reason: String, disconnected: bool },
    /// The thread panicked.
    Panicked,
}

impl ListenerExit {
    pub fn is_failure(&self) -> bool {
        !matches!(self, ListenerExit::Cancelled)
    }
}

impl fmt::Display for ListenerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerExit::Cancelled => write!(f, "stopped"),
            ListenerExit::Failed {
                reason,
                disconnected: true,
            } => write!(f, "device disconnected: {reason}"),
            ListenerExit::Failed { reason, .. } => write!(f, "receive failed: {reason}"),
            ListenerExit::Panicked => write!(f, "receive thread panicked"),
        }
    }
}

const RUNNING: u8 = 1;
const TERMINATED: u8 = 2;

/// A running (or finished) receive thread.
#[derive(Debug)]
pub struct ReceiveListener {
    token: CancellationToken,
    phase: Arc<AtomicU8>,
}

impl ReceiveListener {
    /// Spawn the receive thread.
    ///
    /// The thread locks `port` only for the duration of each read.
    pub fn start(
        port: SharedPort,
        log: MessageLog,
        token: CancellationToken,
        options: ListenerOptions,
    ) -> io::Result<Self> {
        if !token.reserve() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "cancellation token already has a listener",
            ));
        }

        let phase = Arc::new(AtomicU8::new(RUNNING));
        let device = port.lock().name().to_string();

        let thread_token = token.clone();
        let thread_phase = Arc::clone(&phase);
        let spawned = thread::Builder::new()
            .name(format!("rx:{device}"))
            .spawn(move || {
                let span = info_span!("listener", device = %device);
                let _enter = span.enter();
                let exit = receive_loop(&port, &log, &thread_token, options);
                info!(%exit, "listener terminated");
                thread_phase.store(TERMINATED, Ordering::SeqCst);
                exit
            });

        match spawned {
            Ok(handle) => {
                token.attach(handle);
                Ok(Self { token, phase })
            }
            Err(e) => {
                token.release();
                Err(e)
            }
        }
    }

    pub fn state(&self) -> ListenerState {
        if self.has_exited() {
            ListenerState::Terminated
        } else if self.token.is_requested() {
            ListenerState::StopRequested
        } else {
            ListenerState::Running
        }
    }

    /// The thread has returned or unwound.
    fn has_exited(&self) -> bool {
        self.phase.load(Ordering::SeqCst) == TERMINATED || self.token.is_finished()
    }

    /// Signal the token and wait for the thread to exit.
    ///
    /// Safe to call more than once; later calls return the same exit.
    pub fn stop(&self) -> ListenerExit {
        self.token.signal();
        self.token.join().unwrap_or(ListenerExit::Cancelled)
    }

    /// The exit status, once the thread has terminated.
    pub fn exit(&self) -> Option<ListenerExit> {
        if self.has_exited() {
            // Joining a finished thread does not block.
            self.token.join()
        } else {
            self.token.exit()
        }
    }
}

/// Cuts the received byte stream into messages.
#[derive(Debug)]
struct Assembler {
    framing: Framing,
    pending: Vec<u8>,
    /// Longest line held back waiting for `\n`.
    max_line: usize,
}

impl Assembler {
    fn new(framing: Framing, max_line: usize) -> Self {
        Self {
            framing,
            pending: Vec::new(),
            max_line: max_line.max(1),
        }
    }

    fn push(&mut self, bytes: &[u8], mut emit: impl FnMut(Vec<u8>)) {
        match self.framing {
            Framing::Chunk => emit(bytes.to_vec()),
            Framing::Line => {
                let mut rest = bytes;
                while let Some(pos) = memchr(b'\n', rest) {
                    self.pending.extend_from_slice(&rest[..=pos]);
                    emit(std::mem::take(&mut self.pending));
                    rest = &rest[pos + 1..];
                }
                self.pending.extend_from_slice(rest);
                if self.pending.len() >= self.max_line {
                    emit(std::mem::take(&mut self.pending));
                }
            }
        }
    }

    fn finish(&mut self) -> Option<Vec<u8>> {
        (!self.pending.is_empty()).then(|| std::mem::take(&mut self.pending))
    }
}

fn read_once(port: &SharedPort, buffer: &mut [u8]) -> Result<usize, PortError> {
    let mut guard = port.lock();
    let result = guard.adapter_mut().read_bytes(buffer);
    // Hand the port straight to a waiting transmitter, if any.
    MutexGuard::unlock_fair(guard);
    result
}

fn receive_loop(
    port: &SharedPort,
    log: &MessageLog,
    token: &CancellationToken,
    options: ListenerOptions,
) -> ListenerExit {
    let chunk = options.read_chunk_size.max(1);
    let mut buffer = vec![0u8; chunk];
    let mut assembler = Assembler::new(options.framing, chunk.saturating_mul(LINE_LIMIT_CHUNKS));
    let mut consecutive_errors = 0u32;

    info!(framing = ?options.framing, "listener started");

    let exit = loop {
        if token.is_requested() {
            break ListenerExit::Cancelled;
        }

        match read_once(port, &mut buffer) {
            Ok(0) => consecutive_errors = 0,
            Ok(n) => {
                consecutive_errors = 0;
                debug!(bytes = n, "received");
                assembler.push(&buffer[..n], |text| {
                    log.append(Direction::Received, text);
                });
            }
            Err(e) if e.is_transient() => consecutive_errors = 0,
            Err(e) if e.is_disconnect() => {
                warn!(error = %e, "serial device disconnected");
                break ListenerExit::Failed {
                    reason: e.to_string(),
                    disconnected: true,
                };
            }
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors >= options.max_consecutive_errors {
                    warn!(error = %e, attempts = consecutive_errors, "giving up on serial reads");
                    break ListenerExit::Failed {
                        reason: e.to_string(),
                        disconnected: false,
                    };
                }
                debug!(error = %e, attempts = consecutive_errors, "read failed, retrying");
            }
        }
    };

    if let Some(rest) = assembler.finish() {
        log.append(Direction::Received, rest);
    }
    exit
}
