//! Shared test utilities for uart-term integration tests.
//!
//! - Mock-backed session construction
//! - Polling helpers for the background listener

#![allow(dead_code)]

use std::thread;
use std::time::{Duration, Instant};
use uart_term::{
    ListenerState, MessageLog, MockSerialPort, PortHandle, SerialConfiguration, SerialSession,
};

/// Read timeout used by mock sessions, in tenths of a second.
pub const MOCK_TIMEOUT_DS: u8 = 1;

/// Upper bound for anything the tests wait on.
pub const PATIENCE: Duration = Duration::from_secs(3);

/// A 115200 8N1 configuration for `name` with a short read timeout.
pub fn mock_config(name: &str) -> SerialConfiguration {
    SerialConfiguration::new(name).with_read_timeout_ds(MOCK_TIMEOUT_DS)
}

/// A session over a clone of `mock`; the caller keeps `mock` for inspection.
pub fn mock_session(mock: &MockSerialPort) -> SerialSession {
    SerialSession::with_handle(
        PortHandle::from_adapter(mock.clone()),
        mock_config("MOCK0"),
        MessageLog::new(),
    )
    .expect("mock session")
}

/// A session over a fresh loopback mock.
pub fn loopback_session() -> (MockSerialPort, SerialSession) {
    let mock = MockSerialPort::loopback("MOCK0");
    let session = mock_session(&mock);
    (mock, session)
}

/// Poll until `log` holds at least `len` messages or patience runs out.
pub fn wait_for_messages(log: &MessageLog, len: usize) -> bool {
    wait_until(|| log.len() >= len)
}

/// Poll until the session's listener reports `Terminated`.
pub fn wait_for_termination(session: &SerialSession) -> bool {
    wait_until(|| session.listener_state() == ListenerState::Terminated)
}

pub fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + PATIENCE;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    done()
}
