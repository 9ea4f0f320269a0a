//! Tests against a real device.
//!
//! ```bash
//! export TEST_PORT=/dev/ttyUSB0
//! export TEST_BAUD=115200     # optional
//! export TEST_LOOPBACK=1      # TX wired to RX
//! cargo test --features hardware-tests --test integration_hardware -- --ignored
//! ```

use crate::common::wait_for_messages;
use crate::{skip_without_hardware, skip_without_loopback};
use std::time::{Duration, Instant};
use uart_term::{Direction, Framing, ListenerExit, ListenerOptions, ListenerState};

#[test]
#[ignore]
fn test_real_port_open_configure_close() {
    let config = skip_without_hardware!();
    let session = config.open();

    assert_eq!(session.settings().baud_rate.as_u32(), config.baud_rate);
    assert_eq!(session.settings().min_read_bytes, 0);
    assert_eq!(session.listener_state(), ListenerState::Idle);
    assert_eq!(session.close(), None);
}

#[test]
#[ignore]
fn test_real_port_reopen_after_close() {
    let config = skip_without_hardware!();
    config.open().close();
    config.open().close();
}

#[test]
#[ignore]
fn test_real_port_stop_latency() {
    let config = skip_without_hardware!();
    let mut session = config.open();
    session.start_listener(ListenerOptions::default()).unwrap();
    std::thread::sleep(Duration::from_millis(100));

    let started = Instant::now();
    assert_eq!(session.stop_listener(), Some(ListenerExit::Cancelled));
    let bound = session.settings().read_timeout() + Duration::from_millis(250);
    assert!(started.elapsed() < bound, "stop took {:?}", started.elapsed());
}

#[test]
#[ignore]
fn test_loopback_line_round_trip() {
    let config = skip_without_loopback!();
    let mut session = config.open();
    session
        .start_listener(ListenerOptions {
            framing: Framing::Line,
            ..ListenerOptions::default()
        })
        .unwrap();

    session.send_line("uart-term loopback").unwrap();
    assert!(wait_for_messages(session.log(), 2), "no echo received");
    session.stop_listener();

    let messages = session.log().snapshot();
    assert_eq!(messages[0].direction, Direction::Sent);
    assert_eq!(messages[1].direction, Direction::Received);
    assert_eq!(messages[1].text_lossy(), "uart-term loopback\n");
}

#[test]
#[ignore]
fn test_loopback_burst() {
    let config = skip_without_loopback!();
    let mut session = config.open();
    session
        .start_listener(ListenerOptions {
            framing: Framing::Line,
            ..ListenerOptions::default()
        })
        .unwrap();

    for i in 0..20 {
        session.send_line(&format!("burst {i}")).unwrap();
    }
    assert!(wait_for_messages(session.log(), 40), "echo incomplete");
    session.stop_listener();

    let counts = session.log().counts();
    assert_eq!((counts.sent, counts.received), (20, 20));
}
