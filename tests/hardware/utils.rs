//! Utility functions for hardware testing.

use serialport::{available_ports, SerialPortType};
use std::env;
use uart_term::{MessageLog, SerialConfiguration, SerialSession};

/// Test port configuration from environment.
pub struct TestPortConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub loopback_enabled: bool,
}

impl TestPortConfig {
    /// Get test configuration from environment variables.
    pub fn from_env() -> Option<Self> {
        let port_name = env::var("TEST_PORT").ok()?;
        let baud_rate = env::var("TEST_BAUD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(115_200);
        let loopback_enabled = env::var("TEST_LOOPBACK").ok().as_deref() == Some("1");

        Some(TestPortConfig {
            port_name,
            baud_rate,
            loopback_enabled,
        })
    }

    pub fn serial_config(&self) -> SerialConfiguration {
        SerialConfiguration::new(&self.port_name).with_baud_rate(self.baud_rate)
    }

    /// Open a session on the test port, panicking with a readable message.
    pub fn open(&self) -> SerialSession {
        match SerialSession::open(self.serial_config(), MessageLog::new()) {
            Ok(session) => session,
            Err(e) => panic!("could not open {}: {e}", self.port_name),
        }
    }
}

/// Print available ports for debugging.
pub fn print_available_ports() {
    let ports = available_ports().unwrap_or_default();
    if ports.is_empty() {
        println!("No serial ports detected on this system");
        return;
    }

    println!("Available serial ports ({}):", ports.len());
    for port in ports {
        match port.port_type {
            SerialPortType::UsbPort(usb) => println!(
                "  {} (USB {:04x}:{:04x})",
                port.port_name, usb.vid, usb.pid
            ),
            _ => println!("  {}", port.port_name),
        }
    }
}

/// Skip test with a clear message if hardware is not available.
#[macro_export]
macro_rules! skip_without_hardware {
    () => {
        match $crate::hardware::utils::TestPortConfig::from_env() {
            Some(config) => config,
            None => {
                println!("Skipping: TEST_PORT environment variable not set");
                $crate::hardware::utils::print_available_ports();
                return;
            }
        }
    };
}

/// Skip test with a clear message if loopback is not enabled.
#[macro_export]
macro_rules! skip_without_loopback {
    () => {{
        let config = $crate::skip_without_hardware!();
        if !config.loopback_enabled {
            println!("Skipping: set TEST_LOOPBACK=1 with TX wired to RX");
            return;
        }
        config
    }};
}
