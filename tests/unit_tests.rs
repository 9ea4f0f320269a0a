//! Unit tests for configuration loading and the error taxonomy.

use pretty_assertions::assert_eq;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;
use uart_term::config::{Config, ConfigError, ConfigLoader, LogFormat};
use uart_term::{FailureKind, Framing, PortError, SessionError};

const ENV_VARS: [&str; 5] = [
    "UART_TERM_CONFIG",
    "UART_TERM_SERIAL_DEVICE",
    "UART_TERM_SERIAL_BAUD",
    "UART_TERM_SERIAL_READ_TIMEOUT_DS",
    "UART_TERM_LOG_LEVEL",
];

fn clear_env() {
    for var in ENV_VARS {
        env::remove_var(var);
    }
}

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("uart-term.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
#[serial]
fn load_from_file_merges_with_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        [serial]
        default_device = "/dev/ttyUSB1"
        baud_rate = 57600
        framing = "line"

        [logging]
        level = "debug"
        format = "json"
        "#,
    );

    let loader = ConfigLoader::load_from(&path).unwrap();
    let config = loader.config();
    assert_eq!(loader.config_path.as_deref(), Some(path.as_path()));
    assert_eq!(config.serial.default_device.as_deref(), Some("/dev/ttyUSB1"));
    assert_eq!(config.serial.baud_rate, 57600);
    assert_eq!(config.serial.framing, Framing::Line);
    assert_eq!(config.serial.read_timeout_ds, 5);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
#[serial]
fn env_overrides_file_values() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[serial]\nbaud_rate = 9600\n");

    env::set_var("UART_TERM_SERIAL_BAUD", "230400");
    env::set_var("UART_TERM_SERIAL_READ_TIMEOUT_DS", "10");
    env::set_var("UART_TERM_LOG_LEVEL", "trace");
    let loader = ConfigLoader::load_from(&path);
    clear_env();

    let config = loader.unwrap().into_config();
    assert_eq!(config.serial.baud_rate, 230400);
    assert_eq!(config.serial.read_timeout_ds, 10);
    assert_eq!(config.logging.level, "trace");
}

#[test]
#[serial]
fn explicit_config_path_is_used() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[serial]\nbaud_rate = 19200\n");

    env::set_var("UART_TERM_CONFIG", &path);
    let loader = ConfigLoader::load();
    clear_env();

    let loader = loader.unwrap();
    assert_eq!(loader.config_path.as_deref(), Some(path.as_path()));
    assert_eq!(loader.config().serial.baud_rate, 19200);
}

#[test]
#[serial]
fn unsupported_baud_in_file_is_rejected() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[serial]\nbaud_rate = 999999\n");

    let err = ConfigLoader::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { ref key, .. } if key == "serial.baud_rate"));
}

#[test]
#[serial]
fn malformed_file_is_parse_error() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[serial\nbaud_rate = ");
    assert!(matches!(
        ConfigLoader::load_from(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
#[serial]
fn missing_file_is_read_error() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let err = ConfigLoader::load_from(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadError { .. }));
}

#[test]
#[serial]
fn save_then_load_preserves_config() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut loader = ConfigLoader::with_defaults();
    loader.config.serial.baud_rate = 38400;
    loader
        .config
        .serial
        .port_aliases
        .insert("board".into(), "/dev/ttyACM0".into());
    loader.save_to(&path).unwrap();

    let reloaded = ConfigLoader::load_from(&path).unwrap().into_config();
    assert_eq!(reloaded, loader.config);
    assert_eq!(reloaded.serial.connection("board").device_path, "/dev/ttyACM0");
}

#[test]
#[serial]
fn malformed_env_is_ignored_by_defaults_loader() {
    clear_env();
    env::set_var("UART_TERM_SERIAL_BAUD", "fast");
    let loader = ConfigLoader::with_defaults();
    clear_env();
    assert_eq!(loader.into_config(), Config::default());
}

#[test]
fn failure_kinds_cover_every_error() {
    let cases = [
        (
            SessionError::DeviceOpen {
                path: "/dev/x".into(),
                source: PortError::PermissionDenied("/dev/x".into()),
            },
            FailureKind::DeviceOpenFailure,
        ),
        (
            SessionError::Configuration {
                path: "/dev/x".into(),
                source: PortError::UnsupportedBaudRate(1),
            },
            FailureKind::ConfigurationFailure,
        ),
        (
            SessionError::Transmit(PortError::rejected("no")),
            FailureKind::TransmitFailure,
        ),
        (
            SessionError::Receive("read failed".into()),
            FailureKind::ReceiveFailure,
        ),
        (
            SessionError::ListenerRunning("reconfiguring"),
            FailureKind::UsageError,
        ),
    ];
    for (error, kind) in cases {
        assert_eq!(error.kind(), kind, "{error}");
        assert!(!error.to_string().is_empty());
    }
}

#[test]
fn errors_serialize_kind_for_status_display() {
    let json = serde_json::to_value(FailureKind::DeviceOpenFailure).unwrap();
    assert_eq!(json, "device_open_failure");
}
