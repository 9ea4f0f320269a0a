//! A configured serial connection and its optional receive listener.
//!
//! # Architecture
//!
//! ```text
//! caller ──send──┐                     ┌── ReceiveListener (thread)
//!                ▼                     ▼
//!        Arc<Mutex<PortHandle>>  (locked per call)
//!                │                     │
//!                └──────► MessageLog ◄─┘
//! ```
//!
//! The session is the only owner of the device. The listener thread borrows
//! it one read at a time and is always joined before the device is released.

use crate::cancel::CancellationToken;
use crate::error::{SessionError, SessionResult};
use crate::listener::{ListenerExit, ListenerOptions, ListenerState, ReceiveListener, SharedPort};
use crate::message_log::MessageLog;
use crate::port::{self, DeviceSettings, PortError, PortHandle, SerialConfiguration};
use crate::transmit;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// Outbound text framing terminator.
pub const LINE_TERMINATOR: &str = "\n";

/// An open, configured serial device.
#[derive(Debug)]
pub struct SerialSession {
    port: SharedPort,
    path: String,
    config: SerialConfiguration,
    settings: DeviceSettings,
    log: MessageLog,
    listener: Option<ReceiveListener>,
    last_exit: Option<ListenerExit>,
    lost: Mutex<Option<String>>,
}

impl SerialSession {
    /// Open `config.device_path` and apply `config` to it.
    ///
    /// On a configuration failure the freshly opened device is closed before
    /// the error is returned.
    ///
    /// # Errors
    ///
    /// - `SessionError::DeviceOpen` if the device cannot be opened
    /// - `SessionError::Configuration` if the settings are unsupported or refused
    pub fn open(config: SerialConfiguration, log: MessageLog) -> SessionResult<Self> {
        let handle =
            PortHandle::open(&config.device_path).map_err(|source| SessionError::DeviceOpen {
                path: config.device_path.clone(),
                source,
            })?;
        Self::with_handle(handle, config, log)
    }

    /// Build a session around an already-open handle.
    pub fn with_handle(
        mut handle: PortHandle,
        config: SerialConfiguration,
        log: MessageLog,
    ) -> SessionResult<Self> {
        let settings =
            port::apply(&mut handle, &config).map_err(|source| SessionError::Configuration {
                path: config.device_path.clone(),
                source,
            })?;

        info!(
            device = %config.device_path,
            baud = %settings.baud_rate,
            "serial session ready"
        );

        Ok(Self {
            port: Arc::new(Mutex::new(handle)),
            path: config.device_path.clone(),
            config,
            settings,
            log,
            listener: None,
            last_exit: None,
            lost: Mutex::new(None),
        })
    }

    pub fn device_path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> &SerialConfiguration {
        &self.config
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Transmit `bytes` and record them as a `sent` message.
    ///
    /// # Errors
    ///
    /// - `SessionError::Transmit` for a write failure; the session stays usable
    /// - `SessionError::DeviceLost` if the device has gone away
    pub fn send(&self, bytes: &[u8]) -> SessionResult<usize> {
        self.ensure_present()?;

        let mut handle = self.port.lock();
        match transmit::send(handle.adapter_mut(), bytes, &self.log) {
            Ok(n) => Ok(n),
            Err(e) if e.is_disconnect() => Err(self.mark_lost(&e)),
            Err(e) => Err(SessionError::Transmit(e)),
        }
    }

    /// Transmit `text` followed by the line terminator.
    ///
    /// The terminator is always appended, even if `text` already ends in one.
    pub fn send_line(&self, text: &str) -> SessionResult<usize> {
        self.send(format!("{text}{LINE_TERMINATOR}").as_bytes())
    }

    /// Start the background receive listener.
    ///
    /// A previously terminated listener is reaped first.
    pub fn start_listener(&mut self, options: ListenerOptions) -> SessionResult<()> {
        if let Some(listener) = &self.listener {
            if listener.state() != ListenerState::Terminated {
                return Err(SessionError::ListenerRunning("starting another"));
            }
            self.stop_listener();
        }
        self.ensure_present()?;

        let listener = ReceiveListener::start(
            Arc::clone(&self.port),
            self.log.clone(),
            CancellationToken::new(),
            options,
        )
        .map_err(SessionError::Spawn)?;
        self.listener = Some(listener);
        self.last_exit = None;
        Ok(())
    }

    /// Stop the listener and wait for its thread to exit.
    ///
    /// Returns the listener's exit status, or `None` if no listener was
    /// running (calling this twice is a no-op the second time).
    pub fn stop_listener(&mut self) -> Option<ListenerExit> {
        let listener = self.listener.take()?;
        let exit = listener.stop();
        info!(device = %self.path, %exit, "receive listener stopped");

        if let ListenerExit::Failed {
            reason,
            disconnected: true,
        } = &exit
        {
            *self.lost.lock() = Some(reason.clone());
        }
        self.last_exit = Some(exit.clone());
        Some(exit)
    }

    pub fn listener_state(&self) -> ListenerState {
        self.listener
            .as_ref()
            .map_or(ListenerState::Idle, ReceiveListener::state)
    }

    /// The exit status of a terminated or most recently stopped listener.
    ///
    /// `None` while a listener is still running.
    pub fn listener_exit(&self) -> Option<ListenerExit> {
        match &self.listener {
            Some(listener) => listener.exit(),
            None => self.last_exit.clone(),
        }
    }

    /// The listener's failure, if it ended on a read error.
    pub fn receive_failure(&self) -> Option<SessionError> {
        self.listener_exit()
            .filter(ListenerExit::is_failure)
            .map(|exit| SessionError::Receive(exit.to_string()))
    }

    /// Apply a new configuration to the open device.
    ///
    /// The listener must be stopped first, and the device path cannot change.
    pub fn reconfigure(&mut self, config: SerialConfiguration) -> SessionResult<()> {
        if self
            .listener
            .as_ref()
            .is_some_and(|l| l.state() != ListenerState::Terminated)
        {
            return Err(SessionError::ListenerRunning("reconfiguring"));
        }
        if config.device_path != self.path {
            return Err(SessionError::Configuration {
                path: self.path.clone(),
                source: PortError::InvalidSettings(format!(
                    "cannot move an open session to {}",
                    config.device_path
                )),
            });
        }
        self.ensure_present()?;

        let settings = port::apply(&mut self.port.lock(), &config).map_err(|source| {
            SessionError::Configuration {
                path: self.path.clone(),
                source,
            }
        })?;
        self.config = config;
        self.settings = settings;
        Ok(())
    }

    /// Stop any listener and release the device.
    pub fn close(mut self) -> Option<ListenerExit> {
        let exit = self.stop_listener();
        info!(device = %self.path, "closing serial session");
        exit
    }

    fn ensure_present(&self) -> SessionResult<()> {
        match &*self.lost.lock() {
            Some(reason) => Err(SessionError::DeviceLost {
                path: self.path.clone(),
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    fn mark_lost(&self, error: &PortError) -> SessionError {
        warn!(device = %self.path, error = %error, "serial device lost");
        let reason = error.to_string();
        *self.lost.lock() = Some(reason.clone());
        SessionError::DeviceLost {
            path: self.path.clone(),
            reason,
        }
    }
}

impl Drop for SerialSession {
    fn drop(&mut self) {
        self.stop_listener();
    }
}
