//! Remote LED device link.
//!
//! The remote device runs its own show player listening on a fixed TCP
//! control port. Each command opens a fresh connection, writes the literal
//! ASCII command name and closes; there is no framing and no reply. A
//! liveness probe is a bare connect on the same port.
//!
//! Failures here are soft: they are logged, counted in [`RemoteHealth`] and
//! returned as values, but never stop local playback.

mod stager;

pub use stager::{CommandStager, NullStager, ShowStager};

use crate::RemoteError;
use crate::config::RemoteConfig;
use lightshow_common::{RemoteStatus, Status, StatusReport};
use parking_lot::Mutex;
use std::fmt;
use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Instant;

/// Command understood by the remote show player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Start the loaded show.
    Play,
    /// Freeze the show.
    Pause,
    /// Continue a paused show.
    Resume,
    /// Stop and blank the strands.
    Stop,
}

impl RemoteCommand {
    /// Wire text.
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteCommand::Play => "PLAY",
            RemoteCommand::Pause => "PAUSE",
            RemoteCommand::Resume => "RESUME",
            RemoteCommand::Stop => "STOP",
        }
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running record of remote link failures.
#[derive(Debug, Clone, Default)]
pub struct RemoteHealth {
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// Failures since startup.
    pub total_failures: u64,
    /// Text of the most recent failure.
    pub last_error: Option<String>,
    /// When a command or probe last reached the device.
    pub last_success: Option<Instant>,
    /// Result of the last liveness probe.
    pub last_probe: Option<bool>,
}

impl RemoteHealth {
    fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.last_success = Some(Instant::now());
    }

    fn record_failure(&mut self, err: &RemoteError) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.total_failures += 1;
        self.last_error = Some(err.to_string());
    }
}

/// Client for the remote device control port.
#[derive(Debug)]
pub struct RemoteLinkClient {
    config: RemoteConfig,
    health: Mutex<RemoteHealth>,
}

impl RemoteLinkClient {
    /// Client for the configured device.
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            health: Mutex::new(RemoteHealth::default()),
        }
    }

    /// Client that never dials out.
    pub fn disabled() -> Self {
        Self::new(RemoteConfig::disabled())
    }

    /// Whether commands are sent at all.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// `host:port` of the control port.
    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Send one command: connect, write, close.
    pub fn send(&self, command: RemoteCommand) -> Result<(), RemoteError> {
        if !self.config.enabled {
            log::debug!("remote link disabled, not sending {command}");
            return Err(RemoteError::Disabled);
        }
        let result = self.connect().and_then(|mut stream| {
            stream.write_all(command.as_str().as_bytes())?;
            stream.flush()?;
            Ok(())
        });
        self.record(&result);
        match &result {
            Ok(()) => log::debug!("sent {command} to {}", self.address()),
            Err(e) => log::warn!("remote {command} failed: {e}"),
        }
        result
    }

    /// Send a command whose failure only matters for diagnostics.
    ///
    /// Returns whether the command reached the device.
    pub fn signal(&self, command: RemoteCommand) -> bool {
        self.send(command).is_ok()
    }

    /// Check whether the remote player is accepting connections.
    pub fn is_reachable(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        let result = self.connect().map(drop);
        self.record(&result);
        self.health.lock().last_probe = Some(result.is_ok());
        result.is_ok()
    }

    /// Copy of the failure record.
    pub fn health(&self) -> RemoteHealth {
        self.health.lock().clone()
    }

    /// Status value for reporting.
    pub fn remote_status(&self) -> RemoteStatus {
        let health = self.health.lock();
        RemoteStatus {
            enabled: self.config.enabled,
            address: self.address(),
            consecutive_failures: health.consecutive_failures,
            last_error: health.last_error.clone(),
            reachable: health.last_probe,
        }
    }

    /// Count a failure that happened outside this client, such as staging.
    pub(crate) fn note_failure(&self, err: &RemoteError) {
        self.health.lock().record_failure(err);
    }

    fn record(&self, result: &Result<(), RemoteError>) {
        let mut health = self.health.lock();
        match result {
            Ok(()) => health.record_success(),
            Err(e) => health.record_failure(e),
        }
    }

    fn connect(&self) -> Result<TcpStream, RemoteError> {
        let address = self.address();
        let unreachable = |source| RemoteError::Unreachable {
            addr: address.clone(),
            source,
        };
        let addrs: Vec<SocketAddr> = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(unreachable)?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.config.connect_timeout()) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(unreachable(last_err.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "host resolved to no addresses")
        })))
    }
}

impl StatusReport for RemoteLinkClient {
    fn status(&self) -> Status {
        Status::Remote(self.remote_status())
    }
}
