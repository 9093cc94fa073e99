//! Show controller configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial file (or
//! no file at all) yields a working local-only setup.

use crate::{Result, ShowError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Control port the remote LED server listens on.
pub const DEFAULT_REMOTE_PORT: u16 = 12345;

/// Volume applied at startup.
pub const DEFAULT_VOLUME: u8 = 20;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowConfig {
    /// Relay mapping file (light name -> channel).
    pub mapping_path: PathBuf,
    /// Preset file (preset name -> light names).
    pub presets_path: PathBuf,
    /// Song catalog manifest.
    pub catalog_path: PathBuf,
    /// Directory generated show files are written to.
    pub show_dir: PathBuf,
    /// Relay hardware backend.
    pub relays: RelayBackendConfig,
    /// Remote LED device link.
    pub remote: RemoteConfig,
    /// How show files reach the remote device.
    pub stager: StagerConfig,
    /// Playback synchronization timing.
    pub timing: PlaybackTiming,
    /// Volume applied at startup (0-100).
    pub initial_volume: u8,
}

impl Default for ShowConfig {
    fn default() -> Self {
        Self {
            mapping_path: PathBuf::from("relay_mapping.json"),
            presets_path: PathBuf::from("presets.json"),
            catalog_path: PathBuf::from("songs.json"),
            show_dir: PathBuf::from("shows"),
            relays: RelayBackendConfig::default(),
            remote: RemoteConfig::default(),
            stager: StagerConfig::default(),
            timing: PlaybackTiming::default(),
            initial_volume: DEFAULT_VOLUME,
        }
    }
}

impl ShowConfig {
    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: ShowConfig = serde_json::from_str(&text)?;
        config.validate()?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("no configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Check value ranges serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.initial_volume > lightshow_common::VOLUME_MAX {
            return Err(ShowError::Config(format!(
                "initial_volume {} exceeds {}",
                self.initial_volume,
                lightshow_common::VOLUME_MAX
            )));
        }
        if self.remote.enabled && self.remote.host.is_empty() {
            return Err("remote link enabled without a host".into());
        }
        Ok(())
    }

    /// Resolve relative paths against `base` (usually the config file's directory).
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        for path in [
            &mut self.mapping_path,
            &mut self.presets_path,
            &mut self.catalog_path,
            &mut self.show_dir,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        if let RelayBackendConfig::FileSync { path, .. } = &mut self.relays {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }
}

/// Relay hardware backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayBackendConfig {
    /// In-process relays with no hardware behind them.
    Memory {
        /// Number of channels.
        channels: usize,
    },
    /// Linux sysfs GPIO lines, one pin per channel.
    Sysfs {
        /// GPIO line numbers in channel order.
        pins: Vec<u32>,
        /// Relay boards that switch on a low level.
        #[serde(default)]
        active_low: bool,
    },
    /// JSON state file mirrored on every change (off-device visualizer).
    FileSync {
        /// State file path.
        path: PathBuf,
        /// Pin numbers reported for each channel.
        pins: Vec<u32>,
    },
}

impl Default for RelayBackendConfig {
    fn default() -> Self {
        RelayBackendConfig::Memory {
            channels: lightshow_common::NUM_BYTES_RELAYS,
        }
    }
}

/// Remote LED device link settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Send commands at all.
    pub enabled: bool,
    /// Host name or address of the remote device.
    pub host: String,
    /// Control port.
    pub port: u16,
    /// Per-connection timeout.
    pub connect_timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "raspberrypi.local".to_string(),
            port: DEFAULT_REMOTE_PORT,
            connect_timeout_ms: 500,
        }
    }
}

impl RemoteConfig {
    /// Link to `127.0.0.1:port`, used against a local fake device.
    pub fn local(port: u16) -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port,
            connect_timeout_ms: 500,
        }
    }

    /// Link that never dials out.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// External commands used to upload and start a show on the remote device.
///
/// `{show}` expands to the local show file path, `{name}` to its file name.
/// When a template is absent that step is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagerConfig {
    /// Upload command, e.g. `["scp", "{show}", "pi@raspberrypi.local:shows/"]`.
    pub upload: Option<Vec<String>>,
    /// Launch command, e.g. `["ssh", "pi@raspberrypi.local", "sudo ./led_server shows/{name} &"]`.
    pub launch: Option<Vec<String>>,
}

/// Timing constants for playback synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackTiming {
    /// Subtracted from the audio position to offset output buffering.
    pub latency_compensation_ms: u64,
    /// Wait after launching the remote player before sending PLAY.
    pub remote_warmup_ms: u64,
    /// Wait after PLAY before starting local audio.
    pub remote_settle_ms: u64,
    /// Sleep between synchronization loop iterations.
    pub poll_interval_ms: u64,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            latency_compensation_ms: 150,
            remote_warmup_ms: 1000,
            remote_settle_ms: 100,
            poll_interval_ms: 2,
        }
    }
}

impl PlaybackTiming {
    /// No delays and no compensation.
    pub fn immediate() -> Self {
        Self {
            latency_compensation_ms: 0,
            remote_warmup_ms: 0,
            remote_settle_ms: 0,
            poll_interval_ms: 1,
        }
    }

    /// Warm-up delay.
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.remote_warmup_ms)
    }

    /// Settle delay.
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.remote_settle_ms)
    }

    /// Loop sleep.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Audio position with latency compensation applied, clamped at zero.
    pub fn compensate(&self, position_ms: u64) -> u64 {
        position_ms.saturating_sub(self.latency_compensation_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment() {
        let config = ShowConfig::default();
        assert_eq!(config.remote.port, 12345);
        assert_eq!(config.timing.latency_compensation_ms, 150);
        assert_eq!(config.timing.remote_warmup_ms, 1000);
        assert_eq!(config.timing.remote_settle_ms, 100);
        assert_eq!(config.initial_volume, 20);
    }

    #[test]
    fn compensation_clamps_at_zero() {
        let timing = PlaybackTiming::default();
        assert_eq!(timing.compensate(100), 0);
        assert_eq!(timing.compensate(175), 25);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: ShowConfig = serde_json::from_str(
            r#"{
                "relays": {"type": "sysfs", "pins": [17, 27]},
                "remote": {"host": "10.0.0.5"},
                "timing": {"latency_compensation_ms": 90}
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.relays,
            RelayBackendConfig::Sysfs {
                pins: vec![17, 27],
                active_low: false
            }
        );
        assert_eq!(config.remote.address(), "10.0.0.5:12345");
        assert_eq!(config.timing.latency_compensation_ms, 90);
        assert_eq!(config.timing.remote_warmup_ms, 1000);
    }

    #[test]
    fn rejects_loud_initial_volume() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"initial_volume": 101}"#).unwrap();
        assert!(matches!(ShowConfig::load(&path), Err(ShowError::Config(_))));
    }

    #[test]
    fn resolves_relative_paths() {
        let config = ShowConfig::default().resolve_paths(Path::new("/srv/show"));
        assert_eq!(config.mapping_path, Path::new("/srv/show/relay_mapping.json"));
        assert_eq!(config.show_dir, Path::new("/srv/show/shows"));
    }
}
