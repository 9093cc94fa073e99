//! Status reporting shared by all controllers.
//!
//! Every controller implements [`StatusReport`] and returns a variant of
//! [`Status`]. The values are plain serializable data so an outer request
//! layer can hand them to clients as-is.

use serde::Serialize;

/// Playback state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing loaded.
    #[default]
    Idle,
    /// A song is playing.
    Playing,
    /// A song is loaded and paused.
    Paused,
}

/// Display descriptor of a song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongInfo {
    /// Song title.
    pub title: String,
    /// Artist name.
    pub artist: String,
    /// Cover art.
    pub album_art: String,
    /// Length in milliseconds.
    pub length_ms: u64,
}

/// Reachability of the remote display device.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RemoteStatus {
    /// Whether remote control is enabled in the configuration.
    pub enabled: bool,
    /// Remote control address (`host:port`).
    pub address: String,
    /// Failed commands since the last successful one.
    pub consecutive_failures: u32,
    /// Most recent failure, if any.
    pub last_error: Option<String>,
    /// Result of the last liveness probe; `None` until the first probe.
    pub reachable: Option<bool>,
}

impl RemoteStatus {
    /// True when the last command reached the remote device.
    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures == 0
    }
}

/// Status of the song player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongsStatus {
    /// All songs in the catalog.
    pub songs: Vec<SongInfo>,
    /// Song currently loaded.
    pub playing: Option<SongInfo>,
    /// Current playback state.
    pub state: PlaybackState,
    /// Whether playback is paused.
    pub paused: bool,
    /// Elapsed audio position in milliseconds.
    pub elapsed_ms: u64,
    /// Output volume (0-100).
    pub volume: u8,
    /// Last error raised by the synchronization loop.
    pub fault: Option<String>,
    /// Remote device health.
    pub remote: RemoteStatus,
}

/// One named light.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LightStatus {
    /// Logical light name.
    pub name: String,
    /// Physical channel index.
    pub channel: usize,
    /// Hardware pin, when the backend has one.
    pub pin: Option<u32>,
    /// Current output state.
    pub value: bool,
}

/// Status of all named lights.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LightsStatus {
    /// Lights in mapping order.
    pub lights: Vec<LightStatus>,
}

/// One preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresetStatus {
    /// Preset name.
    pub name: String,
    /// Lights switched on by this preset.
    pub lights: Vec<String>,
}

/// Status of all presets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PresetsStatus {
    /// Presets sorted by name.
    pub presets: Vec<PresetStatus>,
}

/// Status of the remap workflow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RemapStatus {
    /// Names still waiting for a channel, `None` when no remap is running.
    pub remaining: Option<Vec<String>>,
    /// Channel currently lit for identification.
    pub current_channel: Option<usize>,
}

impl RemapStatus {
    /// True while a remap session is running.
    pub fn in_progress(&self) -> bool {
        self.remaining.is_some()
    }
}

/// Status value returned by any controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Status {
    /// Song player status.
    Songs(SongsStatus),
    /// Named lights status.
    Lights(LightsStatus),
    /// Presets status.
    Presets(PresetsStatus),
    /// Remap workflow status.
    Remap(RemapStatus),
    /// Remote device status.
    Remote(RemoteStatus),
}

/// Capability implemented by every controller.
pub trait StatusReport {
    /// Snapshot of the controller's current state.
    fn status(&self) -> Status;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_with_kind_tag() {
        let status = Status::Remap(RemapStatus::default());
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["kind"], "remap");
        assert!(json["remaining"].is_null());
    }

    #[test]
    fn remap_status_progress() {
        let status = RemapStatus {
            remaining: Some(vec!["porch".into()]),
            current_channel: Some(3),
        };
        assert!(status.in_progress());
        assert!(!RemapStatus::default().in_progress());
    }
}
