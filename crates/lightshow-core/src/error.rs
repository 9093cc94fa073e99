//! Error types for show control

use lightshow_fseq::DecodeError;

/// Error type for show controller operations
#[derive(thiserror::Error, Debug)]
pub enum ShowError {
    /// Sequence file could not be decoded
    #[error("Sequence error: {0}")]
    Decode(#[from] DecodeError),

    /// Relay hardware or mapping failure
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    /// Audio output failure
    #[error("Audio error: {0}")]
    Audio(String),

    /// Song title not present in the catalog
    #[error("Unknown song: {0}")]
    UnknownSong(String),

    /// Light name not present in the relay mapping
    #[error("Unknown light name: {0}")]
    UnknownLightName(String),

    /// Preset name not present in the preset store
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    /// Remap step requested while no remap session is active
    #[error("No remap in progress")]
    NoRemapInProgress,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<String> for ShowError {
    fn from(s: String) -> Self {
        ShowError::Config(s)
    }
}

impl From<&str> for ShowError {
    fn from(s: &str) -> Self {
        ShowError::Config(s.to_string())
    }
}

/// Result type for show controller operations
pub type Result<T> = std::result::Result<T, ShowError>;

/// Error type for relay banks and the relay mapping
#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    /// Channel index outside the bank, or backing output not writable
    #[error("Relay channel {channel} unavailable")]
    ChannelUnavailable {
        /// Requested channel
        channel: usize,
    },

    /// IO error from a GPIO or state file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// State or mapping file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Mapping file content is structurally wrong
    #[error("Invalid relay mapping: {0}")]
    Mapping(String),
}

/// Error type for the remote LED device link.
///
/// These are soft failures: they are reported and counted but never abort
/// local playback.
#[derive(thiserror::Error, Debug)]
pub enum RemoteError {
    /// Remote control port refused or timed out
    #[error("Remote device at {addr} unreachable: {source}")]
    Unreachable {
        /// Address that was dialed
        addr: String,
        /// Underlying connection error
        #[source]
        source: std::io::Error,
    },

    /// Remote link disabled in configuration
    #[error("Remote link disabled")]
    Disabled,

    /// IO error while writing a command
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Upload or launch of a show file failed
    #[error("Show staging failed: {0}")]
    Stage(String),
}
