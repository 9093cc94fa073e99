//! Audio-synchronized light show control.
//!
//! Plays a song while replaying its lighting sequence on local relays and a
//! remote LED device, in step with the audio clock.
//!
//! # Pieces
//! - [`PlaybackEngine`] - play/pause/resume/stop and the background loop that
//!   writes each frame's relay bytes at the current audio position
//! - [`RelayBank`] / [`SharedRelays`] - relay hardware and the light name mapping
//! - [`RemoteLinkClient`] - command channel and liveness probe for the remote
//!   LED device
//! - [`RemapSession`] - channel calibration with all-or-nothing commit
//! - [`LightsController`], [`PresetController`] - direct light control
//! - [`ShowController`] - wires all of the above from a [`ShowConfig`]
//!
//! # Crate feature flags
//! - `streaming` (optional): real audio output via rodio ([`audio::RodioOutput`])
//!
//! # Example
//! ```no_run
//! use lightshow_core::{audio::SilentAudio, ShowConfig, ShowController};
//!
//! let config = ShowConfig::load_or_default("lightshow.json")?;
//! let show = ShowController::from_config(&config, Box::new(SilentAudio::new()))?;
//! show.songs.play("Carol of the Bells")?;
//! show.songs.wait_until_idle(None);
//! # Ok::<(), lightshow_core::ShowError>(())
//! ```

#![warn(missing_docs)]

pub mod audio;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod engine;
mod error;
pub mod lights;
pub mod presets;
pub mod relay;
pub mod remap;
pub mod remote;

pub use catalog::SongCatalog;
pub use config::{PlaybackTiming, RelayBackendConfig, RemoteConfig, ShowConfig, StagerConfig};
pub use controller::{RecompileReport, ShowController, ShowInfo};
pub use engine::{EngineBuilder, PlaybackEngine};
pub use error::{RelayError, RemoteError, Result, ShowError};
pub use lights::LightsController;
pub use presets::PresetController;
pub use relay::{RelayBank, RelayMapping, SharedRelays};
pub use remap::RemapSession;
pub use remote::{RemoteCommand, RemoteLinkClient};

pub use lightshow_common::{PlaybackState, Song, Status, StatusReport};
