//! Audio output facility.
//!
//! The engine drives audio through [`AudioOutput`] and reads its clock back
//! to pick lighting frames. Implementations:
//! - [`SilentAudio`] - wall-clock playback with no sound (headless runs)
//! - [`ManualAudio`] - clock and end-of-song controlled by the caller
//! - `RodioOutput` - real output via rodio (`streaming` feature)

mod manual;
mod silent;

#[cfg(feature = "streaming")]
mod rodio_output;

pub use manual::{AudioEvent, ManualAudio, ManualClock};
pub use silent::SilentAudio;

#[cfg(feature = "streaming")]
pub use rodio_output::RodioOutput;

use crate::Result;
use lightshow_common::Song;
use std::time::Duration;

/// Audio output the playback engine synchronizes against.
pub trait AudioOutput: Send {
    /// Close the output and reopen it at the native format of `song`'s audio.
    fn reopen_for(&mut self, song: &Song) -> Result<()>;

    /// Load `song` without starting it.
    fn load(&mut self, song: &Song) -> Result<()>;

    /// Start the loaded song.
    fn play(&mut self);

    /// Pause playback.
    fn pause(&mut self);

    /// Continue paused playback.
    fn resume(&mut self);

    /// Stop and unload.
    fn stop(&mut self);

    /// Elapsed playback time of the loaded song.
    fn position(&self) -> Duration;

    /// True while a song is loaded and has not played to its end.
    fn is_busy(&self) -> bool;

    /// Volume, 0-100.
    fn volume(&self) -> u8;

    /// Set volume, 0-100. Larger values are clamped.
    fn set_volume(&mut self, volume: u8);
}
