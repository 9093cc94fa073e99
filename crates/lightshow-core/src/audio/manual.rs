//! Audio output driven by the caller.
//!
//! [`ManualAudio`] plays nothing; its position and end-of-song are set
//! through a shared [`ManualClock`], which also records every call made on
//! the output. Useful wherever playback must be stepped deterministically.

use super::AudioOutput;
use crate::{Result, ShowError};
use lightshow_common::{Song, VOLUME_MAX};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Call made on a [`ManualAudio`] output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioEvent {
    /// `reopen_for(title)`
    Reopen(String),
    /// `load(title)`
    Load(String),
    /// `play()`
    Play,
    /// `pause()`
    Pause,
    /// `resume()`
    Resume,
    /// `stop()`
    Stop,
    /// `set_volume(v)`
    Volume(u8),
}

#[derive(Debug, Default)]
struct ClockState {
    loaded: Option<String>,
    position: Duration,
    finished: bool,
    volume: u8,
    reopen_error: Option<String>,
    events: Vec<AudioEvent>,
}

/// Control handle for a [`ManualAudio`] output.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ClockState>>,
}

impl ManualClock {
    /// Move the playback position.
    pub fn set_position(&self, position: Duration) {
        self.state.lock().position = position;
    }

    /// Report the loaded song as played to its end.
    pub fn finish(&self) {
        self.state.lock().finished = true;
    }

    /// Make every following `reopen_for` fail with `message`.
    pub fn fail_reopen(&self, message: impl Into<String>) {
        self.state.lock().reopen_error = Some(message.into());
    }

    /// Title of the loaded song.
    pub fn loaded(&self) -> Option<String> {
        self.state.lock().loaded.clone()
    }

    /// Calls made so far.
    pub fn events(&self) -> Vec<AudioEvent> {
        self.state.lock().events.clone()
    }
}

/// Audio output whose clock is set by a [`ManualClock`].
#[derive(Debug, Default)]
pub struct ManualAudio {
    clock: ManualClock,
}

impl ManualAudio {
    /// Output plus its control handle.
    pub fn new() -> (Self, ManualClock) {
        let audio = Self::default();
        let clock = audio.clock.clone();
        (audio, clock)
    }

    fn record(&self, event: AudioEvent) {
        self.clock.state.lock().events.push(event);
    }
}

impl AudioOutput for ManualAudio {
    fn reopen_for(&mut self, song: &Song) -> Result<()> {
        let mut state = self.clock.state.lock();
        state.loaded = None;
        state.events.push(AudioEvent::Reopen(song.title.clone()));
        match &state.reopen_error {
            Some(message) => Err(ShowError::Audio(message.clone())),
            None => Ok(()),
        }
    }

    fn load(&mut self, song: &Song) -> Result<()> {
        let mut state = self.clock.state.lock();
        state.loaded = Some(song.title.clone());
        state.position = Duration::ZERO;
        state.finished = false;
        state.events.push(AudioEvent::Load(song.title.clone()));
        Ok(())
    }

    fn play(&mut self) {
        self.record(AudioEvent::Play);
    }

    fn pause(&mut self) {
        self.record(AudioEvent::Pause);
    }

    fn resume(&mut self) {
        self.record(AudioEvent::Resume);
    }

    fn stop(&mut self) {
        let mut state = self.clock.state.lock();
        state.loaded = None;
        state.position = Duration::ZERO;
        state.events.push(AudioEvent::Stop);
    }

    fn position(&self) -> Duration {
        self.clock.state.lock().position
    }

    fn is_busy(&self) -> bool {
        let state = self.clock.state.lock();
        state.loaded.is_some() && !state.finished
    }

    fn volume(&self) -> u8 {
        self.clock.state.lock().volume
    }

    fn set_volume(&mut self, volume: u8) {
        let volume = volume.min(VOLUME_MAX);
        let mut state = self.clock.state.lock();
        state.volume = volume;
        state.events.push(AudioEvent::Volume(volume));
    }
}
