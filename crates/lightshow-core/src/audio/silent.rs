//! Silent wall-clock audio output.

use super::AudioOutput;
use crate::Result;
use lightshow_common::{Song, VOLUME_MAX};
use std::time::{Duration, Instant};

/// Plays nothing, but keeps time as if the song were playing.
///
/// The song ends after its catalog `length_ms`.
#[derive(Debug, Default)]
pub struct SilentAudio {
    length: Option<Duration>,
    elapsed: Duration,
    started: Option<Instant>,
    volume: u8,
}

impl SilentAudio {
    /// Idle output.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioOutput for SilentAudio {
    fn reopen_for(&mut self, _song: &Song) -> Result<()> {
        self.stop();
        Ok(())
    }

    fn load(&mut self, song: &Song) -> Result<()> {
        self.length = Some(Duration::from_millis(song.length_ms));
        self.elapsed = Duration::ZERO;
        self.started = None;
        Ok(())
    }

    fn play(&mut self) {
        if self.length.is_some() && self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        if let Some(started) = self.started.take() {
            self.elapsed += started.elapsed();
        }
    }

    fn resume(&mut self) {
        self.play();
    }

    fn stop(&mut self) {
        self.length = None;
        self.elapsed = Duration::ZERO;
        self.started = None;
    }

    fn position(&self) -> Duration {
        let running = self.started.map(|s| s.elapsed()).unwrap_or_default();
        let position = self.elapsed + running;
        match self.length {
            Some(length) => position.min(length),
            None => Duration::ZERO,
        }
    }

    fn is_busy(&self) -> bool {
        match self.length {
            Some(length) => {
                self.elapsed + self.started.map(|s| s.elapsed()).unwrap_or_default() < length
            }
            None => false,
        }
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(VOLUME_MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn song(length_ms: u64) -> Song {
        Song {
            title: "t".into(),
            artist: "a".into(),
            album_art: String::new(),
            length_ms,
            audio_path: PathBuf::from("t.mp3"),
            sequence_path: PathBuf::from("t.fseq"),
        }
    }

    #[test]
    fn paused_clock_holds_still() {
        let mut audio = SilentAudio::new();
        audio.load(&song(60_000)).unwrap();
        assert!(audio.is_busy());
        assert_eq!(audio.position(), Duration::ZERO);

        audio.play();
        std::thread::sleep(Duration::from_millis(20));
        audio.pause();
        let frozen = audio.position();
        assert!(frozen >= Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(audio.position(), frozen);
    }

    #[test]
    fn ends_after_song_length() {
        let mut audio = SilentAudio::new();
        audio.load(&song(5)).unwrap();
        audio.play();
        std::thread::sleep(Duration::from_millis(15));
        assert!(!audio.is_busy());
        assert_eq!(audio.position(), Duration::from_millis(5));

        audio.stop();
        assert!(!audio.is_busy());
    }

    #[test]
    fn volume_is_clamped() {
        let mut audio = SilentAudio::new();
        audio.set_volume(250);
        assert_eq!(audio.volume(), 100);
    }
}
