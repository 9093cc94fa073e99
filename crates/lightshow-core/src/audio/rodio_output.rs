//! Audio output through rodio.
//!
//! rodio's `OutputStream` cannot leave the thread that created it, so a
//! small keeper thread owns it for as long as the output is open and hands
//! back the `Send` stream handle. Reopening for a new song shuts the keeper
//! down and starts a fresh one at the song's native sample rate.

use super::AudioOutput;
use crate::{Result, ShowError};
use lightshow_common::{Song, VOLUME_MAX};
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sample, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Source wrapper counting the samples handed to the device.
struct Tracked<S> {
    inner: S,
    played: Arc<AtomicU64>,
}

impl<S> Iterator for Tracked<S>
where
    S: Source,
    S::Item: Sample,
{
    type Item = S::Item;

    fn next(&mut self) -> Option<S::Item> {
        let sample = self.inner.next();
        if sample.is_some() {
            self.played.fetch_add(1, Ordering::Relaxed);
        }
        sample
    }
}

impl<S> Source for Tracked<S>
where
    S: Source,
    S::Item: Sample,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}

/// Thread owning an open output stream.
struct StreamKeeper {
    handle: OutputStreamHandle,
    shutdown: mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl StreamKeeper {
    fn open(sample_rate: u32, channels: u16) -> Result<Self> {
        let (handle_tx, handle_rx) = mpsc::channel();
        let (shutdown, shutdown_rx) = mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("lightshow-audio".into())
            .spawn(move || match open_stream(sample_rate, channels) {
                Ok((stream, handle)) => {
                    if handle_tx.send(Ok(handle)).is_ok() {
                        // Blocks until the keeper is dropped
                        let _ = shutdown_rx.recv();
                    }
                    drop(stream);
                }
                Err(e) => {
                    let _ = handle_tx.send(Err(e));
                }
            })?;

        let handle = handle_rx
            .recv()
            .map_err(|_| ShowError::Audio("audio thread exited before opening a stream".into()))?
            .map_err(ShowError::Audio)?;

        Ok(Self {
            handle,
            shutdown,
            thread: Some(thread),
        })
    }
}

impl Drop for StreamKeeper {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("audio stream thread panicked");
            }
        }
    }
}

/// Open the default device at `sample_rate`, falling back to its default
/// configuration when the rate is not accepted.
fn open_stream(
    sample_rate: u32,
    channels: u16,
) -> std::result::Result<(OutputStream, OutputStreamHandle), String> {
    let host = rodio::cpal::default_host();
    if let Some(device) = host.default_output_device() {
        match device.default_output_config() {
            Ok(default) => {
                let config = rodio::cpal::SupportedStreamConfig::new(
                    channels,
                    rodio::cpal::SampleRate(sample_rate),
                    default.buffer_size().clone(),
                    default.sample_format(),
                );
                match OutputStream::try_from_device_config(&device, config) {
                    Ok(stream) => return Ok(stream),
                    Err(e) => log::warn!(
                        "output device rejected {sample_rate} Hz x {channels}: {e}, using its default"
                    ),
                }
            }
            Err(e) => log::warn!("no default output config: {e}"),
        }
    }
    OutputStream::try_default().map_err(|e| format!("Failed to create audio stream: {e}"))
}

fn decode(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)?;
    Decoder::new(BufReader::new(file))
        .map_err(|e| ShowError::Audio(format!("cannot decode {}: {e}", path.display())))
}

/// Speaker output through rodio.
pub struct RodioOutput {
    keeper: Option<StreamKeeper>,
    sink: Option<Sink>,
    played: Arc<AtomicU64>,
    sample_rate: u32,
    channels: u16,
    volume: u8,
}

impl RodioOutput {
    /// Output with no stream open yet; the first song opens one.
    pub fn new() -> Self {
        Self {
            keeper: None,
            sink: None,
            played: Arc::new(AtomicU64::new(0)),
            sample_rate: 44_100,
            channels: 2,
            volume: 0,
        }
    }
}

impl Default for RodioOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for RodioOutput {
    fn reopen_for(&mut self, song: &Song) -> Result<()> {
        self.stop();
        let source = decode(&song.audio_path)?;
        let (rate, channels) = (source.sample_rate(), source.channels());

        self.keeper = None;
        self.keeper = Some(StreamKeeper::open(rate, channels)?);
        log::debug!("audio output reopened at {rate} Hz, {channels} channels");
        Ok(())
    }

    fn load(&mut self, song: &Song) -> Result<()> {
        let keeper = self
            .keeper
            .as_ref()
            .ok_or_else(|| ShowError::Audio("audio output not open".into()))?;
        let source = decode(&song.audio_path)?;
        self.sample_rate = source.sample_rate();
        self.channels = source.channels();
        self.played.store(0, Ordering::Relaxed);

        let sink = Sink::try_new(&keeper.handle)
            .map_err(|e| ShowError::Audio(format!("Failed to create audio sink: {e}")))?;
        sink.pause();
        sink.set_volume(self.volume as f32 / VOLUME_MAX as f32);
        sink.append(Tracked {
            inner: source,
            played: Arc::clone(&self.played),
        });
        self.sink = Some(sink);
        Ok(())
    }

    fn play(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn resume(&mut self) {
        self.play();
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.played.store(0, Ordering::Relaxed);
    }

    fn position(&self) -> Duration {
        let per_second = self.sample_rate as u64 * self.channels.max(1) as u64;
        if per_second == 0 {
            return Duration::ZERO;
        }
        let samples = self.played.load(Ordering::Relaxed);
        Duration::from_millis(samples * 1000 / per_second)
    }

    fn is_busy(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| !sink.empty())
    }

    fn volume(&self) -> u8 {
        self.volume
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(VOLUME_MAX);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume as f32 / VOLUME_MAX as f32);
        }
    }
}
