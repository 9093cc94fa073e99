//! Song playback engine.
//!
//! Owns the play/pause/resume/stop state machine. While a song plays, a
//! background loop thread follows the audio clock and drives the relays from
//! the song's lighting sequence; the remote LED device is started just ahead
//! of local audio so both displays begin together.
//!
//! # Invariants
//! - At most one session exists. `play` always stops the previous session,
//!   joining its loop thread, before the audio output is reopened.
//! - Every stop, whether requested or triggered by the song ending, runs
//!   through one serialized routine. A stop aimed at a session that has
//!   already been replaced does nothing.
//! - After a stop every relay is off.
//! - Starting a song and requested stops are serialized by a separate start
//!   lock, so the remote warm-up never blocks status or pause calls. Those
//!   see the engine idle until the new session is installed.
//! - A `play` that fails after the remote player was launched sends it STOP.

mod sync;

use crate::audio::AudioOutput;
use crate::catalog::SongCatalog;
use crate::config::PlaybackTiming;
use crate::relay::SharedRelays;
use crate::remote::{NullStager, RemoteCommand, RemoteLinkClient, ShowStager};
use crate::{RemoteError, Result, ShowError};
use lightshow_common::{PlaybackState, Song, SongsStatus, Status, StatusReport, VOLUME_MAX};
use lightshow_fseq::SequenceDecoder;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// One playing (or paused) song and its loop thread.
struct Session {
    id: u64,
    song: Song,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

/// State shared between the engine handle, the loop thread and stop threads.
pub(crate) struct EngineShared {
    catalog: Arc<SongCatalog>,
    audio: Mutex<Box<dyn AudioOutput>>,
    relays: SharedRelays,
    remote: Arc<RemoteLinkClient>,
    stager: Box<dyn ShowStager>,
    show_dir: PathBuf,
    timing: PlaybackTiming,
    /// Held for the whole of `play` and for requested stops.
    starting: Mutex<()>,
    session: Mutex<Option<Session>>,
    paused: AtomicBool,
    next_session: AtomicU64,
    active_loops: AtomicUsize,
    fault: Mutex<Option<String>>,
}

impl EngineShared {
    /// Stop the current session, or only session `only` when given.
    fn stop_session(&self, only: Option<u64>) -> Result<()> {
        let mut slot = self.session.lock();
        let wanted = match (slot.as_ref(), only) {
            (Some(session), Some(id)) => session.id == id,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !wanted {
            return Ok(());
        }
        match slot.take() {
            Some(session) => self.shutdown(session),
            None => Ok(()),
        }
    }

    /// Tear a session down. Called with the session slot locked.
    fn shutdown(&self, mut session: Session) -> Result<()> {
        log::info!("stopping {:?}", session.song.title);
        self.paused.store(true, Ordering::Release);
        self.audio.lock().stop();
        self.remote.signal(RemoteCommand::Stop);

        session.cancel.store(true, Ordering::Release);
        if let Some(thread) = session.thread.take() {
            if thread.join().is_err() {
                log::error!("sync loop for {:?} panicked", session.song.title);
            }
        }

        self.relays.all_off()?;
        Ok(())
    }
}

/// Builder for [`PlaybackEngine`].
pub struct EngineBuilder {
    catalog: Arc<SongCatalog>,
    relays: SharedRelays,
    audio: Box<dyn AudioOutput>,
    remote: Arc<RemoteLinkClient>,
    stager: Box<dyn ShowStager>,
    show_dir: PathBuf,
    timing: PlaybackTiming,
}

impl EngineBuilder {
    /// Audio output (default: [`crate::audio::SilentAudio`]).
    pub fn with_audio(mut self, audio: Box<dyn AudioOutput>) -> Self {
        self.audio = audio;
        self
    }

    /// Remote device link (default: disabled).
    pub fn with_remote(mut self, remote: Arc<RemoteLinkClient>) -> Self {
        self.remote = remote;
        self
    }

    /// Show stager (default: [`NullStager`]).
    pub fn with_stager(mut self, stager: Box<dyn ShowStager>) -> Self {
        self.stager = stager;
        self
    }

    /// Directory holding generated show files.
    pub fn with_show_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.show_dir = dir.into();
        self
    }

    /// Synchronization timing.
    pub fn with_timing(mut self, timing: PlaybackTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Build the engine.
    pub fn build(self) -> PlaybackEngine {
        PlaybackEngine {
            shared: Arc::new(EngineShared {
                catalog: self.catalog,
                audio: Mutex::new(self.audio),
                relays: self.relays,
                remote: self.remote,
                stager: self.stager,
                show_dir: self.show_dir,
                timing: self.timing,
                starting: Mutex::new(()),
                session: Mutex::new(None),
                paused: AtomicBool::new(false),
                next_session: AtomicU64::new(1),
                active_loops: AtomicUsize::new(0),
                fault: Mutex::new(None),
            }),
        }
    }
}

/// Plays songs with synchronized relay and remote LED output.
pub struct PlaybackEngine {
    shared: Arc<EngineShared>,
}

impl PlaybackEngine {
    /// Start building an engine over `catalog` driving `relays`.
    pub fn builder(catalog: Arc<SongCatalog>, relays: SharedRelays) -> EngineBuilder {
        EngineBuilder {
            catalog,
            relays,
            audio: Box::new(crate::audio::SilentAudio::new()),
            remote: Arc::new(RemoteLinkClient::disabled()),
            stager: Box::new(NullStager),
            show_dir: PathBuf::from("shows"),
            timing: PlaybackTiming::default(),
        }
    }

    /// Play the catalog song titled `title`, replacing any current song.
    ///
    /// Sequence errors abort the call. Remote device failures are logged and
    /// counted but never prevent local playback.
    pub fn play(&self, title: &str) -> Result<SongsStatus> {
        let shared = &self.shared;
        let song = shared
            .catalog
            .get(title)
            .cloned()
            .ok_or_else(|| ShowError::UnknownSong(title.to_string()))?;

        let _starting = shared.starting.lock();
        shared.stop_session(None)?;
        *shared.fault.lock() = None;

        let decoder = SequenceDecoder::open(&song.sequence_path)?;
        let staged = self.stage_remote(&song);

        let started = self.start_audio(&song, staged).and_then(|()| {
            let mut slot = shared.session.lock();
            let session = self.spawn_session(song.clone(), decoder)?;
            log::info!("playing {:?} (session {})", song.title, session.id);
            *slot = Some(session);
            Ok(())
        });
        if let Err(e) = started {
            log::error!("starting {:?} failed: {e}", song.title);
            shared.paused.store(true, Ordering::Release);
            shared.audio.lock().stop();
            if staged {
                shared.remote.signal(RemoteCommand::Stop);
            }
            return Err(e);
        }

        Ok(self.songs_status())
    }

    /// Pause audio and the remote show. No-op when nothing is loaded.
    pub fn pause(&self) -> SongsStatus {
        let slot = self.shared.session.lock();
        if slot.is_some() {
            self.shared.paused.store(true, Ordering::Release);
            self.shared.audio.lock().pause();
            self.shared.remote.signal(RemoteCommand::Pause);
        }
        drop(slot);
        self.songs_status()
    }

    /// Continue a paused song. No-op when nothing is loaded.
    pub fn resume(&self) -> SongsStatus {
        let slot = self.shared.session.lock();
        if slot.is_some() {
            self.shared.audio.lock().resume();
            self.shared.paused.store(false, Ordering::Release);
            self.shared.remote.signal(RemoteCommand::Resume);
        }
        drop(slot);
        self.songs_status()
    }

    /// Stop the current song, join its loop and switch every relay off.
    pub fn stop(&self) -> Result<SongsStatus> {
        let _starting = self.shared.starting.lock();
        self.shared.stop_session(None)?;
        Ok(self.songs_status())
    }

    /// Current volume, 0-100.
    pub fn volume(&self) -> u8 {
        self.shared.audio.lock().volume()
    }

    /// Set the volume. Values outside 0-100 are ignored with a warning.
    pub fn set_volume(&self, volume: i64) -> SongsStatus {
        match u8::try_from(volume) {
            Ok(v) if v <= VOLUME_MAX => self.shared.audio.lock().set_volume(v),
            _ => log::warn!("ignoring volume {volume}, expected 0-{VOLUME_MAX}"),
        }
        self.songs_status()
    }

    /// Title of the current song.
    pub fn current_song(&self) -> Option<Song> {
        self.shared.session.lock().as_ref().map(|s| s.song.clone())
    }

    /// Current playback state.
    pub fn state(&self) -> PlaybackState {
        if self.shared.session.lock().is_none() {
            PlaybackState::Idle
        } else if self.shared.paused.load(Ordering::Acquire) {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        }
    }

    /// Number of synchronization loop threads alive.
    pub fn active_loops(&self) -> usize {
        self.shared.active_loops.load(Ordering::SeqCst)
    }

    /// Last loop failure of the current or most recent session.
    pub fn fault(&self) -> Option<String> {
        self.shared.fault.lock().clone()
    }

    /// Block until no song is loaded, or `timeout` passes. Returns whether
    /// the engine went idle.
    pub fn wait_until_idle(&self, timeout: Option<Duration>) -> bool {
        let start = Instant::now();
        loop {
            if self.shared.session.lock().is_none() {
                return true;
            }
            if timeout.is_some_and(|t| start.elapsed() >= t) {
                return false;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    /// Status of the song player.
    pub fn songs_status(&self) -> SongsStatus {
        let shared = &self.shared;
        let playing = shared.session.lock().as_ref().map(|s| s.song.info());
        let (elapsed, volume) = {
            let audio = shared.audio.lock();
            (audio.position(), audio.volume())
        };
        let state = self.state();
        SongsStatus {
            songs: shared.catalog.infos(),
            elapsed_ms: if playing.is_some() { elapsed.as_millis() as u64 } else { 0 },
            playing,
            state,
            paused: state != PlaybackState::Playing,
            volume,
            fault: self.fault(),
            remote: shared.remote.remote_status(),
        }
    }

    /// Reopen and load the audio output, then start the remote show and
    /// local audio in order.
    fn start_audio(&self, song: &Song, staged: bool) -> Result<()> {
        let shared = &self.shared;
        {
            let mut audio = shared.audio.lock();
            let volume = audio.volume();
            audio.reopen_for(song)?;
            audio.set_volume(volume);
            audio.load(song)?;
        }

        if staged {
            std::thread::sleep(shared.timing.warmup());
        }
        shared.remote.signal(RemoteCommand::Play);
        std::thread::sleep(shared.timing.settle());

        shared.paused.store(false, Ordering::Release);
        shared.audio.lock().play();
        Ok(())
    }

    /// Spawn the loop thread for a new session.
    fn spawn_session(&self, song: Song, decoder: SequenceDecoder) -> Result<Session> {
        let id = self.shared.next_session.fetch_add(1, Ordering::Relaxed);
        let cancel = Arc::new(AtomicBool::new(false));
        let thread = {
            let shared = Arc::clone(&self.shared);
            let cancel = Arc::clone(&cancel);
            std::thread::Builder::new()
                .name("lightshow-sync".into())
                .spawn(move || sync::run_sync_loop(shared, id, decoder, cancel))?
        };
        Ok(Session {
            id,
            song,
            cancel,
            thread: Some(thread),
        })
    }

    /// Generate (when missing) and stage the song's show on the remote
    /// device. Returns whether the remote player was launched.
    fn stage_remote(&self, song: &Song) -> bool {
        let shared = &self.shared;
        if !shared.stager.is_active() || !shared.remote.is_enabled() {
            return false;
        }
        let show = shared.show_dir.join(song.show_file_name());
        let result = ensure_show(&song.sequence_path, &show)
            .and_then(|()| shared.stager.stage(&show));
        match result {
            Ok(()) => true,
            Err(e) => {
                log::warn!("remote show for {:?} not started: {e}", song.title);
                shared.remote.note_failure(&e);
                false
            }
        }
    }
}

/// Write `show` from `sequence` unless it already exists.
fn ensure_show(sequence: &Path, show: &Path) -> std::result::Result<(), RemoteError> {
    if show.exists() {
        return Ok(());
    }
    if let Some(dir) = show.parent() {
        std::fs::create_dir_all(dir)?;
    }
    log::info!("generating {}", show.display());
    lightshow_fseq::generate_show_file(sequence, show)
        .map(drop)
        .map_err(|e| RemoteError::Stage(format!("cannot generate {}: {e}", show.display())))
}

impl StatusReport for PlaybackEngine {
    fn status(&self) -> Status {
        Status::Songs(self.songs_status())
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        let _starting = self.shared.starting.lock();
        if let Err(e) = self.shared.stop_session(None) {
            log::error!("stopping playback on shutdown failed: {e}");
        }
    }
}
