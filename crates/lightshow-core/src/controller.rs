//! Composition root.
//!
//! [`ShowController`] owns the relay bank, the remote link and the song
//! catalog, and hands shared handles to the playback engine and the light,
//! preset and remap controllers.
//!
//! The relay bank is a single resource: the sync loop, the remap workflow,
//! presets and direct light switching all write it. Each write is atomic, but
//! interleaving (say, toggling a light mid-song) is left to the caller to
//! avoid. [`ShowController::begin_remap`] stops playback before remapping.

use crate::audio::AudioOutput;
use crate::catalog::SongCatalog;
use crate::config::ShowConfig;
use crate::engine::PlaybackEngine;
use crate::lights::LightsController;
use crate::presets::PresetController;
use crate::relay::{RelayMapping, SharedRelays, open_bank};
use crate::remap::RemapSession;
use crate::remote::{CommandStager, RemoteLinkClient, ShowStager};
use crate::Result;
use lightshow_common::{LightsStatus, PresetsStatus, RemapStatus, RemoteStatus, SongsStatus};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Combined status of every controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowInfo {
    /// Song player.
    pub songs: SongsStatus,
    /// Named lights.
    pub lights: LightsStatus,
    /// Presets.
    pub presets: PresetsStatus,
    /// Remap workflow.
    pub remap: RemapStatus,
    /// Remote LED device.
    pub remote: RemoteStatus,
}

/// Outcome of regenerating the remote show files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecompileReport {
    /// Show files written.
    pub generated: Vec<PathBuf>,
    /// Songs whose show could not be generated, with the reason.
    pub failed: Vec<(String, String)>,
    /// Show files copied to the remote device.
    pub uploaded: usize,
}

/// Everything a request layer needs to run the show.
pub struct ShowController {
    /// Song playback.
    pub songs: PlaybackEngine,
    /// Direct light switching.
    pub lights: LightsController,
    /// Light presets.
    pub presets: PresetController,
    /// Channel remap workflow.
    pub remap: RemapSession,
    relays: SharedRelays,
    remote: Arc<RemoteLinkClient>,
    catalog: Arc<SongCatalog>,
    stager: Box<dyn ShowStager>,
    show_dir: PathBuf,
}

impl ShowController {
    /// Assemble every controller from `config`, playing audio through `audio`.
    pub fn from_config(config: &ShowConfig, audio: Box<dyn AudioOutput>) -> Result<Self> {
        config.validate()?;
        let bank = open_bank(&config.relays)?;
        let mapping = if config.mapping_path.exists() {
            RelayMapping::load(&config.mapping_path)?
        } else {
            log::warn!(
                "no relay mapping at {}, naming channels in order",
                config.mapping_path.display()
            );
            RelayMapping::identity((0..bank.channel_count()).map(|i| format!("relay{i}")))
        };
        let relays = SharedRelays::new(bank, mapping, Some(config.mapping_path.clone()))?;
        let catalog = Arc::new(SongCatalog::load_or_empty(&config.catalog_path)?);
        let remote = Arc::new(RemoteLinkClient::new(config.remote.clone()));

        let songs = PlaybackEngine::builder(Arc::clone(&catalog), relays.clone())
            .with_audio(audio)
            .with_remote(Arc::clone(&remote))
            .with_stager(CommandStager::from_config(&config.stager))
            .with_show_dir(&config.show_dir)
            .with_timing(config.timing)
            .build();
        songs.set_volume(config.initial_volume as i64);

        Ok(Self {
            songs,
            lights: LightsController::new(relays.clone()),
            presets: PresetController::open(relays.clone(), &config.presets_path)?,
            remap: RemapSession::new(relays.clone()),
            relays,
            remote,
            catalog,
            stager: CommandStager::from_config(&config.stager),
            show_dir: config.show_dir.clone(),
        })
    }

    /// Combined status. The remote section carries the last probe result,
    /// see [`ShowController::probe_remote`].
    pub fn info(&self) -> ShowInfo {
        ShowInfo {
            songs: self.songs.songs_status(),
            lights: self.lights.lights_status().unwrap_or_else(|e| {
                log::error!("reading relay states failed: {e}");
                LightsStatus::default()
            }),
            presets: self.presets.presets_status(),
            remap: self.remap.remap_status(),
            remote: self.remote.remote_status(),
        }
    }

    /// Stop playback, then start a remap.
    pub fn begin_remap(&self) -> Result<RemapStatus> {
        self.songs.stop()?;
        self.remap.start()
    }

    /// Probe the remote device's control port.
    pub fn probe_remote(&self) -> bool {
        self.remote.is_reachable()
    }

    /// Shared relay handle.
    pub fn relays(&self) -> &SharedRelays {
        &self.relays
    }

    /// Song catalog.
    pub fn catalog(&self) -> &SongCatalog {
        &self.catalog
    }

    /// Regenerate every song's show file and upload them.
    ///
    /// A song whose sequence cannot be read is reported and skipped.
    pub fn recompile_shows(&self) -> Result<RecompileReport> {
        std::fs::create_dir_all(&self.show_dir)?;
        let mut report = RecompileReport::default();

        for song in self.catalog.songs() {
            let show = self.show_dir.join(song.show_file_name());
            match lightshow_fseq::generate_show_file(&song.sequence_path, &show) {
                Ok(_) => report.generated.push(show),
                Err(e) => {
                    log::error!("cannot generate show for {:?}: {e}", song.title);
                    report.failed.push((song.title.clone(), e.to_string()));
                }
            }
        }

        if self.stager.is_active() {
            for show in &report.generated {
                match self.stager.upload(show) {
                    Ok(()) => report.uploaded += 1,
                    Err(e) => {
                        log::warn!("upload of {} failed: {e}", show.display());
                        self.remote.note_failure(&e);
                    }
                }
            }
        }
        Ok(report)
    }

    /// Stop playback, abandon any remap and switch everything off.
    pub fn shutdown(&self) -> Result<()> {
        self.songs.stop()?;
        self.remap.cancel()?;
        self.relays.all_off()?;
        log::info!("show controller shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentAudio;
    use crate::config::RemoteConfig;
    use lightshow_common::{NUM_BYTES_TOTAL, Song};
    use lightshow_fseq::SequenceWriter;
    use std::fs;

    fn config(dir: &std::path::Path) -> ShowConfig {
        ShowConfig {
            remote: RemoteConfig::disabled(),
            ..ShowConfig::default()
        }
        .resolve_paths(dir)
    }

    #[test]
    fn fresh_setup_names_channels() {
        let dir = tempfile::tempdir().unwrap();
        let controller =
            ShowController::from_config(&config(dir.path()), Box::new(SilentAudio::new()))
                .unwrap();

        let info = controller.info();
        assert_eq!(info.lights.lights.len(), 16);
        assert_eq!(info.lights.lights[3].name, "relay3");
        assert_eq!(info.songs.volume, 20);
        assert!(info.songs.songs.is_empty());
        assert!(!info.remap.in_progress());
        assert!(!info.remote.enabled);
    }

    #[test]
    fn info_reports_last_reachability() {
        let dir = tempfile::tempdir().unwrap();
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = ShowConfig {
            remote: RemoteConfig::local(port),
            ..config(dir.path())
        };
        let controller =
            ShowController::from_config(&config, Box::new(SilentAudio::new())).unwrap();

        assert_eq!(controller.info().remote.reachable, None);
        assert!(!controller.probe_remote());
        let remote = controller.info().remote;
        assert_eq!(remote.reachable, Some(false));
        assert!(remote.enabled);
    }

    #[test]
    fn recompile_writes_show_per_song() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let frames = vec![vec![7u8; NUM_BYTES_TOTAL]; 3];
        SequenceWriter::new(NUM_BYTES_TOTAL as u32, 25)
            .write_to_path(dir.path().join("carol.fseq"), &frames)
            .unwrap();
        let songs = vec![
            Song {
                title: "Carol".into(),
                artist: "Choir".into(),
                album_art: String::new(),
                length_ms: 75,
                audio_path: "carol.mp3".into(),
                sequence_path: "carol.fseq".into(),
            },
            Song {
                title: "Broken".into(),
                artist: "Nobody".into(),
                album_art: String::new(),
                length_ms: 0,
                audio_path: "broken.mp3".into(),
                sequence_path: "missing.fseq".into(),
            },
        ];
        fs::write(&config.catalog_path, serde_json::to_string(&songs).unwrap()).unwrap();

        let controller =
            ShowController::from_config(&config, Box::new(SilentAudio::new())).unwrap();
        let report = controller.recompile_shows().unwrap();

        assert_eq!(report.generated, vec![config.show_dir.join("Carol.show")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.uploaded, 0);
        let show = fs::read(config.show_dir.join("Carol.show")).unwrap();
        assert_eq!(&show[..4], &25u32.to_le_bytes());
        assert_eq!(show.len(), 4 + 3 * (554 + 563) * 4);
    }

    #[test]
    fn begin_remap_stops_playback() {
        let dir = tempfile::tempdir().unwrap();
        let controller =
            ShowController::from_config(&config(dir.path()), Box::new(SilentAudio::new()))
                .unwrap();
        let status = controller.begin_remap().unwrap();
        assert_eq!(status.current_channel, Some(0));
        controller.shutdown().unwrap();
        assert!(!controller.remap.in_progress());
    }
}
