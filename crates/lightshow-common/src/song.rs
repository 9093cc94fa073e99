//! Song catalog entries.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A playable song: audio file, its lighting sequence, and display metadata.
///
/// Songs are built by the catalog and are read-only to playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Display title, also the catalog key.
    pub title: String,
    /// Artist name.
    #[serde(default = "unknown_artist")]
    pub artist: String,
    /// Cover art (base64 or a path, passed through to clients untouched).
    #[serde(default)]
    pub album_art: String,
    /// Song length in milliseconds.
    #[serde(default)]
    pub length_ms: u64,
    /// Audio file path.
    pub audio_path: PathBuf,
    /// Lighting sequence (`.fseq`) path.
    pub sequence_path: PathBuf,
}

fn unknown_artist() -> String {
    "Unknown Artist".to_string()
}

impl Song {
    /// File name of the remote show generated for this song.
    pub fn show_file_name(&self) -> String {
        format!("{}.show", self.title)
    }

    /// Display descriptor for status reports.
    pub fn info(&self) -> crate::SongInfo {
        crate::SongInfo {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album_art: self.album_art.clone(),
            length_ms: self.length_ms,
        }
    }
}
