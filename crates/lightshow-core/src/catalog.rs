//! In-memory song catalog.
//!
//! The catalog is read from a JSON manifest listing [`Song`] entries. Audio
//! and sequence paths in the manifest are relative to the manifest's
//! directory unless absolute.

use crate::Result;
use lightshow_common::{Song, SongInfo};
use std::fs;
use std::path::Path;

/// Ordered collection of playable songs, keyed by title.
#[derive(Debug, Clone, Default)]
pub struct SongCatalog {
    songs: Vec<Song>,
}

impl SongCatalog {
    /// Catalog over `songs`. Later duplicates of a title are dropped.
    pub fn from_songs(songs: impl IntoIterator<Item = Song>) -> Self {
        let mut catalog = Self::default();
        for song in songs {
            if catalog.get(&song.title).is_some() {
                log::warn!("duplicate song title {:?} ignored", song.title);
                continue;
            }
            catalog.songs.push(song);
        }
        catalog
    }

    /// Read a manifest.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let mut songs: Vec<Song> = serde_json::from_str(&text)?;
        if let Some(base) = path.parent() {
            for song in &mut songs {
                if song.audio_path.is_relative() {
                    song.audio_path = base.join(&song.audio_path);
                }
                if song.sequence_path.is_relative() {
                    song.sequence_path = base.join(&song.sequence_path);
                }
            }
        }
        let catalog = Self::from_songs(songs);
        log::info!("loaded {} songs from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Read `path` if it exists, otherwise an empty catalog.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("song catalog {} not found", path.display());
            Ok(Self::default())
        }
    }

    /// Song titled `title`.
    pub fn get(&self, title: &str) -> Option<&Song> {
        self.songs.iter().find(|s| s.title == title)
    }

    /// All songs in manifest order.
    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    /// Display descriptors of all songs.
    pub fn infos(&self) -> Vec<SongInfo> {
        self.songs.iter().map(Song::info).collect()
    }

    /// Number of songs.
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    /// True for an empty catalog.
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_paths_resolve_against_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("songs.json");
        fs::write(
            &path,
            r#"[
                {"title": "Carol", "length_ms": 1000, "audio_path": "music/carol.mp3", "sequence_path": "/abs/carol.fseq"},
                {"title": "Carol", "audio_path": "dup.mp3", "sequence_path": "dup.fseq"},
                {"title": "Bells", "artist": "Someone", "audio_path": "bells.mp3", "sequence_path": "bells.fseq"}
            ]"#,
        )
        .unwrap();

        let catalog = SongCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        let carol = catalog.get("Carol").unwrap();
        assert_eq!(carol.audio_path, dir.path().join("music/carol.mp3"));
        assert_eq!(carol.sequence_path, Path::new("/abs/carol.fseq"));
        assert_eq!(catalog.infos()[1].artist, "Someone");
        assert!(catalog.get("Jingle").is_none());
    }

    #[test]
    fn missing_manifest_is_empty() {
        let catalog = SongCatalog::load_or_empty("/nonexistent/songs.json").unwrap();
        assert!(catalog.is_empty());
    }
}
