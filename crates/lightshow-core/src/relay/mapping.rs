//! Ordered light name -> channel mapping.

use super::RelayResult;
use crate::RelayError;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Ordered mapping from light name to physical channel.
///
/// Stored on disk as a JSON object whose key order is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayMapping {
    entries: Vec<(String, usize)>,
}

impl RelayMapping {
    /// Build from ordered entries. Names must be unique.
    pub fn from_entries(entries: Vec<(String, usize)>) -> RelayResult<Self> {
        for (i, (name, _)) in entries.iter().enumerate() {
            if entries[..i].iter().any(|(other, _)| other == name) {
                return Err(RelayError::Mapping(format!("duplicate light name {name:?}")));
            }
        }
        Ok(Self { entries })
    }

    /// Map the `k`-th name to channel `k`.
    pub fn identity<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            entries: names
                .into_iter()
                .enumerate()
                .map(|(channel, name)| (name.into(), channel))
                .collect(),
        }
    }

    /// Read a mapping file.
    pub fn load(path: impl AsRef<Path>) -> RelayResult<Self> {
        let text = fs::read_to_string(path)?;
        let object: Map<String, Value> = serde_json::from_str(&text)?;
        let entries = object
            .into_iter()
            .map(|(name, value)| {
                let channel = value.as_u64().ok_or_else(|| {
                    RelayError::Mapping(format!("channel for {name:?} is not an index: {value}"))
                })?;
                Ok((name, channel as usize))
            })
            .collect::<RelayResult<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Write the mapping file, replacing it atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> RelayResult<()> {
        let path = path.as_ref();
        let object: Map<String, Value> = self
            .entries
            .iter()
            .map(|(name, channel)| (name.clone(), Value::from(*channel)))
            .collect();
        let text = serde_json::to_string_pretty(&Value::Object(object))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Number of lights.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no lights are mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Channel assigned to `name`.
    pub fn channel_of(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, channel)| channel)
    }

    /// True when `name` is a known light.
    pub fn contains(&self, name: &str) -> bool {
        self.channel_of(name).is_some()
    }

    /// Light names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Channels in order; position `k` is driven by relay byte `k`.
    pub fn ordered_channels(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|&(_, channel)| channel)
    }

    /// `(name, channel)` pairs in order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.entries.iter().map(|(name, channel)| (name.as_str(), *channel))
    }

    /// Fail when any channel lies outside a bank of `channel_count`.
    pub(crate) fn check_channels(&self, channel_count: usize) -> RelayResult<()> {
        match self.entries.iter().find(|&&(_, ch)| ch >= channel_count) {
            Some((name, channel)) => Err(RelayError::Mapping(format!(
                "{name:?} mapped to channel {channel}, bank has {channel_count}"
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_keeps_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        fs::write(&path, r#"{"tree": 3, "porch": 0, "arch": 1}"#).unwrap();

        let mapping = RelayMapping::load(&path).unwrap();
        assert_eq!(mapping.names().collect::<Vec<_>>(), ["tree", "porch", "arch"]);
        assert_eq!(mapping.ordered_channels().collect::<Vec<_>>(), [3, 0, 1]);
        assert_eq!(mapping.channel_of("arch"), Some(1));
        assert_eq!(mapping.channel_of("roof"), None);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        let mapping = RelayMapping::from_entries(vec![("z".into(), 1), ("a".into(), 0)]).unwrap();
        mapping.save(&path).unwrap();
        assert_eq!(RelayMapping::load(&path).unwrap(), mapping);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn rejects_non_index_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        fs::write(&path, r#"{"tree": "three"}"#).unwrap();
        assert!(matches!(RelayMapping::load(&path), Err(RelayError::Mapping(_))));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = RelayMapping::from_entries(vec![("a".into(), 0), ("a".into(), 1)]).unwrap_err();
        assert!(matches!(err, RelayError::Mapping(_)));
    }
}
