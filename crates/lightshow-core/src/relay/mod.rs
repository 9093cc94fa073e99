//! Relay outputs and the light name mapping.
//!
//! A [`RelayBank`] is an addressable set of boolean outputs. The
//! [`RelayMapping`] names them: its iteration order is the order of the relay
//! bytes at the start of every sequence frame, so byte `k` drives the channel
//! of the `k`-th mapping entry.
//!
//! Backends:
//! - [`MemoryRelayBank`] - plain in-process state
//! - [`SysfsRelayBank`] - Linux sysfs GPIO lines
//! - [`FileSyncRelayBank`] - JSON state file for off-device visualizers

mod file_sync;
mod mapping;
mod memory;
mod sysfs;

pub use file_sync::FileSyncRelayBank;
pub use mapping::RelayMapping;
pub use memory::MemoryRelayBank;
pub use sysfs::SysfsRelayBank;

use crate::RelayError;
use crate::config::RelayBackendConfig;
use lightshow_common::LightStatus;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::path::PathBuf;
use std::sync::Arc;

/// Result type for relay operations
pub type RelayResult<T> = std::result::Result<T, RelayError>;

/// Addressable set of boolean outputs.
pub trait RelayBank: Send {
    /// Number of channels.
    fn channel_count(&self) -> usize;

    /// Current state of `channel`.
    fn get(&self, channel: usize) -> RelayResult<bool>;

    /// Switch `channel` on or off.
    fn set(&mut self, channel: usize, on: bool) -> RelayResult<()>;

    /// GPIO pin behind `channel`, if the backend has one.
    fn pin(&self, _channel: usize) -> Option<u32> {
        None
    }

    /// Apply several writes at once.
    ///
    /// Backends with expensive writes override this to batch them.
    fn set_many(&mut self, writes: &[(usize, bool)]) -> RelayResult<()> {
        for &(channel, on) in writes {
            self.set(channel, on)?;
        }
        Ok(())
    }

    /// Flip `channel`, returning its new state.
    fn toggle(&mut self, channel: usize) -> RelayResult<bool> {
        let on = !self.get(channel)?;
        self.set(channel, on)?;
        Ok(on)
    }

    /// Switch every channel on.
    fn all_on(&mut self) -> RelayResult<()> {
        let writes: Vec<_> = (0..self.channel_count()).map(|ch| (ch, true)).collect();
        self.set_many(&writes)
    }

    /// Switch every channel off.
    fn all_off(&mut self) -> RelayResult<()> {
        let writes: Vec<_> = (0..self.channel_count()).map(|ch| (ch, false)).collect();
        self.set_many(&writes)
    }

    /// State of every channel in order.
    fn states(&self) -> RelayResult<Vec<bool>> {
        (0..self.channel_count()).map(|ch| self.get(ch)).collect()
    }
}

/// Build the relay bank selected in the configuration.
pub fn open_bank(config: &RelayBackendConfig) -> RelayResult<Box<dyn RelayBank>> {
    Ok(match config {
        RelayBackendConfig::Memory { channels } => Box::new(MemoryRelayBank::new(*channels)),
        RelayBackendConfig::Sysfs { pins, active_low } => {
            Box::new(SysfsRelayBank::new(pins.clone(), *active_low)?)
        }
        RelayBackendConfig::FileSync { path, pins } => {
            Box::new(FileSyncRelayBank::create(path, pins.clone())?)
        }
    })
}

/// Relay bank and mapping shared by the engine, the remap session and the
/// light controllers.
///
/// Cloning is cheap; all clones refer to the same hardware.
#[derive(Clone)]
pub struct SharedRelays {
    bank: Arc<Mutex<Box<dyn RelayBank>>>,
    mapping: Arc<RwLock<RelayMapping>>,
    mapping_path: Option<PathBuf>,
}

impl SharedRelays {
    /// Wrap a bank and its mapping. Mapping commits are persisted to
    /// `mapping_path` when one is given.
    pub fn new(
        bank: Box<dyn RelayBank>,
        mapping: RelayMapping,
        mapping_path: Option<PathBuf>,
    ) -> RelayResult<Self> {
        mapping.check_channels(bank.channel_count())?;
        Ok(Self {
            bank: Arc::new(Mutex::new(bank)),
            mapping: Arc::new(RwLock::new(mapping)),
            mapping_path,
        })
    }

    /// In-memory bank of `names.len()` channels mapped in order.
    pub fn in_memory<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        let mapping = RelayMapping::identity(names);
        let bank = MemoryRelayBank::new(mapping.len());
        Self {
            bank: Arc::new(Mutex::new(Box::new(bank))),
            mapping: Arc::new(RwLock::new(mapping)),
            mapping_path: None,
        }
    }

    /// Exclusive access to the bank.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn RelayBank>> {
        self.bank.lock()
    }

    /// Number of physical channels.
    pub fn channel_count(&self) -> usize {
        self.bank.lock().channel_count()
    }

    /// Copy of the active mapping.
    pub fn mapping(&self) -> RelayMapping {
        self.mapping.read().clone()
    }

    /// Channel assigned to `name`.
    pub fn channel_of(&self, name: &str) -> Option<usize> {
        self.mapping.read().channel_of(name)
    }

    /// Persisted mapping location.
    pub fn mapping_path(&self) -> Option<&PathBuf> {
        self.mapping_path.as_ref()
    }

    /// Persist `mapping` and make it active.
    ///
    /// With a backing file the mapping is written, then reloaded from disk so
    /// the active mapping is exactly what was persisted.
    pub fn commit_mapping(&self, mapping: RelayMapping) -> RelayResult<()> {
        mapping.check_channels(self.channel_count())?;
        let active = match &self.mapping_path {
            Some(path) => {
                mapping.save(path)?;
                RelayMapping::load(path)?
            }
            None => mapping,
        };
        log::info!("relay mapping updated ({} lights)", active.len());
        *self.mapping.write() = active;
        Ok(())
    }

    /// Write one frame's relay bytes: byte `k` drives the `k`-th mapped
    /// channel, nonzero meaning on. Extra bytes or extra entries are ignored.
    pub fn apply_frame(&self, relay_bytes: &[u8]) -> RelayResult<()> {
        let writes: Vec<(usize, bool)> = {
            let mapping = self.mapping.read();
            mapping
                .ordered_channels()
                .zip(relay_bytes)
                .map(|(channel, &byte)| (channel, byte != 0))
                .collect()
        };
        self.bank.lock().set_many(&writes)
    }

    /// Switch every channel off.
    pub fn all_off(&self) -> RelayResult<()> {
        self.bank.lock().all_off()
    }

    /// Switch every channel on.
    pub fn all_on(&self) -> RelayResult<()> {
        self.bank.lock().all_on()
    }

    /// Per-light state in mapping order.
    pub fn snapshot(&self) -> RelayResult<Vec<LightStatus>> {
        let mapping = self.mapping.read();
        let bank = self.bank.lock();
        mapping
            .entries()
            .map(|(name, channel)| {
                Ok(LightStatus {
                    name: name.to_string(),
                    channel,
                    pin: bank.pin(channel),
                    value: bank.get(channel)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_bytes_follow_mapping_order() {
        let bank = MemoryRelayBank::new(3);
        let mapping = RelayMapping::from_entries(vec![
            ("tree".to_string(), 2),
            ("porch".to_string(), 0),
            ("garage".to_string(), 1),
        ])
        .unwrap();
        let relays = SharedRelays::new(Box::new(bank), mapping, None).unwrap();

        relays.apply_frame(&[1, 0, 255]).unwrap();
        assert_eq!(relays.lock().states().unwrap(), vec![false, true, true]);
    }

    #[test]
    fn short_frame_leaves_other_channels() {
        let relays = SharedRelays::in_memory(["a", "b", "c"]);
        relays.all_on().unwrap();
        relays.apply_frame(&[0]).unwrap();
        assert_eq!(relays.lock().states().unwrap(), vec![false, true, true]);
    }

    #[test]
    fn rejects_mapping_past_bank() {
        let mapping = RelayMapping::from_entries(vec![("a".to_string(), 4)]).unwrap();
        let err = SharedRelays::new(Box::new(MemoryRelayBank::new(2)), mapping, None)
            .err()
            .unwrap();
        assert!(matches!(err, RelayError::Mapping(_)));
    }

    #[test]
    fn commit_reloads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        let relays = SharedRelays::new(
            Box::new(MemoryRelayBank::new(2)),
            RelayMapping::identity(["a", "b"]),
            Some(path.clone()),
        )
        .unwrap();

        let swapped =
            RelayMapping::from_entries(vec![("a".to_string(), 1), ("b".to_string(), 0)]).unwrap();
        relays.commit_mapping(swapped.clone()).unwrap();
        assert_eq!(relays.mapping(), swapped);
        assert_eq!(RelayMapping::load(&path).unwrap(), swapped);
    }

    #[test]
    fn snapshot_reports_names_and_values() {
        let relays = SharedRelays::in_memory(["porch", "tree"]);
        relays.lock().set(1, true).unwrap();
        let lights = relays.snapshot().unwrap();
        assert_eq!(lights[1].name, "tree");
        assert!(lights[1].value);
        assert!(!lights[0].value);
    }
}
