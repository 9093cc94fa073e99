//! Relay bank mirrored to a JSON state file.
//!
//! Stands in for the GPIO board when running off-device: every change
//! rewrites `{"<pin>": {"value": <bool>}, ...}` so a visualizer can follow
//! along by watching the file.

use super::{RelayBank, RelayResult};
use crate::RelayError;
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};

/// Relays whose state is mirrored to a JSON file.
#[derive(Debug)]
pub struct FileSyncRelayBank {
    path: PathBuf,
    pins: Vec<u32>,
    states: Vec<bool>,
}

impl FileSyncRelayBank {
    /// Create the bank with all relays off and write the initial state file.
    pub fn create(path: impl AsRef<Path>, pins: Vec<u32>) -> RelayResult<Self> {
        let bank = Self {
            path: path.as_ref().to_path_buf(),
            states: vec![false; pins.len()],
            pins,
        };
        bank.sync()?;
        Ok(bank)
    }

    /// State file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sync(&self) -> RelayResult<()> {
        let object: Map<String, Value> = self
            .pins
            .iter()
            .zip(&self.states)
            .map(|(pin, &on)| (pin.to_string(), json!({ "value": on })))
            .collect();
        fs::write(&self.path, serde_json::to_string_pretty(&Value::Object(object))?)?;
        Ok(())
    }

    fn slot(&mut self, channel: usize) -> RelayResult<&mut bool> {
        self.states
            .get_mut(channel)
            .ok_or(RelayError::ChannelUnavailable { channel })
    }
}

impl RelayBank for FileSyncRelayBank {
    fn channel_count(&self) -> usize {
        self.pins.len()
    }

    fn get(&self, channel: usize) -> RelayResult<bool> {
        self.states
            .get(channel)
            .copied()
            .ok_or(RelayError::ChannelUnavailable { channel })
    }

    fn set(&mut self, channel: usize, on: bool) -> RelayResult<()> {
        let slot = self.slot(channel)?;
        if *slot != on {
            *slot = on;
            self.sync()?;
        }
        Ok(())
    }

    fn set_many(&mut self, writes: &[(usize, bool)]) -> RelayResult<()> {
        let mut changed = false;
        for &(channel, on) in writes {
            let slot = self.slot(channel)?;
            changed |= *slot != on;
            *slot = on;
        }
        if changed {
            self.sync()?;
        }
        Ok(())
    }

    fn pin(&self, channel: usize) -> Option<u32> {
        self.pins.get(channel).copied()
    }
}
