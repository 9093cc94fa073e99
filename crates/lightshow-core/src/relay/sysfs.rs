//! Linux sysfs GPIO relay bank.
//!
//! Each channel is one GPIO line driven through
//! `/sys/class/gpio/gpioN/value`. Lines are exported and set to output on
//! open. Writes go straight to the value file; reads come from the cached
//! state so a status query never touches the hardware.

use super::{RelayBank, RelayResult};
use crate::RelayError;
use std::fs;
use std::path::{Path, PathBuf};

/// Default sysfs GPIO root.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Relays on sysfs GPIO lines.
#[derive(Debug)]
pub struct SysfsRelayBank {
    root: PathBuf,
    pins: Vec<u32>,
    active_low: bool,
    states: Vec<bool>,
}

impl SysfsRelayBank {
    /// Open `pins` under the system GPIO root, all relays off.
    pub fn new(pins: Vec<u32>, active_low: bool) -> RelayResult<Self> {
        Self::with_root(SYSFS_GPIO_ROOT, pins, active_low)
    }

    /// Open `pins` under another GPIO root.
    pub fn with_root(
        root: impl AsRef<Path>,
        pins: Vec<u32>,
        active_low: bool,
    ) -> RelayResult<Self> {
        let root = root.as_ref().to_path_buf();
        for &pin in &pins {
            let line = root.join(format!("gpio{pin}"));
            if !line.exists() {
                fs::write(root.join("export"), pin.to_string())?;
            }
            fs::write(line.join("direction"), "out")?;
        }
        let mut bank = Self {
            root,
            states: vec![false; pins.len()],
            pins,
            active_low,
        };
        bank.all_off()?;
        log::debug!("opened {} sysfs GPIO relays", bank.pins.len());
        Ok(bank)
    }

    fn value_path(&self, channel: usize) -> RelayResult<PathBuf> {
        let pin = self
            .pins
            .get(channel)
            .ok_or(RelayError::ChannelUnavailable { channel })?;
        Ok(self.root.join(format!("gpio{pin}")).join("value"))
    }
}

impl RelayBank for SysfsRelayBank {
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
        let path = self.value_path(channel)?;
        let level = on != self.active_low;
        fs::write(&path, if level { "1" } else { "0" }).map_err(|e| {
            log::error!("GPIO write to {} failed: {e}", path.display());
            RelayError::Io(e)
        })?;
        self.states[channel] = on;
        Ok(())
    }

    fn pin(&self, channel: usize) -> Option<u32> {
        self.pins.get(channel).copied()
    }
}
