//! Direct control of named lights.

use crate::relay::SharedRelays;
use crate::{Result, ShowError};
use lightshow_common::{LightsStatus, Status, StatusReport};

/// Switches individual lights by name.
#[derive(Clone)]
pub struct LightsController {
    relays: SharedRelays,
}

impl LightsController {
    /// Controller over the shared relays.
    pub fn new(relays: SharedRelays) -> Self {
        Self { relays }
    }

    /// Switch every light on.
    pub fn all_on(&self) -> Result<LightsStatus> {
        self.relays.all_on()?;
        self.lights_status()
    }

    /// Switch every light off.
    pub fn all_off(&self) -> Result<LightsStatus> {
        self.relays.all_off()?;
        self.lights_status()
    }

    /// Switch `name` on.
    pub fn turn_on(&self, name: &str) -> Result<LightsStatus> {
        let channel = self.channel(name)?;
        self.relays.lock().set(channel, true)?;
        self.lights_status()
    }

    /// Switch `name` off.
    pub fn turn_off(&self, name: &str) -> Result<LightsStatus> {
        let channel = self.channel(name)?;
        self.relays.lock().set(channel, false)?;
        self.lights_status()
    }

    /// Flip `name`.
    pub fn toggle(&self, name: &str) -> Result<LightsStatus> {
        let channel = self.channel(name)?;
        self.relays.lock().toggle(channel)?;
        self.lights_status()
    }

    /// State of every light in mapping order.
    pub fn lights_status(&self) -> Result<LightsStatus> {
        Ok(LightsStatus {
            lights: self.relays.snapshot()?,
        })
    }

    fn channel(&self, name: &str) -> Result<usize> {
        self.relays
            .channel_of(name)
            .ok_or_else(|| ShowError::UnknownLightName(name.to_string()))
    }
}

impl StatusReport for LightsController {
    fn status(&self) -> Status {
        let status = self.lights_status().unwrap_or_else(|e| {
            log::error!("reading relay states failed: {e}");
            LightsStatus::default()
        });
        Status::Lights(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switches_by_name() {
        let lights = LightsController::new(SharedRelays::in_memory(["porch", "tree"]));
        let status = lights.turn_on("tree").unwrap();
        assert!(status.lights[1].value);
        assert!(!status.lights[0].value);

        let status = lights.toggle("tree").unwrap();
        assert!(!status.lights[1].value);

        let status = lights.all_on().unwrap();
        assert!(status.lights.iter().all(|l| l.value));
        lights.turn_off("porch").unwrap();
        assert!(!lights.lights_status().unwrap().lights[0].value);
    }

    #[test]
    fn unknown_light() {
        let lights = LightsController::new(SharedRelays::in_memory(["porch"]));
        assert!(matches!(lights.toggle("roof"), Err(ShowError::UnknownLightName(_))));
    }
}
