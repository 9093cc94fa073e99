//! Named light presets.
//!
//! A preset is a list of light names. Activating it switches everything off,
//! then switches on exactly the listed lights. Presets persist as a JSON
//! object of `name -> [light, ...]` in insertion order.

use crate::relay::SharedRelays;
use crate::{Result, ShowError};
use lightshow_common::{PresetStatus, PresetsStatus, Status, StatusReport};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Preset store and activation.
pub struct PresetController {
    relays: SharedRelays,
    path: Option<PathBuf>,
    presets: RwLock<Vec<(String, Vec<String>)>>,
}

impl PresetController {
    /// Presets held in memory only.
    pub fn new(relays: SharedRelays) -> Self {
        Self {
            relays,
            path: None,
            presets: RwLock::new(Vec::new()),
        }
    }

    /// Presets persisted at `path`; a missing file starts empty.
    pub fn open(relays: SharedRelays, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let presets = if path.exists() {
            load(&path)?
        } else {
            Vec::new()
        };
        Ok(Self {
            relays,
            path: Some(path),
            presets: RwLock::new(presets),
        })
    }

    /// Show exactly the lights of preset `name`.
    ///
    /// Lights the current mapping no longer knows are skipped.
    pub fn activate(&self, name: &str) -> Result<PresetsStatus> {
        let lights = self
            .presets
            .read()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, lights)| lights.clone())
            .ok_or_else(|| ShowError::UnknownPreset(name.to_string()))?;

        let mapping = self.relays.mapping();
        let mut relays = self.relays.lock();
        relays.all_off()?;
        for light in &lights {
            match mapping.channel_of(light) {
                Some(channel) => relays.set(channel, true)?,
                None => log::warn!("preset {name:?} names unknown light {light:?}"),
            }
        }
        drop(relays);
        log::info!("activated preset {name:?}");
        Ok(self.presets_status())
    }

    /// Create or replace preset `name`.
    pub fn add(&self, name: &str, lights: Vec<String>) -> Result<PresetsStatus> {
        let mapping = self.relays.mapping();
        if let Some(unknown) = lights.iter().find(|l| !mapping.contains(l)) {
            return Err(ShowError::UnknownLightName(unknown.clone()));
        }

        {
            let mut presets = self.presets.write();
            match presets.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1 = lights,
                None => presets.push((name.to_string(), lights)),
            }
            if let Some(path) = &self.path {
                save(path, &presets)?;
            }
        }
        Ok(self.presets_status())
    }

    /// All presets.
    pub fn presets_status(&self) -> PresetsStatus {
        PresetsStatus {
            presets: self
                .presets
                .read()
                .iter()
                .map(|(name, lights)| PresetStatus {
                    name: name.clone(),
                    lights: lights.clone(),
                })
                .collect(),
        }
    }
}

impl StatusReport for PresetController {
    fn status(&self) -> Status {
        Status::Presets(self.presets_status())
    }
}

fn load(path: &Path) -> Result<Vec<(String, Vec<String>)>> {
    let text = fs::read_to_string(path)?;
    let object: Map<String, Value> = serde_json::from_str(&text)?;
    object
        .into_iter()
        .map(|(name, lights)| {
            let lights: Vec<String> = serde_json::from_value(lights)?;
            Ok((name, lights))
        })
        .collect()
}

fn save(path: &Path, presets: &[(String, Vec<String>)]) -> Result<()> {
    let object: Map<String, Value> = presets
        .iter()
        .map(|(name, lights)| (name.clone(), Value::from(lights.clone())))
        .collect();
    fs::write(path, serde_json::to_string_pretty(&Value::Object(object))?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activate_shows_only_listed_lights() {
        let relays = SharedRelays::in_memory(["porch", "tree", "arch"]);
        let presets = PresetController::new(relays.clone());
        presets
            .add("evening", vec!["porch".into(), "arch".into()])
            .unwrap();

        relays.all_on().unwrap();
        presets.activate("evening").unwrap();
        assert_eq!(relays.lock().states().unwrap(), vec![true, false, true]);
    }

    #[test]
    fn unknown_names() {
        let presets = PresetController::new(SharedRelays::in_memory(["porch"]));
        assert!(matches!(presets.activate("night"), Err(ShowError::UnknownPreset(_))));
        assert!(matches!(
            presets.add("night", vec!["roof".into()]),
            Err(ShowError::UnknownLightName(_))
        ));
        assert!(presets.presets_status().presets.is_empty());
    }

    #[test]
    fn persists_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        let relays = SharedRelays::in_memory(["porch", "tree"]);
        {
            let presets = PresetController::open(relays.clone(), &path).unwrap();
            presets.add("zeta", vec!["tree".into()]).unwrap();
            presets.add("alpha", vec![]).unwrap();
            presets.add("zeta", vec!["porch".into()]).unwrap();
        }
        let reopened = PresetController::open(relays, &path).unwrap();
        let status = reopened.presets_status();
        assert_eq!(status.presets[0].name, "zeta");
        assert_eq!(status.presets[0].lights, vec!["porch"]);
        assert_eq!(status.presets[1].name, "alpha");
    }
}
