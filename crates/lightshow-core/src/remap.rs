//! Channel calibration ("remap") workflow.
//!
//! A remap lights each physical channel in turn and asks which named light
//! just came on. The resulting mapping replaces the persisted one only when
//! every light received a channel; an interrupted session leaves the old
//! mapping untouched.

use crate::relay::{RelayMapping, SharedRelays};
use crate::{Result, ShowError};
use lightshow_common::{RemapStatus, Status, StatusReport};
use parking_lot::Mutex;

#[derive(Debug)]
struct RemapState {
    /// Physical channels in the order they are lit.
    channels: Vec<usize>,
    /// Index into `channels` of the lit channel.
    cursor: usize,
    /// Light names in mapping order with their new channel.
    pending: Vec<(String, Option<usize>)>,
}

impl RemapState {
    fn current_channel(&self) -> Option<usize> {
        self.channels.get(self.cursor).copied()
    }

    fn remaining(&self) -> Vec<String> {
        self.pending
            .iter()
            .filter(|(_, channel)| channel.is_none())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// The new mapping, if every light was assigned.
    fn complete_mapping(&self) -> Option<Vec<(String, usize)>> {
        self.pending
            .iter()
            .map(|(name, channel)| channel.map(|ch| (name.clone(), ch)))
            .collect()
    }
}

/// Remap workflow over the shared relays.
pub struct RemapSession {
    relays: SharedRelays,
    state: Mutex<Option<RemapState>>,
}

impl RemapSession {
    /// Idle remap workflow.
    pub fn new(relays: SharedRelays) -> Self {
        Self {
            relays,
            state: Mutex::new(None),
        }
    }

    /// Begin a remap, abandoning any remap already running.
    ///
    /// Switches every relay off and lights the first channel.
    pub fn start(&self) -> Result<RemapStatus> {
        let mut state = self.state.lock();
        if let Some(old) = state.take() {
            log::info!("restarting remap, abandoning the running one");
            self.finalize(old)?;
        }

        let channels: Vec<usize> = (0..self.relays.channel_count()).collect();
        let pending = self
            .relays
            .mapping()
            .names()
            .map(|name| (name.to_string(), None))
            .collect();

        self.relays.all_off()?;
        if let Some(&first) = channels.first() {
            self.relays.lock().set(first, true)?;
            log::info!("remap started over {} channels", channels.len());
            *state = Some(RemapState {
                channels,
                cursor: 0,
                pending,
            });
        } else {
            log::warn!("remap requested on a relay bank without channels");
        }
        Ok(Self::describe(state.as_ref()))
    }

    /// Assign the lit channel to `light_name` and light the next channel.
    ///
    /// After the last channel the session finishes as if cancelled. An
    /// unknown name is rejected and the session is left as it was.
    pub fn next(&self, light_name: &str) -> Result<RemapStatus> {
        let mut guard = self.state.lock();
        let state = guard.as_mut().ok_or(ShowError::NoRemapInProgress)?;

        let slot = state
            .pending
            .iter_mut()
            .find(|(name, _)| name == light_name)
            .ok_or_else(|| ShowError::UnknownLightName(light_name.to_string()))?;
        let Some(channel) = state.channels.get(state.cursor).copied() else {
            return Err(ShowError::NoRemapInProgress);
        };
        slot.1 = Some(channel);
        log::debug!("remap: {light_name} -> channel {channel}");

        let mut relays = self.relays.lock();
        relays.set(channel, false)?;
        state.cursor += 1;
        match state.current_channel() {
            Some(next) => {
                relays.set(next, true)?;
                drop(relays);
            }
            None => {
                drop(relays);
                if let Some(done) = guard.take() {
                    self.finalize(done)?;
                }
            }
        }
        Ok(Self::describe(guard.as_ref()))
    }

    /// End the session now, committing only a complete mapping.
    pub fn cancel(&self) -> Result<RemapStatus> {
        let mut state = self.state.lock();
        if let Some(current) = state.take() {
            self.finalize(current)?;
        }
        Ok(Self::describe(state.as_ref()))
    }

    /// True while a remap is running.
    pub fn in_progress(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Current remap status.
    pub fn remap_status(&self) -> RemapStatus {
        Self::describe(self.state.lock().as_ref())
    }

    fn finalize(&self, state: RemapState) -> Result<()> {
        self.relays.all_off()?;
        match state.complete_mapping() {
            Some(entries) => {
                let mapping = RelayMapping::from_entries(entries)?;
                self.relays.commit_mapping(mapping)?;
                log::info!("remap complete, new mapping saved");
            }
            None => log::info!(
                "remap ended with {} unassigned lights, mapping unchanged",
                state.remaining().len()
            ),
        }
        Ok(())
    }

    fn describe(state: Option<&RemapState>) -> RemapStatus {
        match state {
            Some(state) => RemapStatus {
                remaining: Some(state.remaining()),
                current_channel: state.current_channel(),
            },
            None => RemapStatus::default(),
        }
    }
}

impl StatusReport for RemapSession {
    fn status(&self) -> Status {
        Status::Remap(self.remap_status())
    }
}
