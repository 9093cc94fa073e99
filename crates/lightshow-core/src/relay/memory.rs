//! In-process relay bank.

use super::{RelayBank, RelayResult};
use crate::RelayError;

/// Relays held in memory, with no hardware behind them.
#[derive(Debug, Clone, Default)]
pub struct MemoryRelayBank {
    states: Vec<bool>,
}

impl MemoryRelayBank {
    /// `channels` relays, all off.
    pub fn new(channels: usize) -> Self {
        Self {
            states: vec![false; channels],
        }
    }
}

impl RelayBank for MemoryRelayBank {
    fn channel_count(&self) -> usize {
        self.states.len()
    }

    fn get(&self, channel: usize) -> RelayResult<bool> {
        self.states
            .get(channel)
            .copied()
            .ok_or(RelayError::ChannelUnavailable { channel })
    }

    fn set(&mut self, channel: usize, on: bool) -> RelayResult<()> {
        let slot = self
            .states
            .get_mut(channel)
            .ok_or(RelayError::ChannelUnavailable { channel })?;
        *slot = on;
        Ok(())
    }

    fn states(&self) -> RelayResult<Vec<bool>> {
        Ok(self.states.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_and_bulk() {
        let mut bank = MemoryRelayBank::new(3);
        assert!(bank.toggle(1).unwrap());
        assert_eq!(bank.states().unwrap(), vec![false, true, false]);
        bank.all_on().unwrap();
        assert_eq!(bank.states().unwrap(), vec![true; 3]);
        bank.all_off().unwrap();
        assert_eq!(bank.states().unwrap(), vec![false; 3]);
    }

    #[test]
    fn out_of_range_channel() {
        let mut bank = MemoryRelayBank::new(2);
        assert!(matches!(
            bank.set(2, true),
            Err(RelayError::ChannelUnavailable { channel: 2 })
        ));
    }
}
