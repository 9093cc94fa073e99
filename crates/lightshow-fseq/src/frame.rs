//! Decoded frames

use crate::{DecodeError, Result};
use lightshow_common::FrameLayout;

/// One frame of channel bytes: relays, then the left strand, then the right strand.
///
/// Frames are produced on demand and handed straight to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    layout: FrameLayout,
}

impl Frame {
    /// Wrap raw bytes, checking they match `layout`.
    pub fn new(data: Vec<u8>, layout: FrameLayout) -> Result<Self> {
        if data.len() != layout.total() {
            return Err(DecodeError::Malformed(format!(
                "frame has {} bytes, layout expects {}",
                data.len(),
                layout.total()
            )));
        }
        Ok(Self { data, layout })
    }

    /// Relay bytes (one per relay, nonzero = on).
    pub fn relay_bytes(&self) -> &[u8] {
        &self.data[self.layout.relay_range()]
    }

    /// Left strand RGB bytes.
    pub fn left_bytes(&self) -> &[u8] {
        &self.data[self.layout.left_range()]
    }

    /// Right strand RGB bytes.
    pub fn right_bytes(&self) -> &[u8] {
        &self.data[self.layout.right_range()]
    }

    /// Relay states as booleans.
    pub fn relay_states(&self) -> impl Iterator<Item = bool> + '_ {
        self.relay_bytes().iter().map(|b| *b != 0)
    }

    /// Whole frame.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Layout used to split this frame.
    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// Consume the frame, returning the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightshow_common::{NUM_BYTES_L, NUM_BYTES_R, NUM_BYTES_RELAYS, NUM_BYTES_TOTAL};

    #[test]
    fn splits_into_three_sections() {
        let mut data = vec![0u8; NUM_BYTES_TOTAL];
        data[..NUM_BYTES_RELAYS].fill(1);
        data[NUM_BYTES_RELAYS..NUM_BYTES_RELAYS + NUM_BYTES_L].fill(2);
        data[NUM_BYTES_RELAYS + NUM_BYTES_L..].fill(3);

        let frame = Frame::new(data, FrameLayout::default()).unwrap();
        assert_eq!(frame.relay_bytes().len(), 16);
        assert_eq!(frame.left_bytes().len(), NUM_BYTES_L);
        assert_eq!(frame.right_bytes().len(), NUM_BYTES_R);
        assert!(frame.relay_bytes().iter().all(|b| *b == 1));
        assert!(frame.left_bytes().iter().all(|b| *b == 2));
        assert!(frame.right_bytes().iter().all(|b| *b == 3));
        assert_eq!(frame.relay_states().filter(|on| *on).count(), 16);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = Frame::new(vec![0u8; 10], FrameLayout::default()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }
}
