//! Frame layout for the relay + two-strand hardware.

use crate::{NUM_BYTES_L, NUM_BYTES_R, NUM_BYTES_RELAYS};
use std::ops::Range;

/// Byte layout of a single frame.
///
/// A frame is three contiguous, disjoint slices in fixed order: relay bytes,
/// left-strand bytes, right-strand bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Relay bytes at the start of the frame.
    pub relays: usize,
    /// Left strand bytes following the relays.
    pub left: usize,
    /// Right strand bytes at the end of the frame.
    pub right: usize,
}

impl FrameLayout {
    /// The deployed hardware: 16 relays, 554 + 563 RGB pixels.
    pub const DEFAULT: FrameLayout = FrameLayout {
        relays: NUM_BYTES_RELAYS,
        left: NUM_BYTES_L,
        right: NUM_BYTES_R,
    };

    /// Create a layout with custom section sizes.
    pub const fn new(relays: usize, left: usize, right: usize) -> Self {
        Self {
            relays,
            left,
            right,
        }
    }

    /// Total bytes per frame.
    pub const fn total(&self) -> usize {
        self.relays + self.left + self.right
    }

    /// Byte range of the relay section.
    pub fn relay_range(&self) -> Range<usize> {
        0..self.relays
    }

    /// Byte range of the left strand section.
    pub fn left_range(&self) -> Range<usize> {
        self.relays..self.relays + self.left
    }

    /// Byte range of the right strand section.
    pub fn right_range(&self) -> Range<usize> {
        self.relays + self.left..self.total()
    }
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NUM_BYTES_TOTAL;

    #[test]
    fn default_layout_matches_hardware() {
        let layout = FrameLayout::default();
        assert_eq!(layout.total(), NUM_BYTES_TOTAL);
        assert_eq!(layout.total(), 3367);
        assert_eq!(layout.relay_range(), 0..16);
        assert_eq!(layout.left_range(), 16..1678);
        assert_eq!(layout.right_range(), 1678..3367);
    }

    #[test]
    fn ranges_are_contiguous() {
        let layout = FrameLayout::new(2, 3, 4);
        assert_eq!(layout.relay_range().end, layout.left_range().start);
        assert_eq!(layout.left_range().end, layout.right_range().start);
        assert_eq!(layout.right_range().end, 9);
    }
}
