//! Common types and traits shared by the lightshow crates.
//!
//! This crate holds the pieces every other crate agrees on:
//!
//! - [`FrameLayout`] - how one frame of channel bytes splits into relay,
//!   left-strand and right-strand outputs
//! - [`Song`] - a catalog entry pairing an audio file with its sequence file
//! - [`StatusReport`] - the status capability implemented by each controller
//!
//! # Example
//!
//! ```
//! use lightshow_common::{FrameLayout, NUM_BYTES_TOTAL};
//!
//! let layout = FrameLayout::default();
//! assert_eq!(layout.total(), NUM_BYTES_TOTAL);
//! assert_eq!(layout.left_range(), 16..1678);
//! ```

#![warn(missing_docs)]

mod layout;
mod song;
mod status;

pub use layout::FrameLayout;
pub use song::Song;
pub use status::{
    LightStatus, LightsStatus, PlaybackState, PresetStatus, PresetsStatus, RemapStatus,
    RemoteStatus, SongInfo, SongsStatus, Status, StatusReport,
};

// ============================================================================
// Hardware Layout
// ============================================================================

/// Number of pixels on the left strand.
pub const NUM_LEDS_L: usize = 554;

/// Number of pixels on the right strand.
pub const NUM_LEDS_R: usize = 563;

/// Bytes per strand pixel (one byte per color component, RGB order).
pub const BYTES_PER_PIXEL: usize = 3;

/// One byte per relay at the start of every frame.
pub const NUM_BYTES_RELAYS: usize = 16;

/// Left strand bytes per frame (554 pixels x 3).
pub const NUM_BYTES_L: usize = NUM_LEDS_L * BYTES_PER_PIXEL;

/// Right strand bytes per frame (563 pixels x 3).
pub const NUM_BYTES_R: usize = NUM_LEDS_R * BYTES_PER_PIXEL;

/// Total channel bytes per frame (16 + 1662 + 1689 = 3367).
pub const NUM_BYTES_TOTAL: usize = NUM_BYTES_RELAYS + NUM_BYTES_L + NUM_BYTES_R;

/// Volume range accepted by playback (inclusive).
pub const VOLUME_MAX: u8 = 100;
