//! Remote show file generation
//!
//! The remote LED device plays a flat file:
//!
//! - 4 bytes, little-endian: frame delay in milliseconds
//! - per frame: one 4-byte big-endian `0x00RRGGBB` word per left-strand pixel,
//!   then one per right-strand pixel
//!
//! Relay bytes are not part of the show; relays are driven locally.

use crate::{DecodeError, Frame, Result, SequenceDecoder};
use lightshow_common::BYTES_PER_PIXEL;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;

/// Bytes of the show file header.
pub const SHOW_HEADER_LEN: usize = 4;

/// Bytes per packed pixel.
pub const SHOW_PIXEL_LEN: usize = 4;

/// Result of writing one show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowSummary {
    /// Frames written.
    pub frames: u32,
    /// Frame delay stored in the header.
    pub frame_delay_ms: u32,
    /// Pixels per frame (left + right).
    pub pixels_per_frame: usize,
    /// Total file size.
    pub bytes_written: u64,
}

/// Pack one RGB triple as a big-endian `0x00RRGGBB` word.
pub fn pack_rgb(rgb: &[u8]) -> [u8; SHOW_PIXEL_LEN] {
    let word = (u32::from(rgb[0]) << 16) | (u32::from(rgb[1]) << 8) | u32::from(rgb[2]);
    word.to_be_bytes()
}

/// Append the strand pixels of `frame` to `out`.
pub fn write_frame_pixels<W: Write>(frame: &Frame, out: &mut W) -> Result<()> {
    for strand in [frame.left_bytes(), frame.right_bytes()] {
        for pixel in strand.chunks_exact(BYTES_PER_PIXEL) {
            out.write_all(&pack_rgb(pixel))?;
        }
    }
    Ok(())
}

/// Write the show for every frame of `decoder` into `out`.
pub fn write_show<R, W>(decoder: &mut SequenceDecoder<R>, out: W) -> Result<ShowSummary>
where
    R: Read + Seek,
    W: Write,
{
    let layout = decoder.layout();
    if layout.left % BYTES_PER_PIXEL != 0 || layout.right % BYTES_PER_PIXEL != 0 {
        return Err(DecodeError::Malformed(format!(
            "strand sections ({} / {} bytes) are not whole RGB pixels",
            layout.left, layout.right
        )));
    }

    let mut out = BufWriter::new(out);
    let frame_delay_ms = u32::from(decoder.step_time_ms());
    out.write_all(&frame_delay_ms.to_le_bytes())?;

    let pixels_per_frame = (layout.left + layout.right) / BYTES_PER_PIXEL;
    let mut frames = 0u32;
    for frame in decoder.frames() {
        write_frame_pixels(&frame?, &mut out)?;
        frames += 1;
    }
    out.flush()?;

    Ok(ShowSummary {
        frames,
        frame_delay_ms,
        pixels_per_frame,
        bytes_written: (SHOW_HEADER_LEN + frames as usize * pixels_per_frame * SHOW_PIXEL_LEN)
            as u64,
    })
}

/// Generate the show file for the sequence at `sequence` into `output`.
pub fn generate_show_file(
    sequence: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Result<ShowSummary> {
    let mut decoder = SequenceDecoder::open(sequence.as_ref())?;
    let file = File::create(output.as_ref())?;
    let summary = write_show(&mut decoder, file)?;
    log::info!(
        "generated show {} ({} frames, {} bytes)",
        output.as_ref().display(),
        summary.frames,
        summary.bytes_written
    );
    Ok(summary)
}
