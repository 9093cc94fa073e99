//! zstd block compression
//!
//! Each compression block holds a run of whole frames and is decompressed in
//! one shot. The decompressed size is known up front (frames in block times
//! channels per frame) and is enforced as a hard capacity. Both that size and
//! the compressed block length come from the header, so both are checked
//! against [`MAX_DECOMPRESSED_SIZE`] before anything is allocated.

use crate::{DecodeError, Result};

/// Default zstd level used when encoding.
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

/// Maximum size of one block, compressed or decompressed: 100MB.
/// A block of full frames is typically a few hundred KB.
pub const MAX_DECOMPRESSED_SIZE: usize = 100 * 1024 * 1024;

/// Reject block sizes declared by a corrupt or hostile header.
pub fn check_block_size(len: u64, what: &str) -> Result<usize> {
    if len > MAX_DECOMPRESSED_SIZE as u64 {
        return Err(DecodeError::Malformed(format!(
            "{what} of {len} bytes exceeds the {MAX_DECOMPRESSED_SIZE} byte block limit"
        )));
    }
    Ok(len as usize)
}

/// Decompress one block, expecting exactly `expected_len` bytes.
pub fn decompress_block(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    check_block_size(expected_len as u64, "decompressed block")?;
    let decompressed = zstd::bulk::decompress(data, expected_len).map_err(|e| {
        DecodeError::Malformed(format!(
            "zstd block of {} bytes failed to decompress to {expected_len} bytes: {e}",
            data.len()
        ))
    })?;

    if decompressed.len() != expected_len {
        return Err(DecodeError::Malformed(format!(
            "zstd block decompressed to {} bytes, expected {expected_len}",
            decompressed.len()
        )));
    }

    Ok(decompressed)
}

/// Compress one block of frame data.
pub fn compress_block(data: &[u8], level: i32) -> Result<Vec<u8>> {
    Ok(zstd::bulk::compress(data, level)?)
}
