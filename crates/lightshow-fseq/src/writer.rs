//! PSEQ v2 encoder
//!
//! Produces files the decoder reads back: uncompressed bodies or zstd blocks
//! of `frames_per_block` frames each. Used by tooling and by tests that need
//! hand-built sequences.

use crate::compression::{compress_block, DEFAULT_ZSTD_LEVEL};
use crate::header::{
    CompressionKind, SparseRange, VariableHeader, BLOCK_ENTRY_LEN, FIXED_HEADER_LEN, MAGIC,
    SPARSE_ENTRY_LEN, SUPPORTED_VERSION,
};
use crate::{DecodeError, Result};
use std::fs;
use std::path::Path;

/// Default frames per zstd block.
pub const DEFAULT_FRAMES_PER_BLOCK: u32 = 10;

/// Largest 24-bit value stored in a sparse range field.
const MAX_U24: u32 = 0x00FF_FFFF;

/// Builder-style sequence encoder.
#[derive(Debug, Clone)]
pub struct SequenceWriter {
    channel_count: u32,
    step_time_ms: u8,
    compression: CompressionKind,
    frames_per_block: u32,
    zstd_level: i32,
    sparse_ranges: Vec<SparseRange>,
    variable_headers: Vec<VariableHeader>,
    unique_id: u64,
}

impl SequenceWriter {
    /// Writer for frames of `channel_count` bytes, `step_time_ms` apart.
    pub fn new(channel_count: u32, step_time_ms: u8) -> Self {
        Self {
            channel_count,
            step_time_ms,
            compression: CompressionKind::None,
            frames_per_block: DEFAULT_FRAMES_PER_BLOCK,
            zstd_level: DEFAULT_ZSTD_LEVEL,
            sparse_ranges: Vec::new(),
            variable_headers: Vec::new(),
            unique_id: 0,
        }
    }

    /// Select the body compression.
    pub fn with_compression(mut self, compression: CompressionKind) -> Self {
        self.compression = compression;
        self
    }

    /// Frames per zstd block (ignored for uncompressed output).
    pub fn with_frames_per_block(mut self, frames: u32) -> Self {
        self.frames_per_block = frames.max(1);
        self
    }

    /// zstd compression level.
    pub fn with_zstd_level(mut self, level: i32) -> Self {
        self.zstd_level = level;
        self
    }

    /// Add a sparse channel range.
    pub fn with_sparse_range(mut self, range: SparseRange) -> Self {
        self.sparse_ranges.push(range);
        self
    }

    /// Add a variable-length metadata record.
    pub fn with_variable_header(mut self, header: VariableHeader) -> Self {
        self.variable_headers.push(header);
        self
    }

    /// Value stored in the unique id field.
    pub fn with_unique_id(mut self, id: u64) -> Self {
        self.unique_id = id;
        self
    }

    /// Encode `frames` into a complete file image.
    pub fn encode<F: AsRef<[u8]>>(&self, frames: &[F]) -> Result<Vec<u8>> {
        for (i, frame) in frames.iter().enumerate() {
            let len = frame.as_ref().len();
            if len != self.channel_count as usize {
                return Err(DecodeError::Malformed(format!(
                    "frame {i} has {len} bytes, expected {}",
                    self.channel_count
                )));
            }
        }
        let frame_count = u32::try_from(frames.len())
            .map_err(|_| DecodeError::Malformed(format!("{} frames exceed u32", frames.len())))?;

        let (blocks, body) = match self.compression {
            CompressionKind::None => {
                let body: Vec<u8> =
                    frames.iter().flat_map(|f| f.as_ref().iter().copied()).collect();
                (Vec::new(), body)
            }
            CompressionKind::ZstdBlocks => self.compress_frames(frames)?,
            CompressionKind::Gzip => {
                return Err(DecodeError::UnsupportedCompression(
                    CompressionKind::Gzip.name().to_string(),
                ))
            }
        };

        if blocks.len() > u8::MAX as usize {
            let count = blocks.len();
            return Err(format!("{count} compression blocks exceed the 255 entry table").into());
        }
        if self.sparse_ranges.len() > u8::MAX as usize {
            return Err("more than 255 sparse ranges".into());
        }

        let tables_end = FIXED_HEADER_LEN
            + blocks.len() * BLOCK_ENTRY_LEN
            + self.sparse_ranges.len() * SPARSE_ENTRY_LEN;
        let header_len = tables_end
            + self
                .variable_headers
                .iter()
                .map(VariableHeader::encoded_len)
                .sum::<usize>();
        let channel_data_start = u16::try_from(header_len)
            .map_err(|_| {
                DecodeError::Malformed(format!("header of {header_len} bytes exceeds u16"))
            })?;

        let mut out = Vec::with_capacity(header_len + body.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&channel_data_start.to_le_bytes());
        out.push(SUPPORTED_VERSION.1);
        out.push(SUPPORTED_VERSION.0);
        out.extend_from_slice(&(tables_end as u16).to_le_bytes());
        out.extend_from_slice(&self.channel_count.to_le_bytes());
        out.extend_from_slice(&frame_count.to_le_bytes());
        out.push(self.step_time_ms);
        out.push(0);
        out.push(self.compression.code());
        out.push(blocks.len() as u8);
        out.push(self.sparse_ranges.len() as u8);
        out.push(0);
        out.extend_from_slice(&self.unique_id.to_le_bytes());

        for (first_frame, length) in &blocks {
            out.extend_from_slice(&first_frame.to_le_bytes());
            out.extend_from_slice(&length.to_le_bytes());
        }
        for range in &self.sparse_ranges {
            if range.start_channel > MAX_U24 || range.channel_count > MAX_U24 {
                return Err("sparse range field exceeds 24 bits".into());
            }
            out.extend_from_slice(&range.start_channel.to_le_bytes()[..3]);
            out.extend_from_slice(&range.channel_count.to_le_bytes()[..3]);
        }
        for header in &self.variable_headers {
            let len = u16::try_from(header.encoded_len())
                .map_err(|_| DecodeError::Malformed("variable header exceeds u16".to_string()))?;
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&header.code);
            out.extend_from_slice(&header.data);
        }

        debug_assert_eq!(out.len(), header_len);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Encode `frames` and write them to `path`.
    pub fn write_to_path<F: AsRef<[u8]>>(
        &self,
        path: impl AsRef<Path>,
        frames: &[F],
    ) -> Result<()> {
        let data = self.encode(frames)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// `(first_frame, compressed_length)` table plus the concatenated blocks.
    fn compress_frames<F: AsRef<[u8]>>(&self, frames: &[F]) -> Result<(Vec<(u32, u32)>, Vec<u8>)> {
        let mut table = Vec::new();
        let mut body = Vec::new();
        for (i, chunk) in frames.chunks(self.frames_per_block as usize).enumerate() {
            let raw: Vec<u8> = chunk.iter().flat_map(|f| f.as_ref().iter().copied()).collect();
            let packed = compress_block(&raw, self.zstd_level)?;
            table.push((i as u32 * self.frames_per_block, packed.len() as u32));
            body.extend_from_slice(&packed);
        }
        Ok((table, body))
    }
}
