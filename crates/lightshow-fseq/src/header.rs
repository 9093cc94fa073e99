//! PSEQ v2 header parsing
//!
//! Layout of the fixed part (all multi-byte fields little-endian):
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 4 | magic `PSEQ` |
//! | 4 | 2 | channel data start |
//! | 6 | 1 | minor version |
//! | 7 | 1 | major version |
//! | 8 | 2 | standard header length (unused) |
//! | 10 | 4 | channels per frame |
//! | 14 | 4 | frame count |
//! | 18 | 1 | step time (ms) |
//! | 19 | 1 | flags (must be 0) |
//! | 20 | 1 | compression kind |
//! | 21 | 1 | compression block count |
//! | 22 | 1 | sparse range count |
//! | 23 | 1 | flags (must be 0) |
//! | 24 | 8 | unique id (unused) |
//!
//! followed by the compression block table, the sparse ranges and the
//! variable-length headers, up to the channel data start.

use crate::{DecodeError, Result};
use std::io::{ErrorKind, Read};

/// File magic.
pub const MAGIC: &[u8; 4] = b"PSEQ";

/// The only supported `(major, minor)` version.
pub const SUPPORTED_VERSION: (u8, u8) = (2, 0);

/// Size of the fixed header in bytes.
pub const FIXED_HEADER_LEN: usize = 32;

/// Bytes per compression block table entry.
pub const BLOCK_ENTRY_LEN: usize = 8;

/// Bytes per sparse range entry.
pub const SPARSE_ENTRY_LEN: usize = 6;

/// Bytes of a variable header preamble (length + code).
pub const VARIABLE_HEADER_PREAMBLE: usize = 4;

/// Compression used for the channel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    /// Raw frames, back to back.
    None,
    /// Independently compressed zstd blocks.
    ZstdBlocks,
    /// Recognized, never decoded.
    Gzip,
}

impl CompressionKind {
    /// Map the on-disk code; unknown codes are malformed.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(CompressionKind::None),
            1 => Ok(CompressionKind::ZstdBlocks),
            2 => Ok(CompressionKind::Gzip),
            other => Err(format!("unrecognized compression type: {other}").into()),
        }
    }

    /// On-disk code.
    pub fn code(self) -> u8 {
        match self {
            CompressionKind::None => 0,
            CompressionKind::ZstdBlocks => 1,
            CompressionKind::Gzip => 2,
        }
    }

    /// Short name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            CompressionKind::None => "none",
            CompressionKind::ZstdBlocks => "zstd",
            CompressionKind::Gzip => "gzip",
        }
    }
}

/// Start of a run of frames in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// First frame stored in this block.
    pub first_frame: u32,
    /// Absolute byte offset of the block.
    pub offset: u64,
}

/// Sparse channel range (parsed, not interpreted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparseRange {
    /// First channel of the range (24-bit).
    pub start_channel: u32,
    /// Number of channels in the range (24-bit).
    pub channel_count: u32,
}

/// Variable-length metadata record (opaque).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableHeader {
    /// Two-character record code, e.g. `mf` or `sp`.
    pub code: [u8; 2],
    /// Record payload.
    pub data: Vec<u8>,
}

impl VariableHeader {
    /// Create a record from a two-character code.
    pub fn new(code: [u8; 2], data: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            data: data.into(),
        }
    }

    /// Code as text, lossy.
    pub fn code_str(&self) -> String {
        String::from_utf8_lossy(&self.code).into_owned()
    }

    /// On-disk length including the preamble.
    pub fn encoded_len(&self) -> usize {
        VARIABLE_HEADER_PREAMBLE + self.data.len()
    }
}

/// Parsed sequence header. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceHeader {
    /// Byte offset where frame data begins.
    pub channel_data_start: u16,
    /// Major format version.
    pub major_version: u8,
    /// Minor format version.
    pub minor_version: u8,
    /// Bytes per frame across all outputs.
    pub channel_count_per_frame: u32,
    /// Number of frames.
    pub frame_count: u32,
    /// Duration of one frame in milliseconds.
    pub step_time_ms: u8,
    /// Channel data compression.
    pub compression: CompressionKind,
    /// Blocks ordered by first frame, terminated by a `(frame_count, end)` sentinel.
    pub blocks: Vec<BlockDescriptor>,
    /// Sparse channel ranges.
    pub sparse_ranges: Vec<SparseRange>,
    /// Variable-length metadata records.
    pub variable_headers: Vec<VariableHeader>,
}

impl SequenceHeader {
    /// Parse a header from the start of a sequence stream.
    ///
    /// Leaves the reader positioned somewhere inside the header; callers seek
    /// explicitly before reading frame data.
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        read_exact(reader, &mut magic, "magic")?;
        if &magic != MAGIC {
            let magic = String::from_utf8_lossy(&magic);
            return Err(format!("invalid fseq file magic: {magic:?}").into());
        }

        let mut fixed = [0u8; FIXED_HEADER_LEN - 4];
        read_exact(reader, &mut fixed, "fixed header")?;
        let mut cur = ByteReader::new(&fixed);

        let channel_data_start = cur.u16()?;
        let minor_version = cur.u8()?;
        let major_version = cur.u8()?;
        if (major_version, minor_version) != SUPPORTED_VERSION {
            return Err(DecodeError::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }

        let _standard_header_length = cur.u16()?;
        let channel_count_per_frame = cur.u32()?;
        let frame_count = cur.u32()?;
        let step_time_ms = cur.u8()?;

        let flags = cur.u8()?;
        if flags != 0 {
            return Err(format!("unrecognized bit flags: {flags:#04x}").into());
        }

        let compression = CompressionKind::from_code(cur.u8()?)?;
        if compression == CompressionKind::Gzip {
            return Err(DecodeError::UnsupportedCompression(
                compression.name().to_string(),
            ));
        }

        let num_blocks = cur.u8()? as usize;
        let num_sparse = cur.u8()? as usize;

        let flags = cur.u8()?;
        if flags != 0 {
            return Err(format!("unrecognized bit flags: {flags:#04x}").into());
        }

        let _unique_id = cur.u64()?;

        let tables_len = num_blocks * BLOCK_ENTRY_LEN + num_sparse * SPARSE_ENTRY_LEN;
        let tables_end = FIXED_HEADER_LEN + tables_len;
        let data_start = channel_data_start as usize;
        if data_start < tables_end {
            return Err(format!(
                "channel data start {data_start} overlaps header tables ending at {tables_end}"
            )
            .into());
        }

        let mut rest = vec![0u8; data_start - FIXED_HEADER_LEN];
        read_exact(reader, &mut rest, "header tables")?;
        let mut cur = ByteReader::new(&rest);

        let mut offset = channel_data_start as u64;
        let mut blocks = Vec::with_capacity(num_blocks + 2);
        if compression == CompressionKind::None {
            blocks.push(BlockDescriptor {
                first_frame: 0,
                offset,
            });
        }
        for _ in 0..num_blocks {
            let first_frame = cur.u32()?;
            let length = cur.u32()?;
            // Zero-length entries are padding in the table
            if length == 0 {
                continue;
            }
            if let Some(prev) = blocks.last() {
                if first_frame < prev.first_frame {
                    return Err(format!(
                        "compression block at frame {first_frame} precedes block at frame {}",
                        prev.first_frame
                    )
                    .into());
                }
            }
            blocks.push(BlockDescriptor {
                first_frame,
                offset,
            });
            offset += length as u64;
        }
        blocks.push(BlockDescriptor {
            first_frame: frame_count,
            offset,
        });

        let mut sparse_ranges = Vec::with_capacity(num_sparse);
        for _ in 0..num_sparse {
            sparse_ranges.push(SparseRange {
                start_channel: cur.u24()?,
                channel_count: cur.u24()?,
            });
        }

        let variable_headers = parse_variable_headers(&mut cur, tables_end, data_start)?;

        Ok(SequenceHeader {
            channel_data_start,
            major_version,
            minor_version,
            channel_count_per_frame,
            frame_count,
            step_time_ms,
            compression,
            blocks,
            sparse_ranges,
            variable_headers,
        })
    }

    /// Sequence length in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.frame_count as u64 * self.step_time_ms as u64
    }

    /// Real blocks, without the trailing sentinel.
    pub fn data_blocks(&self) -> &[BlockDescriptor] {
        &self.blocks[..self.blocks.len().saturating_sub(1)]
    }

    /// Find the block holding `frame` and the entry bounding it.
    pub fn block_for(&self, frame: u32) -> Result<(BlockDescriptor, BlockDescriptor)> {
        self.blocks
            .windows(2)
            .find(|pair| pair[0].first_frame <= frame && frame < pair[1].first_frame)
            .map(|pair| (pair[0], pair[1]))
            .ok_or_else(|| format!("no compression block covers frame {frame}").into())
    }
}

fn parse_variable_headers(
    cur: &mut ByteReader<'_>,
    mut start: usize,
    data_start: usize,
) -> Result<Vec<VariableHeader>> {
    let mut headers = Vec::new();
    while start < data_start.saturating_sub(VARIABLE_HEADER_PREAMBLE) {
        let length = cur.u16()? as usize;
        if length == 0 {
            break;
        }
        if length < VARIABLE_HEADER_PREAMBLE {
            return Err(format!("variable header length {length} shorter than its preamble").into());
        }
        let code = cur.take(2)?;
        let data = cur.take(length - VARIABLE_HEADER_PREAMBLE)?;
        headers.push(VariableHeader {
            code: [code[0], code[1]],
            data: data.to_vec(),
        });
        start += length;
    }
    Ok(headers)
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => DecodeError::Malformed(format!("truncated {what}")),
        _ => DecodeError::Io(e),
    })
}

/// Little-endian cursor over an in-memory header slice.
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                DecodeError::Malformed(format!("header truncated at byte {}", self.pos))
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u24(&mut self) -> Result<u32> {
        let b = self.take(3)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_le_bytes(raw))
    }
}
