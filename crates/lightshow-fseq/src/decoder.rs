//! Random-access frame decoder
//!
//! The decoder keeps only the parsed header and a handle to the underlying
//! stream. Every request seeks to the block holding the frame:
//!
//! - uncompressed: read exactly one frame at `offset + i * channels`
//! - zstd: read the whole block, decompress it, slice the frame out
//!
//! Nothing is cached between calls.

use crate::compression::{check_block_size, decompress_block};
use crate::header::{CompressionKind, SequenceHeader};
use crate::{DecodeError, Frame, Result};
use lightshow_common::FrameLayout;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

/// Decoder for a single sequence file.
#[derive(Debug)]
pub struct SequenceDecoder<R = File> {
    reader: R,
    header: SequenceHeader,
    layout: FrameLayout,
}

impl SequenceDecoder<File> {
    /// Open a sequence file for the default hardware layout.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_layout(path, FrameLayout::default())
    }

    /// Open a sequence file for a custom frame layout.
    pub fn open_with_layout(path: impl AsRef<Path>, layout: FrameLayout) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let header = {
            let mut buffered = BufReader::new(&mut file);
            SequenceHeader::parse(&mut buffered)?
        };
        log::debug!(
            "opened sequence {}: {} frames x {} channels, {} ms/frame, {} compression",
            path.display(),
            header.frame_count,
            header.channel_count_per_frame,
            header.step_time_ms,
            header.compression.name()
        );
        Self::with_header(file, header, layout)
    }
}

impl<R: Read + Seek> SequenceDecoder<R> {
    /// Build a decoder over any seekable stream positioned at the file start.
    pub fn from_reader(mut reader: R, layout: FrameLayout) -> Result<Self> {
        let header = SequenceHeader::parse(&mut reader)?;
        Self::with_header(reader, header, layout)
    }

    fn with_header(reader: R, header: SequenceHeader, layout: FrameLayout) -> Result<Self> {
        if header.channel_count_per_frame as usize != layout.total() {
            return Err(DecodeError::Malformed(format!(
                "sequence has {} channels per frame, hardware layout expects {}",
                header.channel_count_per_frame,
                layout.total()
            )));
        }
        if header.step_time_ms == 0 {
            return Err("step time of 0 ms".into());
        }
        Ok(Self {
            reader,
            header,
            layout,
        })
    }

    /// Parsed header.
    pub fn header(&self) -> &SequenceHeader {
        &self.header
    }

    /// Frame layout in use.
    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// Number of frames.
    pub fn frame_count(&self) -> u32 {
        self.header.frame_count
    }

    /// Duration of one frame in milliseconds.
    pub fn step_time_ms(&self) -> u8 {
        self.header.step_time_ms
    }

    /// Sequence length in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.header.duration_ms()
    }

    /// Frame active at `ms` (floor division by the step time).
    pub fn frame_at_time_ms(&mut self, ms: u64) -> Result<Frame> {
        self.frame_at_index(ms / self.header.step_time_ms as u64)
    }

    /// Frame at `index`.
    pub fn frame_at_index(&mut self, index: u64) -> Result<Frame> {
        let frame_count = self.header.frame_count;
        if index >= frame_count as u64 {
            return Err(DecodeError::OutOfRange { index, frame_count });
        }
        let index = index as u32;
        let channels = self.header.channel_count_per_frame as u64;
        let (block, next) = self.header.block_for(index)?;

        match self.header.compression {
            CompressionKind::None => {
                let offset = block.offset + (index - block.first_frame) as u64 * channels;
                let data = self.read_at(offset, channels as usize)?;
                Frame::new(data, self.layout)
            }
            CompressionKind::ZstdBlocks => {
                let frames = next.first_frame - block.first_frame;
                let block_data = self.read_block(block.offset, next.offset, frames)?;
                let start = (index - block.first_frame) as usize * channels as usize;
                let data = block_data[start..start + channels as usize].to_vec();
                Frame::new(data, self.layout)
            }
            CompressionKind::Gzip => Err(DecodeError::UnsupportedCompression(
                CompressionKind::Gzip.name().to_string(),
            )),
        }
    }

    /// Iterate over every frame in order.
    ///
    /// Each zstd block is decompressed once for the frames it holds.
    pub fn frames(&mut self) -> Frames<'_, R> {
        Frames {
            decoder: self,
            next: 0,
            block: None,
        }
    }

    /// Decompressed contents of the block starting at `offset`.
    fn read_block(&mut self, offset: u64, end: u64, frames: u32) -> Result<Vec<u8>> {
        if end < offset {
            return Err(
                format!("compression block at {offset} ends before it starts ({end})").into(),
            );
        }
        let compressed_len = check_block_size(end - offset, "compressed block")?;
        let compressed = self.read_at(offset, compressed_len)?;
        let expected = check_block_size(
            frames as u64 * self.header.channel_count_per_frame as u64,
            "decompressed block",
        )?;
        decompress_block(&compressed, expected)
    }

    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0u8; len];
        self.reader.read_exact(&mut data).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => DecodeError::Malformed(format!(
                "frame data truncated: wanted {len} bytes at offset {offset}"
            )),
            _ => DecodeError::Io(e),
        })?;
        Ok(data)
    }

    /// Consume the decoder, returning the stream.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Sequential frame iterator, see [`SequenceDecoder::frames`].
pub struct Frames<'a, R> {
    decoder: &'a mut SequenceDecoder<R>,
    next: u32,
    /// `(first_frame, end_frame, data)` of the last decompressed block
    block: Option<(u32, u32, Vec<u8>)>,
}

impl<R: Read + Seek> Frames<'_, R> {
    fn next_compressed(&mut self, index: u32) -> Result<Frame> {
        let covered =
            matches!(&self.block, Some((first, end, _)) if *first <= index && index < *end);
        if !covered {
            let (block, next) = self.decoder.header.block_for(index)?;
            let frames = next.first_frame - block.first_frame;
            let data = self.decoder.read_block(block.offset, next.offset, frames)?;
            self.block = Some((block.first_frame, next.first_frame, data));
        }
        let channels = self.decoder.header.channel_count_per_frame as usize;
        match &self.block {
            Some((first, _, data)) => {
                let start = (index - first) as usize * channels;
                Frame::new(data[start..start + channels].to_vec(), self.decoder.layout)
            }
            None => Err(format!("no compression block covers frame {index}").into()),
        }
    }
}

impl<R: Read + Seek> Iterator for Frames<'_, R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.decoder.header.frame_count {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let compression = self.decoder.header.compression;
        let frame = match compression {
            CompressionKind::ZstdBlocks => self.next_compressed(index),
            _ => self.decoder.frame_at_index(index as u64),
        };
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.decoder.header.frame_count.saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}
