//! PSEQ v2 lighting sequence decoder
//!
//! Random access into frame-indexed lighting timelines (magic `PSEQ`,
//! version 2.0), either stored raw or as independently decompressible zstd
//! blocks.
//!
//! # Features
//!
//! - Header parsing with strict validation (magic, version, flags, compression)
//! - Frame lookup by index or by millisecond offset
//! - zstd block decompression with a hard output size limit
//! - Frame splitting into relay / left strand / right strand sections
//! - Encoder for building sequence files
//! - Remote show file generation
//!
//! # Example
//!
//! ```no_run
//! use lightshow_fseq::SequenceDecoder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut decoder = SequenceDecoder::open("Carol of the Bells.fseq")?;
//! let frame = decoder.frame_at_time_ms(1_250)?;
//! println!("relays: {:?}", frame.relay_bytes());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
mod error;
pub use error::{DecodeError, Result};

// Core modules
pub mod compression;
pub mod decoder;
pub mod frame;
pub mod header;
pub mod show;
pub mod writer;

// Re-export commonly used types
pub use decoder::{Frames, SequenceDecoder};
pub use frame::Frame;
pub use header::{
    BlockDescriptor, CompressionKind, SequenceHeader, SparseRange, VariableHeader,
};
pub use lightshow_common::FrameLayout;
pub use show::{generate_show_file, write_show, ShowSummary};
pub use writer::SequenceWriter;
