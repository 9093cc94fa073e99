//! Error types for sequence decoding

/// Error type for sequence file operations
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    /// Structurally invalid file (magic, flags, tables, layout)
    #[error("Malformed sequence: {0}")]
    Malformed(String),

    /// File version other than the supported 2.0
    #[error("Unsupported sequence version {major}.{minor} (expected 2.0)")]
    UnsupportedVersion {
        /// Major version found in the file
        major: u8,
        /// Minor version found in the file
        minor: u8,
    },

    /// Recognized but unsupported compression kind
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// Frame index past the end of the sequence
    #[error("Frame {index} out of range (sequence has {frame_count} frames)")]
    OutOfRange {
        /// Requested frame index
        index: u64,
        /// Frames in the sequence
        frame_count: u32,
    },

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<String> for DecodeError {
    fn from(s: String) -> Self {
        DecodeError::Malformed(s)
    }
}

impl From<&str> for DecodeError {
    fn from(s: &str) -> Self {
        DecodeError::Malformed(s.to_string())
    }
}

/// Result type for sequence operations
pub type Result<T> = std::result::Result<T, DecodeError>;
