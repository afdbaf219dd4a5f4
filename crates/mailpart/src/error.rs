//! Error types for MIME part operations.

use std::io;

/// Result type alias for MIME part operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME part error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Content is neither a byte sequence nor a stream handle.
    #[error("Invalid content kind: {0}")]
    InvalidContentKind(String),

    /// Operation requires the other content mode.
    #[error("Operation not valid for the current content mode (stream required: {stream_required})")]
    NotAStream {
        /// True when the operation needed a stream but the content is buffered.
        stream_required: bool,
    },

    /// Encoding filter could not be installed.
    #[error("Failed to attach encoding filter: {0}")]
    FilterAttachFailed(String),

    /// I/O error while reading or rewinding a stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// Invalid encoded input.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
}

impl Error {
    /// Error for a stream-only operation called on buffered content.
    #[must_use]
    pub const fn not_a_stream() -> Self {
        Self::NotAStream {
            stream_required: true,
        }
    }

    /// Error for a buffered-only operation called on streamed content.
    #[must_use]
    pub const fn not_buffered() -> Self {
        Self::NotAStream {
            stream_required: false,
        }
    }

    /// Returns true if this error reports a content mode mismatch.
    #[must_use]
    pub const fn is_mode_mismatch(&self) -> bool {
        matches!(self, Self::NotAStream { .. })
    }
}
