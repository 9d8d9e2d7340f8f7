//! Unified error types for adapter operations.

use std::path::PathBuf;

use crate::format::ImageFormat;
use crate::pixel::Components;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Which side of the contract an error belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unsupported input, or I/O failure while reading.
    Decode,
    /// Unsupported output shape, or I/O failure while writing.
    Encode,
    /// Caller broke the contract (bad row index, closed handle, short buffer).
    Usage,
}

/// Unified error type for adapter operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AdapterError {
    /// Format not recognized from magic bytes or extension.
    #[error("unrecognized image format")]
    UnrecognizedFormat,

    /// Format recognized but this adapter cannot handle it.
    #[error("format {0:?} not supported by this adapter")]
    UnsupportedFormat(ImageFormat),

    /// No adapter can save to the requested extension.
    #[error("no saver for extension {0:?}")]
    NoSaver(String),

    /// Target format cannot represent the pixel layout, even after marshaling.
    #[error("format {format:?} cannot store {components:?} pixels")]
    UnsupportedComponents {
        format: ImageFormat,
        components: Components,
    },

    /// Component count outside 1..=4.
    #[error("invalid component count {0} (expected 1-4)")]
    InvalidComponents(i64),

    /// Zero or overflowing dimensions.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Pixel buffer length does not match width * height * components.
    #[error("pixel buffer is {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// Caller-supplied row buffer is too short.
    #[error("row buffer is {actual} bytes, need {needed}")]
    BufferTooSmall { needed: usize, actual: usize },

    /// Row index outside `[0, height)`.
    #[error("row {row} out of range (height {height})")]
    RowOutOfRange { row: u32, height: u32 },

    /// A previous read failed; the session can only be closed.
    #[error("streaming session is unusable after an earlier decode failure")]
    SessionPoisoned,

    /// Handle does not refer to an open session.
    #[error("no open streaming session for handle {0}")]
    SessionClosed(u64),

    /// Resource limit exceeded while reading (`kind` Decode) or writing
    /// (`kind` Encode).
    #[error("limit exceeded: {message}")]
    LimitExceeded { message: String, kind: ErrorKind },

    /// Filesystem failure.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        kind: ErrorKind,
        #[source]
        source: std::io::Error,
    },

    /// Underlying library failed to decode.
    #[error("decode error ({format:?}): {source}")]
    Decode {
        format: Option<ImageFormat>,
        #[source]
        source: BoxedSource,
    },

    /// Underlying library failed to encode.
    #[error("encode error ({format:?}): {source}")]
    Encode {
        format: ImageFormat,
        #[source]
        source: BoxedSource,
    },
}

impl AdapterError {
    /// Wrap a library-specific decode error.
    pub fn decode<E>(format: Option<ImageFormat>, error: E) -> Self
    where
        E: Into<BoxedSource>,
    {
        AdapterError::Decode {
            format,
            source: error.into(),
        }
    }

    /// Wrap a library-specific encode error.
    pub fn encode<E>(format: ImageFormat, error: E) -> Self
    where
        E: Into<BoxedSource>,
    {
        AdapterError::Encode {
            format,
            source: error.into(),
        }
    }

    /// Limit rejected an image being decoded.
    pub(crate) fn decode_limit(message: impl Into<String>) -> Self {
        AdapterError::LimitExceeded {
            message: message.into(),
            kind: ErrorKind::Decode,
        }
    }

    /// I/O failure while reading an input file.
    pub fn read_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AdapterError::Io {
            path: path.into(),
            kind: ErrorKind::Decode,
            source,
        }
    }

    /// I/O failure while writing an output file.
    pub fn write_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AdapterError::Io {
            path: path.into(),
            kind: ErrorKind::Encode,
            source,
        }
    }

    /// Classify the error as decode-side, encode-side, or contract misuse.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::UnrecognizedFormat
            | AdapterError::UnsupportedFormat(_)
            | AdapterError::Decode { .. } => ErrorKind::Decode,
            AdapterError::NoSaver(_)
            | AdapterError::UnsupportedComponents { .. }
            | AdapterError::Encode { .. } => ErrorKind::Encode,
            AdapterError::Io { kind, .. } | AdapterError::LimitExceeded { kind, .. } => *kind,
            AdapterError::InvalidComponents(_)
            | AdapterError::InvalidDimensions { .. }
            | AdapterError::BufferSize { .. }
            | AdapterError::BufferTooSmall { .. }
            | AdapterError::RowOutOfRange { .. }
            | AdapterError::SessionPoisoned
            | AdapterError::SessionClosed(_) => ErrorKind::Usage,
        }
    }
}
