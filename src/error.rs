//! Error types for memwire
//!
//! `DecodeError` is what the decoders return; `MemwireError` is the unified
//! error for everything layered on top (value reading, connections, config).

use std::fmt;
use std::io;

use thiserror::Error;

/// Result type alias using MemwireError
pub type Result<T> = std::result::Result<T, MemwireError>;

/// The logical field a decoder was reading when a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The fixed 24-byte binary header
    Header,
    /// The 32-bit flags extra
    Flags,
    /// The 32-bit expiry extra
    Expiry,
    /// The key bytes
    Key,
    /// A text command line
    Line,
    /// The value payload following a set
    Value,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Header => "header",
            Field::Flags => "flags",
            Field::Expiry => "expiry",
            Field::Key => "key",
            Field::Line => "line",
            Field::Value => "value",
        };
        f.write_str(name)
    }
}

/// Numeric text tokens that can fail to parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    Flags,
    Length,
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericField::Flags => f.write_str("flags"),
            NumericField::Length => f.write_str("length"),
        }
    }
}

/// Failure to decode a single request
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stream ended before a complete header or line arrived
    #[error("stream closed before a complete request was read")]
    StreamClosed,

    #[error("IO error while reading {field}: {source}")]
    Io {
        field: Field,
        #[source]
        source: io::Error,
    },

    #[error(
        "malformed length: total body {total_body} is shorter than extras {extra_length} + key {key_length}"
    )]
    MalformedLength {
        total_body: u32,
        extra_length: u8,
        key_length: u16,
    },

    #[error("bad {field}: {token:?} is not a valid number")]
    BadNumber { field: NumericField, token: String },

    #[error("invalid magic byte: 0x{0:02x}")]
    InvalidMagic(u8),

    #[error("unsupported opcode: 0x{0:02x}")]
    UnsupportedOpcode(u8),

    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    #[error("malformed request: {0}")]
    Malformed(String),
}

impl DecodeError {
    /// Tag an I/O failure with the field being read.
    ///
    /// `UnexpectedEof` is kept as an I/O failure here; only the header and
    /// line readers promote it to `StreamClosed`.
    pub(crate) fn io(field: Field, source: io::Error) -> Self {
        DecodeError::Io { field, source }
    }

    /// True when the peer closed the stream between requests
    pub fn is_stream_closed(&self) -> bool {
        matches!(self, DecodeError::StreamClosed)
    }

    /// True when the failure means the peer went away or stopped talking
    /// (closed, reset, aborted, timed out) rather than sent bad bytes
    pub fn is_disconnect(&self) -> bool {
        match self {
            DecodeError::StreamClosed => true,
            DecodeError::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

/// Unified error type for memwire operations
#[derive(Debug, Error)]
pub enum MemwireError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Value too large: {length} bytes (max {max})")]
    ValueTooLarge { length: u32, max: u32 },

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
