//! Protocol Module
//!
//! Decoders for the two memcache wire encodings. Both turn bytes into the same
//! canonical [`Request`], so the executor never learns which one a client
//! spoke.
//!
//! ### Binary
//! A 24-byte big-endian header followed by opcode-specific extras and the key.
//! See [`binary`] for the layout.
//!
//! ### Text
//! One space-separated command line terminated by `\n`. See [`text`].
//!
//! ### Requests
//! - GET:    one or more keys (binary frames carry one key plus its opaque)
//! - SET:    key, flags, expiry, value length (the value stays on the stream)
//! - DELETE: key
//! - TOUCH:  key, expiry
//!
//! Decoders are stateless. Each `decode` call consumes exactly one request
//! from the stream, never the value payload of a set.

pub mod binary;
pub mod text;

mod request;
mod stream;
mod value;

use std::fmt;

pub use binary::{BinaryDecoder, Opcode, RequestHeader, HEADER_SIZE, REQUEST_MAGIC};
pub use request::{Expiry, Request, RequestKind};
pub use stream::ByteStream;
pub use text::{TextDecoder, MAX_LINE_LENGTH};
pub use value::read_value;

use crate::error::DecodeError;

/// Decodes one request per call from a byte stream
pub trait Decoder {
    fn decode<S: ByteStream + ?Sized>(
        &self,
        stream: &mut S,
    ) -> Result<(Request, RequestKind), DecodeError>;
}

/// Wire encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Binary,
    Text,
}

impl Protocol {
    /// Guess the encoding from the first byte a client sends
    ///
    /// Binary frames always open with the request magic, which is not a
    /// printable character and so never starts a text command.
    pub fn detect(first_byte: u8) -> Self {
        if first_byte == REQUEST_MAGIC {
            Protocol::Binary
        } else {
            Protocol::Text
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Binary => f.write_str("binary"),
            Protocol::Text => f.write_str("text"),
        }
    }
}

/// Either decoder, picked at runtime
#[derive(Debug, Clone, Copy)]
pub enum AnyDecoder {
    Binary(BinaryDecoder),
    Text(TextDecoder),
}

impl AnyDecoder {
    /// Build the decoder for `protocol`
    ///
    /// `strict_magic` only affects the binary decoder.
    pub fn for_protocol(protocol: Protocol, strict_magic: bool) -> Self {
        match protocol {
            Protocol::Binary => {
                AnyDecoder::Binary(BinaryDecoder::new().with_strict_magic(strict_magic))
            }
            Protocol::Text => AnyDecoder::Text(TextDecoder::new()),
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            AnyDecoder::Binary(_) => Protocol::Binary,
            AnyDecoder::Text(_) => Protocol::Text,
        }
    }
}

impl Decoder for AnyDecoder {
    fn decode<S: ByteStream + ?Sized>(
        &self,
        stream: &mut S,
    ) -> Result<(Request, RequestKind), DecodeError> {
        match self {
            AnyDecoder::Binary(decoder) => decoder.decode(stream),
            AnyDecoder::Text(decoder) => decoder.decode(stream),
        }
    }
}
