//! Binary protocol decoder
//!
//! ## Wire Format
//!
//! ### Request Header (24 bytes, big-endian)
//! ```text
//! ┌─────────┬──────────┬──────────────┬──────────────┬─────────────┬──────────────┐
//! │Magic (1)│Opcode (1)│ Key len (2)  │Extra len (1) │Data type (1)│ VBucket (2)  │
//! ├─────────┴──────────┴──────────────┴──────────────┴─────────────┴──────────────┤
//! │ Total body length (4)  │  Opaque (4)  │              CAS (8)                   │
//! └────────────────────────┴──────────────┴────────────────────────────────────────┘
//! ```
//!
//! ### Trailing Fields by Opcode
//! - GET    (0x00): key
//! - SET    (0x02): flags (4) + expiry (4) + key, then `value` on the stream
//! - DELETE (0x04): key
//! - TOUCH  (0x1c): expiry (4) + key
//!
//! The value of a SET is never read here. Its length is
//! `total body - extras - key`, and the caller streams it separately.

use bytes::Bytes;

use super::stream::{read_bytes, read_u32, ByteStream};
use super::{Decoder, Expiry, Request, RequestKind};
use crate::error::{DecodeError, Field};

/// Header size in bytes
pub const HEADER_SIZE: usize = 24;

/// Magic byte of a request frame
pub const REQUEST_MAGIC: u8 = 0x80;

/// Opcodes understood by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Get = 0x00,
    Set = 0x02,
    Delete = 0x04,
    Touch = 0x1c,
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> std::result::Result<Self, Self::Error> {
        match byte {
            0x00 => Ok(Opcode::Get),
            0x02 => Ok(Opcode::Set),
            0x04 => Ok(Opcode::Delete),
            0x1c => Ok(Opcode::Touch),
            other => Err(other),
        }
    }
}

impl Opcode {
    /// Number of extras bytes a request with this opcode carries
    pub fn extras_length(self) -> u8 {
        match self {
            Opcode::Set => 8,
            Opcode::Touch => 4,
            Opcode::Get | Opcode::Delete => 0,
        }
    }
}

/// Fixed request header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub magic: u8,
    pub opcode: u8,
    pub key_length: u16,
    pub extra_length: u8,
    pub data_type: u8,
    pub vbucket_id: u16,
    pub total_body_length: u32,
    pub opaque: u32,
    pub cas: u64,
}

impl RequestHeader {
    /// Parse a header from its 24 wire bytes
    pub fn parse(buf: &[u8; HEADER_SIZE]) -> Self {
        Self {
            magic: buf[0],
            opcode: buf[1],
            key_length: u16::from_be_bytes([buf[2], buf[3]]),
            extra_length: buf[4],
            data_type: buf[5],
            vbucket_id: u16::from_be_bytes([buf[6], buf[7]]),
            total_body_length: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            opaque: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
            cas: u64::from_be_bytes([
                buf[16], buf[17], buf[18], buf[19], buf[20], buf[21], buf[22], buf[23],
            ]),
        }
    }

    /// Value payload length, `None` if extras and key overrun the body
    pub fn value_length(&self) -> Option<u32> {
        self.total_body_length
            .checked_sub(u32::from(self.extra_length))?
            .checked_sub(u32::from(self.key_length))
    }

    fn malformed_length(&self) -> DecodeError {
        DecodeError::MalformedLength {
            total_body: self.total_body_length,
            extra_length: self.extra_length,
            key_length: self.key_length,
        }
    }
}

/// Decoder for the binary protocol
#[derive(Debug, Clone, Copy)]
pub struct BinaryDecoder {
    strict_magic: bool,
}

impl Default for BinaryDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryDecoder {
    /// Create a decoder that rejects frames without the request magic
    pub fn new() -> Self {
        Self { strict_magic: true }
    }

    /// Toggle magic byte validation
    ///
    /// Turn it off only when a framing layer above has already checked it.
    pub fn with_strict_magic(mut self, strict: bool) -> Self {
        self.strict_magic = strict;
        self
    }

    /// Whether the magic byte is validated
    pub fn strict_magic(&self) -> bool {
        self.strict_magic
    }

    fn read_header<S: ByteStream + ?Sized>(
        &self,
        stream: &mut S,
    ) -> Result<RequestHeader, DecodeError> {
        let mut buf = [0u8; HEADER_SIZE];
        match stream.read_exact_bytes(&mut buf) {
            Ok(()) => Ok(RequestHeader::parse(&buf)),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(DecodeError::StreamClosed)
            }
            Err(e) => Err(DecodeError::io(Field::Header, e)),
        }
    }
}

impl Decoder for BinaryDecoder {
    fn decode<S: ByteStream + ?Sized>(
        &self,
        stream: &mut S,
    ) -> Result<(Request, RequestKind), DecodeError> {
        let header = self.read_header(stream)?;

        tracing::trace!(
            opcode = header.opcode,
            key_length = header.key_length,
            extra_length = header.extra_length,
            total_body_length = header.total_body_length,
            opaque = header.opaque,
            "binary request header"
        );

        if self.strict_magic && header.magic != REQUEST_MAGIC {
            return Err(DecodeError::InvalidMagic(header.magic));
        }

        let opcode = Opcode::try_from(header.opcode).map_err(DecodeError::UnsupportedOpcode)?;

        // Both checks run before touching the body so a bad frame costs only its header.
        if header.extra_length != opcode.extras_length() {
            return Err(DecodeError::Malformed(format!(
                "opcode 0x{:02x} expects {} bytes of extras, header declares {}",
                header.opcode,
                opcode.extras_length(),
                header.extra_length
            )));
        }
        let length = header
            .value_length()
            .ok_or_else(|| header.malformed_length())?;

        let request = match opcode {
            Opcode::Set => decode_set(stream, &header, length)?,
            Opcode::Get => {
                let key = read_key(stream, &header)?;
                Request::Get {
                    keys: vec![key],
                    opaques: vec![header.opaque],
                }
            }
            Opcode::Delete => Request::Delete {
                key: read_key(stream, &header)?,
            },
            Opcode::Touch => {
                let expiry = read_u32(stream).map_err(|e| DecodeError::io(Field::Expiry, e))?;
                let key = read_key(stream, &header)?;
                Request::Touch {
                    key,
                    expiry: Expiry::Seconds(expiry),
                }
            }
        };

        Ok(request.with_kind())
    }
}

/// Decode SET extras and key
///
/// Format: flags (4) + expiry (4) + key
fn decode_set<S: ByteStream + ?Sized>(
    stream: &mut S,
    header: &RequestHeader,
    length: u32,
) -> Result<Request, DecodeError> {
    let flags = read_u32(stream).map_err(|e| DecodeError::io(Field::Flags, e))?;
    let expiry = read_u32(stream).map_err(|e| DecodeError::io(Field::Expiry, e))?;
    let key = read_key(stream, header)?;

    Ok(Request::Set {
        key,
        flags,
        expiry: Expiry::Seconds(expiry),
        length,
    })
}

fn read_key<S: ByteStream + ?Sized>(
    stream: &mut S,
    header: &RequestHeader,
) -> Result<Bytes, DecodeError> {
    read_bytes(stream, usize::from(header.key_length))
        .map(Bytes::from)
        .map_err(|e| DecodeError::io(Field::Key, e))
}
