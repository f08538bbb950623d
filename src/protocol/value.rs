//! Value payload reading
//!
//! Decoders stop right before the value of a set. Whoever executes the
//! request pulls the payload with `read_value` once it has decided to accept
//! it.

use bytes::Bytes;

use super::stream::{read_bytes, ByteStream};
use super::{Protocol, Request};
use crate::error::{DecodeError, Field, MemwireError, Result};

/// Read the value payload that follows `request`, if any
///
/// Text payloads end with `\r\n` (a bare `\n` is tolerated), which is
/// consumed as well. Values longer than `max_size` are refused before a
/// single payload byte is read.
pub fn read_value<S: ByteStream + ?Sized>(
    stream: &mut S,
    request: &Request,
    protocol: Protocol,
    max_size: u32,
) -> Result<Option<Bytes>> {
    let length = match request.value_length() {
        Some(length) => length,
        None => return Ok(None),
    };

    if length > max_size {
        return Err(MemwireError::ValueTooLarge {
            length,
            max: max_size,
        });
    }

    let value = read_bytes(stream, length as usize).map_err(|e| DecodeError::io(Field::Value, e))?;

    if protocol == Protocol::Text {
        read_terminator(stream)?;
    }

    Ok(Some(Bytes::from(value)))
}

fn read_terminator<S: ByteStream + ?Sized>(stream: &mut S) -> Result<()> {
    let first = stream
        .peek_byte()
        .map_err(|e| DecodeError::io(Field::Value, e))?;

    let expected: &[u8] = match first {
        Some(b'\r') => b"\r\n",
        Some(b'\n') => b"\n",
        Some(_) => {
            return Err(DecodeError::Malformed(
                "value is not followed by a line terminator".to_string(),
            )
            .into())
        }
        None => return Err(DecodeError::StreamClosed.into()),
    };

    let mut terminator = vec![0u8; expected.len()];
    stream
        .read_exact_bytes(&mut terminator)
        .map_err(|e| DecodeError::io(Field::Value, e))?;

    if terminator != expected {
        return Err(DecodeError::Malformed(
            "value is not followed by a line terminator".to_string(),
        )
        .into());
    }

    Ok(())
}
