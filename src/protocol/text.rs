//! Text protocol decoder
//!
//! ## Wire Format
//!
//! One ASCII command line per request, fields separated by a single space:
//! ```text
//! set <key> <flags> <expiry> <length>\r\n
//! get <key> [<key> ...]\r\n
//! delete <key>\r\n
//! touch <key> <expiry>\r\n
//! ```
//!
//! Splitting is literal: two spaces in a row produce an empty token, and
//! there is no quoting or escaping. Expiry tokens are handed over unparsed.

use bytes::Bytes;

use super::stream::ByteStream;
use super::{Decoder, Expiry, Request, RequestKind};
use crate::error::{DecodeError, Field, NumericField};

/// Longest command line accepted by default, terminator included
pub const MAX_LINE_LENGTH: usize = 8192;

/// Decoder for the text protocol
#[derive(Debug, Clone, Copy)]
pub struct TextDecoder {
    max_line_length: usize,
}

impl Default for TextDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDecoder {
    /// Create a decoder that accepts lines up to `MAX_LINE_LENGTH` bytes
    pub fn new() -> Self {
        Self {
            max_line_length: MAX_LINE_LENGTH,
        }
    }

    /// Set the longest command line, terminator included
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Longest command line this decoder reads before giving up
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }
}

impl Decoder for TextDecoder {
    fn decode<S: ByteStream + ?Sized>(
        &self,
        stream: &mut S,
    ) -> Result<(Request, RequestKind), DecodeError> {
        let line = read_line(stream, self.max_line_length)?;
        let tokens: Vec<&str> = line.trim_end().split(' ').collect();

        tracing::trace!(command = tokens[0], tokens = tokens.len(), "text request line");

        let request = match tokens[0] {
            "set" => decode_set(&tokens)?,
            "get" => decode_get(&tokens)?,
            "delete" => Request::Delete {
                key: key_token(&tokens, "delete <key>")?,
            },
            "touch" => {
                let key = key_token(&tokens, "touch <key> <expiry>")?;
                let expiry = token(&tokens, 2, "touch <key> <expiry>")?;
                Request::Touch {
                    key,
                    expiry: Expiry::Raw(expiry.to_string()),
                }
            }
            other => return Err(DecodeError::UnknownCommand(other.to_string())),
        };

        Ok(request.with_kind())
    }
}

/// Read one line including its `\n`, never more than `max` bytes
fn read_line<S: ByteStream + ?Sized>(stream: &mut S, max: usize) -> Result<String, DecodeError> {
    let mut buf = Vec::new();
    let read = stream
        .read_until_delim(b'\n', &mut buf, max)
        .map_err(|e| DecodeError::io(Field::Line, e))?;

    if buf.last() != Some(&b'\n') {
        if read > 0 && read >= max {
            return Err(DecodeError::Malformed(format!(
                "command line exceeds {} bytes",
                max
            )));
        }
        // A line cut off by the end of the stream is as good as no line.
        return Err(DecodeError::StreamClosed);
    }

    String::from_utf8(buf)
        .map_err(|_| DecodeError::Malformed("command line is not valid UTF-8".to_string()))
}

/// Decode `set <key> <flags> <expiry> <length>`
///
/// Length is checked before flags, so a line bad in both reports length.
fn decode_set(tokens: &[&str]) -> Result<Request, DecodeError> {
    const USAGE: &str = "set <key> <flags> <expiry> <length>";

    let length = parse_number(token(tokens, 4, USAGE)?, NumericField::Length)?;
    let flags = parse_number(token(tokens, 2, USAGE)?, NumericField::Flags)?;

    Ok(Request::Set {
        key: Bytes::copy_from_slice(tokens[1].as_bytes()),
        flags,
        expiry: Expiry::Raw(tokens[3].to_string()),
        length,
    })
}

/// Decode `get <key> [<key> ...]`
fn decode_get(tokens: &[&str]) -> Result<Request, DecodeError> {
    if tokens.len() < 2 {
        return Err(DecodeError::Malformed(
            "expected get <key> [<key> ...]".to_string(),
        ));
    }

    let keys = tokens[1..]
        .iter()
        .map(|key| Bytes::copy_from_slice(key.as_bytes()))
        .collect();

    Ok(Request::Get {
        keys,
        opaques: Vec::new(),
    })
}

fn token<'a>(tokens: &[&'a str], index: usize, usage: &str) -> Result<&'a str, DecodeError> {
    tokens
        .get(index)
        .copied()
        .ok_or_else(|| DecodeError::Malformed(format!("expected {}", usage)))
}

fn key_token(tokens: &[&str], usage: &str) -> Result<Bytes, DecodeError> {
    token(tokens, 1, usage).map(|key| Bytes::copy_from_slice(key.as_bytes()))
}

fn parse_number(token: &str, field: NumericField) -> Result<u32, DecodeError> {
    token.trim().parse().map_err(|_| DecodeError::BadNumber {
        field,
        token: token.to_string(),
    })
}
