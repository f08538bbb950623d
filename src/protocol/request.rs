//! Request definitions
//!
//! The canonical request both decoders produce.

use std::fmt;

use bytes::Bytes;

/// Request kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Get,
    Set,
    Delete,
    Touch,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestKind::Get => "get",
            RequestKind::Set => "set",
            RequestKind::Delete => "delete",
            RequestKind::Touch => "touch",
        };
        f.write_str(name)
    }
}

/// Expiry as it arrived on the wire.
///
/// The binary protocol carries a fixed-width integer. The text protocol
/// hands over the raw token and leaves its interpretation to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    Seconds(u32),
    Raw(String),
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expiry::Seconds(secs) => write!(f, "{}", secs),
            Expiry::Raw(token) => f.write_str(token),
        }
    }
}

/// A decoded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Fetch one or more keys.
    ///
    /// `opaques[i]` belongs to `keys[i]`; text requests carry no opaques.
    Get { keys: Vec<Bytes>, opaques: Vec<u32> },

    /// Store a value of `length` bytes, which still sits on the stream
    Set {
        key: Bytes,
        flags: u32,
        expiry: Expiry,
        length: u32,
    },

    /// Remove a key
    Delete { key: Bytes },

    /// Update the expiry of a key
    Touch { key: Bytes, expiry: Expiry },
}

impl Request {
    /// Get the request kind
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Get { .. } => RequestKind::Get,
            Request::Set { .. } => RequestKind::Set,
            Request::Delete { .. } => RequestKind::Delete,
            Request::Touch { .. } => RequestKind::Touch,
        }
    }

    /// Length of the value payload that follows this request on the stream
    pub fn value_length(&self) -> Option<u32> {
        match self {
            Request::Set { length, .. } => Some(*length),
            _ => None,
        }
    }

    /// Pair a request with its kind
    pub(crate) fn with_kind(self) -> (Request, RequestKind) {
        let kind = self.kind();
        (self, kind)
    }
}

/// One-line summary, keys rendered lossily as UTF-8
impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())?;
        match self {
            Request::Get { keys, opaques } => {
                for key in keys {
                    write!(f, " key={:?}", String::from_utf8_lossy(key))?;
                }
                for opaque in opaques {
                    write!(f, " opaque=0x{:08x}", opaque)?;
                }
                Ok(())
            }
            Request::Set {
                key,
                flags,
                expiry,
                length,
            } => write!(
                f,
                " key={:?} flags={} expiry={} length={}",
                String::from_utf8_lossy(key),
                flags,
                expiry,
                length
            ),
            Request::Delete { key } => write!(f, " key={:?}", String::from_utf8_lossy(key)),
            Request::Touch { key, expiry } => write!(
                f,
                " key={:?} expiry={}",
                String::from_utf8_lossy(key),
                expiry
            ),
        }
    }
}
