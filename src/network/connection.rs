//! Connection Handler
//!
//! Drives the decoders over a single client stream.

use std::io::BufRead;
use std::sync::Arc;

use bytes::Bytes;

use crate::config::{Config, ProtocolMode};
use crate::error::{DecodeError, Field, MemwireError, Result};
use crate::protocol::{
    read_value, AnyDecoder, ByteStream, Decoder, Protocol, Request, RequestKind,
};

/// Downstream executor of decoded requests
///
/// `value` holds the payload of a set and is `None` for every other request.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: Request, kind: RequestKind, value: Option<Bytes>) -> Result<()>;
}

/// Handler that only logs what it receives
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHandler;

impl RequestHandler for TracingHandler {
    fn handle(&self, request: Request, kind: RequestKind, value: Option<Bytes>) -> Result<()> {
        match &request {
            Request::Get { keys, .. } => {
                let first = keys.first().map(|key| show_key(key)).unwrap_or_default();
                tracing::info!(%kind, keys = keys.len(), %first, "request")
            }
            Request::Set {
                key,
                flags,
                expiry,
                length,
            } => tracing::info!(
                %kind,
                key = %show_key(key),
                flags,
                %expiry,
                length,
                received = value.as_ref().map_or(0, |v| v.len()),
                "request"
            ),
            Request::Delete { key } => tracing::info!(%kind, key = %show_key(key), "request"),
            Request::Touch { key, expiry } => {
                tracing::info!(%kind, key = %show_key(key), %expiry, "request")
            }
        }
        Ok(())
    }
}

fn show_key(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

/// Handles a single client connection
pub struct Connection<S> {
    /// Buffered client stream
    stream: S,

    /// Fixed protocol, or auto-detect on the first byte
    mode: ProtocolMode,

    strict_magic: bool,

    max_value_size: u32,

    /// Executor for decoded requests
    handler: Arc<dyn RequestHandler>,

    /// Peer address for logging
    peer_addr: String,
}

impl<S: BufRead> Connection<S> {
    /// Create a new connection handler
    pub fn new(stream: S, config: &Config, handler: Arc<dyn RequestHandler>) -> Self {
        Self {
            stream,
            mode: config.protocol,
            strict_magic: config.strict_magic,
            max_value_size: config.max_value_size,
            handler,
            peer_addr: "unknown".to_string(),
        }
    }

    /// Set the peer address used in log lines
    pub fn with_peer_addr(mut self, addr: impl Into<String>) -> Self {
        self.peer_addr = addr.into();
        self
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Serve the connection until the client goes away
    ///
    /// Returns the number of requests handled. A clean hang-up (closed,
    /// reset, timed out) is `Ok`; a protocol fault or handler failure is
    /// returned and ends only this connection.
    pub fn serve(&mut self) -> Result<u64> {
        let decoder = match self.pick_decoder()? {
            Some(decoder) => decoder,
            None => {
                tracing::debug!("Client {} closed before sending anything", self.peer_addr);
                return Ok(0);
            }
        };

        tracing::debug!(
            "Serving {} with the {} protocol",
            self.peer_addr,
            decoder.protocol()
        );

        let mut handled = 0u64;
        loop {
            let (request, kind) = match decoder.decode(&mut self.stream) {
                Ok(decoded) => decoded,
                Err(e) if e.is_disconnect() => {
                    tracing::debug!("Client {} disconnected: {}", self.peer_addr, e);
                    return Ok(handled);
                }
                Err(e) => {
                    tracing::warn!("Bad request from {}: {}", self.peer_addr, e);
                    return Err(e.into());
                }
            };

            tracing::trace!("Received {} from {}: {:?}", kind, self.peer_addr, request);

            let value = read_value(
                &mut self.stream,
                &request,
                decoder.protocol(),
                self.max_value_size,
            )
            .map_err(|e| {
                tracing::warn!("Failed reading value from {}: {}", self.peer_addr, e);
                e
            })?;

            self.handler.handle(request, kind, value)?;
            handled += 1;
        }
    }

    fn pick_decoder(&mut self) -> Result<Option<AnyDecoder>> {
        if let Some(protocol) = self.mode.fixed() {
            return Ok(Some(AnyDecoder::for_protocol(protocol, self.strict_magic)));
        }

        let first = match self.stream.peek_byte() {
            Ok(first) => first,
            Err(e) => {
                let e = DecodeError::io(Field::Header, e);
                if e.is_disconnect() {
                    return Ok(None);
                }
                return Err(MemwireError::Decode(e));
            }
        };

        Ok(first.map(|byte| AnyDecoder::for_protocol(Protocol::detect(byte), self.strict_magic)))
    }
}
