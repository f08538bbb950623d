//! # memwire
//!
//! Request decoders for a memory-cache service that speaks two encodings of
//! the same command set:
//! - a binary, length-prefixed encoding with a fixed 24-byte header
//! - a line-oriented text encoding
//!
//! Both decoders produce the same canonical [`Request`], so the executor
//! behind them never needs to know which encoding a client used.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  one Connection per client
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Protocol Detection                           │
//! │          (0x80 magic → binary, otherwise text)               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Binary    │          │    Text     │
//!   │   Decoder   │          │   Decoder   │
//!   └──────┬──────┘          └──────┬──────┘
//!          └────────────┬────────────┘
//!                       ▼
//!               ┌───────────────┐
//!               │    Request    │ ──► RequestHandler (executor)
//!               └───────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::io::Cursor;
//! use memwire::protocol::{Decoder, Request, TextDecoder};
//!
//! let mut stream = Cursor::new(b"get foo bar\r\n".to_vec());
//! let (request, _kind) = TextDecoder::new().decode(&mut stream).unwrap();
//! assert!(matches!(request, Request::Get { ref keys, .. } if keys.len() == 2));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DecodeError, MemwireError, Result};
pub use config::{Config, ProtocolMode};
pub use protocol::{BinaryDecoder, Decoder, Expiry, Protocol, Request, RequestKind, TextDecoder};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of memwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
