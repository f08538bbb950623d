//! Network Module
//!
//! TCP server and per-connection read loop.
//!
//! ## Architecture
//! - Single acceptor thread polling a non-blocking listener
//! - One thread per connection, capped by `max_connections`
//! - Decoded requests handed to a shared `RequestHandler`

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::{Connection, RequestHandler, TracingHandler};
