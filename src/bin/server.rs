//! memwire Server Binary
//!
//! Accepts memcache clients and logs every decoded request.

use std::sync::Arc;

use clap::Parser;
use memwire::network::{Server, TracingHandler};
use memwire::{Config, ProtocolMode};
use tracing_subscriber::{fmt, EnvFilter};

/// memwire Server
#[derive(Parser, Debug)]
#[command(name = "memwire-server")]
#[command(about = "Decode memcache binary and text requests from TCP clients")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:11211")]
    listen: String,

    /// Wire protocol clients speak
    #[arg(short, long, value_enum, default_value = "auto")]
    protocol: ProtocolMode,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Largest accepted value in KB
    #[arg(long, default_value = "1024")]
    max_value_kb: u32,

    /// Read timeout in milliseconds (0 disables)
    #[arg(long, default_value = "5000")]
    read_timeout_ms: u64,

    /// Accept binary frames regardless of their magic byte
    #[arg(long)]
    no_strict_magic: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,memwire=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("memwire Server v{}", memwire::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .listen_addr(&args.listen)
        .protocol(args.protocol)
        .max_connections(args.max_connections)
        .max_value_size(args.max_value_kb.saturating_mul(1024))
        .read_timeout_ms(args.read_timeout_ms)
        .strict_magic(!args.no_strict_magic)
        .build();

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        std::process::exit(2);
    }

    let mut server = Server::new(config, Arc::new(TracingHandler));
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
