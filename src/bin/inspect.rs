//! memwire Inspect CLI
//!
//! Decodes a captured request stream and prints one line per request.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use memwire::network::{Connection, RequestHandler};
use memwire::{Config, ProtocolMode, Request, RequestKind};
use tracing_subscriber::{fmt, EnvFilter};

/// memwire Inspect
#[derive(Parser, Debug)]
#[command(name = "memwire-inspect")]
#[command(about = "Decode a captured memcache request stream")]
#[command(version)]
struct Args {
    /// Capture file to decode ("-" reads stdin)
    input: PathBuf,

    /// Wire protocol of the capture
    #[arg(short, long, value_enum, default_value = "auto")]
    protocol: ProtocolMode,

    /// Largest accepted value in KB
    #[arg(long, default_value = "1024")]
    max_value_kb: u32,

    /// Accept binary frames regardless of their magic byte
    #[arg(long)]
    no_strict_magic: bool,
}

/// Prints each request to stdout
struct PrintHandler;

impl RequestHandler for PrintHandler {
    fn handle(
        &self,
        request: Request,
        _kind: RequestKind,
        value: Option<Bytes>,
    ) -> memwire::Result<()> {
        match value {
            Some(value) => println!("{} value={:?}", request, String::from_utf8_lossy(&value)),
            None => println!("{}", request),
        }
        Ok(())
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let args = Args::parse();

    let input: Box<dyn BufRead> = if args.input.as_os_str() == "-" {
        Box::new(io::stdin().lock())
    } else {
        match File::open(&args.input) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => {
                eprintln!("cannot open {}: {}", args.input.display(), e);
                std::process::exit(2);
            }
        }
    };

    let config = Config::builder()
        .protocol(args.protocol)
        .max_value_size(args.max_value_kb.saturating_mul(1024))
        .strict_magic(!args.no_strict_magic)
        .build();

    let mut connection = Connection::new(input, &config, Arc::new(PrintHandler))
        .with_peer_addr(args.input.display().to_string());

    match connection.serve() {
        Ok(count) => tracing::info!("decoded {} requests", count),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}
