//! Configuration for memwire
//!
//! Centralized configuration with sensible defaults.

use crate::error::{MemwireError, Result};
use crate::protocol::Protocol;

/// Main configuration for a memwire server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Which encoding clients speak
    pub protocol: ProtocolMode,

    /// Largest value payload a set may carry (in bytes)
    pub max_value_size: u32,

    /// Reject binary frames whose magic byte is not the request magic
    pub strict_magic: bool,
}

/// How a connection's encoding is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProtocolMode {
    /// Every connection speaks the binary protocol
    Binary,

    /// Every connection speaks the text protocol
    Text,

    /// Sniff the first byte of each connection
    Auto,
}

impl ProtocolMode {
    /// The fixed protocol, or `None` when it has to be detected
    pub fn fixed(self) -> Option<Protocol> {
        match self {
            ProtocolMode::Binary => Some(Protocol::Binary),
            ProtocolMode::Text => Some(Protocol::Text),
            ProtocolMode::Auto => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:11211".to_string(),
            max_connections: 1024,
            read_timeout_ms: 5000,
            protocol: ProtocolMode::Auto,
            max_value_size: 1024 * 1024, // 1 MB
            strict_magic: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the settings can actually run a server
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(MemwireError::Config("listen address is empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(MemwireError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.max_value_size == 0 {
            return Err(MemwireError::Config(
                "max_value_size must be at least 1 byte".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the protocol mode
    pub fn protocol(mut self, mode: ProtocolMode) -> Self {
        self.config.protocol = mode;
        self
    }

    /// Set the maximum value size (in bytes)
    pub fn max_value_size(mut self, size: u32) -> Self {
        self.config.max_value_size = size;
        self
    }

    /// Enable or disable binary magic validation
    pub fn strict_magic(mut self, strict: bool) -> Self {
        self.config.strict_magic = strict;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
