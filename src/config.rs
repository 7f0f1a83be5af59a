//! Configuration for the TallyKV server.
//!
//! Everything is set from the command line; there is no config file.

use crate::protocol::parser::{MAX_BODY_SIZE, MAX_HEADER_SIZE};
use crate::protocol::RequestParser;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use std::time::Duration;

/// Command-line arguments for the server
#[derive(Parser, Debug, Clone)]
#[command(name = "tallykv")]
#[command(version)]
#[command(about = "An in-memory key-value server whose values can expire after a number of reads", long_about = None)]
pub struct Config {
    /// Host to bind to
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Close connections that send nothing for this many seconds (default: wait forever)
    #[arg(long, value_name = "SECS")]
    pub idle_timeout: Option<u64>,

    /// Largest accepted request header in bytes
    #[arg(long, default_value_t = MAX_HEADER_SIZE)]
    pub max_header_size: usize,

    /// Largest accepted request body in bytes
    #[arg(long, default_value_t = MAX_BODY_SIZE)]
    pub max_body_size: usize,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-connection settings derived from this configuration.
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            idle_timeout: self.idle_timeout.map(Duration::from_secs),
            max_header_size: self.max_header_size,
            max_body_size: self.max_body_size,
        }
    }
}

/// Settings applied to every client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// `None` waits for input indefinitely
    pub idle_timeout: Option<Duration>,
    pub max_header_size: usize,
    pub max_body_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            max_header_size: MAX_HEADER_SIZE,
            max_body_size: MAX_BODY_SIZE,
        }
    }
}

impl SessionConfig {
    /// Builds a request parser enforcing these limits.
    pub fn parser(&self) -> RequestParser {
        RequestParser::with_limits(self.max_header_size, self.max_body_size)
    }
}
