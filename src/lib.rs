//! # TallyKV - An In-Memory Key-Value Server with Read-Limited Values
//!
//! TallyKV stores opaque values under string keys and serves them over a small
//! space-delimited text protocol. Any value can be given a read counter; once
//! it has been read that many times it disappears on its own.
//!
//! ## Features
//!
//! - **Read-Count Expiry**: A counter on a key deletes the value after N reads
//! - **Locking**: A value with a counter can be neither replaced nor deleted
//! - **Stream Framing**: Requests are assembled from arbitrarily fragmented input
//! - **Async I/O**: Built on Tokio, one task per client connection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              TallyKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐   ┌───────────────────────────────┐ │
//! │                     │  Request    │   │         StorageEngine         │ │
//! │                     │  Parser     │   │  ┌────────┐ ┌────────┐        │ │
//! │                     └─────────────┘   │  │Shard 0 │ │Shard N │ ...    │ │
//! │                                       │  │values  │ │values  │        │ │
//! │                                       │  │counters│ │counters│        │ │
//! │                                       │  └────────┘ └────────┘        │ │
//! │                                       └───────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use tallykv::commands::CommandHandler;
//! use tallykv::config::SessionConfig;
//! use tallykv::connection::{handle_connection, ConnectionStats};
//! use tallykv::storage::StorageEngine;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = Arc::new(StorageEngine::new());
//!     let stats = Arc::new(ConnectionStats::new());
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let handler = CommandHandler::new(Arc::clone(&storage));
//!         let stats = Arc::clone(&stats);
//!
//!         tokio::spawn(handle_connection(stream, addr, handler, stats, SessionConfig::default()));
//!     }
//! }
//! ```
//!
//! ## Protocol
//!
//! ```text
//! POST /key/test Content-Length 10  HelloWorld   ->  200 OK
//! POST /counter/test Content-Length 1  2         ->  200 OK
//! GET /key/test                                  ->  200 OK Content-Length 10  HelloWorld
//! GET /counter/test                              ->  200 OK Content-Length 1  1
//! GET /key/test                                  ->  200 OK Content-Length 10  HelloWorld
//! GET /key/test                                  ->  404 NotFound
//! ```
//!
//! Every header ends with two spaces; there are no newlines on the wire.
//!
//! ## Module Overview
//!
//! - [`protocol`]: Request framing and response encoding
//! - [`storage`]: Thread-safe value/counter store
//! - [`commands`]: Maps requests onto storage operations
//! - [`connection`]: Client connection management
//! - [`config`]: Command-line configuration

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::{Config, SessionConfig};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{ParseError, Request, RequestParser, Response};
pub use storage::{ReadLimit, StorageEngine, StorageError};

/// The default port TallyKV listens on
pub const DEFAULT_PORT: u16 = 8080;

/// The default host TallyKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of TallyKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
