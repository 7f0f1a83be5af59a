//! Connection Handler Module
//!
//! This module handles individual client connections to TallyKV.
//! Each client gets its own handler task that runs in a loop,
//! reading requests and sending responses.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read bytes from socket  │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Frame request(s)        │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Execute + respond       │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client closes / malformed frame / idle timeout / I/O error
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! ## Buffer Management
//!
//! Incoming bytes accumulate in a BytesMut buffer. A request may arrive split
//! over many reads, and one read may carry several requests. Every complete
//! frame is answered before the next read; bytes of an unfinished frame stay
//! in the buffer until the rest arrives. If the client closes the stream, any
//! unfinished frame is dropped without a response.
//!
//! ## Malformed Frames
//!
//! A header that cannot be parsed leaves no reliable way to find the start of
//! the next frame. The handler answers `400 BadRequest` and closes the
//! connection.

use crate::commands::CommandHandler;
use crate::config::SessionConfig;
use crate::protocol::{ParseError, Request, RequestParser, Response};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total requests processed
    pub requests_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn request_processed(&self) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Generic over the byte stream so that anything bidirectional (a
/// `TcpStream`, an in-memory duplex pipe) can be served.
pub struct ConnectionHandler<S> {
    /// The client stream
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Bytes received but not yet consumed by a complete frame
    buffer: BytesMut,

    /// The command handler (shared storage)
    command_handler: CommandHandler,

    /// Request framer
    parser: RequestParser,

    /// Give up on a silent client after this long
    idle_timeout: Option<Duration>,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The byte stream for this connection
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing requests
    /// * `stats` - Shared connection statistics
    /// * `session` - Timeouts and frame size limits
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
        session: SessionConfig,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            command_handler,
            parser: session.parser(),
            idle_timeout: session.idle_timeout,
            stats,
        }
    }

    /// Runs the main connection loop.
    ///
    /// Returns `Ok(())` once the client closes its end of the stream.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection closed"),
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            // Answer every complete frame already buffered
            loop {
                let request = match self.try_parse_request() {
                    Ok(Some(request)) => request,
                    Ok(None) => break,
                    Err(e) => {
                        self.send_response(&Response::BadRequest).await?;
                        return Err(e.into());
                    }
                };

                let response = self.command_handler.execute(request);
                self.stats.request_processed();
                self.send_response(&response).await?;
            }

            if self.read_more_data().await? == 0 {
                if !self.buffer.is_empty() {
                    debug!(
                        client = %self.addr,
                        discarded = self.buffer.len(),
                        "Dropping unfinished frame"
                    );
                }
                return Ok(());
            }
        }
    }

    /// Attempts to frame a request from the front of the buffer.
    fn try_parse_request(&mut self) -> Result<Option<Request>, ParseError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.parser.parse(&self.buffer) {
            Ok(Some((request, consumed))) => {
                self.buffer.advance(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed request"
                );
                Ok(Some(request))
            }
            Ok(None) => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete request, need more data"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Malformed request");
                Err(e)
            }
        }
    }

    /// Reads more data from the stream into the buffer.
    ///
    /// Returns the number of bytes read; zero means the client closed the stream.
    async fn read_more_data(&mut self) -> Result<usize, ConnectionError> {
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let read = self.stream.get_mut().read_buf(&mut self.buffer);
        let n = match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| ConnectionError::IdleTimeout(limit))??,
            None => read.await?,
        };

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(n)
    }

    /// Sends a response to the client.
    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent response"
        );
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unparseable request header
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    /// No data arrived within the idle timeout
    #[error("Idle for {0:?}")]
    IdleTimeout(Duration),
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion. Errors have already been logged by the handler.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    session: SessionConfig,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats, session);
    let _ = handler.run().await;
}
