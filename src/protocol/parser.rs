//! Incremental Request Parser
//!
//! This module turns the raw bytes of a connection into [`Request`] values.
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((request, consumed)))` - A complete frame; `consumed` bytes were used
//! - `Ok(None)` - The frame is incomplete, read more data and try again
//! - `Err(ParseError)` - The header cannot be understood
//!
//! A frame is complete once the header delimiter (two spaces) has arrived and,
//! for POST, once `Content-Length` body bytes follow it. The parser never looks
//! past the current frame, so bytes of the next request stay in the buffer.
//!
//! ## Frame States
//!
//! ```text
//! AWAITING_HEADER ──"  " found──> AWAITING_BODY (POST) ──body complete──> done
//!        │                                                                  ▲
//!        └──────────────────── GET / DELETE ────────────────────────────────┘
//! ```
//!
//! The parser keeps no state between calls: an incomplete frame is simply
//! re-examined when more bytes arrive. Because of this the result never
//! depends on how the transport split the stream.

use crate::protocol::types::{Method, Request, Resource, CONTENT_LENGTH, DELIMITER};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while framing a request.
///
/// Every variant means the boundary of the next frame can no longer be
/// trusted, so the connection should be closed after reporting it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Method token is not GET, DELETE or POST
    #[error("unknown method: {0:?}")]
    InvalidMethod(String),

    /// Header ended before a path
    #[error("missing request path")]
    MissingPath,

    /// Path does not start with `/key/` or `/counter/`
    #[error("unknown path: {0:?}")]
    InvalidPath(String),

    /// POST header without a `Content-Length` field
    #[error("missing Content-Length")]
    MissingContentLength,

    /// `Content-Length` value is not a decimal integer
    #[error("invalid Content-Length: {0:?}")]
    InvalidContentLength(String),

    /// No header delimiter within the allowed header size
    #[error("header too large: {size} bytes (max: {max})")]
    HeaderTooLarge { size: usize, max: usize },

    /// Declared body exceeds the allowed body size
    #[error("body too large: {size} bytes (max: {max})")]
    BodyTooLarge { size: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Default maximum header size (64 KB)
pub const MAX_HEADER_SIZE: usize = 64 * 1024;

/// Default maximum body size (512 MB)
pub const MAX_BODY_SIZE: usize = 512 * 1024 * 1024;

/// An incremental request parser.
///
/// # Example
///
/// ```
/// use tallykv::protocol::{Method, RequestParser};
/// use bytes::{Buf, BytesMut};
///
/// let mut parser = RequestParser::new();
/// let mut buffer = BytesMut::from(&b"POST /key/a Content-Length 2  hiGET /key/a  "[..]);
///
/// let (request, consumed) = parser.parse(&buffer).unwrap().unwrap();
/// assert_eq!(request.method, Method::Post);
/// buffer.advance(consumed);
///
/// let (request, _) = parser.parse(&buffer).unwrap().unwrap();
/// assert_eq!(request.method, Method::Get);
/// ```
#[derive(Debug, Clone)]
pub struct RequestParser {
    max_header_size: usize,
    max_body_size: usize,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    /// Creates a parser with the default size limits.
    pub fn new() -> Self {
        Self::with_limits(MAX_HEADER_SIZE, MAX_BODY_SIZE)
    }

    /// Creates a parser with custom header and body size limits.
    pub fn with_limits(max_header_size: usize, max_body_size: usize) -> Self {
        Self {
            max_header_size,
            max_body_size,
        }
    }

    /// Attempts to parse one request from the front of the buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((request, consumed)))` - A complete request
    /// - `Ok(None)` - Incomplete data, need more bytes
    /// - `Err(e)` - Malformed header
    pub fn parse(&mut self, buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
        // A trailing space may be the first half of the delimiter
        let header_end = match find_delimiter(buf) {
            Some(pos) => pos,
            None if buf.len() >= self.max_header_size.saturating_add(DELIMITER.len()) => {
                return Err(ParseError::HeaderTooLarge {
                    size: buf.len(),
                    max: self.max_header_size,
                });
            }
            None => return Ok(None),
        };

        if header_end > self.max_header_size {
            return Err(ParseError::HeaderTooLarge {
                size: header_end,
                max: self.max_header_size,
            });
        }

        let mut tokens = buf[..header_end].split(|&b| b == b' ');

        let method_token = tokens.next().unwrap_or_default();
        let method = Method::from_token(method_token)
            .ok_or_else(|| ParseError::InvalidMethod(lossy(method_token)))?;

        let path = tokens.next().ok_or(ParseError::MissingPath)?;
        let resource =
            Resource::from_path(path).ok_or_else(|| ParseError::InvalidPath(lossy(path)))?;

        let body_start = header_end + DELIMITER.len();

        if method != Method::Post {
            let request = Request {
                method,
                resource,
                body: None,
            };
            return Ok(Some((request, body_start)));
        }

        let fields: Vec<&[u8]> = tokens.collect();
        let body_len = self.content_length(&fields)?;

        let frame_end = body_start + body_len;
        if buf.len() < frame_end {
            return Ok(None);
        }

        let body = Bytes::copy_from_slice(&buf[body_start..frame_end]);
        Ok(Some((Request::post(resource, body), frame_end)))
    }

    /// Finds the last `Content-Length` field and parses the value after it.
    fn content_length(&self, fields: &[&[u8]]) -> ParseResult<usize> {
        let pos = fields
            .iter()
            .rposition(|field| field.eq_ignore_ascii_case(CONTENT_LENGTH))
            .ok_or(ParseError::MissingContentLength)?;

        let value = fields.get(pos + 1).copied().unwrap_or_default();
        let length: usize = std::str::from_utf8(value)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ParseError::InvalidContentLength(lossy(value)))?;

        if length > self.max_body_size {
            return Err(ParseError::BodyTooLarge {
                size: length,
                max: self.max_body_size,
            });
        }

        Ok(length)
    }
}

/// Finds the first header delimiter (two consecutive spaces).
#[inline]
fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(DELIMITER.len()).position(|w| w == DELIMITER)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Helper function to parse a single request with the default limits.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(Request, usize)>> {
    RequestParser::new().parse(buf)
}
