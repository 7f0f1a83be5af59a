//! Wire Protocol Implementation
//!
//! This module implements TallyKV's request/response protocol: a space-delimited,
//! HTTP-lookalike format carried over a raw byte stream.
//!
//! ## Modules
//!
//! - `types`: `Request`, `Response` and their wire encoding
//! - `parser`: Incremental framing of incoming requests
//!
//! ## Example
//!
//! ```
//! use tallykv::protocol::{parse_message, Request, Resource, Response};
//! use bytes::Bytes;
//!
//! // Parsing incoming data
//! let data = b"GET /key/name  ";
//! let (request, consumed) = parse_message(data).unwrap().unwrap();
//! assert_eq!(request, Request::get(Resource::Key(Bytes::from("name"))));
//! assert_eq!(consumed, data.len());
//!
//! // Creating responses
//! let response = Response::payload(Bytes::from("Tally"));
//! assert_eq!(response.serialize(), b"200 OK Content-Length 5  Tally");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_message, ParseError, ParseResult, RequestParser};
pub use types::{Method, Request, Resource, Response};
