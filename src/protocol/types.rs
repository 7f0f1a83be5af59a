//! Wire Protocol Data Types
//!
//! This module defines the requests and responses exchanged with TallyKV.
//! The protocol looks a little like HTTP but is not HTTP: there are no line
//! endings, and every header is terminated by two consecutive spaces.
//!
//! ## Request Format
//!
//! ```text
//! METHOD SP PATH [SP "Content-Length" SP N] SP SP [BODY]
//! ```
//!
//! - `METHOD`: `GET`, `DELETE` or `POST` (case-insensitive)
//! - `PATH`: `/key/<id>` or `/counter/<id>`
//! - `BODY`: exactly `N` raw bytes, POST only
//!
//! ## Examples
//!
//! Read: `GET /key/test  `
//! Write: `POST /key/test Content-Length 10  HelloWorld`
//! Limit reads: `POST /counter/test Content-Length 1  2`
//!
//! ## Response Format
//!
//! ```text
//! 200 OK Content-Length <N>  <payload>
//! 200 OK
//! 404 NotFound
//! 405 MethodNotAllowed
//! 400 BadRequest
//! ```

use bytes::Bytes;
use std::fmt;

/// The header terminator: two consecutive spaces.
pub const DELIMITER: &[u8] = b"  ";

/// Path prefix for value requests.
pub const KEY_PREFIX: &[u8] = b"/key/";

/// Path prefix for counter requests.
pub const COUNTER_PREFIX: &[u8] = b"/counter/";

/// Name of the body length header field (matched case-insensitively).
pub const CONTENT_LENGTH: &[u8] = b"Content-Length";

/// Request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Delete,
    Post,
}

impl Method {
    /// Matches a method token case-insensitively.
    pub fn from_token(token: &[u8]) -> Option<Self> {
        if token.eq_ignore_ascii_case(b"GET") {
            Some(Method::Get)
        } else if token.eq_ignore_ascii_case(b"DELETE") {
            Some(Method::Delete)
        } else if token.eq_ignore_ascii_case(b"POST") {
            Some(Method::Post)
        } else {
            None
        }
    }

    /// The canonical upper-case token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Delete => "DELETE",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a request path points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// `/key/<id>`: the stored value
    Key(Bytes),
    /// `/counter/<id>`: the value's read counter
    Counter(Bytes),
}

impl Resource {
    /// Splits a path token into its family and key.
    ///
    /// The key is everything after the prefix and may be empty.
    pub fn from_path(path: &[u8]) -> Option<Self> {
        if let Some(key) = path.strip_prefix(KEY_PREFIX) {
            Some(Resource::Key(Bytes::copy_from_slice(key)))
        } else {
            path.strip_prefix(COUNTER_PREFIX)
                .map(|key| Resource::Counter(Bytes::copy_from_slice(key)))
        }
    }

    /// The key this resource refers to.
    pub fn key(&self) -> &Bytes {
        match self {
            Resource::Key(key) | Resource::Counter(key) => key,
        }
    }

    fn prefix(&self) -> &'static [u8] {
        match self {
            Resource::Key(_) => KEY_PREFIX,
            Resource::Counter(_) => COUNTER_PREFIX,
        }
    }
}

/// A fully framed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub resource: Resource,
    /// Present only for POST
    pub body: Option<Bytes>,
}

impl Request {
    pub fn get(resource: Resource) -> Self {
        Self {
            method: Method::Get,
            resource,
            body: None,
        }
    }

    pub fn delete(resource: Resource) -> Self {
        Self {
            method: Method::Delete,
            resource,
            body: None,
        }
    }

    pub fn post(resource: Resource, body: impl Into<Bytes>) -> Self {
        Self {
            method: Method::Post,
            resource,
            body: Some(body.into()),
        }
    }

    /// Serializes the request into its wire format.
    ///
    /// This is the client side of the protocol; the server only parses requests.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(self.method.as_str().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.resource.prefix());
        buf.extend_from_slice(self.resource.key());
        if let Some(body) = &self.body {
            buf.push(b' ');
            buf.extend_from_slice(CONTENT_LENGTH);
            buf.push(b' ');
            buf.extend_from_slice(body.len().to_string().as_bytes());
        }
        buf.extend_from_slice(DELIMITER);
        if let Some(body) = &self.body {
            buf.extend_from_slice(body);
        }
        buf
    }
}

/// A response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `200 OK  `
    Ok,
    /// `200 OK Content-Length <N>  <payload>`
    Payload(Bytes),
    /// `404 NotFound  `
    NotFound,
    /// `405 MethodNotAllowed  `
    MethodNotAllowed,
    /// `400 BadRequest  `
    BadRequest,
}

impl Response {
    /// Creates a success response carrying a payload.
    pub fn payload(data: impl Into<Bytes>) -> Self {
        Response::Payload(data.into())
    }

    /// The numeric status code.
    pub fn status(&self) -> u16 {
        match self {
            Response::Ok | Response::Payload(_) => 200,
            Response::NotFound => 404,
            Response::MethodNotAllowed => 405,
            Response::BadRequest => 400,
        }
    }

    /// The status reason token.
    pub fn reason(&self) -> &'static str {
        match self {
            Response::Ok | Response::Payload(_) => "OK",
            Response::NotFound => "NotFound",
            Response::MethodNotAllowed => "MethodNotAllowed",
            Response::BadRequest => "BadRequest",
        }
    }

    /// Serializes the response for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the response into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.status().to_string().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.reason().as_bytes());
        match self {
            Response::Payload(data) => {
                buf.push(b' ');
                buf.extend_from_slice(CONTENT_LENGTH);
                buf.push(b' ');
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(DELIMITER);
                buf.extend_from_slice(data);
            }
            _ => buf.extend_from_slice(DELIMITER),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status(), self.reason())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_case_insensitive() {
        assert_eq!(Method::from_token(b"get"), Some(Method::Get));
        assert_eq!(Method::from_token(b"Delete"), Some(Method::Delete));
        assert_eq!(Method::from_token(b"POST"), Some(Method::Post));
        assert_eq!(Method::from_token(b"PUT"), None);
        assert_eq!(Method::from_token(b""), None);
    }

    #[test]
    fn test_resource_from_path() {
        assert_eq!(
            Resource::from_path(b"/key/test"),
            Some(Resource::Key(Bytes::from("test")))
        );
        assert_eq!(
            Resource::from_path(b"/counter/test"),
            Some(Resource::Counter(Bytes::from("test")))
        );
        assert_eq!(Resource::from_path(b"/key/"), Some(Resource::Key(Bytes::new())));
        assert_eq!(Resource::from_path(b"/keys/test"), None);
        assert_eq!(Resource::from_path(b"/KEY/test"), None);
    }

    #[test]
    fn test_payload_serialize() {
        let response = Response::payload(Bytes::from("HelloWorld"));
        assert_eq!(response.serialize(), b"200 OK Content-Length 10  HelloWorld");
    }

    #[test]
    fn test_status_only_serialize() {
        assert_eq!(Response::Ok.serialize(), b"200 OK  ");
        assert_eq!(Response::NotFound.serialize(), b"404 NotFound  ");
        assert_eq!(Response::MethodNotAllowed.serialize(), b"405 MethodNotAllowed  ");
        assert_eq!(Response::BadRequest.serialize(), b"400 BadRequest  ");
    }

    #[test]
    fn test_empty_payload_keeps_length_header() {
        assert_eq!(
            Response::payload(Bytes::new()).serialize(),
            b"200 OK Content-Length 0  "
        );
    }

    #[test]
    fn test_request_serialize() {
        let get = Request::get(Resource::Key(Bytes::from("test")));
        assert_eq!(get.serialize(), b"GET /key/test  ");

        let post = Request::post(Resource::Counter(Bytes::from("test")), "2");
        assert_eq!(post.serialize(), b"POST /counter/test Content-Length 1  2");
    }
}
