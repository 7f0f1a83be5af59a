//! Command Handler Module
//!
//! This module maps framed requests onto storage operations.
//!
//! ## Supported Requests
//!
//! | Request                 | Storage operation          |
//! |-------------------------|----------------------------|
//! | `GET /key/<k>`          | read value (may expire it) |
//! | `DELETE /key/<k>`       | delete value               |
//! | `POST /key/<k>`         | insert value (body)        |
//! | `GET /counter/<k>`      | read remaining reads       |
//! | `DELETE /counter/<k>`   | remove counter             |
//! | `POST /counter/<k>`     | add reads (decimal body)   |
//!
//! ## Status Mapping
//!
//! - Missing value or counter: `404 NotFound`
//! - Key locked by a counter, or counter without value: `405 MethodNotAllowed`
//! - Counter body that is not a non-negative integer: `400 BadRequest`

use crate::protocol::{Method, Request, Resource, Response};
use crate::storage::{StorageEngine, StorageError};
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Executes requests against the shared storage engine.
#[derive(Clone)]
pub struct CommandHandler {
    /// The storage engine
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Executes a request and returns the response to send back.
    pub fn execute(&self, request: Request) -> Response {
        let method = request.method;
        let response = self.dispatch(request);
        debug!(%method, status = response.status(), "Executed request");
        response
    }

    /// Dispatches a request to its handler.
    fn dispatch(&self, request: Request) -> Response {
        let Request {
            method,
            resource,
            body,
        } = request;
        let body = body.unwrap_or_default();

        match (method, resource) {
            (Method::Get, Resource::Key(key)) => self.cmd_get_value(&key),
            (Method::Delete, Resource::Key(key)) => self.cmd_delete_value(&key),
            (Method::Post, Resource::Key(key)) => self.cmd_insert_value(key, body),
            (Method::Get, Resource::Counter(key)) => self.cmd_get_counter(&key),
            (Method::Delete, Resource::Counter(key)) => self.cmd_delete_counter(&key),
            (Method::Post, Resource::Counter(key)) => self.cmd_insert_counter(&key, &body),
        }
    }

    // ========================================================================
    // Value commands
    // ========================================================================

    fn cmd_get_value(&self, key: &Bytes) -> Response {
        match self.storage.get_value(key) {
            Some(value) => Response::payload(value),
            None => Response::NotFound,
        }
    }

    fn cmd_delete_value(&self, key: &Bytes) -> Response {
        match self.storage.delete_value(key) {
            Ok(Some(value)) => Response::payload(value),
            Ok(None) => Response::NotFound,
            Err(e) => refused(e),
        }
    }

    fn cmd_insert_value(&self, key: Bytes, value: Bytes) -> Response {
        match self.storage.insert_value(key, value) {
            Ok(()) => Response::Ok,
            Err(e) => refused(e),
        }
    }

    // ========================================================================
    // Counter commands
    // ========================================================================

    fn cmd_get_counter(&self, key: &Bytes) -> Response {
        match self.storage.get_counter(key) {
            Some(limit) => Response::payload(limit.to_string()),
            None => Response::NotFound,
        }
    }

    fn cmd_delete_counter(&self, key: &Bytes) -> Response {
        match self.storage.delete_counter(key) {
            Some(count) => Response::payload(count.to_string()),
            None => Response::NotFound,
        }
    }

    fn cmd_insert_counter(&self, key: &Bytes, body: &[u8]) -> Response {
        let delta = match parse_count(body) {
            Some(delta) => delta,
            None => {
                debug!(body = %String::from_utf8_lossy(body), "Invalid counter value");
                return Response::BadRequest;
            }
        };

        match self.storage.insert_counter(key, delta) {
            Ok(_) => Response::Ok,
            Err(e) => refused(e),
        }
    }
}

fn refused(err: StorageError) -> Response {
    debug!(error = %err, "Request refused");
    Response::MethodNotAllowed
}

/// Parses a counter body as a non-negative decimal integer.
///
/// Surrounding ASCII whitespace is tolerated.
fn parse_count(body: &[u8]) -> Option<u64> {
    std::str::from_utf8(body).ok()?.trim().parse().ok()
}
