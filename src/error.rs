//! Error types shared by the protocol engine.
//!
//! Errors fall into two families. [`ConnectionError`] covers transport and
//! framing failures: each one ends the session. [`DispatchError`] covers
//! failures that are absorbed inside the connection loop and reported to the
//! client as an HTTP status.

use std::io;

use thiserror::Error;

use crate::http::parser::ParseError;

/// A failure that terminates a connection session.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// A read or write did not complete before its deadline.
    #[error("timed out waiting on the peer")]
    Timeout,

    /// The peer closed the stream.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// The header block grew past the configured ceiling before the
    /// terminator was seen.
    #[error("request headers exceed {limit} bytes")]
    HeadersTooLarge { limit: usize },

    /// The header block could not be parsed.
    #[error("malformed request: {0}")]
    Malformed(#[from] ParseError),

    /// The declared Content-Length is above the configured body ceiling.
    #[error("declared body of {declared} bytes exceeds limit of {limit}")]
    BodyTooLarge { declared: usize, limit: usize },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl ConnectionError {
    /// Whether this is an ordinary end of session rather than a fault worth
    /// reporting above debug level.
    pub fn is_benign(&self) -> bool {
        matches!(self, ConnectionError::Timeout | ConnectionError::ConnectionClosed)
    }
}

/// A failure while turning a parsed request into a response.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no route for {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// The handler panicked; `message` is the panic payload when it was a
    /// string.
    #[error("handler for {method} {path} panicked: {message}")]
    HandlerFault {
        method: String,
        path: String,
        message: String,
    },
}
