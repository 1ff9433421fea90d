//! HTTP protocol implementation.
//!
//! This module implements a small HTTP/1.1 server engine with support for
//! keep-alive connections, Content-Length bodies and pattern routing.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`connection`**: The per-connection state machine
//! - **`frame`**: Deadline-bounded reading of header blocks and bodies
//! - **`pool`**: Size-classed buffer recycling shared by reader and writer
//! - **`parser`**: Request line, header, query and body parsing
//! - **`headers`**: Case-insensitive header map
//! - **`request`**: HTTP request representation
//! - **`router`**: Method and `:param` pattern routing
//! - **`dispatch`**: Static files, routing and the handler panic boundary
//! - **`static_files`**: Serving a directory with traversal protection
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and writes HTTP responses to the client
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! Each client connection goes through a state machine:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for a complete header block
//!        └──────┬──────┘
//!               │ CRLF CRLF received
//!               ▼
//!        ┌──────────────────┐
//!        │    Parsing       │ ← Parse head, read Content-Length body
//!        └──────┬───────────┘     (malformed → 400, too large → 413, close)
//!               │ Request ready
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Static files, route table, handler
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```
//!
//! # Example
//!
//! ```no_run
//! use rawhttp::config::Config;
//! use rawhttp::http::response::Response;
//! use rawhttp::http::router::Router;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut router = Router::new();
//!     router.get("/ping", |_req| Response::ok("pong"));
//!
//!     rawhttp::server::run(&Config::default(), router).await
//! }
//! ```

pub mod connection;
pub mod dispatch;
pub mod frame;
pub mod headers;
pub mod mime;
pub mod parser;
pub mod pool;
pub mod request;
pub mod response;
pub mod router;
pub mod static_files;
pub mod writer;
