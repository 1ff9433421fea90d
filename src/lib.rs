//! rawhttp - a small HTTP/1.1 server over raw sockets.
//!
//! Core library for connection handling, routing and serving.

pub mod config;
pub mod error;
pub mod http;
pub mod server;
