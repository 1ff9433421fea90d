//! Accepting connections and running them.

pub mod context;
pub mod listener;
pub mod tls;

pub use listener::{run, Server, TlsListener};
