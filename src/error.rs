//! Error types for the chat server and clients.

use std::io;
use thiserror::Error;

/// Errors that stop a server from starting or running.
///
/// Per-connection failures never surface here; a session absorbs them
/// and reports a [`CloseReason`](crate::session::CloseReason) instead.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be created or bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Name lookup for the configured host failed.
    #[error("failed to resolve {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Lookup succeeded but produced no socket address.
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// The listener itself failed after binding.
    #[error("listener error: {0}")]
    Accept(#[source] io::Error),
}

/// Errors raised by the console clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to resolve {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// Reply timeout was negative, infinite or not a number.
    #[error("invalid reply timeout {0}")]
    InvalidTimeout(f64),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
