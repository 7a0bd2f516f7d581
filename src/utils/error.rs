//! Error types used across `litemsg`.
//!
//! `BrokerError` covers the server lifecycle (startup, registration, I/O).
//! `FrameError` covers a single frame on the wire; those are never fatal to a
//! connection and are only logged.

use std::io;

use crate::client::SessionId;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// The listen address could not be bound. Fatal at startup.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A live session already holds this id.
    #[error("session {0} is already registered")]
    DuplicateSession(SessionId),

    #[error("connection limit of {0} reached")]
    ConnectionLimit(usize),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    #[error("frame exceeds maximum length of {max} bytes")]
    TooLong { max: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}
