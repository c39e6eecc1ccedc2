//! Error types
//!
//! Each layer has its own error enum; [`Error`] wraps them for callers that
//! drive a whole session or server.

use std::io;

use thiserror::Error;

pub use crate::registry::{RegistryError, SinkError};

/// Result alias using the crate-level [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    /// Socket or listener I/O failure
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or oversized frame on a connection
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Registry invariant violation or routing miss
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Outbound delivery failure
    #[error("delivery error: {0}")]
    Sink(#[from] SinkError),
}

impl Error {
    /// Whether this error only means the peer went away
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Io(e) => is_disconnect_kind(e.kind()),
            Error::Protocol(e) => e.is_disconnect(),
            Error::Sink(SinkError::Closed) => true,
            _ => false,
        }
    }
}

/// Framing and decoding errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Transport I/O failure while reading or writing frames
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Frame length prefix exceeds the configured limit
    #[error("frame of {size} bytes exceeds limit of {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// Frame has no tag byte
    #[error("empty frame")]
    EmptyFrame,

    /// Frame ended in the middle of a field
    #[error("unexpected end of frame")]
    UnexpectedEof,

    /// String field is not valid UTF-8
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    /// Unknown response tag (client side)
    #[error("unknown message tag 0x{0:02x}")]
    UnknownTag(u8),

    /// Optional-field marker is neither absent nor present
    #[error("invalid optional marker 0x{0:02x}")]
    InvalidMarker(u8),
}

impl ProtocolError {
    /// Whether this error only means the peer went away
    pub fn is_disconnect(&self) -> bool {
        match self {
            ProtocolError::Io(e) => is_disconnect_kind(e.kind()),
            _ => false,
        }
    }
}

fn is_disconnect_kind(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}
