//! Error types for transport operations.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced while opening or using a desktop session.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The desktop could not be reached.
    #[error("failed to connect to {endpoint}: {message}")]
    Connect {
        /// Description of the endpoint that was dialled.
        endpoint: String,
        /// Human-readable failure description.
        message: String,
        /// Underlying I/O error, when there is one.
        #[source]
        source: Option<Arc<io::Error>>,
    },
    /// Reading or writing the session failed.
    #[error("transport I/O error: {0}")]
    Io(#[source] Arc<io::Error>),
    /// The session has already been closed.
    #[error("session closed")]
    Closed,
    /// An inbound frame exceeded the size limit.
    #[error("inbound message exceeds {max_size} byte limit")]
    FrameTooLarge {
        /// Configured limit.
        max_size: usize,
    },
    /// An inbound frame was not valid UTF-8.
    #[error("inbound message is not valid UTF-8")]
    InvalidUtf8,
    /// The handshake could not be encoded.
    #[error("failed to encode handshake: {0}")]
    Handshake(#[source] Arc<serde_json::Error>),
}

impl TransportError {
    /// Creates a connection error from an I/O failure.
    pub fn connect(endpoint: impl Into<String>, source: io::Error) -> Self {
        Self::Connect {
            endpoint: endpoint.into(),
            message: source.to_string(),
            source: Some(Arc::new(source)),
        }
    }

    /// Creates a connection error without an underlying cause.
    pub fn refused(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            endpoint: endpoint.into(),
            message: message.into(),
            source: None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(source: io::Error) -> Self {
        Self::Io(Arc::new(source))
    }
}
