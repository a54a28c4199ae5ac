//! Error types for inbound call dispatch.
//!
//! The dispatcher turns every variant into a response `error` payload with
//! [`DispatchError::to_payload`]. A [`DispatchError::MalformedMessage`] is
//! answered only when an `id` can still be read from the message; otherwise
//! it is logged and dropped.

use std::io;

use periscope_plugins::PluginError;
use serde_json::{Value, json};
use thiserror::Error;

/// Errors surfaced while decoding and routing inbound messages.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The message was not a JSON object of a recognised shape.
    #[error("malformed message: {message}")]
    MalformedMessage {
        /// Decoder diagnostic.
        message: String,
        /// Underlying JSON error, when decoding failed inside `serde_json`.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The call named a method the client does not implement.
    #[error("unknown method '{method}'")]
    UnknownMethod {
        /// Method name as received.
        method: String,
    },

    /// The call's parameters were missing or had the wrong shape.
    #[error("invalid params for '{method}': {message}")]
    InvalidParams {
        /// Method whose parameters were rejected.
        method: String,
        /// Decoder diagnostic.
        message: String,
    },

    /// The plugin registry rejected the call.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// The thread for a plugin method could not be started.
    #[error("failed to start '{method}' on plugin '{plugin}': {source}")]
    Execution {
        /// Plugin identifier.
        plugin: String,
        /// Method within the plugin.
        method: String,
        /// Spawn failure.
        #[source]
        source: io::Error,
    },

    /// An outbound message could not be encoded.
    #[error("failed to serialise message: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl DispatchError {
    /// Creates a malformed-message error from a serde error.
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedMessage {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed-message error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMessage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an unknown-method error.
    pub fn unknown_method(method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            method: method.into(),
        }
    }

    /// Creates an invalid-params error.
    pub fn invalid_params(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParams {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Creates an error for a plugin method that could not be started.
    pub fn execution(
        plugin: impl Into<String>,
        method: impl Into<String>,
        source: io::Error,
    ) -> Self {
        Self::Execution {
            plugin: plugin.into(),
            method: method.into(),
            source,
        }
    }

    /// Returns the error name carried in response payloads.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::MalformedMessage { .. } => "MalformedMessage",
            Self::UnknownMethod { .. } => "UnknownMethod",
            Self::InvalidParams { .. } => "InvalidParams",
            Self::Plugin(error) => error.kind(),
            Self::Execution { .. } => "PluginExecutionError",
            Self::Serialize(_) => "SerializeError",
        }
    }

    /// Builds the `error` payload sent back to the desktop.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        json!({
            "name": self.name(),
            "message": self.to_string(),
        })
    }
}
