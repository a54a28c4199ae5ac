//! Domain errors raised by plugin registration and lifecycle operations.
//!
//! Every variant carries the identifiers involved so the dispatcher can turn
//! the error into a descriptive response payload without extra context.

use thiserror::Error;

/// Errors arising from plugin registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PluginError {
    /// A plugin with the same identifier is already registered.
    #[error("plugin '{identifier}' is already registered")]
    DuplicateIdentifier {
        /// Identifier that was registered twice.
        identifier: String,
    },

    /// The plugin identifier was empty or whitespace.
    #[error("plugin identifier must not be empty")]
    InvalidIdentifier,

    /// No plugin with the requested identifier is registered.
    #[error("plugin '{identifier}' is not registered")]
    UnknownPlugin {
        /// Identifier that was looked up.
        identifier: String,
    },

    /// The plugin exists but has not been initialised on this connection.
    #[error("plugin '{identifier}' is not connected")]
    NotConnected {
        /// Identifier of the inactive plugin.
        identifier: String,
    },

    /// The plugin does not expose the requested method.
    #[error("plugin '{identifier}' has no method '{method}'")]
    UnknownMethod {
        /// Identifier of the plugin.
        identifier: String,
        /// Method name that was requested.
        method: String,
    },
}

impl PluginError {
    /// Creates a duplicate identifier error.
    pub fn duplicate(identifier: impl Into<String>) -> Self {
        Self::DuplicateIdentifier {
            identifier: identifier.into(),
        }
    }

    /// Creates an unknown plugin error.
    pub fn unknown_plugin(identifier: impl Into<String>) -> Self {
        Self::UnknownPlugin {
            identifier: identifier.into(),
        }
    }

    /// Creates a not-connected error.
    pub fn not_connected(identifier: impl Into<String>) -> Self {
        Self::NotConnected {
            identifier: identifier.into(),
        }
    }

    /// Creates an unknown method error.
    pub fn unknown_method(identifier: impl Into<String>, method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            identifier: identifier.into(),
            method: method.into(),
        }
    }

    /// Short, stable name of the error kind used in wire payloads.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateIdentifier { .. } => "DuplicateIdentifier",
            Self::InvalidIdentifier => "InvalidIdentifier",
            Self::UnknownPlugin { .. } => "UnknownPlugin",
            Self::NotConnected { .. } => "NotConnected",
            Self::UnknownMethod { .. } => "UnknownMethod",
        }
    }
}
