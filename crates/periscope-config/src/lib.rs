//! Shared configuration for the periscope client engine.
//!
//! The engine is embedded in an instrumented application, so configuration is
//! supplied by the host: either deserialised from the host's own settings
//! (every field has a default) or assembled in code. [`Config::validate`]
//! checks the values the connection supervisor relies on before the client
//! starts.

mod defaults;
mod identity;
mod logging;
mod reconnect;
mod socket;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_DESKTOP_HOST, DEFAULT_DESKTOP_PORT,
    DEFAULT_INITIAL_DELAY_MS, DEFAULT_LOG_FILTER, DEFAULT_MAX_DELAY_MS, default_desktop_endpoint,
    default_log_filter, default_log_filter_string, default_log_format, default_os,
    default_sdk_version,
};
pub use identity::ClientIdentity;
pub use logging::{LogFormat, LogFormatParseError};
pub use reconnect::ReconnectPolicy;
pub use socket::{EndpointError, SocketEndpoint};

/// Resolved client configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Identity presented to the desktop when connecting.
    pub identity: ClientIdentity,
    /// Where the desktop tool listens.
    pub desktop_endpoint: SocketEndpoint,
    /// Backoff between connection attempts.
    pub reconnect: ReconnectPolicy,
    /// `tracing` filter expression.
    pub log_filter: String,
    /// Output format for log events.
    pub log_format: LogFormat,
}

impl Config {
    /// Builds the default configuration for the named application.
    #[must_use]
    pub fn for_app(app: impl Into<String>) -> Self {
        Self {
            identity: ClientIdentity::for_app(app),
            ..Self::default()
        }
    }

    /// Returns the identity presented to the desktop.
    #[must_use]
    pub const fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Returns the desktop endpoint.
    #[must_use]
    pub const fn desktop_endpoint(&self) -> &SocketEndpoint {
        &self.desktop_endpoint
    }

    /// Returns the reconnect policy.
    #[must_use]
    pub const fn reconnect(&self) -> &ReconnectPolicy {
        &self.reconnect
    }

    /// Returns the configured log filter.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Checks the invariants the client relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the application name is blank, the
    /// desktop endpoint cannot be dialled, or the reconnect policy could
    /// never produce a usable delay.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.app.trim().is_empty() {
            return Err(ConfigError::MissingAppName);
        }
        self.desktop_endpoint.validate()?;
        let policy = &self.reconnect;
        if policy.initial_delay_ms == 0 {
            return Err(ConfigError::ZeroInitialDelay);
        }
        if policy.max_delay_ms < policy.initial_delay_ms {
            return Err(ConfigError::DelayBoundsInverted {
                initial_ms: policy.initial_delay_ms,
                max_ms: policy.max_delay_ms,
            });
        }
        if policy.multiplier == 0 {
            return Err(ConfigError::ZeroMultiplier);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identity: ClientIdentity::default(),
            desktop_endpoint: default_desktop_endpoint(),
            reconnect: ReconnectPolicy::default(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

/// Reasons a [`Config`] is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `identity.app` was empty.
    #[error("identity.app must name the instrumented application")]
    MissingAppName,
    /// The first reconnect delay was zero.
    #[error("reconnect.initial_delay_ms must be greater than zero")]
    ZeroInitialDelay,
    /// The delay cap was below the first delay.
    #[error("reconnect.max_delay_ms ({max_ms}) is below initial_delay_ms ({initial_ms})")]
    DelayBoundsInverted {
        /// Configured initial delay.
        initial_ms: u64,
        /// Configured maximum delay.
        max_ms: u64,
    },
    /// The backoff multiplier was zero.
    #[error("reconnect.multiplier must be at least 1")]
    ZeroMultiplier,
    /// The desktop endpoint cannot be dialled.
    #[error("desktop_endpoint is unusable: {0}")]
    Endpoint(#[from] EndpointError),
}
