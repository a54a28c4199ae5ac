//! Where the desktop tool listens.
//!
//! Endpoints are written as `tcp://host[:port]` or `unix:///absolute/path`.
//! A bare `host` or `host:port` is read as TCP, and a TCP endpoint without a
//! port dials the desktop's well-known port.

use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::defaults::DEFAULT_DESKTOP_PORT;

const SCHEME_SEPARATOR: &str = "://";

/// Address of the desktop tool the client dials.
///
/// Serialised with a `transport` discriminator so settings read
/// `{"transport": "tcp", "host": "127.0.0.1", "port": 8089}`. The port may be
/// omitted and defaults to [`DEFAULT_DESKTOP_PORT`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum SocketEndpoint {
    /// Desktop reachable over TCP, typically through a forwarded device port.
    Tcp {
        /// Host name or address of the desktop.
        host: String,
        /// Port the desktop listens on.
        #[serde(default = "desktop_port")]
        port: u16,
    },
    /// Desktop on the same machine, listening on a Unix domain socket.
    Unix {
        /// Absolute path of the socket.
        path: Utf8PathBuf,
    },
}

const fn desktop_port() -> u16 {
    DEFAULT_DESKTOP_PORT
}

impl SocketEndpoint {
    /// Builds a TCP endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Builds a TCP endpoint on the desktop's default port.
    #[must_use]
    pub fn desktop_on(host: impl Into<String>) -> Self {
        Self::tcp(host, DEFAULT_DESKTOP_PORT)
    }

    /// Builds a Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Checks that the endpoint can actually be dialled.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] for a blank host, port zero, or a Unix
    /// socket path that is empty or relative.
    pub fn validate(&self) -> Result<(), EndpointError> {
        match self {
            Self::Tcp { host, .. } if host.trim().is_empty() => {
                Err(EndpointError::MissingHost(self.to_string()))
            }
            Self::Tcp { port: 0, .. } => Err(EndpointError::ZeroPort),
            Self::Tcp { .. } => Ok(()),
            Self::Unix { path } if path.as_str().is_empty() => Err(EndpointError::EmptyUnixPath),
            Self::Unix { path } if path.is_relative() => {
                Err(EndpointError::RelativeUnixPath(path.clone()))
            }
            Self::Unix { .. } => Ok(()),
        }
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
            Self::Unix { path } => write!(formatter, "unix://{path}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = EndpointError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = if input.contains(SCHEME_SEPARATOR) {
            Url::parse(input)?
        } else {
            Url::parse(&format!("tcp{SCHEME_SEPARATOR}{input}"))?
        };

        let endpoint = match url.scheme() {
            "tcp" => {
                let host = url
                    .host_str()
                    .ok_or_else(|| EndpointError::MissingHost(input.to_owned()))?;
                Self::tcp(host, url.port().unwrap_or(DEFAULT_DESKTOP_PORT))
            }
            "unix" => Self::unix(url.path()),
            other => return Err(EndpointError::UnsupportedScheme(other.to_owned())),
        };
        endpoint.validate()?;
        Ok(endpoint)
    }
}

/// Reasons an endpoint cannot be used to reach the desktop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EndpointError {
    /// Only `tcp` and `unix` are understood.
    #[error("unsupported endpoint scheme '{0}'")]
    UnsupportedScheme(String),
    /// A TCP endpoint named no host.
    #[error("missing desktop host in '{0}'")]
    MissingHost(String),
    /// Port zero cannot be dialled.
    #[error("desktop port must not be zero")]
    ZeroPort,
    /// A Unix endpoint named no socket path.
    #[error("missing Unix socket path")]
    EmptyUnixPath,
    /// Unix socket paths are resolved independently of the working directory.
    #[error("Unix socket path '{0}' must be absolute")]
    RelativeUnixPath(Utf8PathBuf),
    /// The text was not a URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
