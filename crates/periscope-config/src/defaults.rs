use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Port the desktop tool listens on for plain socket connections.
pub const DEFAULT_DESKTOP_PORT: u16 = 8089;

/// Host the client dials when no endpoint is configured.
pub const DEFAULT_DESKTOP_HOST: &str = "127.0.0.1";

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Placeholder used for device details that were not supplied.
pub const DEFAULT_DEVICE: &str = "unknown";

/// Delay before the first reconnection attempt, in milliseconds.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1_000;

/// Upper bound on the reconnection delay, in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Factor applied to the delay after each consecutive failure.
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Endpoint of a desktop tool running on the same machine.
#[must_use]
pub fn default_desktop_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp(DEFAULT_DESKTOP_HOST, DEFAULT_DESKTOP_PORT)
}

/// Operating system reported in the client identity.
#[must_use]
pub const fn default_os() -> &'static str {
    std::env::consts::OS
}

/// Engine version reported in the client identity.
#[must_use]
pub const fn default_sdk_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
