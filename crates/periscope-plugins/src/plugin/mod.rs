//! The plugin contract and its lifecycle vocabulary.

use std::fmt;

use crate::connection::PluginConnection;
use crate::method::MethodTable;

/// Static capability flags declared by a plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    background: bool,
}

impl Capabilities {
    /// Capabilities of a plugin that is only connected on user request.
    #[must_use]
    pub const fn foreground() -> Self {
        Self { background: false }
    }

    /// Capabilities of a plugin the desktop connects as soon as it is
    /// enabled, without waiting for the user to open it.
    #[must_use]
    pub const fn background() -> Self {
        Self { background: true }
    }

    /// Returns `true` for background-eligible plugins.
    #[must_use]
    pub const fn is_background(&self) -> bool {
        self.background
    }
}

/// Lifecycle state of a registered plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Registered but not initialised on the current connection.
    Registered,
    /// Initialised by the desktop; its methods may be executed.
    Connected,
}

impl PluginState {
    /// Returns the canonical lower-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Unit of functionality the desktop can activate independently.
///
/// The registry queries [`identifier`](Self::identifier),
/// [`capabilities`](Self::capabilities) and [`methods`](Self::methods) once,
/// at registration. Lifecycle hooks run while the registry holds the plugin's
/// lifecycle lock, so a hook that returns has completed its transition; hooks
/// must not block on the desktop answering a call.
///
/// # Example
///
/// ```
/// use periscope_plugins::{MethodTable, Plugin, PluginConnection};
/// use serde_json::json;
///
/// struct Ping;
///
/// impl Plugin for Ping {
///     fn identifier(&self) -> &str {
///         "ping"
///     }
///
///     fn methods(&self) -> MethodTable {
///         MethodTable::new().with("ping", |_params, responder| {
///             responder.success(json!({"pong": true}));
///         })
///     }
///
///     fn on_connect(&self, _connection: PluginConnection) {}
///
///     fn on_disconnect(&self) {}
/// }
/// ```
pub trait Plugin: Send + Sync {
    /// Identifier unique within the registry.
    fn identifier(&self) -> &str;

    /// Capability flags; foreground-only unless overridden.
    fn capabilities(&self) -> Capabilities {
        Capabilities::foreground()
    }

    /// Methods the desktop may execute while the plugin is connected.
    fn methods(&self) -> MethodTable;

    /// Called when the desktop initialises the plugin.
    ///
    /// `connection` stays usable for pushes until the desktop session ends.
    fn on_connect(&self, connection: PluginConnection);

    /// Called when the plugin is deinitialised or its session ends.
    ///
    /// Release anything acquired in [`on_connect`](Self::on_connect) here.
    fn on_disconnect(&self);
}
