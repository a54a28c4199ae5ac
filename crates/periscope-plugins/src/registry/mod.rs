//! Plugin registry and lifecycle state machine.
//!
//! The [`PluginRegistry`] stores plugins in registration order together with
//! their lifecycle state. Plugins start out [`PluginState::Registered`]; only
//! an explicit [`init`](PluginRegistry::init) moves them to
//! [`PluginState::Connected`], and [`deinit`](PluginRegistry::deinit) or
//! [`disconnect_all`](PluginRegistry::disconnect_all) move them back. Each
//! plugin has its own lifecycle lock which is held while its hook runs, so two
//! transitions of the same plugin never overlap.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::connection::{Outbound, PluginConnection};
use crate::error::PluginError;
use crate::method::{MethodHandler, MethodTable};
use crate::plugin::{Capabilities, Plugin, PluginState};

/// Tracing target for registry operations.
const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Whether a lifecycle request changed the plugin's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The hook ran and the state changed.
    Applied,
    /// The plugin was already in the requested state; no hook ran.
    Unchanged,
}

struct RegisteredPlugin {
    identifier: String,
    capabilities: Capabilities,
    methods: MethodTable,
    plugin: Arc<dyn Plugin>,
    state: Mutex<PluginState>,
}

impl RegisteredPlugin {
    fn lock_state(&self) -> MutexGuard<'_, PluginState> {
        // The guarded value is a plain enum, so a panicking hook cannot leave
        // it half-written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registry of plugins and their lifecycle state.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use periscope_plugins::{MethodTable, Plugin, PluginConnection, PluginRegistry, PluginState};
///
/// struct Layout;
///
/// impl Plugin for Layout {
///     fn identifier(&self) -> &str {
///         "layout"
///     }
///     fn methods(&self) -> MethodTable {
///         MethodTable::new()
///     }
///     fn on_connect(&self, _connection: PluginConnection) {}
///     fn on_disconnect(&self) {}
/// }
///
/// let mut registry = PluginRegistry::new();
/// registry.add_plugin(Arc::new(Layout)).expect("registration succeeds");
/// assert_eq!(registry.plugins(), vec!["layout".to_owned()]);
/// assert_eq!(registry.state("layout"), Some(PluginState::Registered));
/// ```
#[derive(Default)]
pub struct PluginRegistry {
    entries: Vec<RegisteredPlugin>,
    index: HashMap<String, usize>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin, resolving its capabilities and method table.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidIdentifier`] for a blank identifier and
    /// [`PluginError::DuplicateIdentifier`] if the identifier is taken.
    pub fn add_plugin(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), PluginError> {
        let identifier = plugin.identifier().to_owned();
        if identifier.trim().is_empty() {
            return Err(PluginError::InvalidIdentifier);
        }
        if self.index.contains_key(&identifier) {
            return Err(PluginError::duplicate(identifier));
        }

        let entry = RegisteredPlugin {
            identifier: identifier.clone(),
            capabilities: plugin.capabilities(),
            methods: plugin.methods(),
            plugin,
            state: Mutex::new(PluginState::Registered),
        };
        debug!(
            target: REGISTRY_TARGET,
            plugin = %identifier,
            background = entry.capabilities.is_background(),
            methods = ?entry.methods.names(),
            "plugin registered"
        );
        self.index.insert(identifier, self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Identifiers of every registered plugin, in registration order.
    #[must_use]
    pub fn plugins(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.identifier.clone())
            .collect()
    }

    /// Identifiers of background-eligible plugins, in registration order.
    #[must_use]
    pub fn background_plugins(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.capabilities.is_background())
            .map(|entry| entry.identifier.clone())
            .collect()
    }

    /// Returns the lifecycle state of `identifier`, if registered.
    #[must_use]
    pub fn state(&self, identifier: &str) -> Option<PluginState> {
        self.entry(identifier).map(|entry| *entry.lock_state())
    }

    /// Connects a plugin, handing it a push channel over `outbound`.
    ///
    /// Initialising a connected plugin is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UnknownPlugin`] if no such plugin is registered.
    pub fn init(
        &self,
        identifier: &str,
        outbound: Arc<dyn Outbound>,
    ) -> Result<Transition, PluginError> {
        let entry = self.require(identifier)?;
        let mut state = entry.lock_state();
        if *state == PluginState::Connected {
            debug!(target: REGISTRY_TARGET, plugin = identifier, "plugin already connected");
            return Ok(Transition::Unchanged);
        }

        entry
            .plugin
            .on_connect(PluginConnection::new(identifier, outbound));
        *state = PluginState::Connected;
        info!(target: REGISTRY_TARGET, plugin = identifier, "plugin connected");
        Ok(Transition::Applied)
    }

    /// Disconnects a plugin at the desktop's request.
    ///
    /// Deinitialising a plugin that is not connected is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UnknownPlugin`] if no such plugin is registered.
    pub fn deinit(&self, identifier: &str) -> Result<Transition, PluginError> {
        let entry = self.require(identifier)?;
        Ok(Self::disconnect(entry))
    }

    /// Forces every connected plugin back to [`PluginState::Registered`].
    ///
    /// Used when the desktop session ends without explicit `deinit` calls.
    /// Returns how many plugins were disconnected.
    pub fn disconnect_all(&self) -> usize {
        let disconnected = self
            .entries
            .iter()
            .filter(|entry| Self::disconnect(entry) == Transition::Applied)
            .count();
        if disconnected > 0 {
            info!(
                target: REGISTRY_TARGET,
                count = disconnected,
                "force-disconnected plugins after session loss"
            );
        }
        disconnected
    }

    /// Resolves the handler for `method` on a connected plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::UnknownPlugin`] for unregistered plugins,
    /// [`PluginError::NotConnected`] when the plugin has not been initialised,
    /// and [`PluginError::UnknownMethod`] when its table lacks `method`.
    pub fn method(&self, identifier: &str, method: &str) -> Result<MethodHandler, PluginError> {
        let entry = self.require(identifier)?;
        if *entry.lock_state() != PluginState::Connected {
            return Err(PluginError::not_connected(identifier));
        }
        entry
            .methods
            .get(method)
            .ok_or_else(|| PluginError::unknown_method(identifier, method))
    }

    /// Returns the number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no plugins are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, identifier: &str) -> Option<&RegisteredPlugin> {
        self.index
            .get(identifier)
            .and_then(|position| self.entries.get(*position))
    }

    fn require(&self, identifier: &str) -> Result<&RegisteredPlugin, PluginError> {
        self.entry(identifier)
            .ok_or_else(|| PluginError::unknown_plugin(identifier))
    }

    fn disconnect(entry: &RegisteredPlugin) -> Transition {
        let mut state = entry.lock_state();
        if *state == PluginState::Registered {
            return Transition::Unchanged;
        }
        entry.plugin.on_disconnect();
        *state = PluginState::Registered;
        info!(
            target: REGISTRY_TARGET,
            plugin = %entry.identifier,
            "plugin disconnected"
        );
        Transition::Applied
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PluginRegistry")
            .field("plugins", &self.plugins())
            .finish()
    }
}

#[cfg(test)]
mod tests;
