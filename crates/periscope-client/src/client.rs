//! Entry point for host applications.

use std::fmt;
use std::sync::Arc;

use periscope_config::{Config, ConfigError};
use periscope_plugins::{ErrorReport, Plugin, PluginError, PluginRegistry, PluginState};
use thiserror::Error;

use crate::connection::{Supervisor, SupervisorHandle};
use crate::dispatch::{Dispatcher, Generation};
use crate::health::{ConnectionReporter, StructuredConnectionReporter};
use crate::transport::Connector;
use crate::transport::socket::SocketConnector;

/// Errors surfaced by [`Client`] and [`ClientHandle`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// A plugin could not be registered.
    #[error(transparent)]
    Plugin(#[from] PluginError),
    /// The supervisor thread could not be started.
    #[error("failed to spawn connection supervisor: {0}")]
    Spawn(#[source] std::io::Error),
    /// The supervisor thread panicked before it could be stopped.
    #[error("connection supervisor panicked")]
    SupervisorPanicked,
}

/// A client that has not started connecting yet.
///
/// Plugins can only be added here; [`Client::start`] consumes the client, so
/// the plugin set is fixed for the lifetime of the connection.
pub struct Client {
    config: Config,
    connector: Arc<dyn Connector>,
    reporter: Arc<dyn ConnectionReporter>,
    registry: PluginRegistry,
}

impl Client {
    /// Creates a client that connects through `connector`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if `config` fails validation.
    pub fn new(config: Config, connector: impl Connector + 'static) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            config,
            connector: Arc::new(connector),
            reporter: Arc::new(StructuredConnectionReporter::new()),
            registry: PluginRegistry::new(),
        })
    }

    /// Creates a client that dials `config.desktop_endpoint` over a socket.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if `config` fails validation.
    pub fn with_socket(config: Config) -> Result<Self, ClientError> {
        let connector = SocketConnector::from_config(&config);
        Self::new(config, connector)
    }

    /// Replaces the default `tracing`-backed connection reporter.
    #[must_use]
    pub fn with_reporter(mut self, reporter: impl ConnectionReporter + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Registers a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Plugin`] when the identifier is empty or
    /// already registered.
    pub fn add_plugin(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), ClientError> {
        self.registry.add_plugin(plugin)?;
        Ok(())
    }

    /// Identifiers of the registered plugins, in registration order.
    #[must_use]
    pub fn plugins(&self) -> Vec<String> {
        self.registry.plugins()
    }

    /// Starts the connection supervisor.
    ///
    /// No plugin is connected until the desktop sends `init` for it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Spawn`] if the supervisor thread cannot start.
    pub fn start(self) -> Result<ClientHandle, ClientError> {
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(self.registry)));
        let supervisor = Supervisor {
            connector: self.connector,
            dispatcher: Arc::clone(&dispatcher),
            identity: self.config.identity,
            reconnect: self.config.reconnect,
            reporter: self.reporter,
        }
        .spawn()
        .map_err(ClientError::Spawn)?;
        Ok(ClientHandle {
            dispatcher,
            supervisor: Some(supervisor),
        })
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Client")
            .field("app", &self.config.identity.app)
            .field("connector", &self.connector.describe())
            .field("plugins", &self.registry.plugins())
            .finish_non_exhaustive()
    }
}

/// Handle to a running client.
///
/// Dropping the handle stops the supervisor without waiting for it.
pub struct ClientHandle {
    dispatcher: Arc<Dispatcher>,
    supervisor: Option<SupervisorHandle>,
}

impl ClientHandle {
    /// Stops retrying, disconnects the live session, and waits for the
    /// supervisor to finish tearing it down.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SupervisorPanicked`] if the supervisor thread
    /// panicked.
    pub fn stop(mut self) -> Result<(), ClientError> {
        let Some(supervisor) = self.supervisor.take() else {
            return Ok(());
        };
        if supervisor.stop() {
            Ok(())
        } else {
            Err(ClientError::SupervisorPanicked)
        }
    }

    /// Returns `true` while a desktop session is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.dispatcher.current_generation().is_some()
    }

    /// Generation of the most recent session; zero before the first one.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.dispatcher.latest_generation()
    }

    /// Lifecycle state of a plugin, if registered.
    #[must_use]
    pub fn plugin_state(&self, identifier: &str) -> Option<PluginState> {
        self.dispatcher.registry().state(identifier)
    }

    /// Sends an out-of-band error report to the desktop.
    ///
    /// Returns `false` when no session is live and the report was dropped.
    pub fn report_error(&self, message: impl Into<String>, stacktrace: impl Into<String>) -> bool {
        self.dispatcher
            .report_error(ErrorReport::new(message, stacktrace))
    }
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.request_stop();
        }
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientHandle")
            .field("connected", &self.is_connected())
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}
