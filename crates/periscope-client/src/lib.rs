//! Client-side engine that exposes in-app plugins to a desktop inspection
//! tool.
//!
//! A [`Client`] owns a set of plugins and, once started, a background
//! supervisor that keeps a connection to the desktop alive. The supervisor
//! retries forever with capped exponential backoff. Every connection it
//! installs gets a new [`Generation`], and anything sent on behalf of an
//! older generation is dropped rather than leaking into the new session.
//!
//! The desktop drives plugin lifecycles explicitly. Plugins stay registered
//! but inactive until the desktop sends `init`, return to the registered
//! state on `deinit`, and are force-disconnected whenever the connection
//! drops. Calls to plugin methods travel in an `execute` envelope and are
//! answered through a single-use [`periscope_plugins::Responder`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use periscope_client::Client;
//! use periscope_config::Config;
//! use periscope_plugins::{MethodTable, Plugin, PluginConnection};
//! use serde_json::json;
//!
//! struct Echo;
//!
//! impl Plugin for Echo {
//!     fn identifier(&self) -> &str {
//!         "echo"
//!     }
//!
//!     fn methods(&self) -> MethodTable {
//!         MethodTable::new().with("echo", |params, responder| responder.success(params))
//!     }
//!
//!     fn on_connect(&self, connection: PluginConnection) {
//!         connection.send("ready", json!({}));
//!     }
//!
//!     fn on_disconnect(&self) {}
//! }
//!
//! # fn main() -> Result<(), periscope_client::ClientError> {
//! let mut client = Client::with_socket(Config::for_app("demo"))?;
//! client.add_plugin(Arc::new(Echo))?;
//! let handle = client.start()?;
//! handle.stop()?;
//! # Ok(())
//! # }
//! ```

mod client;
mod connection;
pub mod dispatch;
mod health;
pub mod protocol;
pub mod telemetry;
pub mod transport;

pub use client::{Client, ClientError, ClientHandle};
pub use dispatch::{DispatchError, Dispatcher, Generation, SessionSummary};
pub use health::{ConnectionReporter, StructuredConnectionReporter};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{Connector, Duplex, MessageReceiver, MessageSender, TransportError};

#[cfg(test)]
mod tests;
