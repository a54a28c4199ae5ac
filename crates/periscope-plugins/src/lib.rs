//! Plugin model and lifecycle registry for the periscope client engine.
//!
//! An instrumented application exposes introspection features to the desktop
//! tool as plugins. Each plugin is identified by a string, declares whether it
//! is background-eligible, and publishes a [`MethodTable`] of named handlers.
//! The desktop activates plugins individually: `init` connects a plugin and
//! hands it a [`PluginConnection`] for pushing data, `deinit` or the loss of
//! the desktop session disconnects it again.
//!
//! # Architecture
//!
//! The [`PluginRegistry`] owns the plugins and their [`PluginState`]. The
//! dispatcher in `periscope-client` routes desktop calls to the registry and,
//! for `execute`, resolves a [`MethodHandler`] and invokes it with a
//! single-use [`Responder`]. Replies and pushes leave through the
//! [`ResponseSink`] and [`Outbound`] traits, which the dispatcher implements
//! per desktop session so that late answers from an old session are dropped.

pub mod connection;
pub mod error;
pub mod method;
pub mod plugin;
pub mod registry;
pub mod responder;

#[cfg(test)]
mod tests;

pub use self::connection::{
    CallFailure, Continuation, ErrorReport, Outbound, PluginConnection, PushCall,
};
pub use self::error::PluginError;
pub use self::method::{MethodHandler, MethodTable};
pub use self::plugin::{Capabilities, Plugin, PluginState};
pub use self::registry::{PluginRegistry, Transition};
pub use self::responder::{CallId, Reply, Responder, ResponseSink};
