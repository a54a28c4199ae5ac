//! Push channel handed to a plugin when it becomes connected.
//!
//! A [`PluginConnection`] lets a plugin send calls to the desktop on its own
//! initiative. The dispatcher behind it wraps each push in the usual `execute`
//! envelope, assigns a correlation id and, when the plugin asked for one,
//! routes the eventual response to a continuation. The connection is bound to
//! the desktop session it was created for; once that session ends, pushes are
//! discarded and pending continuations fail with
//! [`CallFailure::ConnectionLost`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

/// Reason a plugin-initiated call did not succeed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CallFailure {
    /// The desktop answered with an `error` payload.
    #[error("desktop reported an error: {0}")]
    Remote(Value),
    /// The connection closed before a response arrived.
    #[error("connection closed before the desktop responded")]
    ConnectionLost,
}

/// Callback receiving the outcome of a plugin-initiated call.
pub type Continuation = Box<dyn FnOnce(Result<Value, CallFailure>) + Send>;

/// A call a plugin sends towards the desktop.
#[derive(Debug, Clone, PartialEq)]
pub struct PushCall {
    /// Identifier of the sending plugin; becomes `params.api`.
    pub api: String,
    /// Desktop-side method name; becomes `params.method`.
    pub method: String,
    /// Payload; becomes `params.params` when present.
    pub params: Option<Value>,
}

/// Out-of-band failure report for the desktop's error channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// Short description of the failure.
    pub message: String,
    /// Stack trace or other diagnostic context.
    pub stacktrace: String,
}

impl ErrorReport {
    /// Builds a report.
    pub fn new(message: impl Into<String>, stacktrace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stacktrace: stacktrace.into(),
        }
    }
}

/// Sending side implemented by the dispatcher.
///
/// One value is created per desktop session; it refuses to send once that
/// session has been superseded.
pub trait Outbound: Send + Sync {
    /// Sends a plugin-initiated call, registering `continuation` when given.
    fn push(&self, call: PushCall, continuation: Option<Continuation>);

    /// Sends an error report that expects no response.
    fn report_error(&self, report: ErrorReport);

    /// Returns `true` while the session this value belongs to is current.
    fn is_live(&self) -> bool;
}

/// Push handle scoped to one plugin and one desktop session.
#[derive(Clone)]
pub struct PluginConnection {
    plugin: String,
    outbound: Arc<dyn Outbound>,
}

impl PluginConnection {
    /// Binds `outbound` to the plugin named `plugin`.
    pub fn new(plugin: impl Into<String>, outbound: Arc<dyn Outbound>) -> Self {
        Self {
            plugin: plugin.into(),
            outbound,
        }
    }

    /// Returns the identifier of the plugin this connection belongs to.
    #[must_use]
    pub fn plugin(&self) -> &str {
        self.plugin.as_str()
    }

    /// Returns `true` while the desktop session is still current.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.outbound.is_live()
    }

    /// Pushes a call to the desktop without waiting for its response.
    pub fn send(&self, method: impl Into<String>, params: Value) {
        self.outbound.push(self.push_call(method, Some(params)), None);
    }

    /// Pushes a call and invokes `on_response` with its outcome.
    ///
    /// `on_response` runs on the thread that receives the response, or on the
    /// supervisor thread with [`CallFailure::ConnectionLost`] if the session
    /// ends first.
    pub fn call<F>(&self, method: impl Into<String>, params: Value, on_response: F)
    where
        F: FnOnce(Result<Value, CallFailure>) + Send + 'static,
    {
        self.outbound
            .push(self.push_call(method, Some(params)), Some(Box::new(on_response)));
    }

    /// Sends an out-of-band error report to the desktop.
    pub fn report_error(&self, message: impl Into<String>, stacktrace: impl Into<String>) {
        self.outbound
            .report_error(ErrorReport::new(message, stacktrace));
    }

    fn push_call(&self, method: impl Into<String>, params: Option<Value>) -> PushCall {
        PushCall {
            api: self.plugin.clone(),
            method: method.into(),
            params,
        }
    }
}

impl fmt::Debug for PluginConnection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PluginConnection")
            .field("plugin", &self.plugin)
            .field("live", &self.is_live())
            .finish()
    }
}
