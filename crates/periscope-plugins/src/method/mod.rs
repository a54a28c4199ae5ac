//! String-keyed method tables resolved when a plugin is registered.
//!
//! The desktop addresses plugin functionality by method name. Each plugin
//! supplies a [`MethodTable`] once, at registration, and the registry keeps
//! it unchanged for the life of the process.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::responder::Responder;

/// Handler invoked for one method of a plugin.
///
/// The handler receives the call's `params` (`Value::Null` when the call
/// carried none) and the [`Responder`] for the call. It may answer inline or
/// move the responder elsewhere and answer later.
pub type MethodHandler = Arc<dyn Fn(Value, Responder) + Send + Sync>;

/// Mapping from method name to handler.
///
/// # Example
///
/// ```
/// use periscope_plugins::MethodTable;
/// use serde_json::json;
///
/// let table = MethodTable::new().with("ping", |_params, responder| {
///     responder.success(json!({}));
/// });
/// assert!(table.contains("ping"));
/// ```
#[derive(Clone, Default)]
pub struct MethodTable {
    handlers: BTreeMap<String, MethodHandler>,
}

impl MethodTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler, replacing any earlier handler with the same name.
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value, Responder) + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    /// Looks up the handler for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<MethodHandler> {
        self.handlers.get(name).cloned()
    }

    /// Returns `true` when the table exposes `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Returns the method names in lexical order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Returns the number of methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` when the table has no methods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MethodTable")
            .field("methods", &self.names())
            .finish()
    }
}
