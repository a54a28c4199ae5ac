//! Shared test doubles for crate-level unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde_json::{Value, json};

use crate::connection::{Continuation, ErrorReport, Outbound, PluginConnection, PushCall};
use crate::method::MethodTable;
use crate::plugin::{Capabilities, Plugin};

/// Outbound that accepts and discards everything.
pub(crate) struct NullOutbound;

impl Outbound for NullOutbound {
    fn push(&self, _call: PushCall, _continuation: Option<Continuation>) {}

    fn report_error(&self, _report: ErrorReport) {}

    fn is_live(&self) -> bool {
        true
    }
}

pub(crate) fn null_outbound() -> Arc<dyn Outbound> {
    Arc::new(NullOutbound)
}

/// Plugin that counts its hook invocations and exposes `reverse`.
pub(crate) struct CountingPlugin {
    identifier: String,
    capabilities: Capabilities,
    pub(crate) connects: AtomicUsize,
    pub(crate) disconnects: AtomicUsize,
    pub(crate) executed: Arc<AtomicBool>,
}

impl CountingPlugin {
    pub(crate) fn new(identifier: &str) -> Arc<Self> {
        Arc::new(Self::with_capabilities(identifier, Capabilities::foreground()))
    }

    pub(crate) fn background(identifier: &str) -> Arc<Self> {
        Arc::new(Self::with_capabilities(identifier, Capabilities::background()))
    }

    fn with_capabilities(identifier: &str, capabilities: Capabilities) -> Self {
        Self {
            identifier: identifier.to_owned(),
            capabilities,
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            executed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl Plugin for CountingPlugin {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn methods(&self) -> MethodTable {
        let executed = Arc::clone(&self.executed);
        MethodTable::new().with("reverse", move |params: Value, responder| {
            executed.store(true, Ordering::SeqCst);
            let word = params.get("word").and_then(Value::as_str).unwrap_or_default();
            responder.success(json!({ "word": word.chars().rev().collect::<String>() }));
        })
    }

    fn on_connect(&self, _connection: PluginConnection) {
        self.connects.fetch_add(1, Ordering::SeqCst);
    }

    fn on_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}
