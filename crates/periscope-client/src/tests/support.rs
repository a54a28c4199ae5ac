//! Test doubles shared by the client's unit and behaviour suites.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use periscope_config::{Config, ReconnectPolicy};
use periscope_plugins::{
    CallFailure, Capabilities, MethodTable, Plugin, PluginConnection, Responder,
};
use serde_json::{Value, json};

use crate::dispatch::Generation;
use crate::health::ConnectionReporter;
use crate::transport::{MessageSender, TransportError};

/// How long tests wait for cross-thread effects before failing.
pub(crate) const PATIENCE: Duration = Duration::from_secs(5);

/// Polls `condition` until it holds or [`PATIENCE`] runs out.
pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + PATIENCE;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Configuration with short reconnect delays.
pub(crate) fn fast_config() -> Config {
    Config {
        reconnect: ReconnectPolicy::new(10, 40, 2),
        ..Config::for_app("periscope-tests")
    }
}

/// Plugin recording its lifecycle and exposing a few test methods.
///
/// * `reverse` answers `{"word": <params.word reversed>}`.
/// * `hold` parks its responder until the test answers it.
/// * `fail` answers with an error payload.
pub(crate) struct TestPlugin {
    identifier: String,
    capabilities: Capabilities,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    executed: Arc<AtomicBool>,
    held: Arc<Mutex<Vec<Responder>>>,
    connection: Mutex<Option<PluginConnection>>,
}

impl TestPlugin {
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
            held: Arc::new(Mutex::new(Vec::new())),
            connection: Mutex::new(None),
        }
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub(crate) fn was_executed(&self) -> bool {
        self.executed.load(Ordering::SeqCst)
    }

    /// Push channel from the most recent `on_connect`, if still connected.
    pub(crate) fn connection(&self) -> Option<PluginConnection> {
        self.connection.lock().expect("connection lock").clone()
    }

    /// Waits for a `hold` call and returns its responder.
    pub(crate) fn take_held(&self) -> Responder {
        let mut taken = None;
        assert!(
            wait_until(|| {
                taken = self.held.lock().expect("held lock").pop();
                taken.is_some()
            }),
            "no held call arrived"
        );
        taken.expect("held responder")
    }
}

impl Plugin for TestPlugin {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn methods(&self) -> MethodTable {
        let executed = Arc::clone(&self.executed);
        let held = Arc::clone(&self.held);
        MethodTable::new()
            .with("reverse", move |params: Value, responder| {
                executed.store(true, Ordering::SeqCst);
                let word = params.get("word").and_then(Value::as_str).unwrap_or_default();
                responder.success(json!({ "word": word.chars().rev().collect::<String>() }));
            })
            .with("hold", move |_params, responder| {
                held.lock().expect("held lock").push(responder);
            })
            .with("fail", |_params, responder: Responder| {
                responder.error(json!({ "message": "failed on purpose" }));
            })
    }

    fn on_connect(&self, connection: PluginConnection) {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.connection.lock().expect("connection lock") = Some(connection);
    }

    fn on_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.connection.lock().expect("connection lock").take();
    }
}

/// Sender that keeps every message it is asked to send.
#[derive(Default)]
pub(crate) struct RecordingSender {
    sent: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl RecordingSender {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Messages sent so far, decoded as JSON.
    pub(crate) fn messages(&self) -> Vec<Value> {
        self.sent
            .lock()
            .expect("sent lock")
            .iter()
            .map(|text| serde_json::from_str(text).expect("sent valid json"))
            .collect()
    }

    /// Waits until at least `count` messages were sent and returns them.
    pub(crate) fn wait_for(&self, count: usize) -> Vec<Value> {
        assert!(
            wait_until(|| self.sent.lock().expect("sent lock").len() >= count),
            "expected {count} messages, got {:?}",
            self.messages()
        );
        self.messages()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl MessageSender for RecordingSender {
    fn send(&self, message: &str) -> Result<(), TransportError> {
        self.sent.lock().expect("sent lock").push(message.to_owned());
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Outcomes delivered to plugin call continuations.
#[derive(Default, Clone)]
pub(crate) struct Outcomes(Arc<Mutex<Vec<Result<Value, CallFailure>>>>);

impl Outcomes {
    pub(crate) fn recorder(&self) -> impl FnOnce(Result<Value, CallFailure>) + Send + 'static {
        let outcomes = Arc::clone(&self.0);
        move |outcome: Result<Value, CallFailure>| {
            outcomes.lock().expect("outcomes lock").push(outcome);
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<Result<Value, CallFailure>> {
        self.0.lock().expect("outcomes lock").clone()
    }

    pub(crate) fn wait_for(&self, count: usize) -> Vec<Result<Value, CallFailure>> {
        assert!(
            wait_until(|| self.0.lock().expect("outcomes lock").len() >= count),
            "expected {count} outcomes, got {:?}",
            self.snapshot()
        );
        self.snapshot()
    }
}

/// Connection transitions observed by [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConnectionEvent {
    Connecting(u32),
    Connected(Generation),
    Failed,
    Disconnected {
        generation: Generation,
        plugins: usize,
        failed_calls: usize,
    },
    Stopped,
}

/// Reporter that records every transition for assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    events: Mutex<Vec<ConnectionEvent>>,
}

impl RecordingReporter {
    pub(crate) fn events(&self) -> Vec<ConnectionEvent> {
        self.events.lock().expect("reporter lock").clone()
    }

    fn record(&self, event: ConnectionEvent) {
        self.events.lock().expect("reporter lock").push(event);
    }
}

impl ConnectionReporter for RecordingReporter {
    fn connecting(&self, attempt: u32) {
        self.record(ConnectionEvent::Connecting(attempt));
    }

    fn connected(&self, generation: Generation) {
        self.record(ConnectionEvent::Connected(generation));
    }

    fn connection_failed(&self, _error: &TransportError, _retry_in: Duration) {
        self.record(ConnectionEvent::Failed);
    }

    fn disconnected(&self, generation: Generation, plugins: usize, failed_calls: usize) {
        self.record(ConnectionEvent::Disconnected {
            generation,
            plugins,
            failed_calls,
        });
    }

    fn stopped(&self) {
        self.record(ConnectionEvent::Stopped);
    }
}
