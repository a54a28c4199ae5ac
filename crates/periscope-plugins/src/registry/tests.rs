//! Unit tests for the plugin registry.

use std::sync::atomic::Ordering;
use std::sync::{Barrier, Mutex};
use std::thread;
use std::time::Duration;

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::responder::{CallId, Reply, ResponseSink, Responder};
use crate::tests::{CountingPlugin, null_outbound};

#[derive(Default)]
struct CapturedReply(Mutex<Option<Reply>>);

impl ResponseSink for CapturedReply {
    fn deliver(&self, _id: CallId, reply: Reply) {
        *self.0.lock().expect("lock") = Some(reply);
    }
}

struct Populated {
    registry: PluginRegistry,
    layout: Arc<CountingPlugin>,
    network: Arc<CountingPlugin>,
    crash: Arc<CountingPlugin>,
}

#[fixture]
fn populated() -> Populated {
    let layout = CountingPlugin::new("layout");
    let network = CountingPlugin::background("network");
    let crash = CountingPlugin::background("crash");
    let mut registry = PluginRegistry::new();
    registry.add_plugin(layout.clone()).expect("register layout");
    registry.add_plugin(network.clone()).expect("register network");
    registry.add_plugin(crash.clone()).expect("register crash");
    Populated {
        registry,
        layout,
        network,
        crash,
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[test]
fn new_registry_is_empty() {
    let registry = PluginRegistry::new();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
    assert!(registry.plugins().is_empty());
}

#[test]
fn register_rejects_duplicate() {
    let mut registry = PluginRegistry::new();
    registry
        .add_plugin(CountingPlugin::new("layout"))
        .expect("first register");
    let err = registry
        .add_plugin(CountingPlugin::new("layout"))
        .expect_err("duplicate should fail");
    assert_eq!(err, PluginError::duplicate("layout"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn register_rejects_blank_identifier() {
    let mut registry = PluginRegistry::new();
    let err = registry
        .add_plugin(CountingPlugin::new("  "))
        .expect_err("blank identifier should fail");
    assert_eq!(err, PluginError::InvalidIdentifier);
}

#[rstest]
fn registration_does_not_connect(populated: Populated) {
    assert_eq!(populated.layout.connects(), 0);
    assert_eq!(
        populated.registry.state("layout"),
        Some(PluginState::Registered)
    );
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[rstest]
fn plugins_follow_registration_order(populated: Populated) {
    assert_eq!(
        populated.registry.plugins(),
        vec!["layout", "network", "crash"]
    );
    assert_eq!(populated.registry.plugins(), populated.registry.plugins());
}

#[rstest]
fn background_plugins_are_the_flagged_subset(populated: Populated) {
    assert_eq!(
        populated.registry.background_plugins(),
        vec!["network", "crash"]
    );
}

#[rstest]
fn state_of_unknown_plugin_is_none(populated: Populated) {
    assert!(populated.registry.state("missing").is_none());
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[rstest]
fn init_connects_once(populated: Populated) {
    let first = populated
        .registry
        .init("layout", null_outbound())
        .expect("init");
    let second = populated
        .registry
        .init("layout", null_outbound())
        .expect("repeat init");

    assert_eq!(first, Transition::Applied);
    assert_eq!(second, Transition::Unchanged);
    assert_eq!(populated.layout.connects(), 1);
    assert_eq!(
        populated.registry.state("layout"),
        Some(PluginState::Connected)
    );
}

#[rstest]
fn deinit_disconnects(populated: Populated) {
    populated
        .registry
        .init("layout", null_outbound())
        .expect("init");
    let transition = populated.registry.deinit("layout").expect("deinit");

    assert_eq!(transition, Transition::Applied);
    assert_eq!(populated.layout.disconnects(), 1);
    assert_eq!(
        populated.registry.state("layout"),
        Some(PluginState::Registered)
    );
}

#[rstest]
fn deinit_of_registered_plugin_is_a_no_op(populated: Populated) {
    let transition = populated.registry.deinit("layout").expect("deinit");
    assert_eq!(transition, Transition::Unchanged);
    assert_eq!(populated.layout.disconnects(), 0);
}

#[rstest]
#[case::init(true)]
#[case::deinit(false)]
fn lifecycle_of_unknown_plugin_fails(populated: Populated, #[case] init: bool) {
    let result = if init {
        populated.registry.init("ghost", null_outbound())
    } else {
        populated.registry.deinit("ghost")
    };
    assert_eq!(result, Err(PluginError::unknown_plugin("ghost")));
}

#[rstest]
fn disconnect_all_runs_each_hook_once(populated: Populated) {
    populated
        .registry
        .init("layout", null_outbound())
        .expect("init layout");
    populated
        .registry
        .init("crash", null_outbound())
        .expect("init crash");

    assert_eq!(populated.registry.disconnect_all(), 2);
    assert_eq!(populated.registry.disconnect_all(), 0);

    assert_eq!(populated.layout.disconnects(), 1);
    assert_eq!(populated.crash.disconnects(), 1);
    assert_eq!(populated.network.disconnects(), 0);
    for identifier in populated.registry.plugins() {
        assert_eq!(
            populated.registry.state(&identifier),
            Some(PluginState::Registered)
        );
    }
}

#[rstest]
fn reconnecting_after_forced_disconnect_runs_connect_hook_again(populated: Populated) {
    populated
        .registry
        .init("layout", null_outbound())
        .expect("init");
    populated.registry.disconnect_all();
    populated
        .registry
        .init("layout", null_outbound())
        .expect("re-init");
    assert_eq!(populated.layout.connects(), 2);
}

// ---------------------------------------------------------------------------
// Method resolution
// ---------------------------------------------------------------------------

#[rstest]
fn method_requires_connection(populated: Populated) {
    let err = populated
        .registry
        .method("layout", "reverse")
        .err()
        .expect("should refuse");
    assert_eq!(err, PluginError::not_connected("layout"));
    assert!(!populated.layout.executed.load(Ordering::SeqCst));
}

#[rstest]
fn method_rejects_unknown_names(populated: Populated) {
    populated
        .registry
        .init("layout", null_outbound())
        .expect("init");
    let err = populated
        .registry
        .method("layout", "explode")
        .err()
        .expect("should refuse");
    assert_eq!(err, PluginError::unknown_method("layout", "explode"));

    let err = populated
        .registry
        .method("ghost", "reverse")
        .err()
        .expect("should refuse");
    assert_eq!(err, PluginError::unknown_plugin("ghost"));
}

#[rstest]
fn resolved_method_runs_plugin_code(populated: Populated) {
    populated
        .registry
        .init("layout", null_outbound())
        .expect("init");
    let handler = populated
        .registry
        .method("layout", "reverse")
        .expect("resolve");
    let sink = Arc::new(CapturedReply::default());
    handler(
        json!({"word": "hello"}),
        Responder::new(CallId::new(1), "reverse", sink.clone()),
    );

    assert_eq!(
        sink.0.lock().expect("lock").clone(),
        Some(Reply::Success(json!({"word": "olleh"})))
    );
    assert!(populated.layout.executed.load(Ordering::SeqCst));
    assert!(!populated.network.executed.load(Ordering::SeqCst));
}

#[test]
fn missing_params_reach_handler_as_null() {
    let plugin = CountingPlugin::new("layout");
    let mut registry = PluginRegistry::new();
    registry.add_plugin(plugin).expect("register");
    registry.init("layout", null_outbound()).expect("init");

    let handler = registry.method("layout", "reverse").expect("resolve");
    let sink = Arc::new(CapturedReply::default());
    handler(
        Value::Null,
        Responder::new(CallId::new(2), "reverse", sink.clone()),
    );
    assert_eq!(
        sink.0.lock().expect("lock").clone(),
        Some(Reply::Success(json!({"word": ""})))
    );
}

// ---------------------------------------------------------------------------
// Lifecycle serialisation
// ---------------------------------------------------------------------------

/// Plugin whose connect hook parks until the test releases it.
struct GatedPlugin {
    entered: Barrier,
    release: Barrier,
    events: Mutex<Vec<&'static str>>,
}

impl GatedPlugin {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Barrier::new(2),
            release: Barrier::new(2),
            events: Mutex::new(Vec::new()),
        })
    }

    fn record(&self, event: &'static str) {
        self.events.lock().expect("events lock").push(event);
    }

    fn events(&self) -> Vec<&'static str> {
        self.events.lock().expect("events lock").clone()
    }
}

impl Plugin for GatedPlugin {
    fn identifier(&self) -> &str {
        "gated"
    }

    fn methods(&self) -> MethodTable {
        MethodTable::new()
    }

    fn on_connect(&self, _connection: PluginConnection) {
        self.record("connect started");
        self.entered.wait();
        self.release.wait();
        self.record("connect finished");
    }

    fn on_disconnect(&self) {
        self.record("disconnect");
    }
}

#[test]
fn deinit_waits_for_a_running_connect_hook() {
    let plugin = GatedPlugin::new();
    let mut registry = PluginRegistry::new();
    registry.add_plugin(plugin.clone()).expect("register");

    thread::scope(|scope| {
        let init = scope.spawn(|| registry.init("gated", null_outbound()));
        plugin.entered.wait();
        let deinit = scope.spawn(|| registry.deinit("gated"));

        thread::sleep(Duration::from_millis(100));
        let while_connecting = plugin.events();
        plugin.release.wait();
        assert_eq!(while_connecting, vec!["connect started"]);
        assert_eq!(
            init.join().expect("init thread").expect("init"),
            Transition::Applied
        );
        assert_eq!(
            deinit.join().expect("deinit thread").expect("deinit"),
            Transition::Applied
        );
    });

    assert_eq!(
        plugin.events(),
        vec!["connect started", "connect finished", "disconnect"]
    );
    assert_eq!(registry.state("gated"), Some(PluginState::Registered));
}
