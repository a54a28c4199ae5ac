//! Test suites for the client engine.

pub(crate) mod support;

use periscope_config::{ConfigError, SocketEndpoint};
use periscope_plugins::PluginError;
use rstest::rstest;

use crate::transport::memory;
use crate::{Client, ClientError};

use self::support::{TestPlugin, fast_config};

#[rstest]
fn client_rejects_invalid_configuration() {
    let (connector, _peer) = memory::channel();
    let mut config = fast_config();
    config.identity.app = "  ".to_owned();

    let error = Client::new(config, connector).expect_err("blank app name");
    assert!(matches!(
        error,
        ClientError::Config(ConfigError::MissingAppName)
    ));
}

#[rstest]
fn client_rejects_duplicate_plugins() {
    let (connector, _peer) = memory::channel();
    let mut client = Client::new(fast_config(), connector).expect("valid config");
    client
        .add_plugin(TestPlugin::new("test"))
        .expect("first registration");

    let error = client
        .add_plugin(TestPlugin::new("test"))
        .expect_err("duplicate identifier");
    assert!(matches!(
        error,
        ClientError::Plugin(PluginError::DuplicateIdentifier { identifier }) if identifier == "test"
    ));
    assert_eq!(client.plugins(), vec!["test".to_owned()]);
}

#[rstest]
fn socket_clients_dial_the_configured_endpoint() {
    let mut config = fast_config();
    config.desktop_endpoint = SocketEndpoint::tcp("127.0.0.1", 9);
    let client = Client::with_socket(config).expect("valid config");
    assert!(format!("{client:?}").contains("tcp://127.0.0.1:9"));
}

#[rstest]
fn handle_reports_nothing_before_the_first_session() {
    let (connector, peer) = memory::channel();
    peer.set_available(false);
    let mut client = Client::new(fast_config(), connector).expect("valid config");
    client
        .add_plugin(TestPlugin::new("layout"))
        .expect("register");
    let handle = client.start().expect("start");

    assert!(!handle.is_connected());
    assert_eq!(handle.generation().get(), 0);
    assert!(!handle.report_error("boom", "trace"));
    assert!(handle.plugin_state("missing").is_none());
    handle.stop().expect("stop");
}
