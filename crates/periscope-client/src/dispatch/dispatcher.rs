//! Routing of inbound messages to the registry and plugin methods.

use std::io;
use std::sync::{Arc, mpsc};
use std::thread;

use periscope_plugins::{
    CallFailure, ErrorReport, MethodHandler, Outbound, PluginRegistry, Reply, Responder,
    ResponseSink,
};
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use super::errors::DispatchError;
use super::pending::PendingTable;
use super::router::{DISPATCH_TARGET, Method};
use super::session::{ConnectionSlot, Generation, SessionLink};
use crate::protocol::{
    self, ExecuteParams, InboundCall, InboundMessage, InboundResponse, LifecycleParams,
};
use crate::transport::MessageSender;

const EXECUTE_THREAD_NAME: &str = "periscope-execute";

/// What ending a session cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSummary {
    /// Plugins forced back to the registered state.
    pub disconnected_plugins: usize,
    /// Client-initiated calls failed with [`CallFailure::ConnectionLost`].
    pub failed_calls: usize,
}

/// Decodes inbound messages and routes them.
///
/// Inbound messages are handled in arrival order on the caller's thread.
/// Lifecycle calls complete inline; `execute` handlers run on their own
/// thread so a slow plugin method never holds up the receive loop.
pub struct Dispatcher {
    registry: Arc<PluginRegistry>,
    slot: Arc<ConnectionSlot>,
    pending: Arc<PendingTable>,
}

impl Dispatcher {
    /// Creates a dispatcher serving `registry`.
    #[must_use]
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            slot: Arc::new(ConnectionSlot::new()),
            pending: Arc::new(PendingTable::new()),
        }
    }

    /// Registry the dispatcher routes to.
    #[must_use]
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Installs a freshly opened session and returns its generation.
    pub fn session_opened(&self, sender: Arc<dyn MessageSender>) -> Generation {
        let generation = self.slot.install(sender);
        self.pending.begin(generation);
        debug!(target: DISPATCH_TARGET, %generation, "session opened");
        generation
    }

    /// Tears down `generation` after its transport closed.
    ///
    /// Outstanding client-initiated calls fail with
    /// [`CallFailure::ConnectionLost`] and every connected plugin is forced
    /// back to the registered state before this returns.
    pub fn session_closed(&self, generation: Generation) -> SessionSummary {
        self.slot.clear(generation);
        let pending = self.pending.drain(generation);
        let failed_calls = pending.len();
        for call in pending {
            debug!(
                target: DISPATCH_TARGET,
                %generation,
                method = %call.method,
                "failing call after session loss"
            );
            call.complete(Err(CallFailure::ConnectionLost));
        }
        let disconnected_plugins = self.registry.disconnect_all();
        SessionSummary {
            disconnected_plugins,
            failed_calls,
        }
    }

    /// Closes the live session's transport, if any.
    pub fn close_current(&self) {
        self.slot.close_current();
    }

    /// Generation of the live session, if one is installed.
    #[must_use]
    pub fn current_generation(&self) -> Option<Generation> {
        self.slot.current()
    }

    /// Generation of the most recent session, live or not.
    #[must_use]
    pub fn latest_generation(&self) -> Generation {
        self.slot.latest()
    }

    /// Sends an out-of-band error report on the live session.
    ///
    /// Returns `false` when no session is live.
    pub fn report_error(&self, report: ErrorReport) -> bool {
        match self.slot.current() {
            Some(generation) => {
                self.link(generation).report_error(report);
                true
            }
            None => {
                debug!(target: DISPATCH_TARGET, "no session; dropping error report");
                false
            }
        }
    }

    /// Handles one inbound message received on `generation`.
    pub fn handle_text(&self, generation: Generation, text: &str) {
        match InboundMessage::decode(text) {
            Ok(InboundMessage::Call(call)) => self.handle_call(generation, call),
            Ok(InboundMessage::Response(response)) => self.handle_response(generation, response),
            Err(error) => match protocol::recover_id(text) {
                Some(id) => {
                    warn!(
                        target: DISPATCH_TARGET,
                        %generation,
                        %id,
                        %error,
                        "answering malformed message"
                    );
                    self.link(generation)
                        .deliver(id, Reply::Error(error.to_payload()));
                }
                None => warn!(
                    target: DISPATCH_TARGET,
                    %generation,
                    %error,
                    "dropping malformed message"
                ),
            },
        }
    }

    fn link(&self, generation: Generation) -> Arc<SessionLink> {
        Arc::new(SessionLink::new(
            generation,
            Arc::clone(&self.slot),
            Arc::clone(&self.pending),
        ))
    }

    fn handle_call(&self, generation: Generation, call: InboundCall) {
        let link = self.link(generation);
        let responder = match call.id {
            Some(id) => Responder::new(
                id,
                call.method.as_str(),
                Arc::clone(&link) as Arc<dyn ResponseSink>,
            ),
            None => Responder::detached(call.method.as_str()),
        };
        debug!(
            target: DISPATCH_TARGET,
            %generation,
            id = ?call.id,
            method = %call.method,
            "routing call"
        );

        let outcome = Method::parse(&call.method).and_then(|method| match method {
            Method::GetPlugins => Ok(Routed::Reply(json!({ "plugins": self.registry.plugins() }))),
            Method::GetBackgroundPlugins => Ok(Routed::Reply(
                json!({ "plugins": self.registry.background_plugins() }),
            )),
            Method::Init => {
                let params: LifecycleParams = method.params(call.params)?;
                self.registry
                    .init(&params.plugin, link as Arc<dyn Outbound>)?;
                Ok(Routed::Reply(json!({})))
            }
            Method::Deinit => {
                let params: LifecycleParams = method.params(call.params)?;
                self.registry.deinit(&params.plugin)?;
                Ok(Routed::Reply(json!({})))
            }
            Method::Execute => {
                let params: ExecuteParams = method.params(call.params)?;
                let handler = self.registry.method(&params.api, &params.method)?;
                Ok(Routed::Execute(handler, params))
            }
        });

        match outcome {
            Ok(Routed::Reply(payload)) => responder.success(payload),
            Ok(Routed::Execute(handler, params)) => spawn_execute(handler, params, responder),
            Err(error) => {
                debug!(target: DISPATCH_TARGET, %error, method = %call.method, "call failed");
                responder.error(error.to_payload());
            }
        }
    }

    fn handle_response(&self, generation: Generation, response: InboundResponse) {
        match self.pending.resolve(generation, response.id) {
            Some(call) => {
                debug!(
                    target: DISPATCH_TARGET,
                    %generation,
                    id = %response.id,
                    method = %call.method,
                    "response resolved pending call"
                );
                call.complete(response.outcome.map_err(CallFailure::Remote));
            }
            None => debug!(
                target: DISPATCH_TARGET,
                %generation,
                id = %response.id,
                "dropping response with no pending call"
            ),
        }
    }
}

enum Routed {
    Reply(Value),
    Execute(MethodHandler, ExecuteParams),
}

type Job = Box<dyn FnOnce() + Send + 'static>;

fn spawn_execute(handler: MethodHandler, params: ExecuteParams, responder: Responder) {
    start_execute(handler, params, responder, |job| {
        thread::Builder::new()
            .name(EXECUTE_THREAD_NAME.to_owned())
            .spawn(job)
            .map(drop)
    });
}

/// Runs `handler` on a thread started by `spawn`.
///
/// The responder only moves to the new thread once it exists, so a failed
/// spawn still answers the call.
fn start_execute(
    handler: MethodHandler,
    params: ExecuteParams,
    responder: Responder,
    spawn: impl FnOnce(Job) -> io::Result<()>,
) {
    let ExecuteParams {
        api,
        method,
        params,
    } = params;
    let (handoff, arrival) = mpsc::channel::<Responder>();
    let job: Job = Box::new(move || {
        if let Ok(responder) = arrival.recv() {
            handler(params.unwrap_or(Value::Null), responder);
        }
    });

    let (responder, source) = match spawn(job) {
        Ok(()) => match handoff.send(responder) {
            Ok(()) => return,
            Err(mpsc::SendError(responder)) => (
                responder,
                io::Error::other("plugin method thread exited before starting"),
            ),
        },
        Err(source) => (responder, source),
    };
    let error = DispatchError::execution(api, method, source);
    error!(target: DISPATCH_TARGET, %error, "failed to spawn plugin method thread");
    responder.error(error.to_payload());
}
