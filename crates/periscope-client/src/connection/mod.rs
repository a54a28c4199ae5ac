//! Connection supervisor.
//!
//! One background thread owns the desktop connection. It loops forever:
//! connect, serve the session until the transport closes, tear the session
//! down, wait out the backoff, and connect again. Only [`SupervisorHandle::stop`]
//! ends the loop.
//!
//! ```text
//! Disconnected -> Connecting -> Connected
//!       ^             |             |
//!       +--- backoff -+-------------+
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use periscope_config::{ClientIdentity, ReconnectPolicy};
use tracing::{debug, warn};

use crate::dispatch::Dispatcher;
use crate::health::ConnectionReporter;
use crate::transport::{Connector, Duplex, MessageSender};

const CONNECTION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::connection");
const SUPERVISOR_THREAD_NAME: &str = "periscope-supervisor";

/// Everything the supervisor thread needs.
pub(crate) struct Supervisor {
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) identity: ClientIdentity,
    pub(crate) reconnect: ReconnectPolicy,
    pub(crate) reporter: Arc<dyn ConnectionReporter>,
}

impl Supervisor {
    /// Starts the supervisor thread.
    pub(crate) fn spawn(self) -> std::io::Result<SupervisorHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let dispatcher = Arc::clone(&self.dispatcher);
        let thread_stop = Arc::clone(&stop);
        let thread = thread::Builder::new()
            .name(SUPERVISOR_THREAD_NAME.to_owned())
            .spawn(move || self.run(&thread_stop))?;
        Ok(SupervisorHandle {
            stop,
            dispatcher,
            thread,
        })
    }

    fn run(self, stop: &AtomicBool) {
        debug!(
            target: CONNECTION_TARGET,
            endpoint = %self.connector.describe(),
            "supervisor started"
        );
        let mut failures: u32 = 0;
        while !stop.load(Ordering::SeqCst) {
            self.reporter.connecting(failures.saturating_add(1));
            let delay = match self.connector.connect(&self.identity) {
                Ok(duplex) => {
                    failures = 0;
                    self.serve(duplex, stop);
                    self.reconnect.delay_for(0)
                }
                Err(error) => {
                    let delay = self.reconnect.delay_for(failures);
                    self.reporter.connection_failed(&error, delay);
                    failures = failures.saturating_add(1);
                    delay
                }
            };
            pause(delay, stop);
        }
        self.reporter.stopped();
    }

    fn serve(&self, duplex: Duplex, stop: &AtomicBool) {
        let Duplex {
            sender,
            mut receiver,
        } = duplex;
        let sender: Arc<dyn MessageSender> = Arc::from(sender);
        let generation = self.dispatcher.session_opened(Arc::clone(&sender));
        self.reporter.connected(generation);

        // The stop flag is checked after installation so that a stop racing
        // with the connect either sees the sender to close or is seen here.
        while !stop.load(Ordering::SeqCst) {
            match receiver.recv() {
                Ok(Some(text)) => self.dispatcher.handle_text(generation, &text),
                Ok(None) => break,
                Err(error) => {
                    warn!(target: CONNECTION_TARGET, %generation, %error, "session read failed");
                    break;
                }
            }
        }

        sender.close();
        let summary = self.dispatcher.session_closed(generation);
        self.reporter.disconnected(
            generation,
            summary.disconnected_plugins,
            summary.failed_calls,
        );
    }
}

/// Sleeps for `delay` unless a stop is requested first.
///
/// [`SupervisorHandle::stop`] unparks the supervisor thread, so the wait ends
/// promptly on stop.
fn pause(delay: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + delay;
    while !stop.load(Ordering::SeqCst) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        thread::park_timeout(remaining);
    }
}

/// Owner of the running supervisor thread.
pub(crate) struct SupervisorHandle {
    stop: Arc<AtomicBool>,
    dispatcher: Arc<Dispatcher>,
    thread: JoinHandle<()>,
}

impl SupervisorHandle {
    /// Asks the supervisor to exit and disconnects any live session.
    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.dispatcher.close_current();
        self.thread.thread().unpark();
    }

    /// Stops the supervisor and waits for it to exit.
    ///
    /// Returns `false` if the supervisor thread panicked.
    pub(crate) fn stop(self) -> bool {
        self.request_stop();
        self.thread.join().is_ok()
    }
}
