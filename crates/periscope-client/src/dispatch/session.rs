//! The current desktop session and the handles bound to it.
//!
//! [`ConnectionSlot`] holds the sender of the one live session together with
//! its [`Generation`]. Everything that sends on behalf of a session carries
//! the generation it was created for, and the slot refuses to send for any
//! other. Late replies from handlers that outlived their session are
//! therefore dropped instead of leaking into the next one.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use periscope_plugins::{
    CallFailure, CallId, Continuation, ErrorReport, Outbound, PushCall, Reply, ResponseSink,
};
use tracing::{debug, warn};

use super::pending::PendingTable;
use super::router::DISPATCH_TARGET;
use crate::protocol::OutboundMessage;
use crate::transport::{MessageSender, TransportError};

/// Monotonic identity of a desktop session.
///
/// Incremented every time the supervisor installs a new connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u64);

impl Generation {
    /// Wraps a raw generation number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw generation number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(formatter)
    }
}

/// Reason a send was not performed.
#[derive(Debug)]
pub(crate) enum SendRejected {
    /// The session the message belonged to has ended.
    Stale,
    /// The transport failed while writing.
    Transport(TransportError),
}

#[derive(Default)]
struct SlotState {
    generation: Generation,
    sender: Option<Arc<dyn MessageSender>>,
}

/// Holder of the live session's sender.
#[derive(Default)]
pub(crate) struct ConnectionSlot {
    state: Mutex<SlotState>,
}

impl ConnectionSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Installs `sender` as the live session and returns its generation.
    pub(crate) fn install(&self, sender: Arc<dyn MessageSender>) -> Generation {
        let mut state = self.lock();
        state.generation = state.generation.next();
        state.sender = Some(sender);
        state.generation
    }

    /// Forgets the sender of `generation`; returns `false` if it was not live.
    pub(crate) fn clear(&self, generation: Generation) -> bool {
        let mut state = self.lock();
        if state.generation != generation || state.sender.is_none() {
            return false;
        }
        state.sender = None;
        true
    }

    /// Generation of the live session, if one is installed.
    pub(crate) fn current(&self) -> Option<Generation> {
        let state = self.lock();
        state.sender.as_ref().map(|_| state.generation)
    }

    /// Generation of the most recently installed session.
    pub(crate) fn latest(&self) -> Generation {
        self.lock().generation
    }

    pub(crate) fn is_current(&self, generation: Generation) -> bool {
        self.current() == Some(generation)
    }

    /// Sends `text` if `generation` is still the live session.
    ///
    /// The slot is only locked to pick the sender; the write itself happens
    /// unlocked so a blocked transport cannot stall [`Self::close_current`].
    /// A session replaced mid-write has already had its transport closed, so
    /// the write fails rather than reaching the next session.
    pub(crate) fn send(&self, generation: Generation, text: &str) -> Result<(), SendRejected> {
        let sender = {
            let state = self.lock();
            match state.sender.as_ref() {
                Some(sender) if state.generation == generation => Arc::clone(sender),
                _ => return Err(SendRejected::Stale),
            }
        };
        sender.send(text).map_err(SendRejected::Transport)
    }

    /// Closes the live session's transport, waking its receiver.
    ///
    /// The session stops being live at once: later sends for it are stale
    /// even before the supervisor gets round to tearing it down.
    pub(crate) fn close_current(&self) {
        let sender = self.lock().sender.take();
        if let Some(sender) = sender {
            sender.close();
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Per-session sending handle shared by responders and plugin connections.
///
/// Holds only the slot and the pending table, never the registry, so plugins
/// that keep their [`periscope_plugins::PluginConnection`] do not keep the
/// dispatcher alive.
pub(crate) struct SessionLink {
    generation: Generation,
    slot: Arc<ConnectionSlot>,
    pending: Arc<PendingTable>,
}

impl SessionLink {
    pub(crate) fn new(
        generation: Generation,
        slot: Arc<ConnectionSlot>,
        pending: Arc<PendingTable>,
    ) -> Self {
        Self {
            generation,
            slot,
            pending,
        }
    }

    pub(crate) fn generation(&self) -> Generation {
        self.generation
    }

    fn send_message(&self, message: &OutboundMessage, what: &str) -> bool {
        let text = match message.encode() {
            Ok(text) => text,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, what, "failed to encode message");
                return false;
            }
        };
        match self.slot.send(self.generation, &text) {
            Ok(()) => true,
            Err(SendRejected::Stale) => {
                debug!(
                    target: DISPATCH_TARGET,
                    generation = %self.generation,
                    what,
                    "dropping message for a closed session"
                );
                false
            }
            Err(SendRejected::Transport(error)) => {
                warn!(
                    target: DISPATCH_TARGET,
                    generation = %self.generation,
                    %error,
                    what,
                    "failed to send message"
                );
                false
            }
        }
    }
}

impl ResponseSink for SessionLink {
    fn deliver(&self, id: CallId, reply: Reply) {
        let message = match reply {
            Reply::Success(success) => OutboundMessage::Success { id, success },
            Reply::Error(error) => OutboundMessage::Failure { id, error },
        };
        self.send_message(&message, "response");
    }
}

impl Outbound for SessionLink {
    fn push(&self, call: PushCall, continuation: Option<Continuation>) {
        let method = format!("{}.{}", call.api, call.method);
        let id = match self.pending.register(self.generation, method.as_str(), continuation) {
            Ok(id) => id,
            Err(continuation) => {
                debug!(
                    target: DISPATCH_TARGET,
                    generation = %self.generation,
                    method = %method,
                    "dropping push for a closed session"
                );
                if let Some(continuation) = continuation {
                    continuation(Err(CallFailure::ConnectionLost));
                }
                return;
            }
        };

        let sent = OutboundMessage::execute(id, call)
            .inspect_err(|error| {
                warn!(target: DISPATCH_TARGET, %error, method = %method, "failed to encode push");
            })
            .is_ok_and(|message| self.send_message(&message, "push"));
        if !sent && let Some(pending) = self.pending.resolve(self.generation, id) {
            pending.complete(Err(CallFailure::ConnectionLost));
        }
    }

    fn report_error(&self, report: ErrorReport) {
        self.send_message(&OutboundMessage::error_report(report), "error report");
    }

    fn is_live(&self) -> bool {
        self.slot.is_current(self.generation)
    }
}
