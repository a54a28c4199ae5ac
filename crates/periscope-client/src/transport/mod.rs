//! Abstract message channel between the client and the desktop tool.
//!
//! The engine only needs a way to open a session, send text messages, block
//! for the next inbound message, and learn that the session ended. Framing,
//! encryption and device discovery belong to the [`Connector`]
//! implementation. Two are provided: [`socket::SocketConnector`] for
//! newline-delimited JSON over TCP or Unix sockets, and [`memory`] for
//! in-process sessions.

mod errors;
mod framing;
pub mod memory;
pub mod socket;

pub use self::errors::TransportError;

use periscope_config::ClientIdentity;

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Opens sessions with the desktop tool.
pub trait Connector: Send + Sync {
    /// Attempts to open a session, presenting `identity` to the desktop.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the desktop is unreachable or rejects
    /// the handshake. The supervisor retries indefinitely.
    fn connect(&self, identity: &ClientIdentity) -> Result<Duplex, TransportError>;

    /// Short description of where this connector dials, for logs.
    fn describe(&self) -> String;
}

/// Sending half of an open session.
pub trait MessageSender: Send + Sync {
    /// Sends one complete message.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the session can no longer carry
    /// messages.
    fn send(&self, message: &str) -> Result<(), TransportError>;

    /// Closes the session, waking a receiver blocked in
    /// [`MessageReceiver::recv`].
    fn close(&self);
}

/// Receiving half of an open session.
pub trait MessageReceiver: Send {
    /// Blocks until the next message arrives.
    ///
    /// Returns `Ok(None)` once the session has ended.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when reading fails; the session is then
    /// treated as lost.
    fn recv(&mut self) -> Result<Option<String>, TransportError>;
}

/// Both halves of a freshly opened session.
pub struct Duplex {
    /// Outbound half, shared with every thread that answers calls.
    pub sender: Box<dyn MessageSender>,
    /// Inbound half, owned by the supervisor thread.
    pub receiver: Box<dyn MessageReceiver>,
}

impl Duplex {
    /// Pairs a sender with a receiver.
    pub fn new(
        sender: impl MessageSender + 'static,
        receiver: impl MessageReceiver + 'static,
    ) -> Self {
        Self {
            sender: Box::new(sender),
            receiver: Box::new(receiver),
        }
    }
}
