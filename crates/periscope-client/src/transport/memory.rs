//! In-process transport for tests and embedded tooling.
//!
//! [`channel`] returns a [`MemoryConnector`] for the client and a
//! [`DesktopPeer`] that plays the desktop's part: it accepts sessions, reads
//! what the client sent, sends calls and responses, and can drop a session or
//! refuse new ones to simulate the desktop going away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use periscope_config::ClientIdentity;
use serde_json::Value;

use super::{Connector, Duplex, MessageReceiver, MessageSender, TransportError};

const MEMORY_ENDPOINT: &str = "memory://desktop";

enum Frame {
    Message(String),
    Closed,
}

/// Creates a connected connector/peer pair.
#[must_use]
pub fn channel() -> (MemoryConnector, DesktopPeer) {
    let (sessions_tx, sessions_rx) = mpsc::channel();
    let available = Arc::new(AtomicBool::new(true));
    let connector = MemoryConnector {
        sessions: Mutex::new(sessions_tx),
        available: Arc::clone(&available),
    };
    let peer = DesktopPeer {
        sessions: sessions_rx,
        available,
    };
    (connector, peer)
}

/// Client-side connector that opens in-process sessions.
pub struct MemoryConnector {
    sessions: Mutex<Sender<DesktopSession>>,
    available: Arc<AtomicBool>,
}

impl Connector for MemoryConnector {
    fn connect(&self, identity: &ClientIdentity) -> Result<Duplex, TransportError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(TransportError::refused(MEMORY_ENDPOINT, "desktop unavailable"));
        }

        let (to_desktop_tx, to_desktop_rx) = mpsc::channel();
        let (to_client_tx, to_client_rx) = mpsc::channel();
        let session = DesktopSession {
            identity: identity.clone(),
            inbound: to_desktop_rx,
            outbound: to_client_tx.clone(),
        };
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(session)
            .map_err(|_| TransportError::refused(MEMORY_ENDPOINT, "desktop peer dropped"))?;

        Ok(Duplex::new(
            MemorySender {
                outbound: Mutex::new(to_desktop_tx),
                wake: Mutex::new(to_client_tx),
            },
            MemoryReceiver {
                inbound: to_client_rx,
            },
        ))
    }

    fn describe(&self) -> String {
        MEMORY_ENDPOINT.to_owned()
    }
}

struct MemorySender {
    outbound: Mutex<Sender<String>>,
    wake: Mutex<Sender<Frame>>,
}

impl MessageSender for MemorySender {
    fn send(&self, message: &str) -> Result<(), TransportError> {
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(message.to_owned())
            .map_err(|_| TransportError::Closed)
    }

    fn close(&self) {
        let _ = self
            .wake
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send(Frame::Closed);
    }
}

struct MemoryReceiver {
    inbound: Receiver<Frame>,
}

impl MessageReceiver for MemoryReceiver {
    fn recv(&mut self) -> Result<Option<String>, TransportError> {
        match self.inbound.recv() {
            Ok(Frame::Message(message)) => Ok(Some(message)),
            Ok(Frame::Closed) | Err(_) => Ok(None),
        }
    }
}

/// Desktop side of an in-process transport.
pub struct DesktopPeer {
    sessions: Receiver<DesktopSession>,
    available: Arc<AtomicBool>,
}

impl DesktopPeer {
    /// Controls whether new connection attempts succeed.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Waits up to `timeout` for the client to open a session.
    #[must_use]
    pub fn accept(&self, timeout: Duration) -> Option<DesktopSession> {
        self.sessions.recv_timeout(timeout).ok()
    }
}

/// One open session as seen by the desktop.
pub struct DesktopSession {
    identity: ClientIdentity,
    inbound: Receiver<String>,
    outbound: Sender<Frame>,
}

impl DesktopSession {
    /// Identity the client presented when connecting.
    #[must_use]
    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Sends a raw message to the client.
    ///
    /// Returns `false` if the client has already torn the session down.
    pub fn send_raw(&self, message: impl Into<String>) -> bool {
        self.outbound.send(Frame::Message(message.into())).is_ok()
    }

    /// Sends a JSON message to the client.
    pub fn send(&self, message: &Value) -> bool {
        self.send_raw(message.to_string())
    }

    /// Waits up to `timeout` for the next message from the client.
    #[must_use]
    pub fn recv(&self, timeout: Duration) -> Option<Value> {
        self.recv_raw(timeout)
            .and_then(|text| serde_json::from_str(&text).ok())
    }

    /// Waits up to `timeout` for the next raw message from the client.
    #[must_use]
    pub fn recv_raw(&self, timeout: Duration) -> Option<String> {
        match self.inbound.recv_timeout(timeout) {
            Ok(text) => Some(text),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Ends the session as if the desktop had quit.
    pub fn disconnect(self) {
        drop(self);
    }
}

impl Drop for DesktopSession {
    fn drop(&mut self) {
        let _ = self.outbound.send(Frame::Closed);
    }
}
