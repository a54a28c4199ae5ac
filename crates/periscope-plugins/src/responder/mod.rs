//! Single-use reply handles for inbound method calls.
//!
//! A [`Responder`] is created by the dispatcher for every routed call and
//! handed to the plugin method. Answering consumes the handle, so a call can
//! be answered at most once. A handle dropped without an answer leaves the
//! request unanswered; this is logged because it is always a plugin defect.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Tracing target for responder diagnostics.
const RESPONDER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::responder");

/// Correlation id carried by calls and echoed by responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(u64);

impl CallId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(formatter)
    }
}

/// Outcome of a method call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The call succeeded; the payload becomes the response's `success` field.
    Success(Value),
    /// The call failed; the payload becomes the response's `error` field.
    Error(Value),
}

/// Destination for replies produced by [`Responder`]s.
///
/// Implemented by the dispatcher, which decides whether the reply may still
/// be sent on the connection the call arrived on.
pub trait ResponseSink: Send + Sync {
    /// Delivers the reply for the call identified by `id`.
    fn deliver(&self, id: CallId, reply: Reply);
}

/// Handle used by a plugin method to answer exactly one call.
#[must_use = "a call stays unanswered unless its responder is used"]
pub struct Responder {
    target: Option<Target>,
    method: String,
}

struct Target {
    id: CallId,
    sink: Arc<dyn ResponseSink>,
}

impl Responder {
    /// Creates a responder that delivers its reply to `sink`.
    pub fn new(id: CallId, method: impl Into<String>, sink: Arc<dyn ResponseSink>) -> Self {
        Self {
            target: Some(Target { id, sink }),
            method: method.into(),
        }
    }

    /// Creates a responder for a call that expects no response.
    ///
    /// Answers given to a detached responder are discarded.
    pub fn detached(method: impl Into<String>) -> Self {
        Self {
            target: None,
            method: method.into(),
        }
    }

    /// Returns the correlation id of the call, if it expects a response.
    #[must_use]
    pub fn id(&self) -> Option<CallId> {
        self.target.as_ref().map(|target| target.id)
    }

    /// Returns the name of the method being answered.
    #[must_use]
    pub fn method(&self) -> &str {
        self.method.as_str()
    }

    /// Answers the call successfully.
    pub fn success(mut self, payload: Value) {
        self.finish(Reply::Success(payload));
    }

    /// Answers the call with an error payload.
    pub fn error(mut self, payload: Value) {
        self.finish(Reply::Error(payload));
    }

    /// Answers the call with `{"message": ..}` as the error payload.
    pub fn error_message(self, message: impl Into<String>) {
        let message: String = message.into();
        self.error(serde_json::json!({ "message": message }));
    }

    fn finish(&mut self, reply: Reply) {
        match self.target.take() {
            Some(Target { id, sink }) => sink.deliver(id, reply),
            None => debug!(
                target: RESPONDER_TARGET,
                method = %self.method,
                "discarding reply to a call that expects no response"
            ),
        }
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Responder")
            .field("id", &self.id())
            .field("method", &self.method)
            .finish()
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if let Some(target) = &self.target {
            warn!(
                target: RESPONDER_TARGET,
                id = %target.id,
                method = %self.method,
                "responder dropped without answering; the call will never complete"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        replies: Mutex<Vec<(CallId, Reply)>>,
    }

    impl ResponseSink for RecordingSink {
        fn deliver(&self, id: CallId, reply: Reply) {
            self.replies.lock().expect("lock").push((id, reply));
        }
    }

    #[test]
    fn success_reaches_sink_once() {
        let sink = Arc::new(RecordingSink::default());
        let responder = Responder::new(CallId::new(7), "reverse", sink.clone());
        assert_eq!(responder.id(), Some(CallId::new(7)));
        responder.success(json!({"word": "olleh"}));

        let replies = sink.replies.lock().expect("lock");
        assert_eq!(
            replies.as_slice(),
            &[(CallId::new(7), Reply::Success(json!({"word": "olleh"})))]
        );
    }

    #[test]
    fn error_message_wraps_text() {
        let sink = Arc::new(RecordingSink::default());
        Responder::new(CallId::new(3), "reverse", sink.clone()).error_message("no word");

        let replies = sink.replies.lock().expect("lock");
        assert_eq!(
            replies.first().map(|(_, reply)| reply.clone()),
            Some(Reply::Error(json!({"message": "no word"})))
        );
    }

    #[test]
    fn detached_responder_discards_replies() {
        let responder = Responder::detached("notify");
        assert!(responder.id().is_none());
        responder.success(json!({}));
    }

    #[test]
    fn dropping_unanswered_responder_delivers_nothing() {
        let sink = Arc::new(RecordingSink::default());
        drop(Responder::new(CallId::new(1), "slow", sink.clone()));
        assert!(sink.replies.lock().expect("lock").is_empty());
    }

    #[test]
    fn call_ids_serialise_as_plain_integers() {
        assert_eq!(serde_json::to_value(CallId::new(42)).expect("ser"), json!(42));
    }
}
