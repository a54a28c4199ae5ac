//! Correlation of client-initiated calls with their responses.
//!
//! The table is scoped to one session at a time. Ids restart at 1 for every
//! session and are never handed out twice while a call with that id is still
//! outstanding. Closing the session drains the table so that every
//! continuation observes [`CallFailure::ConnectionLost`] exactly once.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use periscope_plugins::{CallFailure, CallId, Continuation};
use serde_json::Value;

use super::session::Generation;

/// A client-initiated call awaiting its response.
pub(crate) struct PendingCall {
    pub(crate) method: String,
    continuation: Option<Continuation>,
}

impl PendingCall {
    /// Hands the outcome to the continuation, if the caller registered one.
    pub(crate) fn complete(self, outcome: Result<Value, CallFailure>) {
        if let Some(continuation) = self.continuation {
            continuation(outcome);
        }
    }
}

#[derive(Default)]
struct PendingState {
    generation: Option<Generation>,
    next_id: u64,
    calls: HashMap<CallId, PendingCall>,
}

impl PendingState {
    fn allocate(&mut self) -> CallId {
        loop {
            let candidate = CallId::new(self.next_id);
            self.next_id = self.next_id.checked_add(1).unwrap_or(1);
            if !self.calls.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

/// Outstanding client-initiated calls for the current session.
#[derive(Default)]
pub(crate) struct PendingTable {
    state: Mutex<PendingState>,
}

impl PendingTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Starts accepting registrations for `generation`.
    pub(crate) fn begin(&self, generation: Generation) {
        let mut state = self.lock();
        state.generation = Some(generation);
        state.next_id = 1;
    }

    /// Records a call about to be sent on `generation` and returns its id.
    ///
    /// Gives the continuation back when `generation` is not the active
    /// session so the caller can fail it.
    pub(crate) fn register(
        &self,
        generation: Generation,
        method: impl Into<String>,
        continuation: Option<Continuation>,
    ) -> Result<CallId, Option<Continuation>> {
        let mut state = self.lock();
        if state.generation != Some(generation) {
            return Err(continuation);
        }
        let id = state.allocate();
        state.calls.insert(
            id,
            PendingCall {
                method: method.into(),
                continuation,
            },
        );
        Ok(id)
    }

    /// Removes and returns the call answered by a response on `generation`.
    pub(crate) fn resolve(&self, generation: Generation, id: CallId) -> Option<PendingCall> {
        let mut state = self.lock();
        if state.generation != Some(generation) {
            return None;
        }
        state.calls.remove(&id)
    }

    /// Ends the active session and returns every call still outstanding.
    ///
    /// Draining a generation that is no longer active returns nothing.
    pub(crate) fn drain(&self, generation: Generation) -> Vec<PendingCall> {
        let mut state = self.lock();
        if state.generation != Some(generation) {
            return Vec::new();
        }
        state.generation = None;
        state.calls.drain().map(|(_, call)| call).collect()
    }

    /// Number of calls currently awaiting a response.
    pub(crate) fn len(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> MutexGuard<'_, PendingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
