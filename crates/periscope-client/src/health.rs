//! Structured health reporting for connection lifecycle events.

use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::Generation;
use crate::transport::TransportError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface connection transitions to telemetry sinks.
pub trait ConnectionReporter: Send + Sync {
    /// Invoked before each connection attempt; `attempt` counts from 1 and
    /// resets after a successful connection.
    fn connecting(&self, attempt: u32);

    /// Invoked once a session is installed.
    fn connected(&self, generation: Generation);

    /// Invoked when an attempt fails, with the delay before the next one.
    fn connection_failed(&self, error: &TransportError, retry_in: Duration);

    /// Invoked after a session ended and its plugins were disconnected.
    fn disconnected(&self, generation: Generation, plugins: usize, failed_calls: usize);

    /// Invoked when the supervisor exits after a stop request.
    fn stopped(&self);
}

impl<T> ConnectionReporter for Arc<T>
where
    T: ConnectionReporter + ?Sized,
{
    fn connecting(&self, attempt: u32) {
        (**self).connecting(attempt);
    }

    fn connected(&self, generation: Generation) {
        (**self).connected(generation);
    }

    fn connection_failed(&self, error: &TransportError, retry_in: Duration) {
        (**self).connection_failed(error, retry_in);
    }

    fn disconnected(&self, generation: Generation, plugins: usize, failed_calls: usize) {
        (**self).disconnected(generation, plugins, failed_calls);
    }

    fn stopped(&self) {
        (**self).stopped();
    }
}

/// Default reporter that records connection events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredConnectionReporter;

impl StructuredConnectionReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ConnectionReporter for StructuredConnectionReporter {
    fn connecting(&self, attempt: u32) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "connecting",
            attempt,
            "connecting to desktop"
        );
    }

    fn connected(&self, generation: Generation) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "connected",
            generation = %generation,
            "desktop session established"
        );
    }

    fn connection_failed(&self, error: &TransportError, retry_in: Duration) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "connection_failed",
            error = %error,
            retry_in_ms = u64::try_from(retry_in.as_millis()).unwrap_or(u64::MAX),
            "desktop connection attempt failed"
        );
    }

    fn disconnected(&self, generation: Generation, plugins: usize, failed_calls: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "disconnected",
            generation = %generation,
            plugins,
            failed_calls,
            "desktop session ended"
        );
    }

    fn stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "stopped",
            "connection supervisor stopped"
        );
    }
}
