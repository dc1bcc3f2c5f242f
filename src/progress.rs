//! Progress delivery
//!
//! A [`ProgressSink`] receives one [`ProgressEvent`] when a submission is
//! accepted and one after every status check. Delivery is fire-and-forget:
//! a sink may report a failure, but the downloader discards it and carries
//! on. Implementations therefore never need to worry about breaking a
//! running workflow.

use crate::types::ProgressEvent;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Why a progress event could not be delivered
#[derive(Debug, Error)]
pub enum SinkError {
    /// Nobody is listening anymore (e.g. the UI surface was closed)
    #[error("no live receiver")]
    Closed,

    /// The receiver refused the event
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

/// Observer for workflow progress
pub trait ProgressSink: Send + Sync {
    /// Deliver one event
    fn notify(&self, event: &ProgressEvent) -> Result<(), SinkError>;
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn notify(&self, _event: &ProgressEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Sink that fans events out over a broadcast channel
///
/// Each subscriber sees every event sent after it subscribed, in order.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<ProgressEvent>,
}

impl BroadcastSink {
    /// Create a sink with room for `capacity` undelivered events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive events through a channel receiver
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Receive events as a `Stream`
    pub fn stream(&self) -> BroadcastStream<ProgressEvent> {
        BroadcastStream::new(self.tx.subscribe())
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ProgressSink for BroadcastSink {
    fn notify(&self, event: &ProgressEvent) -> Result<(), SinkError> {
        self.tx
            .send(event.clone())
            .map(|_| ())
            .map_err(|_| SinkError::Closed)
    }
}

/// Deliver an event, discarding any failure
///
/// A sink that panics is treated like one that returned an error.
pub(crate) fn deliver(sink: &dyn ProgressSink, event: &ProgressEvent) {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.notify(event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::debug!(error = %e, status = %event.status, "progress event not delivered");
        }
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::debug!(error = %reason, status = %event.status, "progress sink panicked");
        }
    }
}
