//! Fan-out of completed epoch summaries to subscriber channels.

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use types::EpochSummary;

#[derive(Debug, Error)]
#[error("subscriber channel closed")]
pub struct SinkClosed;

/// Delivers every epoch summary to every registered sink, in registration
/// order, FIFO per sink. Delivery is synchronous: a full bounded sink
/// back-pressures the epoch loop rather than dropping the summary.
/// Sinks cannot be unregistered; subscribers live for the process lifetime.
#[derive(Default)]
pub struct Dispatcher {
    sinks: Mutex<Vec<mpsc::Sender<EpochSummary>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: registering a sender for a channel that is already
    /// subscribed is a no-op.
    pub async fn register(&self, sink: mpsc::Sender<EpochSummary>) {
        let mut sinks = self.sinks.lock().await;
        if !sinks.iter().any(|existing| existing.same_channel(&sink)) {
            sinks.push(sink);
        }
    }

    pub async fn dispatch(&self, summary: &EpochSummary) -> Result<(), SinkClosed> {
        let sinks = self.sinks.lock().await;
        for sink in sinks.iter() {
            sink.send(summary.clone()).await.map_err(|_| SinkClosed)?;
        }
        Ok(())
    }
}
