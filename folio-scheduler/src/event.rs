//! Change notifications fanned out after each committed state transition.

use folio_persistence::{job, job_batch, job_result};
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChangeEvent {
    JobBatch {
        before: Option<job_batch::Model>,
        after: job_batch::Model,
    },
    Job {
        before: Option<job::Model>,
        after: job::Model,
    },
    JobResult {
        note_id: String,
        paragraph_id: String,
        result: job_result::Model,
    },
    /// Streaming output, never persisted.
    JobTempOutput {
        note_id: String,
        paragraph_id: String,
        job_id: i64,
        text: String,
    },
}

/// Receives events once the transaction that produced them has committed.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: ChangeEvent);
}

#[derive(Default)]
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn publish(&self, event: ChangeEvent) {
        match serde_json::to_string(&event) {
            Ok(payload) => tracing::debug!(event = %payload, "change event"),
            Err(e) => tracing::warn!("failed to encode change event: {}", e),
        }
    }
}

pub struct BroadcastEventSink {
    sender: broadcast::Sender<ChangeEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: ChangeEvent) {
        // no subscribers is fine
        let _ = self.sender.send(event);
    }
}
