//! Artifact notification events
//!
//! Every successful persist publishes an [`ArtifactEvent`] on a broadcast
//! channel. Publishing is fire-and-forget: no subscriber ever blocks or
//! fails a pipeline run, and a slow subscriber only loses its own backlog.

use crate::store::ArtifactRecord;
use serde::Serialize;
use tokio::sync::broadcast;

/// Buffered events per subscriber before the oldest are dropped
const EVENT_CAPACITY: usize = 64;

/// Notification that a new artifact was persisted
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactEvent {
    pub id: String,
    pub url: String,
    pub prompt: Option<String>,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl From<&ArtifactRecord> for ArtifactEvent {
    fn from(record: &ArtifactRecord) -> Self {
        Self {
            id: record.id.clone(),
            url: record.url.clone(),
            prompt: record.prompt.clone(),
            timestamp: record.timestamp_ms,
        }
    }
}

/// Broadcast hub for artifact notifications
#[derive(Debug, Clone)]
pub struct ArtifactEvents {
    sender: broadcast::Sender<ArtifactEvent>,
}

impl ArtifactEvents {
    /// Create a hub buffering up to `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to future artifact events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ArtifactEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// A send error only means nobody is subscribed right now, so it is
    /// logged at debug and otherwise ignored.
    pub fn publish(&self, event: ArtifactEvent) {
        match self.sender.send(event) {
            Ok(received_by) => log::debug!("Artifact event delivered to {received_by} subscriber(s)"),
            Err(_) => log::debug!("Artifact event dropped, no subscribers"),
        }
    }
}

impl Default for ArtifactEvents {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY)
    }
}
