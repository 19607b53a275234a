//! Fan-out of demo events to connected observers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::types::{Event, EventEnvelope};

/// Buffered envelopes per observer; a full run emits well under this.
const DEFAULT_CAPACITY: usize = 1000;

/// Shared channel between the running demo and every observer socket.
///
/// One bus lives for the whole process and is cloned into the orchestrator
/// and each WebSocket task. Publishing never waits on observers: one that
/// falls a full buffer behind gets `RecvError::Lagged` and skips ahead, and
/// an observer that disconnected simply stops counting as a receiver.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    published: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Bus whose observers may lag up to `capacity` envelopes.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Send an already stamped envelope to every observer.
    ///
    /// Returns how many observers it reached. With nobody connected the
    /// envelope is dropped and 0 is returned; runs proceed regardless.
    pub fn publish(&self, envelope: EventEnvelope) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Stamp `event` with the current time and publish it.
    pub fn emit(&self, event: Event) -> usize {
        self.publish(EventEnvelope::new(event))
    }

    /// Register an observer. Only envelopes published afterwards are seen,
    /// so a socket subscribes before sending its `connected` ack.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Observers currently attached.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Envelopes published since the bus was created, observed or not.
    pub fn event_count(&self) -> usize {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.subscriber_count())
            .field("published", &self.event_count())
            .finish()
    }
}
