use serde::{Deserialize, Serialize};

use events::{Event, EventEnvelope};
use orchestrator::StartError;

/// Control messages an observer may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    StartDemo,
}

/// Acknowledgement sent to a newly connected observer.
pub(crate) fn connected() -> EventEnvelope {
    EventEnvelope::new(Event::Connected {
        status: "ready".to_string(),
    })
}

/// Reply to a start request that lost the single-flight race.
pub(crate) fn rejected(reason: StartError) -> EventEnvelope {
    EventEnvelope::new(Event::Error {
        message: reason.to_string(),
        error: None,
    })
}

/// Reply to a frame that is not a valid [`ClientMessage`].
pub(crate) fn invalid_message(cause: &serde_json::Error) -> EventEnvelope {
    EventEnvelope::new(Event::Error {
        message: "Invalid message".to_string(),
        error: Some(cause.to_string()),
    })
}
