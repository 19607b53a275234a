use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use events::{EventBus, EventEnvelope};
use orchestrator::DemoOrchestrator;

use crate::messages::{self, ClientMessage};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct WsState {
    pub event_bus: EventBus,
    pub orchestrator: DemoOrchestrator,
}

impl WsState {
    pub fn new(orchestrator: DemoOrchestrator) -> Self {
        Self {
            event_bus: orchestrator.event_bus().clone(),
            orchestrator,
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<WsState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one inbound text frame.
///
/// Returns the reply meant for the sending observer only, if any. Accepted
/// start requests produce no direct reply; the run announces itself on the bus.
pub fn handle_client_text(text: &str, orchestrator: &DemoOrchestrator) -> Option<EventEnvelope> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::StartDemo) => match orchestrator.start() {
            Ok(_) => None,
            Err(reason) => {
                debug!(%reason, "Start request rejected");
                Some(messages::rejected(reason))
            }
        },
        Err(e) => {
            debug!(error = %e, "Invalid client message");
            Some(messages::invalid_message(&e))
        }
    }
}

async fn send_envelope<S>(sender: &mut S, envelope: &EventEnvelope) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let json = match serde_json::to_string(envelope) {
        Ok(json) => json,
        Err(e) => {
            warn!(event = envelope.event.event_type(), error = %e, "Failed to serialize event");
            return Ok(());
        }
    };
    sender.send(Message::Text(json.into())).await
}

async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let observer_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the ack so nothing published after it is missed
    let mut event_rx = state.event_bus.subscribe();
    info!(%observer_id, "Observer connected");

    if send_envelope(&mut sender, &messages::connected()).await.is_err() {
        debug!(%observer_id, "Observer left before acknowledgement");
        return;
    }

    let mut heartbeat = interval(HEARTBEAT_INTERVAL);
    heartbeat.reset();

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }

            event_result = event_rx.recv() => {
                match event_result {
                    Ok(envelope) => {
                        if send_envelope(&mut sender, &envelope).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(%observer_id, missed = n, "Observer lagged, skipping missed events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_client_text(&text, &state.orchestrator) {
                            if send_envelope(&mut sender, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(%observer_id, error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    info!(%observer_id, "Observer disconnected");
}
