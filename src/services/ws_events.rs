use axum::extract::ws::Message;
use tracing::warn;
use uuid::Uuid;

use crate::{dto::ws::ServerMessage, state::SharedState};

/// Serialize once and fan out to every connected client.
///
/// Delivery is fire-and-forget: the emitting operation never waits for
/// acknowledgement, and a closed channel is simply skipped (the reader loop
/// of that connection notices the closure and tears the seat down).
pub fn broadcast_all(state: &SharedState, message: &ServerMessage) {
    let Some(payload) = encode(message) else {
        return;
    };

    for entry in state.clients().iter() {
        let _ = entry.tx.send(Message::Text(payload.clone().into()));
    }
}

/// Send a message to a single connection, if it is still registered.
pub fn send_to(state: &SharedState, connection: Uuid, message: &ServerMessage) {
    let Some(payload) = encode(message) else {
        return;
    };

    if let Some(entry) = state.clients().get(&connection) {
        let _ = entry.tx.send(Message::Text(payload.into()));
    }
}

/// Send a message to a set of connections (typically one team's seats).
pub fn send_many(state: &SharedState, connections: &[Uuid], message: &ServerMessage) {
    let Some(payload) = encode(message) else {
        return;
    };

    for id in connections {
        if let Some(entry) = state.clients().get(id) {
            let _ = entry.tx.send(Message::Text(payload.clone().into()));
        }
    }
}

/// Serialization failure is a bug in our own types; log it and drop the event.
fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!(error = %err, "failed to serialize server message");
            None
        }
    }
}
