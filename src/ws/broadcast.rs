use axum::extract::ws::Message;

use super::ConnectionRegistry;
use crate::wire::ServerEvent;

/// Serialize a server event into a text frame.
fn encode(event: &ServerEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server event");
            None
        }
    }
}

/// Broadcast an event to all live connections, announced or not.
pub fn broadcast_to_all(registry: &ConnectionRegistry, event: &ServerEvent) {
    let msg = match encode(event) {
        Some(msg) => msg,
        None => return,
    };

    for entry in registry.iter() {
        let _ = entry.value().send(msg.clone());
    }
}

/// Send an event to a single connection. Best-effort: a missing or
/// closed sender means the peer is already gone.
pub fn send_to_conn(registry: &ConnectionRegistry, conn_id: &str, event: &ServerEvent) {
    let msg = match encode(event) {
        Some(msg) => msg,
        None => return,
    };

    if let Some(sender) = registry.get(conn_id) {
        let _ = sender.send(msg);
    }
}
