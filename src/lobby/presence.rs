//! Presence snapshots.
//!
//! The full (online, busy) view is rebuilt and broadcast to every live
//! connection after each lobby mutation; there are no diffs. A REST
//! endpoint mirrors the same payload for observability.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;
use crate::wire::{Player, ServerEvent};
use crate::ws::broadcast::broadcast_to_all;

/// Build the current presence snapshot event.
pub fn snapshot_event(state: &AppState) -> ServerEvent {
    let (online, busy) = state.lock_lobby().snapshot();
    ServerEvent::PresenceSnapshot { online, busy }
}

/// Broadcast the full snapshot to every live connection, announced or
/// not.
pub fn broadcast_snapshot(state: &AppState) {
    let event = snapshot_event(state);
    broadcast_to_all(&state.connections, &event);
}

#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    pub online: Vec<Player>,
    pub busy: Vec<String>,
}

/// GET /api/presence — read-only mirror of the broadcast snapshot.
pub async fn get_presence(State(state): State<AppState>) -> Json<PresenceResponse> {
    let (online, busy) = state.lock_lobby().snapshot();
    Json(PresenceResponse { online, busy })
}
