use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use uuid::Uuid;

use crate::state::AppState;
use crate::ws::actor;

/// GET /ws
/// WebSocket upgrade endpoint. There is no authentication: a connection
/// only becomes a targetable participant once it announces a display
/// name. Each connection is assigned a fresh UUID id, unique among live
/// connections and freed for reuse only after disconnect.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let conn_id = Uuid::new_v4().to_string();

    tracing::info!(conn_id = %conn_id, "WebSocket connection upgrading");

    ws.on_upgrade(move |socket| handle_connected(socket, state, conn_id))
}

/// Handle an upgraded WebSocket connection by spawning the actor.
async fn handle_connected(socket: WebSocket, state: AppState, conn_id: String) {
    actor::run_connection(socket, state, conn_id).await;
}
