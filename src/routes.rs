use axum::{routing::get, Json, Router};

use crate::lobby::presence;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// GET /api/info — public endpoint returning server name and version.
async fn server_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "faceoff-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Build the axum Router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler::ws_upgrade))
        .route("/api/presence", get(presence::get_presence))
        .route("/api/info", get(server_info))
        .with_state(state)
}
