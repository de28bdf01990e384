//! One-hop relay for in-session turn events.
//!
//! Deliberately a dumb pipe: board, role, and winner payloads pass
//! through verbatim, and the recipient is whatever opponent the sender
//! resolved in its own envelope. No legality, turn-order, or board-shape
//! checks, and no re-validation against the session table. A stale
//! opponent id simply drops the frame.

use serde_json::Value;

use crate::state::AppState;
use crate::wire::{Player, Role, ServerEvent};
use crate::ws::broadcast::send_to_conn;

/// Forward a turn to the opponent's connection only.
pub fn handle_move(board: Value, role: Role, opponent: &Player, state: &AppState, conn_id: &str) {
    tracing::debug!(
        conn_id = %conn_id,
        opponent = %opponent.id,
        role = ?role,
        "Relaying move"
    );
    send_to_conn(
        &state.connections,
        &opponent.id,
        &ServerEvent::MoveRelayed { board, role },
    );
}

/// Forward a win announcement to the opponent.
pub fn handle_result(winner: Role, opponent: &Player, state: &AppState, conn_id: &str) {
    tracing::info!(
        conn_id = %conn_id,
        opponent = %opponent.id,
        winner = ?winner,
        "Relaying game result"
    );
    send_to_conn(
        &state.connections,
        &opponent.id,
        &ServerEvent::ResultRelayed { winner },
    );
}

/// Forward a reset request to the opponent. Busy state is untouched.
pub fn handle_reset(opponent: &Player, state: &AppState, conn_id: &str) {
    tracing::debug!(
        conn_id = %conn_id,
        opponent = %opponent.id,
        "Relaying reset request"
    );
    send_to_conn(&state.connections, &opponent.id, &ServerEvent::ResetRelayed);
}
