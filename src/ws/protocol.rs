use axum::extract::ws::Message;
use tokio::sync::mpsc;

use crate::lobby::{relay, signaling};
use crate::state::AppState;
use crate::wire::{ClientEvent, ServerEvent};

/// Handle an incoming text (JSON) message.
/// Decodes the tagged envelope, dispatches based on event type.
pub fn handle_text_message(
    text: &str,
    tx: &mpsc::UnboundedSender<Message>,
    state: &AppState,
    conn_id: &str,
) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(
                conn_id = %conn_id,
                error = %e,
                "Failed to decode client event"
            );
            send_error(tx, 400, "Invalid event payload");
            return;
        }
    };

    dispatch_event(event, tx, state, conn_id);
}

/// Dispatch a decoded event to the appropriate handler.
///
/// Matchmaking events go to the challenge signaling layer; in-session
/// turn events go straight to the relay.
fn dispatch_event(
    event: ClientEvent,
    tx: &mpsc::UnboundedSender<Message>,
    state: &AppState,
    conn_id: &str,
) {
    match event {
        ClientEvent::Announce { display_name } => {
            signaling::handle_announce(&display_name, state, conn_id);
        }
        ClientEvent::Challenge { invitee_id } => {
            signaling::handle_challenge(&invitee_id, tx, state, conn_id);
        }
        ClientEvent::ChallengeAccept { challenger_id } => {
            signaling::handle_accept(&challenger_id, state, conn_id);
        }
        ClientEvent::ChallengeDecline { challenger_id } => {
            signaling::handle_decline(&challenger_id, state, conn_id);
        }
        ClientEvent::LeaveSession { opponent } => {
            signaling::handle_leave(&opponent, state, conn_id);
        }
        ClientEvent::Move {
            board,
            role,
            opponent,
        } => {
            relay::handle_move(board, role, &opponent, state, conn_id);
        }
        ClientEvent::Result { winner, opponent } => {
            relay::handle_result(winner, &opponent, state, conn_id);
        }
        ClientEvent::ResetRequest { opponent } => {
            relay::handle_reset(&opponent, state, conn_id);
        }
    }
}

/// Encode and send a server event as a text WebSocket message.
pub fn send_event(tx: &mpsc::UnboundedSender<Message>, event: &ServerEvent) {
    match serde_json::to_string(event) {
        Ok(json) => {
            let _ = tx.send(Message::Text(json.into()));
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server event");
        }
    }
}

/// Send an error notice to the offending client.
pub fn send_error(tx: &mpsc::UnboundedSender<Message>, code: u16, message: &str) {
    send_event(
        tx,
        &ServerEvent::Error {
            code,
            message: message.to_string(),
        },
    );
}
