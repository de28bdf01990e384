//! Challenge handshake handlers: propose, accept, decline, leave.
//!
//! Each handler runs one lobby transition under the lock, then delivers
//! the targeted notices and the refreshed presence snapshot. Stale or
//! invalid events degrade to logged no-ops; the authority never stops
//! processing because one event referenced vanished state.

use axum::extract::ws::Message;
use tokio::sync::mpsc;

use crate::lobby::presence;
use crate::lobby::state::{AcceptOutcome, ChallengeOutcome, DeclineOutcome, LeaveOutcome};
use crate::state::AppState;
use crate::wire::{Player, ServerEvent};
use crate::ws::broadcast::send_to_conn;
use crate::ws::protocol::{send_error, send_event};

/// Handle `announce`: the connection becomes a targetable participant.
pub fn handle_announce(display_name: &str, state: &AppState, conn_id: &str) {
    let player = state.lock_lobby().announce(conn_id, display_name);

    tracing::info!(
        conn_id = %conn_id,
        display_name = %player.display_name,
        "Player now online"
    );

    presence::broadcast_snapshot(state);
}

/// Handle `challenge`: propose a session to an idle participant.
pub fn handle_challenge(
    invitee_id: &str,
    tx: &mpsc::UnboundedSender<Message>,
    state: &AppState,
    conn_id: &str,
) {
    let outcome = state.lock_lobby().challenge(conn_id, invitee_id);

    match outcome {
        ChallengeOutcome::Issued {
            challenger,
            invitee,
        } => {
            tracing::info!(
                challenger = %challenger.display_name,
                invitee = %invitee.display_name,
                "Challenge issued"
            );
            send_to_conn(
                &state.connections,
                &invitee.id,
                &ServerEvent::Challenged { challenger },
            );
            presence::broadcast_snapshot(state);
        }
        ChallengeOutcome::InviteeBusy { invitee } => {
            // An occupied target is not an error; the challenger just
            // learns who is busy. No state changed, nothing to broadcast.
            send_event(tx, &ServerEvent::PlayerBusy { player: invitee });
        }
        ChallengeOutcome::UnknownInvitee => {
            // The target raced a disconnect or never existed.
            tracing::debug!(
                conn_id = %conn_id,
                invitee_id = %invitee_id,
                "Challenge to unknown participant"
            );
            send_error(tx, 404, "Player is no longer online");
        }
        ChallengeOutcome::Rejected => {
            tracing::debug!(
                conn_id = %conn_id,
                invitee_id = %invitee_id,
                "Challenge rejected"
            );
        }
    }
}

/// Handle `challenge-accept`: the invitee confirms the handshake.
pub fn handle_accept(challenger_id: &str, state: &AppState, conn_id: &str) {
    let outcome = state.lock_lobby().accept(conn_id, challenger_id);

    match outcome {
        AcceptOutcome::Accepted {
            challenger,
            invitee,
            displaced,
        } => {
            tracing::info!(
                challenger = %challenger.display_name,
                invitee = %invitee.display_name,
                "Challenge accepted, session active"
            );
            send_to_conn(
                &state.connections,
                &challenger.id,
                &ServerEvent::ChallengeAccepted {
                    opponent: invitee.clone(),
                },
            );
            // Challengers displaced by the new pairing are declined on
            // the paired player's behalf.
            for (displaced_challenger, unavailable) in displaced {
                send_to_conn(
                    &state.connections,
                    &displaced_challenger,
                    &ServerEvent::ChallengeDeclined {
                        opponent: unavailable,
                    },
                );
            }
            presence::broadcast_snapshot(state);
        }
        AcceptOutcome::NotPending => {
            tracing::debug!(
                conn_id = %conn_id,
                challenger_id = %challenger_id,
                "Accept with no matching pending challenge"
            );
        }
    }
}

/// Handle `challenge-decline`: the invitee turns the challenger down.
pub fn handle_decline(challenger_id: &str, state: &AppState, conn_id: &str) {
    let outcome = state.lock_lobby().decline(conn_id, challenger_id);

    match outcome {
        DeclineOutcome::Declined {
            challenger_id,
            invitee,
        } => {
            tracing::info!(
                challenger_id = %challenger_id,
                invitee = %invitee.display_name,
                "Challenge declined"
            );
            send_to_conn(
                &state.connections,
                &challenger_id,
                &ServerEvent::ChallengeDeclined { opponent: invitee },
            );
            presence::broadcast_snapshot(state);
        }
        DeclineOutcome::NotPending => {
            tracing::debug!(
                conn_id = %conn_id,
                challenger_id = %challenger_id,
                "Decline with no matching pending challenge"
            );
        }
    }
}

/// Handle `leave-session`: either member may end the session; both are
/// freed. The session table is authoritative for who the peer is; the
/// client-supplied opponent is informational.
pub fn handle_leave(opponent: &Player, state: &AppState, conn_id: &str) {
    let outcome = state.lock_lobby().leave(conn_id);

    match outcome {
        LeaveOutcome::Left {
            departing,
            opponent_id,
        } => {
            if opponent.id != opponent_id {
                tracing::debug!(
                    claimed = %opponent.id,
                    actual = %opponent_id,
                    "leave-session opponent mismatch, trusting session record"
                );
            }
            tracing::info!(
                departing = %departing.display_name,
                opponent_id = %opponent_id,
                "Session ended by departure"
            );
            send_to_conn(
                &state.connections,
                &opponent_id,
                &ServerEvent::OpponentLeft {
                    display_name: departing.display_name,
                },
            );
            presence::broadcast_snapshot(state);
        }
        LeaveOutcome::NoSession => {
            tracing::debug!(conn_id = %conn_id, "leave-session without an active session");
        }
    }
}
