use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::lobby::presence;
use crate::state::AppState;
use crate::wire::ServerEvent;
use crate::ws::broadcast::send_to_conn;
use crate::ws::protocol;

/// Ping interval: server sends a WebSocket ping every 30 seconds so that
/// abrupt client death is converted into a disconnect within one cycle
/// instead of leaking a paired-with-vanished-peer state.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Pong timeout: if pong not received within 10 seconds after ping, close.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the actor-per-connection pattern for an upgraded WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader task: processes incoming messages, dispatches to protocol
///   handlers
///
/// The mpsc channel allows any part of the system to send events to this
/// client by cloning the sender.
pub async fn run_connection(socket: WebSocket, state: AppState, conn_id: String) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Register this connection in the connection registry
    state.connections.insert(conn_id.clone(), tx.clone());

    // The welcome frame carries the transport-assigned connection id;
    // clients need it to recognize themselves in presence snapshots.
    protocol::send_event(
        &tx,
        &ServerEvent::Welcome {
            connection_id: conn_id.clone(),
        },
    );

    // Send the current presence snapshot to the newly connected client,
    // before it has announced, so late joiners see accurate state.
    protocol::send_event(&tx, &presence::snapshot_event(&state));

    tracing::info!(conn_id = %conn_id, "WebSocket actor started");

    // Spawn writer task: forwards mpsc messages to the WebSocket sink
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Track pong reception
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();

    // Spawn ping task: sends periodic pings and monitors pong responses
    let ping_tx = tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            // Send ping
            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died — connection is gone
                break;
            }

            // Wait for pong within timeout
            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {
                    // Pong received, continue
                }
                _ => {
                    // Pong timeout or channel closed — close connection
                    tracing::warn!("Pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop: process incoming WebSocket messages
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    // Decode the JSON envelope and dispatch
                    protocol::handle_text_message(text.as_str(), &tx, &state, &conn_id);
                }
                Message::Binary(_) => {
                    // The protocol is JSON text frames
                    tracing::debug!(
                        conn_id = %conn_id,
                        "Ignoring binary frame (expected JSON text)"
                    );
                }
                Message::Pong(_) => {
                    // Pong received — notify the ping task
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    // Respond to client pings with pong
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(
                        conn_id = %conn_id,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    conn_id = %conn_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                // Stream ended — client disconnected
                tracing::info!(conn_id = %conn_id, "WebSocket stream ended");
                break;
            }
        }
    }

    // Cleanup: abort writer and ping tasks
    writer_handle.abort();
    ping_handle.abort();

    // Unwind matchmaking state. Sessions are dissolved before the online
    // entry is dropped, so no snapshot can show a busy-but-offline
    // player, and the whole cleanup is idempotent.
    let outcome = state.lock_lobby().disconnect(&conn_id);

    // Remove this connection from the registry
    state.connections.remove(&conn_id);

    if let Some(player) = &outcome.player {
        tracing::info!(
            conn_id = %conn_id,
            display_name = %player.display_name,
            "Player going offline"
        );
    }

    // An active-session peer learns its opponent vanished; a pending
    // challenger whose invitee vanished is declined on their behalf.
    if let Some((peer_id, departing)) = &outcome.opponent_left {
        send_to_conn(
            &state.connections,
            peer_id,
            &ServerEvent::OpponentLeft {
                display_name: departing.display_name.clone(),
            },
        );
    }
    for (challenger_id, invitee) in &outcome.auto_declined {
        send_to_conn(
            &state.connections,
            challenger_id,
            &ServerEvent::ChallengeDeclined {
                opponent: invitee.clone(),
            },
        );
    }

    if outcome.changed {
        presence::broadcast_snapshot(&state);
    }

    tracing::info!(conn_id = %conn_id, "WebSocket actor stopped");
}

/// Writer task: receives messages from the mpsc channel and forwards
/// them to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}
