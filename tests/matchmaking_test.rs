//! Integration tests for the challenge handshake and presence tracking:
//! announce, challenge, accept, decline, leave, and disconnect cleanup,
//! driven over real WebSocket connections.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Start the server on a random port and return its address.
async fn start_test_server() -> SocketAddr {
    let state = faceoff_server::state::AppState::new();
    let app = faceoff_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

async fn connect(addr: SocketAddr) -> WsStream {
    let (ws_stream, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .expect("Failed to connect to WebSocket");
    ws_stream
}

/// Read the next JSON event, skipping transport frames.
async fn next_event(ws: &mut WsStream) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("Timed out waiting for event")
            .expect("Stream ended unexpectedly")
            .expect("WebSocket error");
        match msg {
            Message::Text(text) => {
                return serde_json::from_str(text.as_str()).expect("Event should be valid JSON")
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Unexpected frame: {:?}", other),
        }
    }
}

/// Read events until one of the given type arrives, skipping interleaved
/// presence snapshots (broadcasts from other clients' activity).
async fn next_event_of(ws: &mut WsStream, event_type: &str) -> Value {
    for _ in 0..10 {
        let event = next_event(ws).await;
        if event["type"] == event_type {
            return event;
        }
        assert_eq!(
            event["type"], "presence-snapshot",
            "Unexpected interleaved event: {}",
            event
        );
    }
    panic!("No {} event within 10 frames", event_type);
}

/// Assert that no event arrives within `dur`.
async fn assert_silent(ws: &mut WsStream, dur: Duration) {
    let result = tokio::time::timeout(dur, ws.next()).await;
    assert!(result.is_err(), "Expected silence, got {:?}", result);
}

async fn send_json(ws: &mut WsStream, event: Value) {
    ws.send(Message::text(event.to_string()))
        .await
        .expect("Failed to send event");
}

/// Connect and announce. Consumes the welcome frame, the connect-time
/// snapshot, and the broadcast triggered by the announce itself; returns
/// the socket and its server-assigned connection id.
async fn join(addr: SocketAddr, name: &str) -> (WsStream, String) {
    let mut ws = connect(addr).await;

    let welcome = next_event(&mut ws).await;
    assert_eq!(welcome["type"], "welcome");
    let conn_id = welcome["connection_id"].as_str().unwrap().to_string();

    let snapshot = next_event(&mut ws).await;
    assert_eq!(snapshot["type"], "presence-snapshot");

    send_json(&mut ws, json!({ "type": "announce", "display_name": name })).await;
    let snapshot = next_event(&mut ws).await;
    assert_eq!(snapshot["type"], "presence-snapshot");

    (ws, conn_id)
}

/// Fetch the REST presence mirror.
async fn fetch_presence(addr: SocketAddr) -> Value {
    reqwest::get(format!("http://{}/api/presence", addr))
        .await
        .expect("Presence request failed")
        .json()
        .await
        .expect("Presence response should be JSON")
}

fn busy_ids(presence: &Value) -> Vec<String> {
    let mut ids: Vec<String> = presence["busy"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids
}

fn online_ids(presence: &Value) -> Vec<String> {
    let mut ids: Vec<String> = presence["online"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids
}

fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

/// alice challenges bob, bob accepts; returns both fully drained.
async fn pair_up(addr: SocketAddr) -> ((WsStream, String), (WsStream, String)) {
    let (mut p1, id1) = join(addr, "alice").await;
    let (mut p2, id2) = join(addr, "bob").await;

    // alice sees bob's announce
    let snapshot = next_event(&mut p1).await;
    assert_eq!(snapshot["type"], "presence-snapshot");

    send_json(&mut p1, json!({ "type": "challenge", "invitee_id": id2 })).await;
    let challenged = next_event(&mut p2).await;
    assert_eq!(challenged["type"], "challenged");
    let _ = next_event(&mut p2).await; // challenge broadcast
    let _ = next_event(&mut p1).await; // challenge broadcast

    send_json(
        &mut p2,
        json!({ "type": "challenge-accept", "challenger_id": id1 }),
    )
    .await;
    let accepted = next_event(&mut p1).await;
    assert_eq!(accepted["type"], "challenge-accepted");
    let _ = next_event(&mut p1).await; // accept broadcast
    let _ = next_event(&mut p2).await; // accept broadcast

    ((p1, id1), (p2, id2))
}

#[tokio::test]
async fn test_announce_appears_online_and_idle() {
    let addr = start_test_server().await;
    let (_p1, id1) = join(addr, "alice").await;

    let presence = fetch_presence(addr).await;
    assert_eq!(online_ids(&presence), vec![id1]);
    assert_eq!(presence["online"][0]["display_name"], "alice");
    assert!(busy_ids(&presence).is_empty());
}

#[tokio::test]
async fn test_late_joiner_receives_welcome_and_current_snapshot() {
    let addr = start_test_server().await;
    let (_p1, id1) = join(addr, "alice").await;

    // A fresh, not-yet-announced connection still sees the lobby.
    let mut ws = connect(addr).await;
    let welcome = next_event(&mut ws).await;
    assert_eq!(welcome["type"], "welcome");
    assert!(welcome["connection_id"].is_string());

    let snapshot = next_event(&mut ws).await;
    assert_eq!(snapshot["type"], "presence-snapshot");
    let online: Vec<&str> = snapshot["online"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(online, vec![id1.as_str()]);
    assert!(snapshot["busy"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_challenge_notifies_invitee_and_marks_challenger_busy() {
    let addr = start_test_server().await;
    let (mut p1, id1) = join(addr, "alice").await;
    let (mut p2, id2) = join(addr, "bob").await;
    let _ = next_event(&mut p1).await; // bob's announce

    send_json(&mut p1, json!({ "type": "challenge", "invitee_id": id2 })).await;

    let challenged = next_event(&mut p2).await;
    assert_eq!(challenged["type"], "challenged");
    assert_eq!(challenged["challenger"]["display_name"], "alice");
    assert_eq!(challenged["challenger"]["id"], id1.as_str());

    // Only the challenger is committed while the handshake is pending.
    let presence = fetch_presence(addr).await;
    assert_eq!(busy_ids(&presence), vec![id1]);
}

#[tokio::test]
async fn test_accept_notifies_challenger_and_pairs_both() {
    let addr = start_test_server().await;
    let (mut p1, id1) = join(addr, "alice").await;
    let (mut p2, id2) = join(addr, "bob").await;
    let _ = next_event(&mut p1).await;

    send_json(&mut p1, json!({ "type": "challenge", "invitee_id": id2 })).await;
    let _ = next_event_of(&mut p2, "challenged").await;

    send_json(
        &mut p2,
        json!({ "type": "challenge-accept", "challenger_id": id1 }),
    )
    .await;

    let accepted = next_event_of(&mut p1, "challenge-accepted").await;
    assert_eq!(accepted["opponent"]["display_name"], "bob");
    assert_eq!(accepted["opponent"]["id"], id2.as_str());

    let presence = fetch_presence(addr).await;
    assert_eq!(busy_ids(&presence), sorted(vec![id1, id2]));
}

#[tokio::test]
async fn test_challenge_to_busy_player_reports_busy() {
    let addr = start_test_server().await;
    let ((mut p1, id1), (_p2, id2)) = pair_up(addr).await;

    let (mut p3, _id3) = join(addr, "carol").await;
    send_json(&mut p3, json!({ "type": "challenge", "invitee_id": id1 })).await;

    let busy = next_event(&mut p3).await;
    assert_eq!(busy["type"], "player-busy");
    assert_eq!(busy["player"]["display_name"], "alice");

    // The busy target hears nothing: only carol's announce broadcast is
    // queued on alice's stream.
    let snapshot = next_event(&mut p1).await;
    assert_eq!(snapshot["type"], "presence-snapshot");
    assert_silent(&mut p1, Duration::from_millis(300)).await;

    let presence = fetch_presence(addr).await;
    assert_eq!(busy_ids(&presence), sorted(vec![id1, id2]));
}

#[tokio::test]
async fn test_decline_frees_challenger_and_leaves_invitee_idle() {
    let addr = start_test_server().await;
    let (mut p1, id1) = join(addr, "alice").await;
    let (mut p2, id2) = join(addr, "bob").await;
    let _ = next_event(&mut p1).await;

    send_json(&mut p1, json!({ "type": "challenge", "invitee_id": id2 })).await;
    let _ = next_event_of(&mut p2, "challenged").await;

    send_json(
        &mut p2,
        json!({ "type": "challenge-decline", "challenger_id": id1 }),
    )
    .await;

    let declined = next_event_of(&mut p1, "challenge-declined").await;
    assert_eq!(declined["opponent"]["display_name"], "bob");

    let presence = fetch_presence(addr).await;
    assert!(busy_ids(&presence).is_empty());
    assert_eq!(online_ids(&presence), sorted(vec![id1, id2]));
}

#[tokio::test]
async fn test_leave_session_frees_both_sides() {
    let addr = start_test_server().await;
    let ((mut p1, id1), (mut p2, id2)) = pair_up(addr).await;

    // The invitee leaves; leaving is symmetric, both are freed.
    send_json(
        &mut p2,
        json!({
            "type": "leave-session",
            "opponent": { "id": id1, "display_name": "alice" },
        }),
    )
    .await;

    let left = next_event_of(&mut p1, "opponent-left").await;
    assert_eq!(left["display_name"], "bob");

    let presence = fetch_presence(addr).await;
    assert!(busy_ids(&presence).is_empty());
    assert_eq!(online_ids(&presence), sorted(vec![id1, id2]));
}

#[tokio::test]
async fn test_disconnect_mid_session_notifies_and_frees_peer() {
    let addr = start_test_server().await;
    let ((mut p1, id1), (mut p2, _id2)) = pair_up(addr).await;

    p2.close(None).await.expect("Failed to close");

    let left = next_event_of(&mut p1, "opponent-left").await;
    assert_eq!(left["display_name"], "bob");

    let presence = fetch_presence(addr).await;
    assert!(busy_ids(&presence).is_empty());
    assert_eq!(online_ids(&presence), vec![id1]);
}

#[tokio::test]
async fn test_accept_displaces_competing_challenge() {
    let addr = start_test_server().await;
    let (mut p1, id1) = join(addr, "alice").await;
    let (mut p2, _id2) = join(addr, "bob").await;
    let (mut p3, id3) = join(addr, "carol").await;

    // Both alice and bob challenge carol.
    send_json(&mut p1, json!({ "type": "challenge", "invitee_id": id3 })).await;
    let _ = next_event_of(&mut p3, "challenged").await;
    send_json(&mut p2, json!({ "type": "challenge", "invitee_id": id3 })).await;
    let second = next_event_of(&mut p3, "challenged").await;
    assert_eq!(second["challenger"]["display_name"], "bob");

    // carol accepts alice; bob's challenge is declined on her behalf.
    send_json(
        &mut p3,
        json!({ "type": "challenge-accept", "challenger_id": id1 }),
    )
    .await;

    let accepted = next_event_of(&mut p1, "challenge-accepted").await;
    assert_eq!(accepted["opponent"]["display_name"], "carol");

    let declined = next_event_of(&mut p2, "challenge-declined").await;
    assert_eq!(declined["opponent"]["display_name"], "carol");

    let presence = fetch_presence(addr).await;
    assert_eq!(busy_ids(&presence), sorted(vec![id1, id3]));
}

#[tokio::test]
async fn test_challenge_to_unknown_target_reports_error() {
    let addr = start_test_server().await;
    let (mut p1, _id1) = join(addr, "alice").await;

    send_json(
        &mut p1,
        json!({ "type": "challenge", "invitee_id": "no-such-connection" }),
    )
    .await;

    let error = next_event(&mut p1).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], 404);

    let presence = fetch_presence(addr).await;
    assert!(busy_ids(&presence).is_empty());
}

#[tokio::test]
async fn test_self_challenge_is_rejected_silently() {
    let addr = start_test_server().await;
    let (mut p1, id1) = join(addr, "alice").await;

    send_json(&mut p1, json!({ "type": "challenge", "invitee_id": id1 })).await;
    assert_silent(&mut p1, Duration::from_millis(300)).await;

    let presence = fetch_presence(addr).await;
    assert!(busy_ids(&presence).is_empty());
}

#[tokio::test]
async fn test_malformed_event_reports_error() {
    let addr = start_test_server().await;
    let (mut p1, _id1) = join(addr, "alice").await;

    p1.send(Message::text("this is not an event"))
        .await
        .expect("Failed to send");

    let error = next_event(&mut p1).await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], 400);

    // The connection survives a bad frame.
    send_json(
        &mut p1,
        json!({ "type": "announce", "display_name": "alice" }),
    )
    .await;
    let snapshot = next_event(&mut p1).await;
    assert_eq!(snapshot["type"], "presence-snapshot");
}

#[tokio::test]
async fn test_disconnect_cleanup_allows_fresh_reconnect() {
    let addr = start_test_server().await;
    let (mut p1, id1) = join(addr, "alice").await;
    p1.close(None).await.expect("Failed to close");

    // Give the server a moment to clean up
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (_p2, id2) = join(addr, "alice").await;
    assert_ne!(id1, id2, "Connection ids are not reused while live");

    let presence = fetch_presence(addr).await;
    assert_eq!(online_ids(&presence), vec![id2]);
    assert!(busy_ids(&presence).is_empty());
}
