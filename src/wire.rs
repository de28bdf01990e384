//! Wire protocol types for the WebSocket event channel.
//!
//! Every frame is a JSON object tagged with a `type` field. Board state,
//! role, and winner payloads are defined by the client and pass through
//! the server unmodified.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An announced participant as seen on the wire.
///
/// `id` is the transport-assigned connection id; `display_name` is
/// client-supplied and neither unique nor validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub display_name: String,
}

/// Marker for the two seats in a session. The server attaches no meaning
/// to which seat is which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    A,
    B,
}

/// Events a client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Identify this connection as a participant named `display_name`.
    Announce { display_name: String },
    /// Propose a session to the participant at `invitee_id`.
    Challenge { invitee_id: String },
    /// Accept a pending challenge issued by `challenger_id`.
    ChallengeAccept { challenger_id: String },
    /// Decline a pending challenge issued by `challenger_id`.
    ChallengeDecline { challenger_id: String },
    /// End the active session; the opponent field is informational only,
    /// the session table decides who the peer actually is.
    LeaveSession { opponent: Player },
    /// Relay a turn: full board state plus the sender's seat.
    Move {
        board: Value,
        role: Role,
        opponent: Player,
    },
    /// Relay a win announcement.
    Result { winner: Role, opponent: Player },
    /// Ask the opponent for a board reset.
    ResetRequest { opponent: Player },
}

/// Events the server may send.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// First frame on every connection: the transport-assigned id, which
    /// the client needs to recognize itself in presence snapshots.
    Welcome { connection_id: String },
    /// Full (online, busy) snapshot; broadcast to everyone on any change.
    PresenceSnapshot {
        online: Vec<Player>,
        busy: Vec<String>,
    },
    /// Challenge target is already committed to a session; to the
    /// challenger only.
    PlayerBusy { player: Player },
    /// A challenge arrived; to the invitee only.
    Challenged { challenger: Player },
    /// The invitee accepted; to the challenger only.
    ChallengeAccepted { opponent: Player },
    /// The invitee declined (or became unavailable); to the challenger
    /// only.
    ChallengeDeclined { opponent: Player },
    /// The session peer left or disconnected; to the remaining peer.
    OpponentLeft { display_name: String },
    /// Relayed turn; to the opponent only.
    MoveRelayed { board: Value, role: Role },
    /// Relayed win announcement; to the opponent only.
    ResultRelayed { winner: Role },
    /// Relayed reset request; to the opponent only.
    ResetRelayed,
    /// Protocol-level failure notice; to the offending sender only.
    Error { code: u16, message: String },
}
