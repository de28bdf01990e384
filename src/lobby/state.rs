//! The matchmaking authority: online set plus session table.
//!
//! All of this state lives behind one mutex (see `AppState`), and every
//! transition below is a single non-suspending unit of work, so
//! concurrent client events are applied atomically in arrival order.
//! Transitions return typed outcomes; delivering the resulting notices
//! is the signaling layer's job.

use std::collections::HashMap;

use crate::lobby::session::{SessionState, SessionTable};
use crate::wire::Player;

/// Result of a `challenge` transition.
#[derive(Debug)]
pub enum ChallengeOutcome {
    /// Pending session opened; the challenger is now busy.
    Issued { challenger: Player, invitee: Player },
    /// Target is committed elsewhere; no state change.
    InviteeBusy { invitee: Player },
    /// Target id is not in the online set (stale or never announced).
    UnknownInvitee,
    /// Challenger unannounced, already busy, or challenging itself.
    Rejected,
}

/// Result of an `accept` transition.
#[derive(Debug)]
pub enum AcceptOutcome {
    Accepted {
        challenger: Player,
        invitee: Player,
        /// Challengers of other pending sessions aimed at either newly
        /// paired participant, with the player now unavailable to them.
        displaced: Vec<(String, Player)>,
    },
    /// No matching pending challenge, or the invitee is no longer idle.
    NotPending,
}

/// Result of a `decline` transition.
#[derive(Debug)]
pub enum DeclineOutcome {
    Declined {
        challenger_id: String,
        invitee: Player,
    },
    NotPending,
}

/// Result of a `leave` transition.
#[derive(Debug)]
pub enum LeaveOutcome {
    Left {
        departing: Player,
        opponent_id: String,
    },
    NoSession,
}

/// Result of disconnect cleanup.
#[derive(Debug, Default)]
pub struct DisconnectOutcome {
    /// The removed online entry, if the connection had announced.
    pub player: Option<Player>,
    /// Active-session peer to notify: (peer conn id, departing player).
    pub opponent_left: Option<(String, Player)>,
    /// Pending challengers whose invitee vanished: (challenger conn id,
    /// vanished invitee).
    pub auto_declined: Vec<(String, Player)>,
    /// Whether the online or busy set changed (snapshot needed).
    pub changed: bool,
}

/// Online set + session table. Owned exclusively by `AppState::lobby`.
#[derive(Debug, Default)]
pub struct Lobby {
    players: HashMap<String, Player>,
    sessions: SessionTable,
}

impl Lobby {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
            sessions: SessionTable::new(),
        }
    }

    /// Register a connection as a participant. Last call wins; duplicate
    /// entries are impossible by construction.
    pub fn announce(&mut self, conn_id: &str, display_name: &str) -> Player {
        let player = Player {
            id: conn_id.to_string(),
            display_name: display_name.to_string(),
        };
        self.players.insert(conn_id.to_string(), player.clone());
        player
    }

    /// Look up an announced participant.
    #[allow(dead_code)]
    pub fn lookup(&self, conn_id: &str) -> Option<Player> {
        self.players.get(conn_id).cloned()
    }

    /// Whether the connection is committed to a session.
    #[allow(dead_code)]
    pub fn is_busy(&self, conn_id: &str) -> bool {
        self.sessions.is_busy(conn_id)
    }

    /// Propose a session. Requires the challenger to be announced and
    /// idle and the invitee to be announced; an occupied invitee is
    /// reported, not an error.
    pub fn challenge(&mut self, challenger_id: &str, invitee_id: &str) -> ChallengeOutcome {
        let challenger = match self.players.get(challenger_id) {
            Some(player) => player.clone(),
            None => return ChallengeOutcome::Rejected,
        };
        if challenger_id == invitee_id {
            return ChallengeOutcome::Rejected;
        }
        if self.sessions.is_busy(challenger_id) {
            return ChallengeOutcome::Rejected;
        }

        let invitee = match self.players.get(invitee_id) {
            Some(player) => player.clone(),
            None => return ChallengeOutcome::UnknownInvitee,
        };
        if self.sessions.is_busy(invitee_id) {
            return ChallengeOutcome::InviteeBusy { invitee };
        }

        self.sessions.open(challenger_id, invitee_id);
        ChallengeOutcome::Issued {
            challenger,
            invitee,
        }
    }

    /// Accept a pending challenge. The invitee must still be idle; the
    /// challenger has been committed since issue, so activation adds no
    /// duplicate membership. Every other pending session aimed at either
    /// participant is removed and reported for auto-decline, so no
    /// challenger is left dangling against a paired peer.
    pub fn accept(&mut self, invitee_id: &str, challenger_id: &str) -> AcceptOutcome {
        let session_id = match self.sessions.pending_between(challenger_id, invitee_id) {
            Some(id) => id,
            None => return AcceptOutcome::NotPending,
        };
        if self.sessions.is_busy(invitee_id) {
            return AcceptOutcome::NotPending;
        }

        let challenger = match self.players.get(challenger_id) {
            Some(player) => player.clone(),
            None => {
                // Session without an online challenger cannot happen
                // (disconnect dissolves sessions); drop it if it does.
                self.sessions.remove(&session_id);
                return AcceptOutcome::NotPending;
            }
        };
        let invitee = match self.players.get(invitee_id) {
            Some(player) => player.clone(),
            None => {
                self.sessions.remove(&session_id);
                return AcceptOutcome::NotPending;
            }
        };

        self.sessions.activate(&session_id);

        let mut displaced = Vec::new();
        for sid in self.sessions.pending_aimed_at(invitee_id) {
            if let Some(session) = self.sessions.remove(&sid) {
                displaced.push((session.challenger, invitee.clone()));
            }
        }
        for sid in self.sessions.pending_aimed_at(challenger_id) {
            if let Some(session) = self.sessions.remove(&sid) {
                displaced.push((session.challenger, challenger.clone()));
            }
        }

        AcceptOutcome::Accepted {
            challenger,
            invitee,
            displaced,
        }
    }

    /// Decline a pending challenge: frees the challenger only, the
    /// invitee was never committed by it.
    pub fn decline(&mut self, invitee_id: &str, challenger_id: &str) -> DeclineOutcome {
        let session_id = match self.sessions.pending_between(challenger_id, invitee_id) {
            Some(id) => id,
            None => return DeclineOutcome::NotPending,
        };
        self.sessions.remove(&session_id);

        let invitee = match self.players.get(invitee_id) {
            Some(player) => player.clone(),
            None => return DeclineOutcome::NotPending,
        };

        DeclineOutcome::Declined {
            challenger_id: challenger_id.to_string(),
            invitee,
        }
    }

    /// End the active session `departing_id` is a member of. Pairing is
    /// symmetric: either side may leave and both are freed. The session
    /// table, not the caller, decides who the peer is.
    pub fn leave(&mut self, departing_id: &str) -> LeaveOutcome {
        let session = match self.sessions.active_session_of(departing_id) {
            Some(session) => session.clone(),
            None => return LeaveOutcome::NoSession,
        };
        self.sessions.remove(&session.id);

        let departing = match self.players.get(departing_id) {
            Some(player) => player.clone(),
            None => return LeaveOutcome::NoSession,
        };
        let opponent_id = match session.peer_of(departing_id) {
            Some(peer) => peer.to_string(),
            None => return LeaveOutcome::NoSession,
        };

        LeaveOutcome::Left {
            departing,
            opponent_id,
        }
    }

    /// Unwind all state for a connection: dissolve every session it
    /// appears in (busy cleared first), then drop the online entry.
    /// Unconditionally idempotent.
    pub fn disconnect(&mut self, conn_id: &str) -> DisconnectOutcome {
        let mut outcome = DisconnectOutcome::default();

        for session_id in self.sessions.sessions_involving(conn_id) {
            let session = match self.sessions.remove(&session_id) {
                Some(session) => session,
                None => continue,
            };
            outcome.changed = true;

            match session.state {
                SessionState::Active => {
                    if let (Some(peer), Some(departing)) =
                        (session.peer_of(conn_id), self.players.get(conn_id))
                    {
                        outcome.opponent_left = Some((peer.to_string(), departing.clone()));
                    }
                }
                SessionState::Pending if session.invitee == conn_id => {
                    // The challenger was committed against an invitee
                    // that no longer exists; decline on its behalf.
                    if let Some(invitee) = self.players.get(conn_id) {
                        outcome
                            .auto_declined
                            .push((session.challenger.clone(), invitee.clone()));
                    }
                }
                SessionState::Pending => {
                    // Issued by the vanished connection; the invitee was
                    // never committed, the next snapshot supersedes the
                    // stale challenged notice.
                }
            }
        }

        if let Some(player) = self.players.remove(conn_id) {
            outcome.player = Some(player);
            outcome.changed = true;
        }

        outcome
    }

    /// Full (online, busy) snapshot. Busy is derived from session
    /// membership, so it is a subset of the online set by construction.
    pub fn snapshot(&self) -> (Vec<Player>, Vec<String>) {
        let online: Vec<Player> = self.players.values().cloned().collect();
        let busy: Vec<String> = self
            .players
            .keys()
            .filter(|id| self.sessions.is_busy(id))
            .cloned()
            .collect();
        (online, busy)
    }
}
