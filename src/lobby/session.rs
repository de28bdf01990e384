//! Explicit session records.
//!
//! A session is created Pending when a challenge is issued and becomes
//! Active on acceptance. Busy membership is derived from session
//! membership rather than tracked as a separate set: the challenger of
//! any session is committed from the moment of issue, the invitee only
//! once the session is Active.

use std::collections::HashMap;
use uuid::Uuid;

/// Lifecycle of a session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Challenge issued, awaiting the invitee's response. Only the
    /// challenger is committed.
    Pending,
    /// Handshake confirmed; both participants are committed.
    Active,
}

/// A two-participant session, keyed by id in the [`SessionTable`].
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub challenger: String,
    pub invitee: String,
    pub state: SessionState,
}

impl Session {
    /// The other member's connection id, if `conn_id` is a member.
    pub fn peer_of(&self, conn_id: &str) -> Option<&str> {
        if self.challenger == conn_id {
            Some(&self.invitee)
        } else if self.invitee == conn_id {
            Some(&self.challenger)
        } else {
            None
        }
    }

    /// Whether `conn_id` is a member of this session.
    pub fn involves(&self, conn_id: &str) -> bool {
        self.challenger == conn_id || self.invitee == conn_id
    }

    /// Whether this session commits `conn_id` (the derived busy rule).
    fn commits(&self, conn_id: &str) -> bool {
        self.challenger == conn_id || (self.state == SessionState::Active && self.invitee == conn_id)
    }
}

/// In-memory table of session records.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<String, Session>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Whether `conn_id` is committed to any session.
    pub fn is_busy(&self, conn_id: &str) -> bool {
        self.sessions.values().any(|s| s.commits(conn_id))
    }

    /// Open a Pending session. Re-issuing an identical pending challenge
    /// returns the existing record instead of creating a duplicate.
    pub fn open(&mut self, challenger: &str, invitee: &str) -> String {
        if let Some(id) = self.pending_between(challenger, invitee) {
            return id;
        }

        let session = Session {
            id: Uuid::new_v4().to_string(),
            challenger: challenger.to_string(),
            invitee: invitee.to_string(),
            state: SessionState::Pending,
        };
        let id = session.id.clone();
        self.sessions.insert(id.clone(), session);
        id
    }

    /// Promote a session to Active. Unknown id is a no-op.
    pub fn activate(&mut self, session_id: &str) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.state = SessionState::Active;
        }
    }

    /// Remove a session record. Safe to call with an unknown id.
    pub fn remove(&mut self, session_id: &str) -> Option<Session> {
        self.sessions.remove(session_id)
    }

    /// The Pending session `challenger -> invitee`, if one exists.
    pub fn pending_between(&self, challenger: &str, invitee: &str) -> Option<String> {
        self.sessions
            .values()
            .find(|s| {
                s.state == SessionState::Pending
                    && s.challenger == challenger
                    && s.invitee == invitee
            })
            .map(|s| s.id.clone())
    }

    /// The Active session `conn_id` is a member of, if any.
    pub fn active_session_of(&self, conn_id: &str) -> Option<&Session> {
        self.sessions
            .values()
            .find(|s| s.state == SessionState::Active && s.involves(conn_id))
    }

    /// Ids of every session `conn_id` appears in, in either seat.
    pub fn sessions_involving(&self, conn_id: &str) -> Vec<String> {
        self.sessions
            .values()
            .filter(|s| s.involves(conn_id))
            .map(|s| s.id.clone())
            .collect()
    }

    /// Ids of Pending sessions whose invitee is `conn_id`.
    pub fn pending_aimed_at(&self, conn_id: &str) -> Vec<String> {
        self.sessions
            .values()
            .filter(|s| s.state == SessionState::Pending && s.invitee == conn_id)
            .map(|s| s.id.clone())
            .collect()
    }
}
