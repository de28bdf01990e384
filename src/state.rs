use std::sync::{Arc, Mutex, MutexGuard};

use crate::lobby::state::Lobby;
use crate::ws::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State
/// extractor.
#[derive(Clone)]
pub struct AppState {
    /// Outbound sender per live WebSocket connection
    pub connections: ConnectionRegistry,
    /// Matchmaking authority: online set + session table behind one lock
    pub lobby: Arc<Mutex<Lobby>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            connections: crate::ws::new_connection_registry(),
            lobby: Arc::new(Mutex::new(Lobby::new())),
        }
    }

    /// Acquire the matchmaking lock. Lobby transitions never suspend or
    /// panic while the guard is held, so a poisoned lock still carries
    /// consistent state and is safe to recover.
    pub fn lock_lobby(&self) -> MutexGuard<'_, Lobby> {
        self.lobby
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
