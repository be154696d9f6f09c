//! Directory collaborators: who a player is, and where other arenas run.

use crate::error::{ArenaError, ArenaResult};
use arena_event_system::PlayerId;
use dashmap::DashMap;
use std::sync::Mutex;

/// Maps between stable player ids and display names.
pub trait PlayerDirectory: Send + Sync {
    /// Resolves a display name; matching is case-insensitive.
    fn resolve_id(&self, name: &str) -> ArenaResult<PlayerId>;

    fn resolve_name(&self, id: PlayerId) -> ArenaResult<String>;
}

/// Directory backed by two concurrent maps.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    names: DashMap<PlayerId, String>,
    ids: DashMap<String, PlayerId>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or renames a player.
    pub fn insert(&self, id: PlayerId, name: &str) {
        if let Some(previous) = self.names.insert(id, name.to_string()) {
            self.ids.remove(&previous.to_lowercase());
        }
        self.ids.insert(name.to_lowercase(), id);
    }
}

impl PlayerDirectory for InMemoryDirectory {
    fn resolve_id(&self, name: &str) -> ArenaResult<PlayerId> {
        self.ids
            .get(&name.to_lowercase())
            .map(|entry| *entry.value())
            .ok_or_else(|| ArenaError::UnknownPlayer(name.to_string()))
    }

    fn resolve_name(&self, id: PlayerId) -> ArenaResult<String> {
        self.names
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(ArenaError::UnknownPlayerId(id))
    }
}

/// Knows which servers host which game mode and can move players between them.
pub trait MatchDirectory: Send + Sync {
    /// Servers whose name starts with `mode_prefix`, including the caller's own.
    fn servers_for_mode(&self, mode_prefix: &str) -> Vec<String>;

    /// Asks the network to move `player_name` to `server`. Fire-and-forget.
    fn redirect(&self, player_name: &str, server: &str);
}

/// Fixed server list that records redirect requests.
#[derive(Debug, Default)]
pub struct StaticMatchDirectory {
    servers: Vec<String>,
    redirects: Mutex<Vec<(String, String)>>,
}

impl StaticMatchDirectory {
    pub fn new<I, S>(servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            servers: servers.into_iter().map(Into::into).collect(),
            redirects: Mutex::new(Vec::new()),
        }
    }

    /// `(player, server)` pairs in request order.
    pub fn redirects(&self) -> Vec<(String, String)> {
        self.redirects
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

impl MatchDirectory for StaticMatchDirectory {
    fn servers_for_mode(&self, mode_prefix: &str) -> Vec<String> {
        self.servers
            .iter()
            .filter(|server| server.starts_with(mode_prefix))
            .cloned()
            .collect()
    }

    fn redirect(&self, player_name: &str, server: &str) {
        if let Ok(mut log) = self.redirects.lock() {
            log.push((player_name.to_string(), server.to_string()));
        }
    }
}
