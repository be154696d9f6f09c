//! Per-player session records.
//!
//! Sessions are keyed by [`PlayerId`]. A name lookup goes through the
//! [`PlayerDirectory`] first, so a player who renames between lookups still
//! resolves to the same session.

use crate::directory::PlayerDirectory;
use crate::error::ArenaResult;
use crate::item::{CategoryId, ItemId, ItemKey};
use arena_event_system::PlayerId;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifeState {
    Alive,
    /// In the match but spectating
    Ghost,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    player_id: PlayerId,
    name: String,
    life: LifeState,
    team: Option<u32>,
    owned_items: HashSet<ItemKey>,
    selected_items: HashMap<CategoryId, ItemId>,
}

impl Session {
    fn new(player_id: PlayerId, name: String) -> Self {
        Self {
            player_id,
            name,
            life: LifeState::Alive,
            team: None,
            owned_items: HashSet::new(),
            selected_items: HashMap::new(),
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Name the directory returned when the session was created.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn life(&self) -> LifeState {
        self.life
    }

    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    pub fn is_ghost(&self) -> bool {
        self.life == LifeState::Ghost
    }

    pub fn set_life(&mut self, life: LifeState) {
        self.life = life;
    }

    pub fn team(&self) -> Option<u32> {
        self.team
    }

    pub(crate) fn set_team(&mut self, team: Option<u32>) {
        self.team = team;
    }

    pub fn owns(&self, key: ItemKey) -> bool {
        self.owned_items.contains(&key)
    }

    pub fn owned_items(&self) -> impl Iterator<Item = &ItemKey> {
        self.owned_items.iter()
    }

    /// Returns `false` if the item was already owned.
    pub fn grant_item(&mut self, key: ItemKey) -> bool {
        self.owned_items.insert(key)
    }

    pub fn selected_item(&self, category: CategoryId) -> Option<ItemId> {
        self.selected_items.get(&category).copied()
    }

    pub fn is_selected(&self, key: ItemKey) -> bool {
        self.selected_item(key.category) == Some(key.item)
    }

    /// Makes `key` the selection of its category and returns the item it
    /// replaced. Only owned items can be selected.
    pub(crate) fn select_item(&mut self, key: ItemKey) -> Option<ItemId> {
        debug_assert!(self.owns(key));
        self.selected_items.insert(key.category, key.item)
    }

    pub(crate) fn unselect_item(&mut self, category: CategoryId) -> Option<ItemId> {
        self.selected_items.remove(&category)
    }
}

/// Lazily populated map of sessions for everyone the arena has seen.
pub struct SessionStore {
    directory: Arc<dyn PlayerDirectory>,
    sessions: HashMap<PlayerId, Session>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

impl SessionStore {
    pub fn new(directory: Arc<dyn PlayerDirectory>) -> Self {
        Self {
            directory,
            sessions: HashMap::new(),
        }
    }

    /// Returns the session for `id`, creating it on first access.
    ///
    /// The id must be known to the directory; an unknown id is an error and no
    /// session is created.
    pub fn get(&mut self, id: PlayerId) -> ArenaResult<&mut Session> {
        match self.sessions.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let name = self.directory.resolve_name(id)?;
                debug!("👤 Created session for {} ({})", name, id);
                Ok(entry.insert(Session::new(id, name)))
            }
        }
    }

    /// Resolves `name` through the directory and returns that player's session.
    pub fn get_by_name(&mut self, name: &str) -> ArenaResult<&mut Session> {
        let id = self.directory.resolve_id(name)?;
        self.get(id)
    }

    /// Looks up a session without creating one.
    pub fn peek(&self, id: PlayerId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn alive(&self) -> HashSet<PlayerId> {
        self.filtered(Session::is_alive)
    }

    pub fn ghosts(&self) -> HashSet<PlayerId> {
        self.filtered(Session::is_ghost)
    }

    fn filtered(&self, predicate: impl Fn(&Session) -> bool) -> HashSet<PlayerId> {
        self.sessions
            .values()
            .filter(|session| predicate(session))
            .map(Session::player_id)
            .collect()
    }

    /// Drops the session of a player who left.
    pub fn evict(&mut self, id: PlayerId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }
}
