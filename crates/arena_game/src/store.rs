//! Persistence of purchased cosmetics.
//!
//! Writes are fire-and-forget from the arena's point of view: the service logs
//! a failed write and carries on with the in-memory state.

use crate::error::{ArenaError, ArenaResult};
use crate::item::ItemKey;
use arena_event_system::PlayerId;
use dashmap::DashMap;

pub trait ItemStore: Send + Sync {
    /// Records a newly purchased item.
    fn insert(&self, player: PlayerId, key: ItemKey, selected: bool) -> ArenaResult<()>;

    /// Updates the selected flag of an owned item.
    fn update_selection(&self, player: PlayerId, key: ItemKey, selected: bool) -> ArenaResult<()>;
}

/// Row-per-item store kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryItemStore {
    rows: DashMap<(PlayerId, ItemKey), bool>,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selected flag of a stored row, `None` if the row does not exist.
    pub fn row(&self, player: PlayerId, key: ItemKey) -> Option<bool> {
        self.rows.get(&(player, key)).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ItemStore for InMemoryItemStore {
    fn insert(&self, player: PlayerId, key: ItemKey, selected: bool) -> ArenaResult<()> {
        self.rows.insert((player, key), selected);
        Ok(())
    }

    fn update_selection(&self, player: PlayerId, key: ItemKey, selected: bool) -> ArenaResult<()> {
        match self.rows.get_mut(&(player, key)) {
            Some(mut row) => {
                *row = selected;
                Ok(())
            }
            None => Err(ArenaError::Store(format!(
                "no row for item {}/{} of {}",
                key.category, key.item, player
            ))),
        }
    }
}
