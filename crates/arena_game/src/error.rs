//! Error types for the arena core

use crate::item::{CategoryId, ItemId};
use arena_event_system::{EventError, PlayerId};
use thiserror::Error;

/// Errors surfaced by arena operations.
///
/// Every variant is local and recoverable: the failed operation leaves the
/// arena unchanged and the caller decides whether to try again.
#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("Unknown player: {0}")]
    UnknownPlayer(String),

    #[error("Unknown player id: {0}")]
    UnknownPlayerId(PlayerId),

    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    #[error("Team {0} is not registered")]
    UnknownTeam(u32),

    #[error("Item category {0} is not registered")]
    UnknownCategory(CategoryId),

    #[error("Item {item} does not exist in category {category}")]
    UnknownItem { category: CategoryId, item: ItemId },

    #[error("A menu needs between 3 and 6 rows, got {0}")]
    InvalidLayout(u8),

    #[error("No free server is hosting mode {0}")]
    NoEligibleDestination(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Item store error: {0}")]
    Store(String),

    #[error("Event system error: {0}")]
    Event(#[from] EventError),
}

pub type ArenaResult<T> = Result<T, ArenaError>;
