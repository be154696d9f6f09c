//! # Arena Game
//!
//! Match coordination for a per-match arena game mode: which phase the match
//! is in, who plays on which team, who is still alive, which cosmetics each
//! player owns, and where a player goes when they want another round.
//!
//! The crate keeps all match state in memory inside one [`ArenaService`].
//! Everything it does not own (player names, balances, persisted purchases,
//! the list of other servers) is reached through the collaborator traits in
//! [`directory`], [`ledger`] and [`store`]. Observers plug in through the
//! shared [`EventSystem`](arena_event_system::EventSystem) and may veto
//! setting changes.
//!
//! ```rust
//! use arena_event_system::{create_arena_event_system, PlayerId};
//! use arena_game::*;
//! use std::sync::Arc;
//!
//! let directory = Arc::new(InMemoryDirectory::new());
//! directory.insert(PlayerId::new(1), "Alex");
//!
//! let mut arena = ArenaService::new(
//!     "BedWars",
//!     ArenaCollaborators {
//!         events: create_arena_event_system(),
//!         directory,
//!         ledger: Arc::new(InMemoryLedger::new()),
//!         item_store: Arc::new(InMemoryItemStore::new()),
//!         matches: Arc::new(StaticMatchDirectory::new(["bw-solo-1", "bw-solo-2"])),
//!         server_name: "bw-solo-1".to_string(),
//!     },
//! );
//!
//! arena.set_map_name("Lighthouse");
//! arena.set_mode("solo");
//! arena.set_max_players(8);
//! arena.register_phase(Arc::new(Phase::new("waiting", true)));
//! assert!(arena.can_start());
//!
//! arena.transition_to("waiting").unwrap();
//! assert!(arena.on_player_connected(PlayerId::new(1)).unwrap().is_allowed());
//! assert_eq!(arena.play_again(PlayerId::new(1)).unwrap(), "bw-solo-2");
//! ```

pub mod directory;
pub mod error;
pub mod events;
pub mod item;
pub mod ledger;
pub mod menu;
pub mod routing;
pub mod service;
pub mod session;
pub mod setting;
pub mod state;
pub mod store;
pub mod team;

pub use directory::{InMemoryDirectory, MatchDirectory, PlayerDirectory, StaticMatchDirectory};
pub use error::{ArenaError, ArenaResult};
pub use events::{ArenaInfo, PhaseChangedEvent, SettingChangeEvent};
pub use item::{
    CategoryId, Currency, GameItem, ItemCategory, ItemDisplayState, ItemId, ItemKey, ItemView,
    Price,
};
pub use ledger::{CurrencyLedger, InMemoryLedger};
pub use menu::{MenuLayout, MenuPage};
pub use service::{
    ArenaCollaborators, ArenaService, DenyReason, ItemInteraction, JoinDecision, SettingChange,
};
pub use session::{LifeState, Session};
pub use setting::{keys, GameSetting, SettingKey, SettingValue};
pub use state::{MatchPhase, Phase};
pub use store::{InMemoryItemStore, ItemStore};
pub use team::Team;
