//! The arena itself: match metadata plus every registry of one running match.
//!
//! [`ArenaService`] owns its phases, teams, sessions, settings and item
//! catalog, and talks to the rest of the network only through the
//! collaborators handed to it in [`ArenaCollaborators`]. All methods run to
//! completion on the caller's thread; the service holds no locks and expects
//! a single owner.

use crate::directory::{MatchDirectory, PlayerDirectory};
use crate::error::{ArenaError, ArenaResult};
use crate::events::{
    ArenaInfo, PhaseChangedEvent, SettingChangeEvent, ARENA_INFO, PHASE_CHANGED,
    PLAYER_CONNECTED, PLAYER_DISCONNECTED, SETTING_CHANGED,
};
use crate::item::{
    CategoryId, GameItem, ItemCatalog, ItemCategory, ItemDisplayState, ItemId, ItemKey, ItemView,
    Price,
};
use crate::ledger::CurrencyLedger;
use crate::menu::{MenuLayout, MenuPage};
use crate::routing::{mode_prefix, pick_destination};
use crate::session::{LifeState, Session, SessionStore};
use crate::setting::{GameSetting, SettingKey, SettingType, SettingValue};
use crate::state::{MatchPhase, StateRegistry};
use crate::store::ItemStore;
use crate::team::{Team, TeamRegistry};
use arena_event_system::{
    current_timestamp, DisconnectReason, EventSystem, PlayerConnectedEvent,
    PlayerDisconnectedEvent, PlayerId,
};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Everything outside the arena that the arena needs to talk to.
#[derive(Clone)]
pub struct ArenaCollaborators {
    pub events: Arc<EventSystem>,
    pub directory: Arc<dyn PlayerDirectory>,
    pub ledger: Arc<dyn CurrencyLedger>,
    pub item_store: Arc<dyn ItemStore>,
    pub matches: Arc<dyn MatchDirectory>,
    /// Name of the server this arena runs on, e.g. `bw-solo-3`
    pub server_name: String,
}

/// Outcome of [`ArenaService::set_setting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum SettingChange {
    Applied,
    /// An observer cancelled the change; the old value is still in place
    Vetoed,
}

/// Why a connecting player was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    NoActivePhase,
    PhaseClosed { phase: String },
    ArenaFull { max_players: u32 },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::NoActivePhase => write!(f, "the arena is not running"),
            DenyReason::PhaseClosed { phase } => write!(f, "the match is in phase '{}'", phase),
            DenyReason::ArenaFull { max_players } => {
                write!(f, "the arena is full ({} players)", max_players)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinDecision {
    Allowed,
    Denied(DenyReason),
}

impl JoinDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, JoinDecision::Allowed)
    }
}

/// Outcome of clicking an item in the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemInteraction {
    /// Not owned and the player cannot pay; nothing changed
    InsufficientFunds { price: Price },
    /// Bought but not selected
    Purchased,
    /// Became the category's selection, replacing `previous`
    Selected { previous: Option<ItemId> },
    AlreadySelected,
}

pub struct ArenaService {
    game_name: String,
    map_name: Option<String>,
    mode: Option<String>,
    max_players: u32,

    states: StateRegistry,
    teams: TeamRegistry,
    sessions: SessionStore,
    settings: HashMap<GameSetting, SettingValue>,
    catalog: ItemCatalog,
    /// Admitted players in connect order
    online: Vec<PlayerId>,

    events: Arc<EventSystem>,
    directory: Arc<dyn PlayerDirectory>,
    ledger: Arc<dyn CurrencyLedger>,
    item_store: Arc<dyn ItemStore>,
    matches: Arc<dyn MatchDirectory>,
    server_name: String,
}

impl fmt::Debug for ArenaService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaService")
            .field("game_name", &self.game_name)
            .field("map_name", &self.map_name)
            .field("mode", &self.mode)
            .field("max_players", &self.max_players)
            .field("server_name", &self.server_name)
            .field("states", &self.states)
            .field("teams", &self.teams)
            .field("sessions", &self.sessions)
            .field("online", &self.online)
            .finish()
    }
}

impl ArenaService {
    /// Creates an empty arena.
    ///
    /// The arena starts without map, mode, phases or teams and admits nobody
    /// until those are configured.
    ///
    /// # Arguments
    ///
    /// * `game_name` - Display name of the game, e.g. `BedWars`
    /// * `collaborators` - Event bus, directories, ledger and item store the
    ///   arena talks to
    ///
    /// # Returns
    ///
    /// A new `ArenaService` for which [`can_start`](Self::can_start) is `false`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use arena_event_system::create_arena_event_system;
    /// use arena_game::*;
    /// use std::sync::Arc;
    ///
    /// let arena = ArenaService::new(
    ///     "BedWars",
    ///     ArenaCollaborators {
    ///         events: create_arena_event_system(),
    ///         directory: Arc::new(InMemoryDirectory::new()),
    ///         ledger: Arc::new(InMemoryLedger::new()),
    ///         item_store: Arc::new(InMemoryItemStore::new()),
    ///         matches: Arc::new(StaticMatchDirectory::new(["bw-solo-1"])),
    ///         server_name: "bw-solo-1".to_string(),
    ///     },
    /// );
    /// assert_eq!(arena.game_name(), "BedWars");
    /// assert!(!arena.can_start());
    /// ```
    pub fn new(game_name: impl Into<String>, collaborators: ArenaCollaborators) -> Self {
        let ArenaCollaborators {
            events,
            directory,
            ledger,
            item_store,
            matches,
            server_name,
        } = collaborators;

        Self {
            game_name: game_name.into(),
            map_name: None,
            mode: None,
            max_players: 0,
            states: StateRegistry::new(),
            teams: TeamRegistry::new(),
            sessions: SessionStore::new(Arc::clone(&directory)),
            settings: HashMap::new(),
            catalog: ItemCatalog::new(),
            online: Vec::new(),
            events,
            directory,
            ledger,
            item_store,
            matches,
            server_name,
        }
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    pub fn game_name(&self) -> &str {
        &self.game_name
    }

    pub fn map_name(&self) -> Option<&str> {
        self.map_name.as_deref()
    }

    pub fn set_map_name(&mut self, map_name: impl Into<String>) {
        self.map_name = Some(map_name.into());
    }

    pub fn mode(&self) -> Option<&str> {
        self.mode.as_deref()
    }

    pub fn set_mode(&mut self, mode: impl Into<String>) {
        self.mode = Some(mode.into());
    }

    pub fn max_players(&self) -> u32 {
        self.max_players
    }

    pub fn set_max_players(&mut self, max_players: u32) {
        self.max_players = max_players;
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn events(&self) -> &Arc<EventSystem> {
        &self.events
    }

    /// True once the arena has a phase, a map, a mode and room for players.
    pub fn can_start(&self) -> bool {
        !self.states.is_empty()
            && self.map_name.is_some()
            && self.mode.is_some()
            && self.max_players > 0
    }

    pub fn snapshot_info(&self) -> ArenaInfo {
        ArenaInfo {
            map_name: self.map_name.clone(),
            mode: self.mode.clone(),
            joinable: self
                .states
                .current()
                .is_some_and(|phase| phase.accepts_new_players()),
            alive_players: self.sessions.alive().len(),
            max_players: self.max_players,
        }
    }

    /// Emits the current [`ArenaInfo`] on `core:arena_info`.
    pub fn publish_info(&self) -> ArenaInfo {
        let info = self.snapshot_info();
        self.events.emit_core(ARENA_INFO, &info);
        info
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn setting<V: SettingType>(&self, key: SettingKey<V>) -> Option<V> {
        self.settings.get(&key.setting()).and_then(V::from_value)
    }

    pub fn has_setting(&self, setting: GameSetting) -> bool {
        self.settings.contains_key(&setting)
    }

    /// Proposes a new value to the `core:setting_changed` observers and
    /// stores it unless one of them vetoes.
    ///
    /// # Arguments
    ///
    /// * `key` - Typed setting key from [`keys`](crate::setting::keys)
    /// * `value` - Proposed value; its type is fixed by `key`
    ///
    /// # Returns
    ///
    /// [`SettingChange::Applied`] when stored, [`SettingChange::Vetoed`] when an
    /// observer cancelled the change and the previous value was kept.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// assert_eq!(arena.set_setting(keys::MIN_PLAYERS, 4), SettingChange::Applied);
    /// assert_eq!(arena.setting(keys::MIN_PLAYERS), Some(4));
    /// ```
    pub fn set_setting<V: SettingType>(&mut self, key: SettingKey<V>, value: V) -> SettingChange {
        let setting = key.setting();
        let event = SettingChangeEvent {
            setting,
            old: self.settings.get(&setting).cloned(),
            new: value.into_value(),
        };

        if self.events.emit_core(SETTING_CHANGED, &event).is_veto() {
            debug!("🚫 Change of {} to {} was vetoed", setting, event.new);
            return SettingChange::Vetoed;
        }

        debug!("⚙️ Setting {} is now {}", setting, event.new);
        self.settings.insert(setting, event.new);
        SettingChange::Applied
    }

    // ------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------

    pub fn register_phase(&mut self, phase: Arc<dyn MatchPhase>) -> bool {
        self.states.register(phase)
    }

    pub fn current_phase(&self) -> Option<&Arc<dyn MatchPhase>> {
        self.states.current()
    }

    pub fn phases(&self) -> &[Arc<dyn MatchPhase>] {
        self.states.phases()
    }

    pub fn transition_to(&mut self, name: &str) -> ArenaResult<()> {
        let previous = self.current_phase_name();
        let phase = self.states.transition_to(name)?;
        self.announce_phase(previous, phase.as_ref());
        Ok(())
    }

    /// Moves to the next registered phase; `Ok(false)` when already at the last.
    pub fn advance_phase(&mut self) -> ArenaResult<bool> {
        let previous = self.current_phase_name();
        match self.states.advance()? {
            Some(phase) => {
                self.announce_phase(previous, phase.as_ref());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn current_phase_name(&self) -> Option<String> {
        self.states.current().map(|phase| phase.name().to_string())
    }

    fn announce_phase(&self, previous: Option<String>, phase: &dyn MatchPhase) {
        let event = PhaseChangedEvent {
            previous,
            current: phase.name().to_string(),
            accepts_new_players: phase.accepts_new_players(),
            timestamp: current_timestamp(),
        };
        self.events.emit_core(PHASE_CHANGED, &event);
    }

    // ------------------------------------------------------------------
    // Teams
    // ------------------------------------------------------------------

    pub fn register_team(&mut self, index: u32, team: Team) {
        self.teams.register(index, team);
    }

    pub fn team(&self, index: u32) -> Option<&Team> {
        self.teams.get(index)
    }

    pub fn team_mut(&mut self, index: u32) -> Option<&mut Team> {
        self.teams.get_mut(index)
    }

    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.teams()
    }

    /// Spreads online players without a team over `candidates`.
    ///
    /// Teams are filled one after another in the order given, each up to
    /// `per_team_capacity`; teams already at capacity are skipped. Players who
    /// already have a team keep it, even if that team is not a candidate.
    /// Players left over once every candidate is full stay teamless.
    ///
    /// Returns `false` without touching anything when no candidate team had
    /// room at the time of the call.
    ///
    /// # Arguments
    ///
    /// * `per_team_capacity` - Upper bound on the roster size of every candidate
    /// * `candidates` - Team indices in fill order; a repeated index is filled
    ///   at most up to `per_team_capacity` like any other
    ///
    /// # Returns
    ///
    /// `true` if at least one candidate team had room, `false` otherwise.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// // Five players online, two of each on teams 1 and 2, one left over.
    /// assert!(arena.assign_players_to_teams(2, &[1, 2]));
    /// ```
    pub fn assign_players_to_teams(&mut self, per_team_capacity: usize, candidates: &[u32]) -> bool {
        let mut candidates = candidates.iter().copied();
        let mut target = self.next_open_team(&mut candidates, per_team_capacity);

        if target.is_none() {
            debug!("🚫 No candidate team has room for more players");
            return false;
        }

        for player in self.online.clone() {
            let Some(index) = target else {
                break;
            };

            match self.sessions.get(player) {
                Ok(session) if session.team().is_some() => continue,
                Ok(session) => session.set_team(Some(index)),
                Err(e) => {
                    warn!("⚠️ Skipping {} during team assignment: {}", player, e);
                    continue;
                }
            }
            self.teams.add_player(index, player);
            debug!("👥 {} assigned to team {}", player, index);

            let full = self
                .teams
                .get(index)
                .map_or(true, |team| team.player_count() >= per_team_capacity);
            if full {
                target = self.next_open_team(&mut candidates, per_team_capacity);
            }
        }

        true
    }

    /// Advances `candidates` to the next registered team that still has room.
    ///
    /// Room is checked when the team is reached, so an index repeated in
    /// `candidates` is not filled past capacity.
    fn next_open_team(
        &self,
        candidates: &mut impl Iterator<Item = u32>,
        per_team_capacity: usize,
    ) -> Option<u32> {
        candidates.find(|index| match self.teams.get(*index) {
            Some(team) => team.player_count() < per_team_capacity,
            None => {
                warn!("⚠️ Team {} is not registered, skipping it", index);
                false
            }
        })
    }

    /// Puts `player` on team `index`, moving them off their previous team.
    pub fn join_team(&mut self, player: PlayerId, index: u32) -> ArenaResult<()> {
        if self.teams.get(index).is_none() {
            return Err(ArenaError::UnknownTeam(index));
        }

        self.sessions.get(player)?.set_team(Some(index));
        self.teams.add_player(index, player);
        info!("👥 {} joined team {}", player, index);
        Ok(())
    }

    /// Takes `player` off their team and returns the team they left.
    pub fn leave_team(&mut self, player: PlayerId) -> ArenaResult<Option<u32>> {
        let session = self.sessions.get(player)?;
        let previous = session.team();
        session.set_team(None);
        self.teams.remove_player(player);
        Ok(previous)
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub fn session(&mut self, player: PlayerId) -> ArenaResult<&Session> {
        self.sessions.get(player).map(|session| &*session)
    }

    pub fn session_by_name(&mut self, name: &str) -> ArenaResult<&Session> {
        self.sessions.get_by_name(name).map(|session| &*session)
    }

    pub fn alive_players(&self) -> HashSet<PlayerId> {
        self.sessions.alive()
    }

    pub fn ghost_players(&self) -> HashSet<PlayerId> {
        self.sessions.ghosts()
    }

    /// Players with no session are neither alive nor ghosts.
    pub fn is_alive(&self, player: PlayerId) -> bool {
        self.sessions.peek(player).is_some_and(Session::is_alive)
    }

    pub fn is_ghost(&self, player: PlayerId) -> bool {
        self.sessions.peek(player).is_some_and(Session::is_ghost)
    }

    pub fn mark_ghost(&mut self, player: PlayerId) -> ArenaResult<()> {
        self.sessions.get(player)?.set_life(LifeState::Ghost);
        debug!("👻 {} is now spectating", player);
        Ok(())
    }

    pub fn revive(&mut self, player: PlayerId) -> ArenaResult<()> {
        self.sessions.get(player)?.set_life(LifeState::Alive);
        Ok(())
    }

    /// Admitted players in connect order.
    pub fn online_players(&self) -> &[PlayerId] {
        &self.online
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Decides whether `player` may enter the arena and, if so, admits them.
    ///
    /// A player already online is admitted again without side effects.
    pub fn on_player_connected(&mut self, player: PlayerId) -> ArenaResult<JoinDecision> {
        if self.online.contains(&player) {
            return Ok(JoinDecision::Allowed);
        }

        let decision = match self.states.current() {
            None => JoinDecision::Denied(DenyReason::NoActivePhase),
            Some(phase) if !phase.accepts_new_players() => {
                JoinDecision::Denied(DenyReason::PhaseClosed {
                    phase: phase.name().to_string(),
                })
            }
            Some(_) if self.online.len() >= self.max_players as usize => {
                JoinDecision::Denied(DenyReason::ArenaFull {
                    max_players: self.max_players,
                })
            }
            Some(_) => JoinDecision::Allowed,
        };

        if let JoinDecision::Denied(reason) = &decision {
            info!("🚪 Turned away {}: {}", player, reason);
            return Ok(decision);
        }

        let player_name = self.sessions.get(player)?.name().to_string();
        self.online.push(player);
        info!(
            "🎮 {} ({}) joined the arena [{}/{}]",
            player_name,
            player,
            self.online.len(),
            self.max_players
        );

        self.events.emit_core(
            PLAYER_CONNECTED,
            &PlayerConnectedEvent {
                player_id: player,
                player_name,
                timestamp: current_timestamp(),
            },
        );
        Ok(decision)
    }

    /// Forgets everything about `player`. Returns `false` if they had no session.
    pub fn on_player_disconnected(&mut self, player: PlayerId, reason: DisconnectReason) -> bool {
        self.online.retain(|online| *online != player);
        self.teams.remove_player(player);

        let Some(session) = self.sessions.evict(player) else {
            return false;
        };

        info!("👋 {} ({}) left the arena: {:?}", session.name(), player, reason);
        self.events.emit_core(
            PLAYER_DISCONNECTED,
            &PlayerDisconnectedEvent {
                player_id: player,
                reason,
                timestamp: current_timestamp(),
            },
        );
        true
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    pub fn register_category(&mut self, category: ItemCategory) {
        self.catalog.register(category);
    }

    pub fn category(&self, id: CategoryId) -> Option<&ItemCategory> {
        self.catalog.get(id)
    }

    pub fn categories(&self) -> impl Iterator<Item = &ItemCategory> {
        self.catalog.categories()
    }

    /// How `item` looks to `player` right now.
    pub fn item_view(&mut self, player: PlayerId, category: CategoryId, item: ItemId) -> ArenaResult<ItemView> {
        let item = self.catalog.item(ItemKey::new(category, item))?;
        let session: &Session = self.sessions.get(player)?;
        Ok(view_for(session, self.ledger.as_ref(), item))
    }

    /// One page of the menu for `category`, as seen by `player`.
    pub fn menu_page(
        &mut self,
        player: PlayerId,
        category: CategoryId,
        layout: &MenuLayout,
        page: usize,
    ) -> ArenaResult<MenuPage> {
        let category = self
            .catalog
            .get(category)
            .ok_or(ArenaError::UnknownCategory(category))?;
        let session: &Session = self.sessions.get(player)?;

        let slots = layout
            .page(category.items(), page)
            .into_iter()
            .map(|(slot, item)| (slot, view_for(session, self.ledger.as_ref(), item)))
            .collect();

        Ok(MenuPage {
            title: category.name.clone(),
            page,
            page_count: layout.page_count(category.items().len()),
            slots,
            back_slot: layout.back_slot(),
        })
    }

    /// Buys or selects an item, depending on what the player already has.
    ///
    /// A purchase never selects the item; the player clicks again for that.
    ///
    /// # Arguments
    ///
    /// * `player` - Player who clicked the item
    /// * `category` - Category the item belongs to
    /// * `item` - Item id within `category`
    ///
    /// # Returns
    ///
    /// The [`ItemInteraction`] that took place, or an error when the item is
    /// not in the catalog, the player is unknown or the ledger refuses the
    /// withdrawal.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// ledger.deposit(player, Currency::Coins, 500);
    /// assert_eq!(arena.interact_with_item(player, 7, 1)?, ItemInteraction::Purchased);
    /// assert_eq!(
    ///     arena.interact_with_item(player, 7, 1)?,
    ///     ItemInteraction::Selected { previous: None }
    /// );
    /// ```
    pub fn interact_with_item(
        &mut self,
        player: PlayerId,
        category: CategoryId,
        item: ItemId,
    ) -> ArenaResult<ItemInteraction> {
        let key = ItemKey::new(category, item);
        let game_item = self.catalog.item(key)?;
        let price = game_item.price;
        let session = self.sessions.get(player)?;

        if !session.owns(key) {
            if !self.ledger.can_afford(player, price) {
                debug!("💸 {} cannot afford '{}' ({})", player, game_item.name, price);
                return Ok(ItemInteraction::InsufficientFunds { price });
            }

            self.ledger.withdraw(player, price.currency, price.amount)?;
            session.grant_item(key);
            persist(self.item_store.insert(player, key, false), player, key);
            info!("🛒 {} bought '{}' for {}", player, game_item.name, price);
            return Ok(ItemInteraction::Purchased);
        }

        if session.is_selected(key) {
            return Ok(ItemInteraction::AlreadySelected);
        }

        let previous = session.select_item(key);
        if let Some(previous) = previous {
            let previous_key = ItemKey::new(category, previous);
            persist(
                self.item_store.update_selection(player, previous_key, false),
                player,
                previous_key,
            );
        }
        persist(self.item_store.update_selection(player, key, true), player, key);

        debug!("✨ {} selected '{}'", player, game_item.name);
        Ok(ItemInteraction::Selected { previous })
    }

    /// Clears the player's selection in `category` and returns what was selected.
    pub fn unselect_item(&mut self, player: PlayerId, category: CategoryId) -> ArenaResult<Option<ItemId>> {
        if self.catalog.get(category).is_none() {
            return Err(ArenaError::UnknownCategory(category));
        }

        let previous = self.sessions.get(player)?.unselect_item(category);
        if let Some(item) = previous {
            let key = ItemKey::new(category, item);
            persist(self.item_store.update_selection(player, key, false), player, key);
        }
        Ok(previous)
    }

    // ------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------

    /// Sends `player` to a random other server of this arena's mode.
    ///
    /// # Arguments
    ///
    /// * `player` - Player asking for another round
    ///
    /// # Returns
    ///
    /// The destination server name, or
    /// [`ArenaError::NoEligibleDestination`] when this is the only server of
    /// its mode.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// // Running on bw-solo-1 with bw-solo-2 also up.
    /// assert_eq!(arena.play_again(player)?, "bw-solo-2");
    /// ```
    pub fn play_again(&self, player: PlayerId) -> ArenaResult<String> {
        let player_name = match self.sessions.peek(player) {
            Some(session) => session.name().to_string(),
            None => self.directory.resolve_name(player)?,
        };

        let servers = self.matches.servers_for_mode(mode_prefix(&self.server_name));
        let destination = pick_destination(&self.server_name, &servers, &mut rand::thread_rng())?;

        info!("🔀 Sending {} to {}", player_name, destination);
        self.matches.redirect(&player_name, &destination);
        Ok(destination)
    }
}

fn view_for(session: &Session, ledger: &dyn CurrencyLedger, item: &GameItem) -> ItemView {
    let key = item.key();
    let state = ItemDisplayState::resolve(
        session.owns(key),
        session.is_selected(key),
        ledger.can_afford(session.player_id(), item.price),
    );
    ItemView::new(item, state)
}

fn persist(result: ArenaResult<()>, player: PlayerId, key: ItemKey) {
    if let Err(e) = result {
        error!(
            "❌ Failed to store item {}/{} for {}: {}",
            key.category, key.item, player, e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{InMemoryDirectory, StaticMatchDirectory};
    use crate::item::{Currency, GameItem};
    use crate::ledger::InMemoryLedger;
    use crate::setting::keys;
    use crate::state::Phase;
    use crate::store::InMemoryItemStore;
    use arena_event_system::{create_arena_event_system, EventError, Verdict};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        arena: ArenaService,
        ledger: Arc<InMemoryLedger>,
        store: Arc<InMemoryItemStore>,
        matches: Arc<StaticMatchDirectory>,
    }

    fn harness(players: u32) -> Harness {
        let directory = Arc::new(InMemoryDirectory::new());
        for id in 1..=players {
            directory.insert(PlayerId::new(id), &format!("player{}", id));
        }
        let ledger = Arc::new(InMemoryLedger::new());
        let store = Arc::new(InMemoryItemStore::new());
        let matches = Arc::new(StaticMatchDirectory::new(["bw-solo-1", "bw-solo-2", "sw-solo-1"]));

        let arena = ArenaService::new(
            "BedWars",
            ArenaCollaborators {
                events: create_arena_event_system(),
                directory,
                ledger: ledger.clone(),
                item_store: store.clone(),
                matches: matches.clone(),
                server_name: "bw-solo-1".to_string(),
            },
        );

        Harness {
            arena,
            ledger,
            store,
            matches,
        }
    }

    fn running(players: u32) -> Harness {
        let mut h = harness(players);
        h.arena.set_map_name("Lighthouse");
        h.arena.set_mode("solo");
        h.arena.set_max_players(16);
        h.arena.register_phase(Arc::new(Phase::new("waiting", true)));
        h.arena.register_phase(Arc::new(Phase::new("ingame", false)));
        h.arena.transition_to("waiting").unwrap();
        h
    }

    fn connect_all(arena: &mut ArenaService, players: u32) {
        for id in 1..=players {
            assert!(arena.on_player_connected(PlayerId::new(id)).unwrap().is_allowed());
        }
    }

    fn hats() -> ItemCategory {
        ItemCategory::new(1, "Hats")
            .with_item(GameItem::new(1, "Top hat", Price::new(Currency::Coins, 100)))
            .with_item(GameItem::new(2, "Crown", Price::new(Currency::Coins, 50)))
    }

    #[test]
    fn test_can_start_needs_every_condition() {
        let mut h = harness(0);
        assert!(!h.arena.can_start());

        h.arena.set_map_name("Lighthouse");
        h.arena.set_mode("solo");
        h.arena.set_max_players(8);
        assert!(!h.arena.can_start());

        h.arena.register_phase(Arc::new(Phase::new("waiting", true)));
        assert!(h.arena.can_start());

        h.arena.set_max_players(0);
        assert!(!h.arena.can_start());

        let mut h = harness(0);
        h.arena.set_map_name("Lighthouse");
        h.arena.set_max_players(8);
        h.arena.register_phase(Arc::new(Phase::new("waiting", true)));
        assert!(!h.arena.can_start());
    }

    #[test]
    fn test_joinability_follows_current_phase() {
        let mut h = harness(0);
        h.arena.register_phase(Arc::new(Phase::new("waiting", true)));
        h.arena.register_phase(Arc::new(Phase::new("ingame", false)));
        assert!(!h.arena.snapshot_info().joinable);

        for (name, joinable) in [("waiting", true), ("ingame", false), ("waiting", true)] {
            h.arena.transition_to(name).unwrap();
            assert_eq!(h.arena.current_phase().unwrap().name(), name);
            assert_eq!(h.arena.snapshot_info().joinable, joinable);
        }
    }

    #[test]
    fn test_phase_change_is_announced() {
        let mut h = running(0);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        h.arena
            .events()
            .on_core(PHASE_CHANGED, move |event: &PhaseChangedEvent| {
                sink.lock().unwrap().push((event.previous.clone(), event.current.clone()));
                Ok(())
            })
            .unwrap();

        assert!(h.arena.advance_phase().unwrap());
        assert!(!h.arena.advance_phase().unwrap());

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(Some("waiting".to_string()), "ingame".to_string())]
        );
    }

    #[test]
    fn test_assignment_fills_teams_in_order() {
        let mut h = running(5);
        for index in 1..=3 {
            h.arena.register_team(index, Team::new(index, format!("Team {}", index)));
        }
        connect_all(&mut h.arena, 5);

        assert!(h.arena.assign_players_to_teams(2, &[1, 2, 3]));

        let rosters: Vec<Vec<u32>> = h
            .arena
            .teams()
            .map(|team| team.roster().iter().map(|player| player.get()).collect())
            .collect();
        assert_eq!(rosters, vec![vec![1, 2], vec![3, 4], vec![5]]);
        assert_eq!(h.arena.session(PlayerId::new(5)).unwrap().team(), Some(3));
    }

    #[test]
    fn test_assignment_leaves_teamed_players_alone() {
        let mut h = running(4);
        for index in 1..=3 {
            h.arena.register_team(index, Team::new(index, format!("Team {}", index)));
        }
        connect_all(&mut h.arena, 4);
        h.arena.join_team(PlayerId::new(1), 3).unwrap();

        assert!(h.arena.assign_players_to_teams(2, &[1, 2]));
        assert_eq!(h.arena.session(PlayerId::new(1)).unwrap().team(), Some(3));
        assert_eq!(h.arena.team(1).unwrap().roster(), &[PlayerId::new(2), PlayerId::new(3)]);

        // Running it again moves nobody.
        let before: Vec<Vec<PlayerId>> = h.arena.teams().map(|team| team.roster().to_vec()).collect();
        assert!(h.arena.assign_players_to_teams(2, &[1, 2]));
        let after: Vec<Vec<PlayerId>> = h.arena.teams().map(|team| team.roster().to_vec()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_assignment_without_room_is_a_no_op() {
        let mut h = running(3);
        h.arena.register_team(1, Team::new(1, "Red"));
        connect_all(&mut h.arena, 3);

        assert!(h.arena.assign_players_to_teams(1, &[1]));
        assert!(!h.arena.assign_players_to_teams(1, &[1]));
        assert!(!h.arena.assign_players_to_teams(1, &[7]));
        assert!(h.arena.session(PlayerId::new(2)).unwrap().team().is_none());
    }

    #[test]
    fn test_repeated_candidate_does_not_overfill() {
        let mut h = running(5);
        h.arena.register_team(1, Team::new(1, "Red"));
        h.arena.register_team(2, Team::new(2, "Blue"));
        connect_all(&mut h.arena, 5);

        assert!(h.arena.assign_players_to_teams(2, &[1, 1, 2]));

        let sizes: Vec<usize> = h.arena.teams().map(Team::player_count).collect();
        assert_eq!(sizes, vec![2, 2]);
        assert_eq!(h.arena.team(2).unwrap().roster(), &[PlayerId::new(3), PlayerId::new(4)]);
        assert!(h.arena.session(PlayerId::new(5)).unwrap().team().is_none());

        // A repeat after the last full team finds nothing either.
        assert!(!h.arena.assign_players_to_teams(2, &[2, 1, 2]));
    }

    #[test]
    fn test_vetoed_setting_keeps_old_value() {
        let mut h = harness(0);
        h.arena
            .events()
            .on_core_cancellable(SETTING_CHANGED, |event: &SettingChangeEvent| {
                Ok(match event.new_value(keys::START_COUNTDOWN) {
                    Some(seconds) if seconds < 5 => Verdict::Veto,
                    _ => Verdict::Allow,
                })
            })
            .unwrap();

        assert_eq!(h.arena.set_setting(keys::START_COUNTDOWN, 2), SettingChange::Vetoed);
        assert!(!h.arena.has_setting(GameSetting::StartCountdown));
        assert_eq!(h.arena.setting(keys::START_COUNTDOWN), None);

        assert_eq!(h.arena.set_setting(keys::START_COUNTDOWN, 30), SettingChange::Applied);
        assert_eq!(h.arena.set_setting(keys::START_COUNTDOWN, 1), SettingChange::Vetoed);
        assert_eq!(h.arena.setting(keys::START_COUNTDOWN), Some(30));
        assert!(h.arena.has_setting(GameSetting::StartCountdown));
    }

    #[test]
    fn test_failing_observer_does_not_block_settings() {
        let mut h = harness(0);
        h.arena
            .events()
            .on_core(SETTING_CHANGED, |_: &SettingChangeEvent| {
                Err(EventError::HandlerExecution("scoreboard offline".to_string()))
            })
            .unwrap();

        assert_eq!(
            h.arena.set_setting(keys::SCOREBOARD_TITLE, "BED WARS".to_string()),
            SettingChange::Applied
        );
        assert_eq!(h.arena.setting(keys::SCOREBOARD_TITLE).as_deref(), Some("BED WARS"));
    }

    #[test]
    fn test_observer_sees_old_and_new_value() {
        let mut h = harness(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        h.arena
            .events()
            .on_core(SETTING_CHANGED, move |event: &SettingChangeEvent| {
                if counter.fetch_add(1, Ordering::SeqCst) == 1 {
                    assert_eq!(event.old, Some(SettingValue::Bool(false)));
                    assert_eq!(event.new, SettingValue::Bool(true));
                }
                Ok(())
            })
            .unwrap();

        let _ = h.arena.set_setting(keys::FRIENDLY_FIRE, false);
        let _ = h.arena.set_setting(keys::FRIENDLY_FIRE, true);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_join_decisions() {
        let mut h = harness(3);
        h.arena.set_max_players(1);
        let first = PlayerId::new(1);

        assert_eq!(
            h.arena.on_player_connected(first).unwrap(),
            JoinDecision::Denied(DenyReason::NoActivePhase)
        );

        h.arena.register_phase(Arc::new(Phase::new("waiting", true)));
        h.arena.register_phase(Arc::new(Phase::new("ingame", false)));
        h.arena.transition_to("waiting").unwrap();
        assert!(h.arena.on_player_connected(first).unwrap().is_allowed());
        assert!(h.arena.on_player_connected(first).unwrap().is_allowed());
        assert_eq!(h.arena.online_players(), &[first]);

        assert_eq!(
            h.arena.on_player_connected(PlayerId::new(2)).unwrap(),
            JoinDecision::Denied(DenyReason::ArenaFull { max_players: 1 })
        );

        h.arena.transition_to("ingame").unwrap();
        assert_eq!(
            h.arena.on_player_connected(PlayerId::new(3)).unwrap(),
            JoinDecision::Denied(DenyReason::PhaseClosed {
                phase: "ingame".to_string()
            })
        );

        h.arena.transition_to("waiting").unwrap();
        h.arena.set_max_players(5);
        assert!(matches!(
            h.arena.on_player_connected(PlayerId::new(40)),
            Err(ArenaError::UnknownPlayerId(_))
        ));
    }

    #[test]
    fn test_disconnect_clears_everything() {
        let mut h = running(2);
        h.arena.register_team(1, Team::new(1, "Red"));
        connect_all(&mut h.arena, 2);
        h.arena.join_team(PlayerId::new(1), 1).unwrap();

        assert!(h.arena.on_player_disconnected(PlayerId::new(1), DisconnectReason::ClientDisconnect));
        assert!(h.arena.team(1).unwrap().roster().is_empty());
        assert_eq!(h.arena.online_players(), &[PlayerId::new(2)]);
        assert!(!h.arena.is_alive(PlayerId::new(1)));
        assert!(!h.arena.on_player_disconnected(PlayerId::new(1), DisconnectReason::ClientDisconnect));
    }

    #[test]
    fn test_ghosts_and_alive_counts() {
        let mut h = running(3);
        connect_all(&mut h.arena, 3);
        h.arena.mark_ghost(PlayerId::new(2)).unwrap();

        assert!(h.arena.is_ghost(PlayerId::new(2)));
        assert!(!h.arena.is_alive(PlayerId::new(2)));
        assert_eq!(h.arena.ghost_players(), HashSet::from([PlayerId::new(2)]));
        assert_eq!(h.arena.snapshot_info().alive_players, 2);

        h.arena.revive(PlayerId::new(2)).unwrap();
        assert_eq!(h.arena.alive_players().len(), 3);
    }

    #[test]
    fn test_leave_team() {
        let mut h = running(1);
        h.arena.register_team(1, Team::new(1, "Red"));
        h.arena.register_team(2, Team::new(2, "Blue"));
        let player = PlayerId::new(1);

        h.arena.join_team(player, 1).unwrap();
        h.arena.join_team(player, 2).unwrap();
        assert!(h.arena.team(1).unwrap().roster().is_empty());

        assert_eq!(h.arena.leave_team(player).unwrap(), Some(2));
        assert!(h.arena.session(player).unwrap().team().is_none());
        assert!(matches!(h.arena.join_team(player, 9), Err(ArenaError::UnknownTeam(9))));
    }

    #[test]
    fn test_purchase_without_funds_changes_nothing() {
        let mut h = running(1);
        h.arena.register_category(hats());
        let player = PlayerId::new(1);
        h.ledger.deposit(player, Currency::Coins, 99);

        assert_eq!(
            h.arena.interact_with_item(player, 1, 1).unwrap(),
            ItemInteraction::InsufficientFunds {
                price: Price::new(Currency::Coins, 100)
            }
        );

        let session = h.arena.session(player).unwrap();
        assert!(!session.owns(ItemKey::new(1, 1)));
        assert_eq!(session.selected_item(1), None);
        assert_eq!(h.ledger.balance(player, Currency::Coins), 99);
        assert!(h.store.is_empty());
    }

    #[test]
    fn test_purchase_does_not_select() {
        let mut h = running(1);
        h.arena.register_category(hats());
        let player = PlayerId::new(1);
        h.ledger.deposit(player, Currency::Coins, 120);

        assert_eq!(h.arena.interact_with_item(player, 1, 1).unwrap(), ItemInteraction::Purchased);

        let session = h.arena.session(player).unwrap();
        assert!(session.owns(ItemKey::new(1, 1)));
        assert_eq!(session.selected_item(1), None);
        assert_eq!(h.ledger.balance(player, Currency::Coins), 20);
        assert_eq!(h.store.row(player, ItemKey::new(1, 1)), Some(false));

        let view = h.arena.item_view(player, 1, 1).unwrap();
        assert_eq!(view.state, ItemDisplayState::Owned);
        assert!(view.price_label.is_none());
    }

    #[test]
    fn test_selecting_replaces_previous_selection() {
        let mut h = running(1);
        h.arena.register_category(hats());
        let player = PlayerId::new(1);
        h.ledger.deposit(player, Currency::Coins, 150);

        h.arena.interact_with_item(player, 1, 1).unwrap();
        h.arena.interact_with_item(player, 1, 2).unwrap();

        assert_eq!(
            h.arena.interact_with_item(player, 1, 1).unwrap(),
            ItemInteraction::Selected { previous: None }
        );
        assert_eq!(
            h.arena.interact_with_item(player, 1, 2).unwrap(),
            ItemInteraction::Selected { previous: Some(1) }
        );
        assert_eq!(
            h.arena.interact_with_item(player, 1, 2).unwrap(),
            ItemInteraction::AlreadySelected
        );

        assert_eq!(h.arena.session(player).unwrap().selected_item(1), Some(2));
        assert_eq!(h.store.row(player, ItemKey::new(1, 1)), Some(false));
        assert_eq!(h.store.row(player, ItemKey::new(1, 2)), Some(true));

        assert_eq!(h.arena.unselect_item(player, 1).unwrap(), Some(2));
        assert_eq!(h.store.row(player, ItemKey::new(1, 2)), Some(false));
        assert_eq!(h.arena.unselect_item(player, 1).unwrap(), None);
    }

    #[test]
    fn test_unknown_items() {
        let mut h = running(1);
        h.arena.register_category(hats());
        let player = PlayerId::new(1);

        assert!(matches!(
            h.arena.interact_with_item(player, 2, 1),
            Err(ArenaError::UnknownCategory(2))
        ));
        assert!(matches!(
            h.arena.interact_with_item(player, 1, 9),
            Err(ArenaError::UnknownItem { category: 1, item: 9 })
        ));
    }

    #[test]
    fn test_menu_page_views() {
        let mut h = running(1);
        h.arena.register_category(hats());
        let player = PlayerId::new(1);
        h.ledger.deposit(player, Currency::Coins, 60);

        let layout = MenuLayout::new(3).unwrap();
        let page = h.arena.menu_page(player, 1, &layout, 0).unwrap();

        assert_eq!(page.title, "Hats");
        assert_eq!(page.page_count, 1);
        assert_eq!(page.back_slot, 23);
        let states: Vec<(usize, ItemDisplayState)> =
            page.slots.iter().map(|(slot, view)| (*slot, view.state)).collect();
        assert_eq!(
            states,
            vec![
                (10, ItemDisplayState::Unaffordable),
                (11, ItemDisplayState::Affordable)
            ]
        );
    }

    #[test]
    fn test_play_again_picks_other_server_of_mode() {
        let h = running(1);

        assert_eq!(h.arena.play_again(PlayerId::new(1)).unwrap(), "bw-solo-2");
        assert_eq!(
            h.matches.redirects(),
            vec![("player1".to_string(), "bw-solo-2".to_string())]
        );
    }

    #[test]
    fn test_play_again_without_destination() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.insert(PlayerId::new(1), "player1");
        let arena = ArenaService::new(
            "SkyWars",
            ArenaCollaborators {
                events: create_arena_event_system(),
                directory,
                ledger: Arc::new(InMemoryLedger::new()),
                item_store: Arc::new(InMemoryItemStore::new()),
                matches: Arc::new(StaticMatchDirectory::new(["sw-solo-1"])),
                server_name: "SW-SOLO-1".to_string(),
            },
        );

        assert!(matches!(
            arena.play_again(PlayerId::new(1)),
            Err(ArenaError::NoEligibleDestination(prefix)) if prefix == "SW-SOLO-"
        ));
    }
}
