//! Events the arena publishes on the core channel of the event bus.

use crate::setting::{GameSetting, SettingKey, SettingType, SettingValue};
use serde::{Deserialize, Serialize};

/// `core:setting_changed`, vetoable.
pub const SETTING_CHANGED: &str = "setting_changed";
/// `core:phase_changed`
pub const PHASE_CHANGED: &str = "phase_changed";
/// `core:player_connected`
pub const PLAYER_CONNECTED: &str = "player_connected";
/// `core:player_disconnected`
pub const PLAYER_DISCONNECTED: &str = "player_disconnected";
/// `core:arena_info`
pub const ARENA_INFO: &str = "arena_info";

/// A pending setting change. Observers answering
/// [`Verdict::Veto`](arena_event_system::Verdict::Veto) keep the old value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingChangeEvent {
    pub setting: GameSetting,
    /// `None` if the setting was never written
    pub old: Option<SettingValue>,
    pub new: SettingValue,
}

impl SettingChangeEvent {
    /// Whether this event is about the setting behind `key`.
    pub fn is<V>(&self, key: SettingKey<V>) -> bool {
        self.setting == key.setting()
    }

    /// The proposed value, read through `key`.
    ///
    /// Returns `None` when the event concerns another setting.
    pub fn new_value<V: SettingType>(&self, key: SettingKey<V>) -> Option<V> {
        if self.is(key) {
            V::from_value(&self.new)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChangedEvent {
    pub previous: Option<String>,
    pub current: String,
    pub accepts_new_players: bool,
    pub timestamp: u64,
}

/// Snapshot of the arena as shown to matchmaking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaInfo {
    pub map_name: Option<String>,
    pub mode: Option<String>,
    pub joinable: bool,
    pub alive_players: usize,
    pub max_players: u32,
}
