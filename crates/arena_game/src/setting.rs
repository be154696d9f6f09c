//! Typed game settings.
//!
//! Every [`GameSetting`] holds exactly one kind of value. The binding between
//! a setting and its Rust type lives in the [`SettingKey`] constants of the
//! [`keys`] module, so reading a flag as text does not type-check.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Settings an arena can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameSetting {
    PlayerDamage,
    FriendlyFire,
    FallDamage,
    BlockBreak,
    BlockPlace,
    ItemDrop,
    Hunger,
    /// Seconds between enough players joining and the match starting
    StartCountdown,
    /// Players needed before the countdown runs
    MinPlayers,
    ScoreboardTitle,
}

impl fmt::Display for GameSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameSetting::PlayerDamage => "player_damage",
            GameSetting::FriendlyFire => "friendly_fire",
            GameSetting::FallDamage => "fall_damage",
            GameSetting::BlockBreak => "block_break",
            GameSetting::BlockPlace => "block_place",
            GameSetting::ItemDrop => "item_drop",
            GameSetting::Hunger => "hunger",
            GameSetting::StartCountdown => "start_countdown",
            GameSetting::MinPlayers => "min_players",
            GameSetting::ScoreboardTitle => "scoreboard_title",
        };
        f.write_str(name)
    }
}

/// Stored value of a setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SettingValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(value) => write!(f, "{}", value),
            SettingValue::Integer(value) => write!(f, "{}", value),
            SettingValue::Text(value) => write!(f, "\"{}\"", value),
        }
    }
}

/// Rust types a setting can be read and written as.
pub trait SettingType: Sized {
    fn into_value(self) -> SettingValue;

    fn from_value(value: &SettingValue) -> Option<Self>;
}

impl SettingType for bool {
    fn into_value(self) -> SettingValue {
        SettingValue::Bool(self)
    }

    fn from_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl SettingType for i64 {
    fn into_value(self) -> SettingValue {
        SettingValue::Integer(self)
    }

    fn from_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl SettingType for String {
    fn into_value(self) -> SettingValue {
        SettingValue::Text(self)
    }

    fn from_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Text(value) => Some(value.clone()),
            _ => None,
        }
    }
}

/// A setting together with the type its value is read and written as.
pub struct SettingKey<V> {
    setting: GameSetting,
    _value: PhantomData<fn() -> V>,
}

impl<V> SettingKey<V> {
    const fn new(setting: GameSetting) -> Self {
        Self {
            setting,
            _value: PhantomData,
        }
    }

    pub fn setting(&self) -> GameSetting {
        self.setting
    }
}

impl<V> Clone for SettingKey<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for SettingKey<V> {}

impl<V> fmt::Debug for SettingKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SettingKey")
            .field(&self.setting)
            .field(&std::any::type_name::<V>())
            .finish()
    }
}

pub mod keys {
    use super::{GameSetting, SettingKey};

    pub const PLAYER_DAMAGE: SettingKey<bool> = SettingKey::new(GameSetting::PlayerDamage);
    pub const FRIENDLY_FIRE: SettingKey<bool> = SettingKey::new(GameSetting::FriendlyFire);
    pub const FALL_DAMAGE: SettingKey<bool> = SettingKey::new(GameSetting::FallDamage);
    pub const BLOCK_BREAK: SettingKey<bool> = SettingKey::new(GameSetting::BlockBreak);
    pub const BLOCK_PLACE: SettingKey<bool> = SettingKey::new(GameSetting::BlockPlace);
    pub const ITEM_DROP: SettingKey<bool> = SettingKey::new(GameSetting::ItemDrop);
    pub const HUNGER: SettingKey<bool> = SettingKey::new(GameSetting::Hunger);
    pub const START_COUNTDOWN: SettingKey<i64> = SettingKey::new(GameSetting::StartCountdown);
    pub const MIN_PLAYERS: SettingKey<i64> = SettingKey::new(GameSetting::MinPlayers);
    pub const SCOREBOARD_TITLE: SettingKey<String> = SettingKey::new(GameSetting::ScoreboardTitle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_only_convert_to_their_own_type() {
        let value = 30i64.into_value();
        assert_eq!(i64::from_value(&value), Some(30));
        assert_eq!(bool::from_value(&value), None);
        assert_eq!(String::from_value(&value), None);
    }

    #[test]
    fn test_keys_name_their_setting() {
        assert_eq!(keys::FRIENDLY_FIRE.setting(), GameSetting::FriendlyFire);
        assert_eq!(keys::SCOREBOARD_TITLE.setting().to_string(), "scoreboard_title");
    }

    #[test]
    fn test_value_serializes_with_tag() {
        let json = serde_json::to_string(&SettingValue::Integer(5)).unwrap();
        assert_eq!(json, r#"{"type":"integer","value":5}"#);
    }
}
