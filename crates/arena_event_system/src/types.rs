//! # Core Type Definitions
//!
//! Identity and timing primitives shared by every arena crate.
//!
//! ## Key Types
//!
//! - [`PlayerId`] - Stable numeric identity of a player on the network
//! - [`DisconnectReason`] - Why a player left the arena server

use serde::{Deserialize, Serialize};
use std::num::ParseIntError;

/// Stable identifier for a player.
///
/// The network assigns every account a numeric id that never changes, even
/// when the player renames. Sessions and rosters are keyed by this id; display
/// names are resolved on demand through the player directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// Wraps a raw network id.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw network id.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for PlayerId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl std::str::FromStr for PlayerId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Enumeration of possible disconnection reasons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisconnectReason {
    /// Player initiated disconnection (normal logout)
    ClientDisconnect,
    /// Player was sent to another arena server
    Redirected(String),
    /// Server is shutting down gracefully
    ServerShutdown,
    /// An error occurred that forced disconnection
    Error(String),
}

/// Returns the current Unix timestamp in seconds.
///
/// A clock set before the Unix epoch yields `0` rather than panicking.
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_id_parses_and_displays() {
        let id: PlayerId = " 42 ".parse().unwrap();
        assert_eq!(id, PlayerId::new(42));
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "#42");
        assert!("steve".parse::<PlayerId>().is_err());
    }

    #[test]
    fn timestamp_is_after_2020() {
        assert!(current_timestamp() > 1_577_836_800);
    }
}
