//! Teams and their rosters.
//!
//! Rosters are back-references kept for display and iteration; the team index
//! stored on a player's [`Session`](crate::session::Session) is authoritative.
//! The registry only guarantees that a player sits in at most one roster.

use arena_event_system::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A team of the current match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    index: u32,
    name: String,
    roster: Vec<PlayerId>,
}

impl Team {
    pub fn new(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            roster: Vec::new(),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Members in the order they joined.
    pub fn roster(&self) -> &[PlayerId] {
        &self.roster
    }

    pub fn player_count(&self) -> usize {
        self.roster.len()
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.roster.contains(&player)
    }

    fn push(&mut self, player: PlayerId) {
        if !self.contains(player) {
            self.roster.push(player);
        }
    }

    fn remove(&mut self, player: PlayerId) -> bool {
        let before = self.roster.len();
        self.roster.retain(|member| *member != player);
        before != self.roster.len()
    }
}

/// Teams keyed by index, iterated in ascending index order.
#[derive(Debug, Default)]
pub struct TeamRegistry {
    teams: BTreeMap<u32, Team>,
}

impl TeamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `team` under `index`, replacing any team registered there.
    ///
    /// The stored team takes `index` as its own index.
    pub fn register(&mut self, index: u32, mut team: Team) {
        team.index = index;
        if let Some(replaced) = self.teams.insert(index, team) {
            debug!("♻️ Team {} ('{}') replaced", index, replaced.name);
        } else {
            debug!("📋 Registered team {}", index);
        }
    }

    pub fn get(&self, index: u32) -> Option<&Team> {
        self.teams.get(&index)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut Team> {
        self.teams.get_mut(&index)
    }

    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    pub fn indices(&self) -> Vec<u32> {
        self.teams.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// The team whose roster lists `player`.
    pub fn team_of(&self, player: PlayerId) -> Option<&Team> {
        self.teams.values().find(|team| team.contains(player))
    }

    /// Puts `player` on team `index`, taking them off any other roster first.
    ///
    /// Returns `false` if no team is registered under `index`.
    pub fn add_player(&mut self, index: u32, player: PlayerId) -> bool {
        if !self.teams.contains_key(&index) {
            return false;
        }

        for (other, team) in self.teams.iter_mut() {
            if *other != index {
                team.remove(player);
            }
        }

        if let Some(team) = self.teams.get_mut(&index) {
            team.push(player);
        }
        true
    }

    /// Removes `player` from whichever roster holds them.
    pub fn remove_player(&mut self, player: PlayerId) -> Option<u32> {
        self.teams
            .values_mut()
            .find_map(|team| team.remove(player).then_some(team.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: u32) -> PlayerId {
        PlayerId::new(raw)
    }

    #[test]
    fn test_register_overwrites_same_index() {
        let mut teams = TeamRegistry::new();
        teams.register(1, Team::new(1, "Red"));
        teams.register(1, Team::new(9, "Blue"));

        assert_eq!(teams.len(), 1);
        let team = teams.get(1).unwrap();
        assert_eq!(team.name(), "Blue");
        assert_eq!(team.index(), 1);
    }

    #[test]
    fn test_iteration_is_index_ordered() {
        let mut teams = TeamRegistry::new();
        teams.register(3, Team::new(3, "Green"));
        teams.register(1, Team::new(1, "Red"));
        teams.register(2, Team::new(2, "Blue"));

        let names: Vec<&str> = teams.teams().map(Team::name).collect();
        assert_eq!(names, ["Red", "Blue", "Green"]);
        assert_eq!(teams.indices(), vec![1, 2, 3]);
    }

    #[test]
    fn test_player_sits_in_one_roster() {
        let mut teams = TeamRegistry::new();
        teams.register(1, Team::new(1, "Red"));
        teams.register(2, Team::new(2, "Blue"));

        assert!(teams.add_player(1, p(10)));
        assert!(teams.add_player(1, p(10)));
        assert_eq!(teams.get(1).unwrap().player_count(), 1);

        assert!(teams.add_player(2, p(10)));
        assert_eq!(teams.get(1).unwrap().player_count(), 0);
        assert_eq!(teams.team_of(p(10)).unwrap().index(), 2);

        assert!(!teams.add_player(7, p(10)));
        assert_eq!(teams.remove_player(p(10)), Some(2));
        assert_eq!(teams.remove_player(p(10)), None);
    }
}
