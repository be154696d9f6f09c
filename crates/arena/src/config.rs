//! Configuration of the arena host.
//!
//! The configuration is a TOML file describing the arena (map, mode, phases,
//! teams and cosmetics) plus host and logging settings. A missing file is
//! replaced by a default one on first start.

use anyhow::{Context, Result};
use arena_event_system::EventSystem;
use arena_game::{
    ArenaCollaborators, ArenaService, Currency, GameItem, InMemoryDirectory, InMemoryItemStore,
    InMemoryLedger, ItemCategory, Phase, Price, StaticMatchDirectory, Team,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

fn default_per_team_capacity() -> usize {
    1
}

fn default_heartbeat_interval() -> u64 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub arena: ArenaSettings,
    #[serde(default)]
    pub phases: Vec<PhaseSettings>,
    #[serde(default)]
    pub teams: Vec<TeamSettings>,
    #[serde(default)]
    pub categories: Vec<ItemCategory>,
    pub host: HostSettings,
    pub logging: LoggingSettings,
}

/// What is being played and how many may play it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaSettings {
    pub game_name: String,
    pub map_name: Option<String>,
    pub mode: Option<String>,
    pub max_players: u32,
    /// Name of this server; its trailing digits are the instance number
    pub server_name: String,
    #[serde(default = "default_per_team_capacity")]
    pub per_team_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSettings {
    pub name: String,
    #[serde(default)]
    pub accepts_new_players: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSettings {
    pub index: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    /// How often arena info is published, in milliseconds
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_ms: u64,
    /// Servers known to host arenas, used for "play again"
    #[serde(default)]
    pub servers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    pub json_format: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            arena: ArenaSettings {
                game_name: "BedWars".to_string(),
                map_name: Some("Lighthouse".to_string()),
                mode: Some("solo".to_string()),
                max_players: 8,
                server_name: "bw-solo-1".to_string(),
                per_team_capacity: 1,
            },
            phases: vec![
                PhaseSettings {
                    name: "waiting".to_string(),
                    accepts_new_players: true,
                },
                PhaseSettings {
                    name: "ingame".to_string(),
                    accepts_new_players: false,
                },
                PhaseSettings {
                    name: "ending".to_string(),
                    accepts_new_players: false,
                },
            ],
            teams: (1..=8)
                .map(|index| TeamSettings {
                    index,
                    name: format!("Team {}", index),
                })
                .collect(),
            categories: vec![ItemCategory::new(1, "Trails")
                .with_item(GameItem::new(1, "Flames", Price::new(Currency::Coins, 500)))
                .with_item(GameItem::new(2, "Hearts", Price::new(Currency::Coins, 500)))
                .with_item(GameItem::new(3, "Rainbow", Price::new(Currency::Gems, 20)))],
            host: HostSettings {
                heartbeat_interval_ms: default_heartbeat_interval(),
                servers: vec!["bw-solo-1".to_string(), "bw-solo-2".to_string()],
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file does not exist, a default configuration is written to
    /// `path` and returned.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!("📝 Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Checks the configuration for values the arena cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        if self.arena.server_name.is_empty() {
            return Err("Server name cannot be empty".to_string());
        }
        if self.arena.max_players == 0 {
            return Err("max_players must be greater than 0".to_string());
        }
        if self.arena.per_team_capacity == 0 {
            return Err("per_team_capacity must be greater than 0".to_string());
        }
        if self.host.heartbeat_interval_ms == 0 {
            return Err("heartbeat_interval_ms must be greater than 0".to_string());
        }

        if self.phases.is_empty() {
            return Err("At least one phase must be configured".to_string());
        }
        let mut phase_names = HashSet::new();
        for phase in &self.phases {
            if !phase_names.insert(phase.name.as_str()) {
                return Err(format!("Duplicate phase: {}", phase.name));
            }
        }

        let mut team_indices = HashSet::new();
        for team in &self.teams {
            if !team_indices.insert(team.index) {
                return Err(format!("Duplicate team index: {}", team.index));
            }
        }

        Ok(())
    }

    /// Builds the arena described by this configuration.
    ///
    /// Players, balances and purchases live in memory for the lifetime of the
    /// process.
    pub fn build_arena(&self, events: Arc<EventSystem>) -> ArenaService {
        let collaborators = ArenaCollaborators {
            events,
            directory: Arc::new(InMemoryDirectory::new()),
            ledger: Arc::new(InMemoryLedger::new()),
            item_store: Arc::new(InMemoryItemStore::new()),
            matches: Arc::new(StaticMatchDirectory::new(self.host.servers.iter().cloned())),
            server_name: self.arena.server_name.clone(),
        };

        let mut arena = ArenaService::new(self.arena.game_name.clone(), collaborators);
        if let Some(map_name) = &self.arena.map_name {
            arena.set_map_name(map_name.clone());
        }
        if let Some(mode) = &self.arena.mode {
            arena.set_mode(mode.clone());
        }
        arena.set_max_players(self.arena.max_players);

        for phase in &self.phases {
            arena.register_phase(Arc::new(Phase::new(
                phase.name.clone(),
                phase.accepts_new_players,
            )));
        }
        for team in &self.teams {
            arena.register_team(team.index, Team::new(team.index, team.name.clone()));
        }
        for category in &self.categories {
            arena.register_category(category.clone());
        }

        arena
    }
}
