//! Arena host entry point.
//!
//! Loads the configuration, builds the arena, enters its first phase and
//! publishes arena info on every heartbeat until the process is told to stop.

mod cli;
mod config;
mod logging;
mod signals;

use anyhow::{bail, Result};
use arena_event_system::create_arena_event_system;
use arena_game::events::{ARENA_INFO, PHASE_CHANGED, SETTING_CHANGED};
use arena_game::{ArenaInfo, ArenaService, PhaseChangedEvent, SettingChangeEvent};
use cli::CliArgs;
use config::AppConfig;
use std::time::Duration;
use tracing::{debug, error, info};

pub struct Application {
    config: AppConfig,
    arena: ArenaService,
}

impl Application {
    pub async fn new(args: CliArgs) -> Result<Self> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }
        if let Some(map) = args.map {
            config.arena.map_name = Some(map);
        }

        if let Err(e) = config.validate() {
            bail!("Configuration validation failed: {}", e);
        }

        logging::setup_logging(&config.logging.level, config.logging.json_format)?;

        let events = create_arena_event_system();
        events.on_core(SETTING_CHANGED, |event: &SettingChangeEvent| {
            info!(
                "⚙️ {} changed: {} -> {}",
                event.setting,
                event
                    .old
                    .as_ref()
                    .map_or_else(|| "unset".to_string(), ToString::to_string),
                event.new
            );
            Ok(())
        })?;
        events.on_core(PHASE_CHANGED, |event: &PhaseChangedEvent| {
            info!(
                "🔄 Phase {} -> {} (joinable: {})",
                event.previous.as_deref().unwrap_or("none"),
                event.current,
                event.accepts_new_players
            );
            Ok(())
        })?;
        events.on_core(ARENA_INFO, |info: &ArenaInfo| {
            debug!(
                "💓 {} | {} | {}/{} alive | joinable: {}",
                info.map_name.as_deref().unwrap_or("-"),
                info.mode.as_deref().unwrap_or("-"),
                info.alive_players,
                info.max_players,
                info.joinable
            );
            Ok(())
        })?;

        let arena = config.build_arena(events);

        info!("🚀 Arena host v{}", env!("CARGO_PKG_VERSION"));
        info!(
            "📂 Config: {} | Server: {}",
            args.config_path.display(),
            config.arena.server_name
        );

        Ok(Self { config, arena })
    }

    pub async fn run(mut self) -> Result<()> {
        if !self.arena.can_start() {
            bail!(
                "Arena {} is missing a map, mode, phase or player limit",
                self.arena.game_name()
            );
        }

        info!("🌟 Starting {} arena", self.arena.game_name());
        info!("📋 Configuration Summary:");
        info!("  🗺️ Map: {}", self.arena.map_name().unwrap_or("-"));
        info!("  🎲 Mode: {}", self.arena.mode().unwrap_or("-"));
        info!("  👥 Max players: {}", self.arena.max_players());
        info!(
            "  🏳️ Teams: {} of {} players",
            self.arena.teams().count(),
            self.config.arena.per_team_capacity
        );
        info!("  🎨 Item categories: {}", self.arena.categories().count());

        self.arena.advance_phase()?;

        let mut heartbeat =
            tokio::time::interval(Duration::from_millis(self.config.host.heartbeat_interval_ms));
        let shutdown = signals::wait_for_shutdown();
        tokio::pin!(shutdown);

        info!("✅ Arena is now running");
        info!("🛑 Press Ctrl+C to shut down");

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    self.arena.publish_info();
                }
                result = &mut shutdown => {
                    let signal = result?;
                    info!(
                        "🛑 {} received, stopping arena with {} players online",
                        signal,
                        self.arena.online_players().len()
                    );
                    break;
                }
            }
        }

        let stats = self.arena.events().get_stats();
        info!("📊 Final Statistics:");
        info!("  - Events emitted: {}", stats.events_emitted);
        info!("  - Events vetoed: {}", stats.events_vetoed);
        info!("  - Handler failures: {}", stats.handler_failures);
        info!("👋 Arena host shut down");

        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let app = match Application::new(args).await {
        Ok(app) => app,
        Err(e) => {
            eprintln!("❌ Failed to start arena host: {:?}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run().await {
        error!("❌ Arena host error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
