//! Command-line interface of the arena host.
//!
//! Every option overrides the matching value from the configuration file.

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the map being played
    pub map: Option<String>,
}

impl CliArgs {
    pub fn parse() -> Self {
        Self::from_matches(&Self::command().get_matches())
    }

    fn command() -> Command {
        Command::new("Arena Host")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Runs one arena of the game mode and reports its state")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("arena.toml"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("map")
                    .short('m')
                    .long("map")
                    .value_name("NAME")
                    .help("Map to play, replacing the configured one"),
            )
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("arena.toml")),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            map: matches.get_one::<String>("map").cloned(),
        }
    }
}
