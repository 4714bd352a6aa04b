//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use spyglass::ClientConfig;

/// Play or watch a Spyglass game from the terminal.
///
/// CLI values override settings loaded from the config file.
#[derive(Parser, Debug, Default)]
#[command(name = "spyglass", version, about)]
pub struct CliArgs {
    /// Game server, `host[:port]`.
    #[arg(long)]
    pub host: Option<String>,

    /// Connect with wss:// instead of ws://.
    #[arg(long)]
    pub secure: bool,

    /// Id of the game to join.
    #[arg(long)]
    pub game: Option<String>,

    /// Watch without taking part.
    #[arg(long)]
    pub spectate: bool,

    /// Where to keep the player id.
    #[arg(long)]
    pub identity_file: Option<PathBuf>,

    /// Milliseconds between reconnect attempts.
    #[arg(long)]
    pub reconnect_ms: Option<u64>,

    /// Log filter (error, warn, info, debug, trace or a full directive).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to a JSON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// Applies the arguments that were given on top of `config`.
    pub fn apply_to(&self, config: &mut ClientConfig) {
        if let Some(ref host) = self.host {
            config.host = host.clone();
        }
        if self.secure {
            config.secure = true;
        }
        if let Some(ref game) = self.game {
            config.game_id = Some(game.clone());
        }
        if self.spectate {
            config.spectate = true;
        }
        if let Some(ref path) = self.identity_file {
            config.identity_file = Some(path.clone());
        }
        if let Some(ms) = self.reconnect_ms {
            config.reconnect_interval_ms = ms;
        }
        if let Some(ref level) = self.log_level {
            config.log_level = level.clone();
        }
    }
}

/// `<config dir>/spyglass/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("spyglass").join("config.json"))
}
