//! Log setup for the terminal client.
//!
//! Logs go to stderr so they never interleave with the game summary lines
//! on stdout.

use tracing_subscriber::EnvFilter;

/// Picks the filter: an explicit `--log-level` wins, then `RUST_LOG`, then
/// the config file's level.
pub fn env_filter(cli_level: Option<&str>, config_level: &str) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level);
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level))
}

pub fn init(cli_level: Option<&str>, config_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli_level, config_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
