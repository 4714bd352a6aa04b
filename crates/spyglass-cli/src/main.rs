//! Terminal client: prints a line per game update and sends each stdin
//! line as an action (`StartGame`, `Guess CAT`, `UpdateTeam alice redspy`).

mod cli;
mod logging;
mod render;

use std::path::Path;

use clap::Parser;
use spyglass::prelude::*;
use spyglass::{ConfigError, SpyglassError};
use spyglass_session::{IdentityStore, PlayerIdentity};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), SpyglassError> {
    let args = CliArgs::parse();

    let mut config = load_config(args.config.as_deref())?;
    args.apply_to(&mut config);
    logging::init(args.log_level.as_deref(), &config.log_level);

    let (participant, session_id) = if config.spectate {
        (Participant::Spectator, spyglass_session::generate_id())
    } else {
        let identity = resolve_identity(&config);
        (
            Participant::Player {
                player_id: identity.player_id,
            },
            identity.session_id,
        )
    };
    let params = config.connect_params(participant, session_id)?;
    info!(url = %params.url()?, "joining game");

    let session = Session::start(&params, config.session_config())?;

    let mut views = session.subscribe();
    let printer = tokio::spawn(async move {
        let mut last = None;
        loop {
            let line = render::summary(&views.borrow_and_update());
            if last.as_ref() != Some(&line) {
                println!("{line}");
                last = Some(line);
            }
            if views.changed().await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let command = line.trim();
                    if command.is_empty() {
                        continue;
                    }
                    if !session.dispatch(command).await {
                        println!("not sent: {command}");
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "stdin closed");
                    break;
                }
            },
        }
    }

    session.shutdown().await;
    let _ = printer.await;
    Ok(())
}

/// Reads `path`, or the default config file if it exists, or falls back
/// to defaults.
fn load_config(path: Option<&Path>) -> Result<ClientConfig, ConfigError> {
    if let Some(path) = path {
        return ClientConfig::load(path);
    }
    match cli::default_config_path() {
        Some(path) if path.exists() => ClientConfig::load(&path),
        _ => Ok(ClientConfig::default()),
    }
}

fn resolve_identity(config: &ClientConfig) -> PlayerIdentity {
    let path = config
        .identity_file
        .clone()
        .or_else(FileIdentityStore::default_path);
    match path {
        Some(path) => identity_from(FileIdentityStore::new(path)),
        None => identity_from(MemoryIdentityStore::new()),
    }
}

fn identity_from<S: IdentityStore>(store: S) -> PlayerIdentity {
    IdentityProvider::new(store).identity()
}
