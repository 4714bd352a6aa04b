//! Outbound actions.
//!
//! The server understands a small, closed vocabulary of command strings.
//! [`Command`] is the typed form; `Display` renders the wire string and
//! `FromStr` parses it back, rejecting anything outside the vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, Role};

/// The JSON object that carries a command: `{"Action": "<command>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionMessage {
    pub action: String,
}

/// A client-to-server intent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Move the lobby into a running game. Creator only.
    StartGame,
    /// Start over after a team has won.
    RestartGame,
    /// Pass the turn to the other team.
    EndTurn,
    /// Reveal the card with this word.
    Guess(String),
    /// Seat `player` in `role`.
    UpdateTeam { player: String, role: Role },
}

impl Command {
    /// The verb that starts the wire form.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::StartGame => "StartGame",
            Self::RestartGame => "RestartGame",
            Self::EndTurn => "EndTurn",
            Self::Guess(_) => "Guess",
            Self::UpdateTeam { .. } => "UpdateTeam",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guess(word) => write!(f, "Guess {word}"),
            Self::UpdateTeam { player, role } => {
                write!(f, "UpdateTeam {player} {role}")
            }
            other => f.write_str(other.verb()),
        }
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts
            .next()
            .ok_or_else(|| ProtocolError::InvalidCommand("empty command".into()))?;
        let args: Vec<&str> = parts.collect();

        let expect_args = |n: usize| {
            if args.len() == n {
                Ok(())
            } else {
                Err(ProtocolError::InvalidCommand(format!(
                    "`{verb}` takes {n} argument(s), got {}",
                    args.len()
                )))
            }
        };

        match verb {
            "StartGame" => expect_args(0).map(|()| Self::StartGame),
            "RestartGame" => expect_args(0).map(|()| Self::RestartGame),
            "EndTurn" => expect_args(0).map(|()| Self::EndTurn),
            "Guess" => {
                expect_args(1)?;
                Ok(Self::Guess(args[0].to_owned()))
            }
            "UpdateTeam" => {
                expect_args(2)?;
                Ok(Self::UpdateTeam {
                    player: args[0].to_owned(),
                    role: args[1].parse()?,
                })
            }
            other => Err(ProtocolError::InvalidCommand(format!(
                "unknown action `{other}`"
            ))),
        }
    }
}
