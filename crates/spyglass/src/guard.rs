//! Client-side checks that keep obviously pointless actions off the wire.
//!
//! These mirror what the board and lobby would disable, nothing more. The
//! server stays the judge of every rule.

use spyglass_protocol::{Command, GameSnapshot, GameStatus};

use crate::DispatchError;

/// Checks `command` against the current snapshot.
pub(crate) fn check(command: &Command, snapshot: &GameSnapshot) -> Result<(), DispatchError> {
    if snapshot.is_spectator_view() {
        return Err(refused("spectators cannot act"));
    }

    let status = snapshot.status();
    match command {
        Command::Guess(word) => {
            require(status == GameStatus::Running, "guesses need a running game")?;
            match snapshot.card(word) {
                None => Err(refused(format!("no card `{word}` on the board"))),
                Some(card) if card.guessed => {
                    Err(refused(format!("`{word}` has already been guessed")))
                }
                Some(_) => Ok(()),
            }
        }
        Command::EndTurn => require(status == GameStatus::Running, "no turn to end"),
        Command::StartGame => require(status == GameStatus::Pending, "game already started"),
        Command::RestartGame => require(status.is_finished(), "game is not over"),
        Command::UpdateTeam { .. } => require(
            matches!(status, GameStatus::Pending | GameStatus::Running),
            "teams are locked",
        ),
    }
}

fn require(condition: bool, reason: &str) -> Result<(), DispatchError> {
    if condition { Ok(()) } else { Err(refused(reason)) }
}

fn refused(reason: impl Into<String>) -> DispatchError {
    DispatchError::Refused(reason.into())
}
